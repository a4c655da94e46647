use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::Response,
    routing::{delete, get, post},
};
use serde_json::json;

use storefront_core::ProductId;
use storefront_infra::Services;
use storefront_sales::Cart;

use super::{created, no_content, ok};
use crate::app::dto::{AddToCartRequest, CartCheckoutRequest};
use crate::app::errors::{self, ApiResult};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/count", get(cart_count))
        .route("/items", post(add_item))
        .route("/items/:product_id", delete(remove_item))
        .route("/checkout", post(checkout_cart))
}

fn cart_view(cart: &Cart) -> Response {
    ok(json!({
        "items": cart.lines(),
        "count": cart.count(),
        "subtotal": cart.subtotal(),
    }))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    cart_view(&services.carts.cart(principal.user_id()))
}

pub async fn cart_count(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    ok(json!({ "count": services.carts.count(principal.user_id()) }))
}

pub async fn add_item(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<AddToCartRequest>,
) -> ApiResult {
    let cart = services
        .carts
        .add(principal.user_id(), body.product_id, body.quantity)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(cart_view(&cart))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> ApiResult {
    let product_id: ProductId = errors::parse_id(&product_id, "product")?;
    let cart = services
        .carts
        .remove(principal.user_id(), product_id)
        .map_err(errors::service_error_to_response)?;
    Ok(cart_view(&cart))
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    services.carts.clear(principal.user_id());
    no_content()
}

pub async fn checkout_cart(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CartCheckoutRequest>,
) -> ApiResult {
    let order = services
        .orders
        .checkout_cart(principal.customer(), body.address, body.shipping_fee)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(created(order))
}
