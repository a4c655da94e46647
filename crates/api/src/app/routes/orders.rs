use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use storefront_core::OrderId;
use storefront_infra::Services;
use storefront_sales::CheckoutRequest;

use super::{created, ok};
use crate::app::errors::{self, ApiResult};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_my_orders))
        .route("/checkout", post(checkout))
        .route("/:id", get(get_my_order))
}

/// Checkout of client-held lines; prices come from the catalog, not the body.
pub async fn checkout(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CheckoutRequest>,
) -> ApiResult {
    let order = services
        .orders
        .checkout(principal.customer(), body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(created(order))
}

pub async fn list_my_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let orders = services
        .orders
        .list_for(principal.user_id())
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(orders))
}

pub async fn get_my_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: OrderId = errors::parse_id(&id, "order")?;
    let order = services
        .orders
        .get_for(principal.user_id(), id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(order))
}
