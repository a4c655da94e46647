//! Back-office routes. Every handler checks its permission first.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{get, post},
};

use storefront_auth::Permission;
use storefront_catalog::{CategoryDraft, ProductDraft};
use storefront_core::{CategoryId, OrderId, ProductId};
use storefront_infra::Services;

use super::{analytics, created, no_content, ok};
use crate::app::dto::{OrderStatusRequest, PageQuery};
use crate::app::errors::{self, ApiResult};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(update_order_status))
        .nest("/analytics", analytics::router())
}

// --- categories -----------------------------------------------------------

pub async fn list_categories(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let categories = services
        .catalog
        .list_categories()
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(categories))
}

pub async fn get_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let id: CategoryId = errors::parse_id(&id, "category")?;
    let category = services
        .catalog
        .get_category(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(category))
}

pub async fn create_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CategoryDraft>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let category = services
        .catalog
        .create_category(body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(created(category))
}

pub async fn update_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<CategoryDraft>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let id: CategoryId = errors::parse_id(&id, "category")?;
    let category = services
        .catalog
        .update_category(id, body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(category))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let id: CategoryId = errors::parse_id(&id, "category")?;
    services
        .catalog
        .delete_category(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(no_content())
}

// --- products -------------------------------------------------------------

pub async fn list_products(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let products = services
        .catalog
        .list_products(page.request())
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(products))
}

pub async fn get_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let id: ProductId = errors::parse_id(&id, "product")?;
    let details = services
        .catalog
        .get_product(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(details))
}

pub async fn create_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ProductDraft>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let product = services
        .catalog
        .create_product(body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(created(product))
}

pub async fn update_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<ProductDraft>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let id: ProductId = errors::parse_id(&id, "product")?;
    let product = services
        .catalog
        .update_product(id, body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(product))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::CATALOG_MANAGE)?;
    let id: ProductId = errors::parse_id(&id, "product")?;
    services
        .catalog
        .delete_product(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(no_content())
}

// --- orders ---------------------------------------------------------------

pub async fn list_orders(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    require(&principal, &Permission::ORDERS_MANAGE)?;
    let orders = services
        .orders
        .list_all(page.request())
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(orders))
}

pub async fn get_order(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    require(&principal, &Permission::ORDERS_MANAGE)?;
    let id: OrderId = errors::parse_id(&id, "order")?;
    let order = services
        .orders
        .get(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(order))
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<OrderStatusRequest>,
) -> ApiResult {
    require(&principal, &Permission::ORDERS_MANAGE)?;
    let id: OrderId = errors::parse_id(&id, "order")?;
    let status = body.status()?;
    let order = services
        .orders
        .update_status(id, status)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(order))
}
