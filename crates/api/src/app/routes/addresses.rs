use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use storefront_core::AddressId;
use storefront_customers::AddressInput;
use storefront_infra::Services;

use super::{created, no_content, ok};
use crate::app::errors::{self, ApiResult};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/default", get(default_address))
        .route(
            "/:id",
            get(get_address).put(update_address).delete(delete_address),
        )
        .route("/:id/make-default", post(make_default))
}

pub async fn list_addresses(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let addresses = services
        .addresses
        .list(principal.user_id())
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(addresses))
}

pub async fn default_address(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    let address = services
        .addresses
        .default_address(principal.user_id())
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(address))
}

pub async fn get_address(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: AddressId = errors::parse_id(&id, "address")?;
    let address = services
        .addresses
        .get(principal.user_id(), id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(address))
}

pub async fn create_address(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<AddressInput>,
) -> ApiResult {
    let address = services
        .addresses
        .create(principal.user_id(), body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(created(address))
}

pub async fn update_address(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<AddressInput>,
) -> ApiResult {
    let id: AddressId = errors::parse_id(&id, "address")?;
    let address = services
        .addresses
        .update(principal.user_id(), id, body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(address))
}

pub async fn delete_address(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: AddressId = errors::parse_id(&id, "address")?;
    services
        .addresses
        .delete(principal.user_id(), id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(no_content())
}

pub async fn make_default(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: AddressId = errors::parse_id(&id, "address")?;
    let address = services
        .addresses
        .make_default(principal.user_id(), id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(address))
}
