use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{get, post},
};
use serde_json::json;

use storefront_core::ProductId;
use storefront_infra::Services;
use storefront_reviews::NewReview;

use super::{created, ok};
use crate::app::errors::{self, ApiResult};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_review))
        .route("/mine/:product_id", get(my_review))
}

pub async fn create_review(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewReview>,
) -> ApiResult {
    let review = services
        .reviews
        .create(&principal.reviewer(), body)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(created(review))
}

/// The caller's latest review of a product, if any.
pub async fn my_review(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> ApiResult {
    let product_id: ProductId = errors::parse_id(&product_id, "product")?;
    let review = services
        .reviews
        .user_review(principal.user_id(), product_id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(json!({
        "has_reviewed": review.is_some(),
        "review": review,
    })))
}
