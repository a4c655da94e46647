use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{get, post},
};

use storefront_core::{CategoryId, ProductId};
use storefront_infra::Services;

use super::ok;
use crate::app::dto::{ProductIdsRequest, ProductSearchQuery, ReviewsQuery};
use crate::app::errors::{self, ApiResult};

pub fn router() -> Router {
    Router::new()
        .route("/products", get(search_products))
        .route("/products/by-ids", post(products_by_ids))
        .route("/products/:id", get(get_product))
        .route("/products/:id/reviews", get(product_reviews))
        .route("/products/:id/rating", get(product_rating))
        .route("/categories", get(list_categories))
        .route("/categories/:id", get(get_category))
}

pub async fn search_products(
    Extension(services): Extension<Arc<Services>>,
    Query(query): Query<ProductSearchQuery>,
) -> ApiResult {
    let (filters, page) = query.into_parts()?;
    let page = services
        .catalog
        .search(&filters, page)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(page))
}

pub async fn get_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = errors::parse_id(&id, "product")?;
    let details = services
        .catalog
        .get_product(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(details))
}

/// Used by the client-side cart and "recently viewed" lists.
pub async fn products_by_ids(
    Extension(services): Extension<Arc<Services>>,
    Json(body): Json<ProductIdsRequest>,
) -> ApiResult {
    let products = services
        .catalog
        .products_by_ids(&body.ids)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(products))
}

pub async fn product_reviews(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    Query(query): Query<ReviewsQuery>,
) -> ApiResult {
    let id: ProductId = errors::parse_id(&id, "product")?;
    let reviews = services
        .reviews
        .for_product(id, query.with_comments_only)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(reviews))
}

pub async fn product_rating(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = errors::parse_id(&id, "product")?;
    let summary = services
        .reviews
        .summary(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(summary))
}

pub async fn list_categories(Extension(services): Extension<Arc<Services>>) -> ApiResult {
    let categories = services
        .catalog
        .list_categories()
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(categories))
}

pub async fn get_category(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: CategoryId = errors::parse_id(&id, "category")?;
    let category = services
        .catalog
        .get_category(id)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(category))
}
