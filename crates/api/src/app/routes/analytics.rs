use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Query},
    routing::get,
};

use storefront_auth::Permission;
use storefront_infra::Services;
use storefront_infra::services::AnalyticsQuery;

use super::ok;
use crate::app::errors::{self, ApiResult};
use crate::authz::require;
use crate::context::PrincipalContext;

/// Mounted under `/admin/analytics`; everything needs `analytics.read`.
pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/sales", get(sales))
        .route("/top-products", get(top_products))
        .route("/low-stock", get(low_stock))
        .route("/best-rated", get(best_rated))
        .route("/worst-rated", get(worst_rated))
        .route("/orders-by-status", get(orders_by_status))
        .route("/dashboard", get(dashboard))
}

pub async fn summary(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .summary(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn sales(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .sales_by_period(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn top_products(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .top_products(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn low_stock(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .low_stock(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn best_rated(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .best_rated(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn worst_rated(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .worst_rated(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn orders_by_status(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .orders_by_status(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}

pub async fn dashboard(
    Extension(services): Extension<Arc<Services>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult {
    require(&principal, &Permission::ANALYTICS_READ)?;
    let report = services
        .analytics
        .dashboard(&query)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(ok(report))
}
