use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

pub mod addresses;
pub mod admin;
pub mod age_verification;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod reviews;
pub mod system;

/// Endpoints open to anonymous visitors.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/catalog", catalog::router())
        .nest("/age-verification", age_verification::router())
}

/// Endpoints that need a verified bearer token.
pub fn protected_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/addresses", addresses::router())
        .nest("/admin", admin::router())
}

pub(crate) fn ok<T: Serialize>(body: T) -> Response {
    Json(body).into_response()
}

pub(crate) fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub(crate) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
