//! API-side permission guard for back-office routes.
//!
//! Handlers call [`require`] before touching a service, so services stay
//! auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;

use storefront_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Reject the request with 403 unless the principal holds `permission`.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), Response> {
    authorize(&principal.principal(), permission).map_err(|e| {
        tracing::info!(user_id = %principal.user_id(), %permission, "forbidden");
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}
