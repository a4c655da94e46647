//! `storefront-auth`: authentication and authorization boundary.
//!
//! Identity is issued elsewhere; this crate verifies HS256 tokens, models the
//! claims, and maps roles to permissions. It knows nothing about HTTP or
//! storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize, permissions_for_roles};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use roles::Role;
