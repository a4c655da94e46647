use storefront_auth::{JwtClaims, Principal, Role};
use storefront_core::UserId;
use storefront_infra::services::Reviewer;
use storefront_sales::Customer;

/// Principal context for a request (authenticated identity + roles).
///
/// Built from verified token claims by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    roles: Vec<Role>,
    email: Option<String>,
    name: String,
}

impl PrincipalContext {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles.clone(),
            email: claims.email.clone(),
            name: claims.display_name(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn principal(&self) -> Principal {
        Principal::from_roles(self.user_id, self.roles.clone())
    }

    /// Snapshot stored on orders.
    pub fn customer(&self) -> Customer {
        Customer {
            id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn reviewer(&self) -> Reviewer {
        Reviewer {
            id: self.user_id,
            name: self.name.clone(),
        }
    }
}
