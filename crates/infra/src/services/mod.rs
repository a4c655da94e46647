//! Application services: domain rules orchestrated around the stores.
//!
//! Each service owns `Arc<dyn …Store>` handles and is cheap to clone. HTTP
//! handlers receive the whole [`Services`] bundle.

use std::sync::Arc;

use thiserror::Error;

use storefront_core::DomainError;

use crate::store::{
    AddressStore, AnalyticsStore, CartStore, CatalogStore, InMemoryCartStore, InMemoryStore,
    OrderStore, ReviewStore, StoreError,
};

pub mod addresses;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod reviews;

pub use addresses::AddressService;
pub use analytics::{AnalyticsQuery, AnalyticsService};
pub use cart::CartService;
pub use catalog::{CatalogService, ProductCard, ProductDetails};
pub use orders::OrderService;
pub use reviews::{ReviewService, Reviewer};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of a service call: a broken business rule or a store problem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::Domain(DomainError::not_found(resource, id))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if matches!(err, StoreError::Backend(_) | StoreError::Corrupt(_)) {
            tracing::error!(error = %err, "store failure");
        }
        ServiceError::Store(err)
    }
}

/// A store able to back every service except carts.
pub trait StorefrontStore:
    CatalogStore + OrderStore + ReviewStore + AddressStore + AnalyticsStore
{
}

impl<S> StorefrontStore for S where
    S: CatalogStore + OrderStore + ReviewStore + AddressStore + AnalyticsStore
{
}

/// Every service, wired to one store.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub carts: CartService,
    pub orders: OrderService,
    pub reviews: ReviewService,
    pub addresses: AddressService,
    pub analytics: AnalyticsService,
}

impl Services {
    pub fn from_store<S>(store: Arc<S>, carts: Arc<dyn CartStore>) -> Self
    where
        S: StorefrontStore + 'static,
    {
        let catalog_store: Arc<dyn CatalogStore> = store.clone();
        let order_store: Arc<dyn OrderStore> = store.clone();
        let review_store: Arc<dyn ReviewStore> = store.clone();
        let address_store: Arc<dyn AddressStore> = store.clone();
        let analytics_store: Arc<dyn AnalyticsStore> = store;

        Self {
            catalog: CatalogService::new(catalog_store.clone(), review_store.clone()),
            carts: CartService::new(carts.clone(), catalog_store.clone()),
            orders: OrderService::new(order_store.clone(), catalog_store.clone(), carts),
            reviews: ReviewService::new(review_store, catalog_store, order_store),
            addresses: AddressService::new(address_store),
            analytics: AnalyticsService::new(analytics_store),
        }
    }

    /// Fresh in-memory wiring for dev and tests.
    pub fn in_memory() -> Self {
        Self::from_store(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryCartStore::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_resource_and_id() {
        let err = ServiceError::not_found("order", 42);
        assert_eq!(err, ServiceError::Domain(DomainError::NotFound("order 42 not found".into())));
    }
}
