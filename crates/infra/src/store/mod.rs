//! Persistence ports and their adapters.
//!
//! Services talk to the traits below; `InMemoryStore` backs dev and tests,
//! `PostgresStore` backs production. Both implement every trait, so one value
//! can be shared behind several `Arc<dyn …>` handles.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use storefront_analytics::{DateRange, OrderFact, ProductStockFact, RatingFact};
use storefront_catalog::{Category, CategoryWithCount, Product, ProductSearchFilters};
use storefront_core::{
    AddressId, CategoryId, OrderId, Page, PageRequest, ProductId, UserId,
};
use storefront_customers::{Address, AddressChange};
use storefront_reviews::ProductReview;
use storefront_sales::{Cart, NewOrder, Order, OrderStatus};

pub mod keyed;
pub mod memory;
pub mod postgres;

pub use keyed::{InMemoryCartStore, InMemoryKeyedStore, KeyedStore};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure.
///
/// `Conflict` and `NotFound` are expected outcomes the caller can act on;
/// `Backend` and `Corrupt` are surfaced as internal errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_category(&self, category: &Category) -> StoreResult<()>;
    /// `NotFound` when the category does not exist.
    async fn update_category(&self, category: &Category) -> StoreResult<()>;
    /// `Conflict` when products still reference the category.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    /// All categories by name, each with its product count.
    async fn list_categories(&self) -> StoreResult<Vec<CategoryWithCount>>;

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    /// `NotFound` when the product does not exist.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;
    /// `Conflict` when order lines still reference the product.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    /// Products among `ids` that exist, in no particular order.
    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
    async fn search_products(
        &self,
        filters: &ProductSearchFilters,
        page: PageRequest,
    ) -> StoreResult<Page<Product>>;
    /// Admin listing, by name.
    async fn list_products(&self, page: PageRequest) -> StoreResult<Page<Product>>;
    async fn product_has_orders(&self, id: ProductId) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Re-check stock, apply the decrements and insert the order as one unit.
    /// `Conflict` when stock moved below the requested quantity.
    async fn place_order(&self, new_order: &NewOrder) -> StoreResult<()>;
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn orders_for_customer(&self, customer: UserId) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn list_orders(&self, page: PageRequest) -> StoreResult<Page<Order>>;
    /// `NotFound` when the order does not exist.
    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<()>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert_review(&self, review: &ProductReview) -> StoreResult<()>;
    /// Newest first.
    async fn reviews_for_product(&self, product_id: ProductId) -> StoreResult<Vec<ProductReview>>;
    /// Newest first.
    async fn reviews_by_user(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> StoreResult<Vec<ProductReview>>;
    /// Average rating of each reviewed product among `ids`.
    async fn average_ratings(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, f64>>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn addresses_of(&self, user_id: UserId) -> StoreResult<Vec<Address>>;
    /// Delete `change.removed`, then write `change.upserts` in order, atomically.
    async fn apply_address_change(
        &self,
        user_id: UserId,
        change: &AddressChange,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Orders placed inside `range`, with their lines.
    async fn order_facts(&self, range: DateRange) -> StoreResult<Vec<OrderFact>>;
    async fn product_stock_facts(&self) -> StoreResult<Vec<ProductStockFact>>;
    async fn rating_facts(&self) -> StoreResult<Vec<RatingFact>>;
}

/// Server-held carts, one per user.
///
/// Carts are session state: they stay in process memory even when the rest
/// of the data lives in Postgres.
pub trait CartStore: KeyedStore<UserId, Cart> {}

impl<S> CartStore for S where S: KeyedStore<UserId, Cart> + ?Sized {}

/// Shorthand used by adapters when a lookup by id comes back empty.
pub(crate) fn not_found(resource: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{resource} {id} not found"))
}

/// Shorthand for an address that does not belong to the user.
pub(crate) fn foreign_address(id: AddressId) -> StoreError {
    not_found("address", id)
}
