//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, the domain error model, pagination and field validation.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod page;
pub mod validate;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AddressId, CategoryId, OrderId, ProductId, ReviewId, UserId};
pub use money::Money;
pub use page::{Page, PageRequest};
pub use value_object::ValueObject;

/// Page size used by the public storefront listings (3x4 grid).
pub const STOREFRONT_PAGE_SIZE: u32 = 12;

/// Page size used by back-office listings.
pub const ADMIN_PAGE_SIZE: u32 = 10;

/// Default number of rows returned by "top N" reports.
pub const DEFAULT_TOP_ITEMS: usize = 10;
