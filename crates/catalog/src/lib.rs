//! Catalog domain module.
//!
//! Categories, products and the storefront search rules (text terms, filters,
//! sort orders). Pure domain logic: no IO, no HTTP, no storage.

pub mod category;
pub mod product;
pub mod search;

pub use category::{Category, CategoryDraft, CategoryWithCount};
pub use product::{Product, ProductDraft, ProductLite};
pub use search::{ProductSearchFilters, ProductSortOrder, SearchTerms, relevance, search};

/// Maximum product name length (characters).
pub const MAX_PRODUCT_NAME_LEN: usize = 150;

/// Maximum product description length (characters).
pub const MAX_PRODUCT_DESCRIPTION_LEN: usize = 2000;

/// Maximum category name length (characters).
pub const MAX_CATEGORY_NAME_LEN: usize = 120;

/// Maximum category description length (characters).
pub const MAX_CATEGORY_DESCRIPTION_LEN: usize = 500;

/// Maximum image URL length (characters).
pub const MAX_IMAGE_URL_LEN: usize = 500;

/// Length of the product card summary before it is cut with "...".
pub const PRODUCT_SUMMARY_LEN: usize = 150;
