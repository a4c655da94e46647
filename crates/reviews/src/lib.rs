//! Product reviews: rating rules and rating summaries.

pub mod rating;
pub mod review;

pub use rating::{RatingSummary, average_rating};
pub use review::{MAX_COMMENT_LEN, MAX_RATING, NewReview, ProductReview};
