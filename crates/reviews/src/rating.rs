use serde::Serialize;

use crate::ProductReview;

/// Arithmetic mean of the ratings; `None` when there are none.
pub fn average_rating(ratings: impl IntoIterator<Item = u8>) -> Option<f64> {
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(s, c), r| (s + u64::from(r), c + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

/// Everything a product page shows about its ratings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub total: u64,
    /// Reviews carrying a comment, newest first.
    pub with_comments: Vec<ProductReview>,
}

impl RatingSummary {
    pub fn from_reviews(reviews: Vec<ProductReview>) -> Self {
        let average = average_rating(reviews.iter().map(|r| r.rating));
        let total = reviews.len() as u64;
        let mut with_comments: Vec<ProductReview> =
            reviews.into_iter().filter(ProductReview::has_comment).collect();
        with_comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            average,
            total,
            with_comments,
        }
    }
}
