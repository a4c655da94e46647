use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::validate::{max_len, optional_text};
use storefront_core::{DomainError, DomainResult, Entity, OrderId, ProductId, ReviewId, UserId};

pub const MAX_RATING: u8 = 5;
pub const MAX_COMMENT_LEN: usize = 1000;

/// A customer's review of a product, optionally tied to the order it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: String,
    pub order_id: Option<OrderId>,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for ProductReview {
    type Id = ReviewId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl ProductReview {
    pub fn has_comment(&self) -> bool {
        self.comment.is_some()
    }
}

/// Review submission. Product and order existence are checked by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub product_id: ProductId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewReview {
    /// Check the rating range and normalise the comment, producing the
    /// stored review. The same user may review a product more than once.
    pub fn into_review(
        self,
        id: ReviewId,
        user_id: UserId,
        author_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<ProductReview> {
        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|r| *r <= MAX_RATING)
            .ok_or_else(|| DomainError::validation("rating must be between 0 and 5"))?;

        let comment = optional_text(self.comment.as_deref());
        if let Some(c) = &comment {
            max_len(c, MAX_COMMENT_LEN, "comment")?;
        }

        Ok(ProductReview {
            id,
            product_id: self.product_id,
            user_id,
            author_name: author_name.into(),
            order_id: self.order_id,
            rating,
            comment,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(rating: i32, comment: Option<&str>) -> NewReview {
        NewReview {
            product_id: ProductId::new(),
            order_id: None,
            rating,
            comment: comment.map(str::to_string),
        }
    }

    fn build(new: NewReview) -> DomainResult<ProductReview> {
        new.into_review(ReviewId::new(), UserId::new(), "Ana", Utc::now())
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert_eq!(build(submission(0, None)).unwrap().rating, 0);
        assert_eq!(build(submission(5, None)).unwrap().rating, 5);
        assert!(build(submission(6, None)).is_err());
        assert!(build(submission(-1, None)).is_err());
    }

    #[test]
    fn blank_comment_is_dropped() {
        let review = build(submission(4, Some("   "))).unwrap();
        assert_eq!(review.comment, None);
        assert!(!review.has_comment());

        let review = build(submission(4, Some(" great "))).unwrap();
        assert_eq!(review.comment.as_deref(), Some("great"));
    }

    #[test]
    fn long_comment_is_rejected() {
        let long = "c".repeat(MAX_COMMENT_LEN + 1);
        let err = build(submission(3, Some(&long))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
