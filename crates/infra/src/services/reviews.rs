use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_core::{OrderId, ProductId, ReviewId, UserId};
use storefront_reviews::{NewReview, ProductReview, RatingSummary, average_rating};

use super::{ServiceError, ServiceResult};
use crate::store::{CatalogStore, OrderStore, ReviewStore};

/// Who is writing a review, as known from the identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    pub id: UserId,
    pub name: String,
}

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            reviews,
            catalog,
            orders,
        }
    }

    /// Record a review. The product must exist; a referenced order must
    /// exist and belong to the reviewer.
    #[instrument(
        skip(self, reviewer, submission),
        fields(user_id = %reviewer.id, product_id = %submission.product_id),
        err
    )]
    pub async fn create(
        &self,
        reviewer: &Reviewer,
        submission: NewReview,
    ) -> ServiceResult<ProductReview> {
        let review = submission.into_review(ReviewId::new(), reviewer.id, &reviewer.name, Utc::now())?;

        if self.catalog.get_product(review.product_id).await?.is_none() {
            return Err(ServiceError::not_found("product", review.product_id));
        }
        if let Some(order_id) = review.order_id {
            match self.orders.get_order(order_id).await? {
                Some(order) if order.belongs_to(reviewer.id) => {}
                _ => return Err(ServiceError::not_found("order", order_id)),
            }
        }

        self.reviews.insert_review(&review).await?;
        tracing::info!(review_id = %review.id, rating = review.rating, "review created");
        Ok(review)
    }

    /// Reviews of a product, newest first.
    pub async fn for_product(
        &self,
        product_id: ProductId,
        with_comments_only: bool,
    ) -> ServiceResult<Vec<ProductReview>> {
        let mut reviews = self.reviews.reviews_for_product(product_id).await?;
        if with_comments_only {
            reviews.retain(ProductReview::has_comment);
        }
        Ok(reviews)
    }

    pub async fn average(&self, product_id: ProductId) -> ServiceResult<Option<f64>> {
        let reviews = self.reviews.reviews_for_product(product_id).await?;
        Ok(average_rating(reviews.iter().map(|r| r.rating)))
    }

    pub async fn count(&self, product_id: ProductId) -> ServiceResult<u64> {
        Ok(self.reviews.reviews_for_product(product_id).await?.len() as u64)
    }

    pub async fn summary(&self, product_id: ProductId) -> ServiceResult<RatingSummary> {
        let reviews = self.reviews.reviews_for_product(product_id).await?;
        Ok(RatingSummary::from_reviews(reviews))
    }

    /// Averages for every requested product; unreviewed ones map to `None`.
    pub async fn averages(
        &self,
        ids: &[ProductId],
    ) -> ServiceResult<HashMap<ProductId, Option<f64>>> {
        let known = self.reviews.average_ratings(ids).await?;
        Ok(ids.iter().map(|id| (*id, known.get(id).copied())).collect())
    }

    pub async fn has_reviewed(&self, user: UserId, product_id: ProductId) -> ServiceResult<bool> {
        Ok(!self.reviews.reviews_by_user(user, product_id).await?.is_empty())
    }

    pub async fn has_reviewed_in_order(
        &self,
        user: UserId,
        product_id: ProductId,
        order_id: OrderId,
    ) -> ServiceResult<bool> {
        let reviews = self.reviews.reviews_by_user(user, product_id).await?;
        Ok(reviews.iter().any(|r| r.order_id == Some(order_id)))
    }

    /// The user's most recent review of the product.
    pub async fn user_review(
        &self,
        user: UserId,
        product_id: ProductId,
    ) -> ServiceResult<Option<ProductReview>> {
        Ok(self
            .reviews
            .reviews_by_user(user, product_id)
            .await?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Services;
    use storefront_catalog::{CategoryDraft, ProductDraft};
    use storefront_core::{DomainError, Money};
    use storefront_sales::{CheckoutItem, CheckoutRequest, Customer, ShippingAddress};

    async fn product(services: &Services) -> ProductId {
        let c = services
            .catalog
            .create_category(CategoryDraft {
                name: "Vinhos".into(),
                description: None,
            })
            .await
            .unwrap();
        services
            .catalog
            .create_product(ProductDraft {
                name: "Malbec".into(),
                description: None,
                price: Money::from_cents(1_000),
                stock: 10,
                image_url: None,
                category_id: c.id,
            })
            .await
            .unwrap()
            .id
    }

    async fn order_for(services: &Services, user: UserId, product_id: ProductId) -> OrderId {
        services
            .orders
            .checkout(
                Customer {
                    id: user,
                    name: "Ana".into(),
                    email: None,
                },
                CheckoutRequest {
                    items: vec![CheckoutItem {
                        product_id,
                        quantity: 1,
                    }],
                    address: ShippingAddress {
                        street: "Rua A".into(),
                        number: None,
                        neighborhood: "Centro".into(),
                        city: "Campinas".into(),
                        complement: None,
                    },
                    shipping_fee: Money::zero(),
                },
            )
            .await
            .unwrap()
            .id
    }

    fn reviewer(id: UserId) -> Reviewer {
        Reviewer {
            id,
            name: "Ana".into(),
        }
    }

    fn submission(product_id: ProductId, order_id: Option<OrderId>, rating: i32, comment: Option<&str>) -> NewReview {
        NewReview {
            product_id,
            order_id,
            rating,
            comment: comment.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn review_of_unknown_product_is_not_found() {
        let services = Services::in_memory();
        let err = services
            .reviews
            .create(&reviewer(UserId::new()), submission(ProductId::new(), None, 4, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn rating_out_of_range_is_invalid() {
        let services = Services::in_memory();
        let p = product(&services).await;
        let err = services
            .reviews
            .create(&reviewer(UserId::new()), submission(p, None, 6, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn order_must_belong_to_reviewer() {
        let services = Services::in_memory();
        let p = product(&services).await;
        let owner = UserId::new();
        let order = order_for(&services, owner, p).await;

        let err = services
            .reviews
            .create(&reviewer(UserId::new()), submission(p, Some(order), 5, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        services
            .reviews
            .create(&reviewer(owner), submission(p, Some(order), 5, Some("ótimo")))
            .await
            .unwrap();
        assert!(services.reviews.has_reviewed_in_order(owner, p, order).await.unwrap());
        assert!(!services.reviews.has_reviewed_in_order(owner, p, OrderId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn queries_report_average_count_and_comments() {
        let services = Services::in_memory();
        let p = product(&services).await;
        let unrated = ProductId::new();
        let ana = UserId::new();

        services.reviews.create(&reviewer(ana), submission(p, None, 4, Some("bom"))).await.unwrap();
        services.reviews.create(&reviewer(ana), submission(p, None, 5, Some("  "))).await.unwrap();
        services.reviews.create(&reviewer(UserId::new()), submission(p, None, 3, None)).await.unwrap();

        assert_eq!(services.reviews.average(p).await.unwrap(), Some(4.0));
        assert_eq!(services.reviews.count(p).await.unwrap(), 3);
        assert_eq!(services.reviews.for_product(p, true).await.unwrap().len(), 1);

        let summary = services.reviews.summary(p).await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.with_comments.len(), 1);

        let averages = services.reviews.averages(&[p, unrated]).await.unwrap();
        assert_eq!(averages[&p], Some(4.0));
        assert_eq!(averages[&unrated], None);

        assert!(services.reviews.has_reviewed(ana, p).await.unwrap());
        assert_eq!(services.reviews.user_review(ana, p).await.unwrap().map(|r| r.user_id), Some(ana));
        assert!(services.reviews.user_review(UserId::new(), p).await.unwrap().is_none());
    }
}
