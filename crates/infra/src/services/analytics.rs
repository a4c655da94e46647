use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use storefront_analytics::{
    DashboardAnalytics, DashboardSummary, DateRange, Granularity, OrderStatusCount, PeriodFilter,
    ProductRating, ProductSales, ProductStockFact, SalesByPeriod, report, resolve_range,
};
use storefront_core::DEFAULT_TOP_ITEMS;

use super::ServiceResult;
use crate::store::AnalyticsStore;

/// Dashboard query parameters shared by every report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyticsQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub period: Option<PeriodFilter>,
    pub top: Option<usize>,
}

impl AnalyticsQuery {
    fn range(&self, now: DateTime<Utc>) -> DateRange {
        resolve_range(self.start, self.end, self.period, now)
    }

    fn granularity(&self) -> Granularity {
        self.period.map_or(Granularity::Day, PeriodFilter::granularity)
    }

    fn top(&self) -> usize {
        self.top.unwrap_or(DEFAULT_TOP_ITEMS)
    }
}

/// Back-office reports. Facts come from the store; aggregation happens here.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn AnalyticsStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn AnalyticsStore>) -> Self {
        Self { store }
    }

    pub async fn summary(&self, query: &AnalyticsQuery) -> ServiceResult<DashboardSummary> {
        let orders = self.store.order_facts(query.range(Utc::now())).await?;
        let products = self.store.product_stock_facts().await?;
        Ok(report::summary(&orders, &products))
    }

    pub async fn sales_by_period(&self, query: &AnalyticsQuery) -> ServiceResult<Vec<SalesByPeriod>> {
        let orders = self.store.order_facts(query.range(Utc::now())).await?;
        Ok(report::sales_by_period(&orders, query.granularity()))
    }

    pub async fn top_products(&self, query: &AnalyticsQuery) -> ServiceResult<Vec<ProductSales>> {
        let orders = self.store.order_facts(query.range(Utc::now())).await?;
        Ok(report::top_selling(&orders, query.top())?)
    }

    pub async fn orders_by_status(
        &self,
        query: &AnalyticsQuery,
    ) -> ServiceResult<Vec<OrderStatusCount>> {
        let orders = self.store.order_facts(query.range(Utc::now())).await?;
        Ok(report::orders_by_status(&orders))
    }

    /// Stock is a current snapshot; the date range does not apply.
    pub async fn low_stock(&self, query: &AnalyticsQuery) -> ServiceResult<Vec<ProductStockFact>> {
        let products = self.store.product_stock_facts().await?;
        Ok(report::lowest_stock(&products, query.top())?)
    }

    pub async fn best_rated(&self, query: &AnalyticsQuery) -> ServiceResult<Vec<ProductRating>> {
        let ratings = self.store.rating_facts().await?;
        let products = self.store.product_stock_facts().await?;
        Ok(report::best_rated(&ratings, &products, query.top())?)
    }

    pub async fn worst_rated(&self, query: &AnalyticsQuery) -> ServiceResult<Vec<ProductRating>> {
        let ratings = self.store.rating_facts().await?;
        let products = self.store.product_stock_facts().await?;
        Ok(report::worst_rated(&ratings, &products, query.top())?)
    }

    #[instrument(skip(self), err)]
    pub async fn dashboard(&self, query: &AnalyticsQuery) -> ServiceResult<DashboardAnalytics> {
        let range = query.range(Utc::now());
        let orders = self.store.order_facts(range).await?;
        let products = self.store.product_stock_facts().await?;
        tracing::debug!(orders = orders.len(), products = products.len(), "dashboard facts loaded");
        Ok(report::dashboard(
            range,
            query.granularity(),
            &orders,
            &products,
            query.top(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Services;
    use storefront_catalog::{CategoryDraft, ProductDraft};
    use storefront_core::{DomainError, Money, ProductId, UserId};
    use storefront_reviews::NewReview;
    use storefront_sales::{CheckoutItem, CheckoutRequest, Customer, OrderStatus, ShippingAddress};

    use crate::services::{Reviewer, ServiceError};

    async fn product(services: &Services, name: &str, cents: i64, stock: i64) -> ProductId {
        let c = services
            .catalog
            .create_category(CategoryDraft {
                name: format!("{name} category"),
                description: None,
            })
            .await
            .unwrap();
        services
            .catalog
            .create_product(ProductDraft {
                name: name.into(),
                description: None,
                price: Money::from_cents(cents),
                stock,
                image_url: None,
                category_id: c.id,
            })
            .await
            .unwrap()
            .id
    }

    async fn buy(services: &Services, user: UserId, product_id: ProductId, quantity: i64) {
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
                        quantity,
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
            .unwrap();
    }

    async fn rate(services: &Services, product_id: ProductId, rating: i32) {
        services
            .reviews
            .create(
                &Reviewer {
                    id: UserId::new(),
                    name: "Bia".into(),
                },
                NewReview {
                    product_id,
                    order_id: None,
                    rating,
                    comment: None,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dashboard_aggregates_recent_orders() {
        let services = Services::in_memory();
        let malbec = product(&services, "Malbec", 5_000, 10).await;
        let cohiba = product(&services, "Cohiba", 2_000, 1).await;
        let (ana, bia) = (UserId::new(), UserId::new());

        buy(&services, ana, malbec, 2).await;
        buy(&services, bia, malbec, 1).await;
        buy(&services, ana, cohiba, 1).await;

        let query = AnalyticsQuery {
            period: Some(PeriodFilter::Today),
            ..Default::default()
        };
        let dashboard = services.analytics.dashboard(&query).await.unwrap();

        assert_eq!(dashboard.summary.total_orders, 3);
        assert_eq!(dashboard.summary.total_revenue, Money::from_cents(17_000));
        assert_eq!(dashboard.summary.active_customers, 2);
        assert_eq!(dashboard.summary.out_of_stock_products, 1);
        assert_eq!(dashboard.sales_by_period.len(), 1);
        assert_eq!(dashboard.sales_by_period[0].items_sold, 4);
        assert_eq!(dashboard.top_selling[0].product_id, malbec);
        assert_eq!(dashboard.top_selling[0].quantity_sold, 3);

        let statuses = services.analytics.orders_by_status(&query).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, OrderStatus::Processing);
        assert_eq!(statuses[0].count, 3);
    }

    #[tokio::test]
    async fn orders_outside_the_window_are_ignored() {
        let services = Services::in_memory();
        let malbec = product(&services, "Malbec", 5_000, 10).await;
        buy(&services, UserId::new(), malbec, 1).await;

        let past = Utc::now() - chrono::Duration::days(400);
        let query = AnalyticsQuery {
            start: Some(past - chrono::Duration::days(1)),
            end: Some(past),
            period: Some(PeriodFilter::Custom),
            top: None,
        };
        assert_eq!(services.analytics.summary(&query).await.unwrap().total_orders, 0);
        assert!(services.analytics.sales_by_period(&query).await.unwrap().is_empty());
        assert!(services.analytics.top_products(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stock_and_rating_rankings() {
        let services = Services::in_memory();
        let malbec = product(&services, "Malbec", 5_000, 10).await;
        let cohiba = product(&services, "Cohiba", 2_000, 2).await;
        product(&services, "Merlot", 3_000, 7).await;

        rate(&services, malbec, 5).await;
        rate(&services, malbec, 4).await;
        rate(&services, cohiba, 2).await;

        let query = AnalyticsQuery {
            top: Some(2),
            ..Default::default()
        };
        let low: Vec<i64> = services
            .analytics
            .low_stock(&query)
            .await
            .unwrap()
            .iter()
            .map(|p| p.stock)
            .collect();
        assert_eq!(low, [2, 7]);

        let best = services.analytics.best_rated(&query).await.unwrap();
        assert_eq!(best[0].product_id, malbec);
        assert_eq!(best[0].average, 4.5);
        assert_eq!(best.len(), 2);

        let worst = services.analytics.worst_rated(&query).await.unwrap();
        assert_eq!(worst[0].product_id, cohiba);
    }

    #[tokio::test]
    async fn zero_top_is_invalid() {
        let services = Services::in_memory();
        let query = AnalyticsQuery {
            top: Some(0),
            ..Default::default()
        };
        let err = services.analytics.low_stock(&query).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
