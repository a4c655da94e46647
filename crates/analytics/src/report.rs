use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use storefront_core::{DomainError, DomainResult, Money, ProductId};
use storefront_sales::OrderStatus;

use crate::facts::{OrderFact, ProductStockFact, RatingFact};
use crate::period::{DateRange, Granularity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_revenue: Money,
    pub total_orders: u64,
    pub average_order_value: Money,
    pub active_customers: u64,
    pub total_products: u64,
    pub out_of_stock_products: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusCount {
    pub status: OrderStatus,
    pub label: String,
    pub count: u64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesByPeriod {
    /// "dd/MM/yyyy" for daily buckets, "MM/yyyy" for monthly ones.
    pub period: String,
    pub revenue: Money,
    pub order_count: u64,
    pub items_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Money,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRating {
    pub product_id: ProductId,
    pub name: String,
    pub average: f64,
    pub total: u64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardAnalytics {
    pub range: DateRange,
    pub summary: DashboardSummary,
    pub orders_by_status: Vec<OrderStatusCount>,
    pub sales_by_period: Vec<SalesByPeriod>,
    pub top_selling: Vec<ProductSales>,
}

fn ensure_top(top: usize) -> DomainResult<usize> {
    if top == 0 {
        return Err(DomainError::validation("top must be greater than zero"));
    }
    Ok(top)
}

pub fn summary(orders: &[OrderFact], products: &[ProductStockFact]) -> DashboardSummary {
    let total_revenue: Money = orders.iter().map(|o| o.total).sum();
    let total_orders = orders.len() as u64;
    let active_customers = orders
        .iter()
        .map(|o| o.customer_id)
        .collect::<HashSet<_>>()
        .len() as u64;

    DashboardSummary {
        total_revenue,
        total_orders,
        average_order_value: total_revenue.average(total_orders),
        active_customers,
        total_products: products.len() as u64,
        out_of_stock_products: products.iter().filter(|p| p.stock <= 0).count() as u64,
    }
}

/// Counts and revenue per status, in lifecycle order. Statuses without
/// orders are omitted.
pub fn orders_by_status(orders: &[OrderFact]) -> Vec<OrderStatusCount> {
    let mut grouped: BTreeMap<OrderStatus, (u64, Money)> = BTreeMap::new();
    for o in orders {
        let entry = grouped.entry(o.status).or_insert((0, Money::zero()));
        entry.0 += 1;
        entry.1 += o.total;
    }
    grouped
        .into_iter()
        .map(|(status, (count, revenue))| OrderStatusCount {
            status,
            label: status.label().to_string(),
            count,
            revenue,
        })
        .collect()
}

/// Chronological buckets of revenue, order count and units sold.
pub fn sales_by_period(orders: &[OrderFact], granularity: Granularity) -> Vec<SalesByPeriod> {
    let mut buckets: BTreeMap<NaiveDate, (Money, u64, i64)> = BTreeMap::new();
    for o in orders {
        let day = o.placed_at.date_naive();
        let key = match granularity {
            Granularity::Day => day,
            Granularity::Month => day - chrono::Duration::days(i64::from(day.day0())),
        };
        let entry = buckets.entry(key).or_insert((Money::zero(), 0, 0));
        entry.0 += o.total;
        entry.1 += 1;
        entry.2 += o.items.iter().map(|i| i.quantity).sum::<i64>();
    }

    let format = match granularity {
        Granularity::Day => "%d/%m/%Y",
        Granularity::Month => "%m/%Y",
    };
    buckets
        .into_iter()
        .map(|(key, (revenue, order_count, items_sold))| SalesByPeriod {
            period: key.format(format).to_string(),
            revenue,
            order_count,
            items_sold,
        })
        .collect()
}

/// Best sellers by units sold.
pub fn top_selling(orders: &[OrderFact], top: usize) -> DomainResult<Vec<ProductSales>> {
    let top = ensure_top(top)?;
    let mut by_product: HashMap<ProductId, ProductSales> = HashMap::new();
    for item in orders.iter().flat_map(|o| &o.items) {
        let row = by_product.entry(item.product_id).or_insert_with(|| ProductSales {
            product_id: item.product_id,
            name: item.product_name.clone(),
            quantity_sold: 0,
            revenue: Money::zero(),
            image_url: item.image_url.clone(),
        });
        row.quantity_sold += item.quantity;
        row.revenue += item.unit_price.times(item.quantity);
    }

    let mut rows: Vec<ProductSales> = by_product.into_values().collect();
    rows.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(top);
    Ok(rows)
}

/// Products closest to running out (stock ascending, then name).
pub fn lowest_stock(products: &[ProductStockFact], top: usize) -> DomainResult<Vec<ProductStockFact>> {
    let top = ensure_top(top)?;
    let mut rows = products.to_vec();
    rows.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    rows.truncate(top);
    Ok(rows)
}

fn rating_rows(ratings: &[RatingFact], products: &[ProductStockFact]) -> Vec<ProductRating> {
    let mut grouped: HashMap<ProductId, (u64, u64)> = HashMap::new();
    for r in ratings {
        let entry = grouped.entry(r.product_id).or_insert((0, 0));
        entry.0 += u64::from(r.rating);
        entry.1 += 1;
    }
    products
        .iter()
        .filter_map(|p| {
            let (sum, count) = grouped.get(&p.product_id)?;
            Some(ProductRating {
                product_id: p.product_id,
                name: p.name.clone(),
                average: *sum as f64 / *count as f64,
                total: *count,
                image_url: p.image_url.clone(),
            })
        })
        .collect()
}

fn cmp_avg(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Highest average first; more reviews wins a tie.
pub fn best_rated(
    ratings: &[RatingFact],
    products: &[ProductStockFact],
    top: usize,
) -> DomainResult<Vec<ProductRating>> {
    let top = ensure_top(top)?;
    let mut rows = rating_rows(ratings, products);
    rows.sort_by(|a, b| {
        cmp_avg(b.average, a.average)
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(top);
    Ok(rows)
}

/// Lowest average first; fewer reviews wins a tie.
pub fn worst_rated(
    ratings: &[RatingFact],
    products: &[ProductStockFact],
    top: usize,
) -> DomainResult<Vec<ProductRating>> {
    let top = ensure_top(top)?;
    let mut rows = rating_rows(ratings, products);
    rows.sort_by(|a, b| {
        cmp_avg(a.average, b.average)
            .then_with(|| a.total.cmp(&b.total))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(top);
    Ok(rows)
}

/// Everything the dashboard landing page shows, over one window.
pub fn dashboard(
    range: DateRange,
    granularity: Granularity,
    orders: &[OrderFact],
    products: &[ProductStockFact],
    top: usize,
) -> DomainResult<DashboardAnalytics> {
    Ok(DashboardAnalytics {
        range,
        summary: summary(orders, products),
        orders_by_status: orders_by_status(orders),
        sales_by_period: sales_by_period(orders, granularity),
        top_selling: top_selling(orders, top)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::ItemFact;
    use chrono::{TimeZone, Utc};
    use storefront_core::{OrderId, UserId};

    fn item(product_id: ProductId, name: &str, qty: i64, cents: i64) -> ItemFact {
        ItemFact {
            product_id,
            product_name: name.to_string(),
            image_url: None,
            quantity: qty,
            unit_price: Money::from_cents(cents),
        }
    }

    fn order(customer: UserId, day: u32, month: u32, status: OrderStatus, items: Vec<ItemFact>) -> OrderFact {
        let total = items.iter().map(|i| i.unit_price.times(i.quantity)).sum();
        OrderFact {
            order_id: OrderId::new(),
            customer_id: customer,
            placed_at: Utc.with_ymd_and_hms(2025, month, day, 10, 0, 0).unwrap(),
            status,
            total,
            items,
        }
    }

    fn stock(name: &str, stock: i64) -> ProductStockFact {
        ProductStockFact {
            product_id: ProductId::new(),
            name: name.to_string(),
            price: Money::from_cents(100),
            stock,
            image_url: None,
        }
    }

    struct Fixture {
        orders: Vec<OrderFact>,
        products: Vec<ProductStockFact>,
    }

    fn fixture() -> Fixture {
        let products = vec![stock("Seda", 10), stock("Isqueiro", 0), stock("Piteira", -1)];
        let (seda, isq) = (products[0].product_id, products[1].product_id);
        let ana = UserId::new();
        let bia = UserId::new();
        let orders = vec![
            order(ana, 1, 3, OrderStatus::Processing, vec![item(seda, "Seda", 3, 500)]),
            order(ana, 1, 3, OrderStatus::Delivered, vec![item(isq, "Isqueiro", 1, 1200)]),
            order(bia, 5, 4, OrderStatus::Processing, vec![item(seda, "Seda", 1, 500), item(isq, "Isqueiro", 1, 1200)]),
        ];
        Fixture { orders, products }
    }

    #[test]
    fn summary_counts_distinct_customers_and_empty_stock() {
        let f = fixture();
        let s = summary(&f.orders, &f.products);
        assert_eq!(s.total_revenue, Money::from_cents(1500 + 1200 + 1700));
        assert_eq!(s.total_orders, 3);
        assert_eq!(s.average_order_value, Money::from_cents(4400 / 3));
        assert_eq!(s.active_customers, 2);
        assert_eq!(s.total_products, 3);
        assert_eq!(s.out_of_stock_products, 2);
    }

    #[test]
    fn summary_of_no_orders_has_zero_average() {
        let s = summary(&[], &[]);
        assert_eq!(s.average_order_value, Money::zero());
        assert_eq!(s.total_orders, 0);
    }

    #[test]
    fn statuses_follow_lifecycle_order_and_skip_empty() {
        let f = fixture();
        let rows = orders_by_status(&f.orders);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, OrderStatus::Processing);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[0].revenue, Money::from_cents(1500 + 1700));
        assert_eq!(rows[1].label, "Delivered");
    }

    #[test]
    fn daily_and_monthly_buckets() {
        let f = fixture();
        let daily = sales_by_period(&f.orders, Granularity::Day);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].period, "01/03/2025");
        assert_eq!(daily[0].order_count, 2);
        assert_eq!(daily[0].items_sold, 4);
        assert_eq!(daily[1].period, "05/04/2025");

        let monthly = sales_by_period(&f.orders, Granularity::Month);
        assert_eq!(
            monthly.iter().map(|b| b.period.as_str()).collect::<Vec<_>>(),
            vec!["03/2025", "04/2025"]
        );
    }

    #[test]
    fn top_selling_ranks_by_units() {
        let f = fixture();
        let rows = top_selling(&f.orders, 10).unwrap();
        assert_eq!(rows[0].name, "Seda");
        assert_eq!(rows[0].quantity_sold, 4);
        assert_eq!(rows[0].revenue, Money::from_cents(2000));
        assert_eq!(top_selling(&f.orders, 1).unwrap().len(), 1);
        assert!(top_selling(&f.orders, 0).is_err());
    }

    #[test]
    fn lowest_stock_orders_ascending() {
        let f = fixture();
        let rows = lowest_stock(&f.products, 2).unwrap();
        assert_eq!(
            rows.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["Piteira", "Isqueiro"]
        );
    }

    #[test]
    fn best_and_worst_rated_break_ties_by_review_count() {
        let f = fixture();
        let (seda, isq, pit) = (
            f.products[0].product_id,
            f.products[1].product_id,
            f.products[2].product_id,
        );
        let r = |product_id, rating| RatingFact { product_id, rating };
        let ratings = vec![r(seda, 4), r(seda, 4), r(isq, 4), r(pit, 2)];

        let best = best_rated(&ratings, &f.products, 10).unwrap();
        assert_eq!(best[0].product_id, seda);
        assert_eq!(best[1].product_id, isq);
        assert_eq!(best[2].product_id, pit);

        let worst = worst_rated(&ratings, &f.products, 2).unwrap();
        assert_eq!(worst[0].product_id, pit);
        assert_eq!(worst[1].product_id, isq);
        assert!(worst_rated(&ratings, &f.products, 0).is_err());
    }

    #[test]
    fn dashboard_bundles_the_reports() {
        let f = fixture();
        let range = DateRange {
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap(),
        };
        let d = dashboard(range, Granularity::Month, &f.orders, &f.products, 5).unwrap();
        assert_eq!(d.summary.total_orders, 3);
        assert_eq!(d.sales_by_period.len(), 2);
        assert_eq!(d.top_selling.len(), 2);
    }
}
