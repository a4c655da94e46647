//! Back-office analytics.
//!
//! Reports are pure folds over *facts*: flattened reads of orders, products
//! and ratings that a store fetches for a date range. Keeping aggregation
//! here means the in-memory and Postgres stores report identical numbers.

pub mod facts;
pub mod period;
pub mod report;

pub use facts::{ItemFact, OrderFact, ProductStockFact, RatingFact};
pub use period::{DateRange, Granularity, PeriodFilter, resolve_range};
pub use report::{
    DashboardAnalytics, DashboardSummary, OrderStatusCount, ProductRating, ProductSales,
    SalesByPeriod, best_rated, dashboard, lowest_stock, orders_by_status, sales_by_period, summary,
    top_selling, worst_rated,
};
