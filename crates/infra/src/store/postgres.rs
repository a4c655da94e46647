//! Postgres-backed store.
//!
//! Queries are plain runtime `sqlx::query` calls; the storefront search is
//! composed with `QueryBuilder` so optional filters and the sort order stay
//! bound parameters.
//!
//! ## Checkout
//!
//! `place_order` runs in one transaction: product rows are locked with
//! `SELECT … FOR UPDATE` (in id order, so concurrent checkouts cannot
//! deadlock), stock is re-checked, decremented, and the order plus its lines
//! are inserted before commit. Any early return drops the transaction, which
//! rolls it back.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use storefront_analytics::{DateRange, OrderFact, ProductStockFact, RatingFact};
use storefront_catalog::{
    Category, CategoryWithCount, Product, ProductSearchFilters, ProductSortOrder, SearchTerms,
};
use storefront_core::{
    AddressId, CategoryId, Money, OrderId, Page, PageRequest, ProductId, ReviewId, UserId,
};
use storefront_customers::{Address, AddressChange};
use storefront_reviews::ProductReview;
use storefront_sales::{Customer, NewOrder, Order, OrderItem, OrderStatus, ShippingAddress};

use super::{
    AddressStore, AnalyticsStore, CatalogStore, OrderStore, ReviewStore, StoreError, StoreResult,
    foreign_address, not_found,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const PRODUCT_COLUMNS: &str =
    "p.id, p.name, p.description, p.price_cents, p.stock, p.image_url, p.category_id";

const ORDER_COLUMNS: &str = r#"
    id, customer_id, customer_name, customer_email, placed_at, status,
    street, number, neighborhood, city, complement, total_cents
"#;

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, author_name, order_id, rating, comment, created_at";

const ADDRESS_COLUMNS: &str =
    "id, user_id, street, number, city, neighborhood, complement, is_default, created_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables and indexes.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn load_orders(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Order>> {
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(corrupt)?;
        let mut items = self.order_items(&ids).await?;

        rows.iter()
            .map(|row| {
                let header = OrderRow::from_row(row).map_err(corrupt)?;
                let lines = items.remove(&header.id).unwrap_or_default();
                header.into_order(lines)
            })
            .collect()
    }

    async fn order_items(&self, order_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<OrderItem>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, image_url, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_items", e))?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id").map_err(corrupt)?;
            let item = OrderItem {
                product_id: ProductId::from_uuid(row.try_get("product_id").map_err(corrupt)?),
                product_name: row.try_get("product_name").map_err(corrupt)?,
                image_url: row.try_get("image_url").map_err(corrupt)?,
                quantity: row.try_get("quantity").map_err(corrupt)?,
                unit_price: Money::from_cents(row.try_get("unit_price_cents").map_err(corrupt)?),
            };
            by_order.entry(order_id).or_default().push(item);
        }
        Ok(by_order)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        sqlx::query("INSERT INTO categories (id, name, description) VALUES ($1, $2, $3)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let result = sqlx::query("UPDATE categories SET name = $2, description = $3 WHERE id = $1")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.description)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("category", category.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("delete_category", e) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict(format!("category {id} still has products"))
                }
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(not_found("category", id));
        }
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, description FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.map(|r| category_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_categories(&self) -> StoreResult<Vec<CategoryWithCount>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.description, COUNT(p.id) AS product_count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name COLLATE "C"
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter()
            .map(|r| {
                let count: i64 = r.try_get("product_count").map_err(corrupt)?;
                Ok(CategoryWithCount {
                    category: category_from_row(r)?,
                    product_count: count.max(0) as u64,
                })
            })
            .collect()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock, image_url, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(product.category_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| missing_category(map_sqlx_error("insert_product", e), product.category_id))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4, stock = $5,
                image_url = $6, category_id = $7
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(product.category_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| missing_category(map_sqlx_error("update_product", e), product.category_id))?;
        if result.rows_affected() == 0 {
            return Err(not_found("product", product.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| match map_sqlx_error("delete_product", e) {
                StoreError::Conflict(_) => {
                    StoreError::Conflict(format!("product {id} appears in orders"))
                }
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(not_found("product", id));
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_by_ids", e))?;
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(
        skip(self, filters),
        fields(sort = ?filters.sort, page = page.page, result_count = tracing::field::Empty),
        err
    )]
    async fn search_products(
        &self,
        filters: &ProductSearchFilters,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        let terms = SearchTerms::parse(filters.term.as_deref());

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM products p");
        push_search_filters(&mut count, filters, &terms);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_products_count", e))?
            .try_get("total")
            .map_err(corrupt)?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        if filters.sort == ProductSortOrder::TopRated {
            query.push(
                r#"
                LEFT JOIN (
                    SELECT product_id, AVG(rating)::float8 AS avg_rating
                    FROM reviews
                    GROUP BY product_id
                ) r ON r.product_id = p.id
                "#,
            );
        }
        push_search_filters(&mut query, filters, &terms);
        push_search_order(&mut query, filters.sort, &terms);
        query
            .push(" LIMIT ")
            .push_bind(i64::from(page.page_size))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_products", e))?;
        let items = rows.iter().map(product_from_row).collect::<StoreResult<Vec<_>>>()?;

        Span::current().record("result_count", items.len());
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    #[instrument(skip(self), fields(page = page.page), err)]
    async fn list_products(&self, page: PageRequest) -> StoreResult<Page<Product>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products_count", e))?
            .try_get("total")
            .map_err(corrupt)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products p
            ORDER BY p.name COLLATE "C", p.id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(i64::from(page.page_size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let items = rows.iter().map(product_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    async fn product_has_orders(&self, id: ProductId) -> StoreResult<bool> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1) AS ordered")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_has_orders", e))?
            .try_get("ordered")
            .map_err(corrupt)
    }
}

/// `WHERE` clause shared by the count and the page query.
fn push_search_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &ProductSearchFilters,
    terms: &SearchTerms,
) {
    qb.push(" WHERE TRUE");
    for term in terms.as_slice() {
        let pattern = like_pattern(term);
        qb.push(" AND (LOWER(p.name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(p.description, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category_id) = filters.category_id {
        qb.push(" AND p.category_id = ").push_bind(*category_id.as_uuid());
    }
    if let Some(min) = filters.min_price {
        qb.push(" AND p.price_cents >= ").push_bind(min.cents());
    }
    if let Some(max) = filters.max_price {
        qb.push(" AND p.price_cents <= ").push_bind(max.cents());
    }
    if filters.in_stock_only {
        qb.push(" AND p.stock > 0");
    }
}

/// Names compare byte-wise (`COLLATE "C"`) to match the in-memory ordering.
fn push_search_order(qb: &mut QueryBuilder<'_, Postgres>, sort: ProductSortOrder, terms: &SearchTerms) {
    match sort {
        ProductSortOrder::Name => {
            qb.push(r#" ORDER BY p.name COLLATE "C", p.id"#);
        }
        ProductSortOrder::PriceAsc => {
            qb.push(r#" ORDER BY p.price_cents ASC, p.name COLLATE "C", p.id"#);
        }
        ProductSortOrder::PriceDesc => {
            qb.push(r#" ORDER BY p.price_cents DESC, p.name COLLATE "C", p.id"#);
        }
        ProductSortOrder::Relevance if terms.is_empty() => {
            qb.push(r#" ORDER BY p.name COLLATE "C", p.id"#);
        }
        ProductSortOrder::Relevance => {
            qb.push(" ORDER BY (0");
            for term in terms.as_slice() {
                let pattern = like_pattern(term);
                qb.push(" + CASE WHEN LOWER(p.name) LIKE ")
                    .push_bind(pattern.clone())
                    .push(" THEN 2 ELSE 0 END + CASE WHEN LOWER(COALESCE(p.description, '')) LIKE ")
                    .push_bind(pattern)
                    .push(" THEN 1 ELSE 0 END");
            }
            qb.push(r#") DESC, p.name COLLATE "C", p.id"#);
        }
        ProductSortOrder::TopRated => {
            qb.push(r#" ORDER BY r.avg_rating DESC NULLS LAST, p.name COLLATE "C", p.id"#);
        }
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(
        skip(self, new_order),
        fields(
            order_id = %new_order.order.id,
            customer_id = %new_order.order.customer.id,
            line_count = new_order.order.items.len()
        ),
        err
    )]
    async fn place_order(&self, new_order: &NewOrder) -> StoreResult<()> {
        let order = &new_order.order;
        let mut decrements = new_order.decrements.clone();
        decrements.sort_by_key(|d| d.product_id);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("place_order_begin", e))?;

        for d in &decrements {
            let row = sqlx::query("SELECT name, stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(d.product_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("place_order_lock", e))?
                .ok_or_else(|| {
                    StoreError::Conflict(format!("product {} is no longer available", d.product_id))
                })?;
            let name: String = row.try_get("name").map_err(corrupt)?;
            let stock: i64 = row.try_get("stock").map_err(corrupt)?;
            if stock < d.quantity {
                return Err(StoreError::Conflict(format!(
                    "quantity above stock for '{name}'. Available: {stock}"
                )));
            }

            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(d.product_id.as_uuid())
                .bind(d.quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("place_order_decrement", e))?;
        }

        let address = &order.shipping_address;
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, customer_name, customer_email, placed_at, status,
                street, number, neighborhood, city, complement, total_cents
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer.id.as_uuid())
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(order.placed_at)
        .bind(order.status.code())
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.neighborhood)
        .bind(&address.city)
        .bind(&address.complement)
        .bind(order.total.cents())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("place_order_insert", e))?;

        for (line_no, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, line_no, product_id, product_name, image_url, quantity, unit_price_cents
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(&item.image_url)
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("place_order_items", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("place_order_commit", e))?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        Ok(self.load_orders(rows).await?.into_iter().next())
    }

    #[instrument(skip(self), fields(customer_id = %customer), err)]
    async fn orders_for_customer(&self, customer: UserId) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY placed_at DESC, id DESC"
        ))
        .bind(customer.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_for_customer", e))?;
        self.load_orders(rows).await
    }

    #[instrument(skip(self), fields(page = page.page), err)]
    async fn list_orders(&self, page: PageRequest) -> StoreResult<Page<Order>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders_count", e))?
            .try_get("total")
            .map_err(corrupt)?;

        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY placed_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.page_size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let items = self.load_orders(rows).await?;
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status), err)]
    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.code())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_order_status", e))?;
        if result.rows_affected() == 0 {
            return Err(not_found("order", id));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for PostgresStore {
    #[instrument(skip(self, review), fields(review_id = %review.id, product_id = %review.product_id), err)]
    async fn insert_review(&self, review: &ProductReview) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, user_id, author_name, order_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(&review.author_name)
        .bind(review.order_id.map(|id| *id.as_uuid()))
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_review", e) {
            StoreError::Conflict(_) => not_found("product", review.product_id),
            other => other,
        })?;
        Ok(())
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> StoreResult<Vec<ProductReview>> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("reviews_for_product", e))?;
        rows.iter().map(review_from_row).collect()
    }

    async fn reviews_by_user(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> StoreResult<Vec<ProductReview>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REVIEW_COLUMNS} FROM reviews
            WHERE user_id = $1 AND product_id = $2
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("reviews_by_user", e))?;
        rows.iter().map(review_from_row).collect()
    }

    async fn average_ratings(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, f64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT product_id, AVG(rating)::float8 AS average
            FROM reviews
            WHERE product_id = ANY($1)
            GROUP BY product_id
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("average_ratings", e))?;

        rows.iter()
            .map(|r| {
                let id: Uuid = r.try_get("product_id").map_err(corrupt)?;
                let average: f64 = r.try_get("average").map_err(corrupt)?;
                Ok((ProductId::from_uuid(id), average))
            })
            .collect()
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn addresses_of(&self, user_id: UserId) -> StoreResult<Vec<Address>> {
        let rows = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("addresses_of", e))?;
        rows.iter().map(address_from_row).collect()
    }

    #[instrument(
        skip(self, change),
        fields(user_id = %user_id, upserts = change.upserts.len(), removed = ?change.removed),
        err
    )]
    async fn apply_address_change(
        &self,
        user_id: UserId,
        change: &AddressChange,
    ) -> StoreResult<()> {
        if let Some(foreign) = change.upserts.iter().find(|a| a.user_id != user_id) {
            return Err(foreign_address(foreign.id));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply_address_change_begin", e))?;

        // Removal first so a promoted default never meets the old one.
        if let Some(id) = change.removed {
            let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
                .bind(id.as_uuid())
                .bind(user_id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_address", e))?;
            if result.rows_affected() == 0 {
                return Err(foreign_address(id));
            }
        }

        for a in &change.upserts {
            let result = sqlx::query(
                r#"
                INSERT INTO addresses (
                    id, user_id, street, number, city, neighborhood, complement, is_default, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO UPDATE SET
                    street = EXCLUDED.street,
                    number = EXCLUDED.number,
                    city = EXCLUDED.city,
                    neighborhood = EXCLUDED.neighborhood,
                    complement = EXCLUDED.complement,
                    is_default = EXCLUDED.is_default
                WHERE addresses.user_id = EXCLUDED.user_id
                "#,
            )
            .bind(a.id.as_uuid())
            .bind(a.user_id.as_uuid())
            .bind(&a.street)
            .bind(&a.number)
            .bind(&a.city)
            .bind(&a.neighborhood)
            .bind(&a.complement)
            .bind(a.is_default)
            .bind(a.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("upsert_address", e))?;
            if result.rows_affected() == 0 {
                return Err(foreign_address(a.id));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("apply_address_change_commit", e))?;
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for PostgresStore {
    #[instrument(skip(self), fields(start = %range.start, end = %range.end), err)]
    async fn order_facts(&self, range: DateRange) -> StoreResult<Vec<OrderFact>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE placed_at >= $1 AND placed_at <= $2 ORDER BY placed_at"
        ))
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_facts", e))?;
        let orders = self.load_orders(rows).await?;
        Ok(orders.iter().map(OrderFact::from).collect())
    }

    async fn product_stock_facts(&self) -> StoreResult<Vec<ProductStockFact>> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products p"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_stock_facts", e))?;
        rows.iter()
            .map(|r| {
                let p = product_from_row(r)?;
                Ok(ProductStockFact {
                    product_id: p.id,
                    name: p.name,
                    price: p.price,
                    stock: p.stock,
                    image_url: p.image_url,
                })
            })
            .collect()
    }

    async fn rating_facts(&self) -> StoreResult<Vec<RatingFact>> {
        let rows = sqlx::query("SELECT product_id, rating FROM reviews")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rating_facts", e))?;
        rows.iter()
            .map(|r| {
                let id: Uuid = r.try_get("product_id").map_err(corrupt)?;
                Ok(RatingFact {
                    product_id: ProductId::from_uuid(id),
                    rating: rating_from(r.try_get("rating").map_err(corrupt)?)?,
                })
            })
            .collect()
    }
}

// -------------------------------------------------------------------------
// Row mapping
// -------------------------------------------------------------------------

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn rating_from(raw: i16) -> StoreResult<u8> {
    u8::try_from(raw).map_err(|_| StoreError::Corrupt(format!("rating out of range: {raw}")))
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(corrupt)?),
        name: row.try_get("name").map_err(corrupt)?,
        description: row.try_get("description").map_err(corrupt)?,
        price: Money::from_cents(row.try_get("price_cents").map_err(corrupt)?),
        stock: row.try_get("stock").map_err(corrupt)?,
        image_url: row.try_get("image_url").map_err(corrupt)?,
        category_id: CategoryId::from_uuid(row.try_get("category_id").map_err(corrupt)?),
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<ProductReview> {
    let order_id: Option<Uuid> = row.try_get("order_id").map_err(corrupt)?;
    Ok(ProductReview {
        id: ReviewId::from_uuid(row.try_get("id").map_err(corrupt)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(corrupt)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt)?),
        author_name: row.try_get("author_name").map_err(corrupt)?,
        order_id: order_id.map(OrderId::from_uuid),
        rating: rating_from(row.try_get("rating").map_err(corrupt)?)?,
        comment: row.try_get("comment").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

fn address_from_row(row: &PgRow) -> StoreResult<Address> {
    Ok(Address {
        id: AddressId::from_uuid(row.try_get("id").map_err(corrupt)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(corrupt)?),
        street: row.try_get("street").map_err(corrupt)?,
        number: row.try_get("number").map_err(corrupt)?,
        city: row.try_get("city").map_err(corrupt)?,
        neighborhood: row.try_get("neighborhood").map_err(corrupt)?,
        complement: row.try_get("complement").map_err(corrupt)?,
        is_default: row.try_get("is_default").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

/// Order header as stored; lines are loaded separately.
#[derive(Debug, Clone)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    customer_name: String,
    customer_email: Option<String>,
    placed_at: DateTime<Utc>,
    status: String,
    street: String,
    number: Option<String>,
    neighborhood: String,
    city: String,
    complement: Option<String>,
    total_cents: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            placed_at: row.try_get("placed_at")?,
            status: row.try_get("status")?,
            street: row.try_get("street")?,
            number: row.try_get("number")?,
            neighborhood: row.try_get("neighborhood")?,
            city: row.try_get("city")?,
            complement: row.try_get("complement")?,
            total_cents: row.try_get("total_cents")?,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        let status = OrderStatus::from_code(&self.status)
            .map_err(|e| StoreError::Corrupt(format!("order {}: {}", self.id, e.message())))?;
        Ok(Order {
            id: OrderId::from_uuid(self.id),
            customer: Customer {
                id: UserId::from_uuid(self.customer_id),
                name: self.customer_name,
                email: self.customer_email,
            },
            placed_at: self.placed_at,
            status,
            shipping_address: ShippingAddress {
                street: self.street,
                number: self.number,
                neighborhood: self.neighborhood,
                city: self.city,
                complement: self.complement,
            },
            items,
            total: Money::from_cents(self.total_cents),
        })
    }
}

fn missing_category(err: StoreError, category_id: CategoryId) -> StoreError {
    match err {
        StoreError::Conflict(_) => not_found("category", category_id),
        other => other,
    }
}

/// Map SQLx errors to store errors.
///
/// Constraint violations (unique, foreign key, check) become `Conflict`;
/// everything else is a backend failure.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") | Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Backend(format!("connection pool timed out in {operation}"))
        }
        e @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)) => {
            StoreError::Corrupt(format!("decode error in {operation}: {e}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
