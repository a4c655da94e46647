use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use storefront_analytics::{DateRange, OrderFact, ProductStockFact, RatingFact};
use storefront_catalog::{Category, CategoryWithCount, Product, ProductSearchFilters, search};
use storefront_core::{AddressId, CategoryId, Entity, OrderId, Page, PageRequest, ProductId, UserId};
use storefront_customers::{Address, AddressChange};
use storefront_reviews::{ProductReview, average_rating};
use storefront_sales::{NewOrder, Order, OrderStatus};

use super::{
    AddressStore, AnalyticsStore, CatalogStore, OrderStore, ReviewStore, StoreError, StoreResult,
    foreign_address, not_found,
};

#[derive(Debug, Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    /// Insertion order.
    orders: Vec<Order>,
    reviews: Vec<ProductReview>,
    addresses: Vec<Address>,
}

impl Tables {
    fn ratings(&self) -> HashMap<ProductId, Vec<u8>> {
        let mut by_product: HashMap<ProductId, Vec<u8>> = HashMap::new();
        for r in &self.reviews {
            by_product.entry(r.product_id).or_default().push(r.rating);
        }
        by_product
    }

    fn average_ratings(&self) -> HashMap<ProductId, f64> {
        self.ratings()
            .into_iter()
            .filter_map(|(id, ratings)| average_rating(ratings).map(|avg| (id, avg)))
            .collect()
    }
}

fn row<'a, E: Entity>(rows: &'a [E], id: &E::Id) -> Option<&'a E> {
    rows.iter().find(|r| r.id() == id)
}

fn row_mut<'a, E: Entity>(rows: &'a mut [E], id: &E::Id) -> Option<&'a mut E> {
    rows.iter_mut().find(|r| r.id() == id)
}

/// In-memory store for tests/dev.
///
/// Every table sits behind one lock, so a checkout's stock check, stock
/// decrement and order insert happen as a single step.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then_with(|| b.id.cmp(&a.id)));
}

fn newest_reviews_first(reviews: &mut [ProductReview]) {
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.categories.contains_key(&category.id) {
            return Err(StoreError::Conflict(format!(
                "category {} already exists",
                category.id
            )));
        }
        t.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> StoreResult<()> {
        let mut t = self.write()?;
        match t.categories.get_mut(&category.id) {
            Some(existing) => {
                *existing = category.clone();
                Ok(())
            }
            None => Err(not_found("category", category.id)),
        }
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.products.values().any(|p| p.category_id == id) {
            return Err(StoreError::Conflict(format!(
                "category {id} still has products"
            )));
        }
        t.categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("category", id))
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryWithCount>> {
        let t = self.read()?;
        let mut counts: HashMap<CategoryId, u64> = HashMap::new();
        for p in t.products.values() {
            *counts.entry(p.category_id).or_default() += 1;
        }
        let mut listed: Vec<CategoryWithCount> = t
            .categories
            .values()
            .map(|c| CategoryWithCount {
                category: c.clone(),
                product_count: counts.get(&c.id).copied().unwrap_or(0),
            })
            .collect();
        listed.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(listed)
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&product.category_id) {
            return Err(not_found("category", product.category_id));
        }
        if t.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        t.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.categories.contains_key(&product.category_id) {
            return Err(not_found("category", product.category_id));
        }
        match t.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(not_found("product", product.id)),
        }
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut t = self.write()?;
        let ordered = t
            .orders
            .iter()
            .any(|o| o.items.iter().any(|i| i.product_id == id));
        if ordered {
            return Err(StoreError::Conflict(format!(
                "product {id} appears in orders"
            )));
        }
        t.products.remove(&id).ok_or_else(|| not_found("product", id))?;
        t.reviews.retain(|r| r.product_id != id);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let t = self.read()?;
        let mut seen = std::collections::HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| t.products.get(id).cloned())
            .collect())
    }

    async fn search_products(
        &self,
        filters: &ProductSearchFilters,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        let t = self.read()?;
        let products: Vec<Product> = t.products.values().cloned().collect();
        Ok(search(&products, filters, &t.average_ratings(), page))
    }

    async fn list_products(&self, page: PageRequest) -> StoreResult<Page<Product>> {
        let t = self.read()?;
        let mut products: Vec<Product> = t.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(Page::from_vec(products, page))
    }

    async fn product_has_orders(&self, id: ProductId) -> StoreResult<bool> {
        let t = self.read()?;
        Ok(t.orders
            .iter()
            .any(|o| o.items.iter().any(|i| i.product_id == id)))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, new_order: &NewOrder) -> StoreResult<()> {
        let mut t = self.write()?;

        // Check everything before touching anything.
        for d in &new_order.decrements {
            let product = t.products.get(&d.product_id).ok_or_else(|| {
                StoreError::Conflict(format!("product {} is no longer available", d.product_id))
            })?;
            if product.stock < d.quantity {
                return Err(StoreError::Conflict(format!(
                    "quantity above stock for '{}'. Available: {}",
                    product.name, product.stock
                )));
            }
        }

        for d in &new_order.decrements {
            if let Some(product) = t.products.get_mut(&d.product_id) {
                product.stock -= d.quantity;
            }
        }
        t.orders.push(new_order.order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(row(&self.read()?.orders, &id).cloned())
    }

    async fn orders_for_customer(&self, customer: UserId) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .read()?
            .orders
            .iter()
            .filter(|o| o.belongs_to(customer))
            .cloned()
            .collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_orders(&self, page: PageRequest) -> StoreResult<Page<Order>> {
        let mut orders = self.read()?.orders.clone();
        newest_first(&mut orders);
        Ok(Page::from_vec(orders, page))
    }

    async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<()> {
        let mut t = self.write()?;
        let order = row_mut(&mut t.orders, &id).ok_or_else(|| not_found("order", id))?;
        order.set_status(status);
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn insert_review(&self, review: &ProductReview) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.products.contains_key(&review.product_id) {
            return Err(not_found("product", review.product_id));
        }
        t.reviews.push(review.clone());
        Ok(())
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> StoreResult<Vec<ProductReview>> {
        let mut reviews: Vec<ProductReview> = self
            .read()?
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        newest_reviews_first(&mut reviews);
        Ok(reviews)
    }

    async fn reviews_by_user(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> StoreResult<Vec<ProductReview>> {
        let mut reviews: Vec<ProductReview> = self
            .read()?
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id && r.product_id == product_id)
            .cloned()
            .collect();
        newest_reviews_first(&mut reviews);
        Ok(reviews)
    }

    async fn average_ratings(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, f64>> {
        let mut averages = self.read()?.average_ratings();
        averages.retain(|id, _| ids.contains(id));
        Ok(averages)
    }
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn addresses_of(&self, user_id: UserId) -> StoreResult<Vec<Address>> {
        Ok(self
            .read()?
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn apply_address_change(
        &self,
        user_id: UserId,
        change: &AddressChange,
    ) -> StoreResult<()> {
        let mut t = self.write()?;

        let owned_elsewhere = |id: AddressId| t.addresses.iter().any(|a| a.id == id && a.user_id != user_id);
        if let Some(id) = change.removed {
            if !t.addresses.iter().any(|a| a.id == id && a.user_id == user_id) {
                return Err(foreign_address(id));
            }
        }
        if let Some(foreign) = change
            .upserts
            .iter()
            .find(|a| a.user_id != user_id || owned_elsewhere(a.id))
        {
            return Err(foreign_address(foreign.id));
        }

        if let Some(id) = change.removed {
            t.addresses.retain(|a| a.id != id);
        }
        for address in &change.upserts {
            match row_mut(&mut t.addresses, &address.id) {
                Some(existing) => *existing = address.clone(),
                None => t.addresses.push(address.clone()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryStore {
    async fn order_facts(&self, range: DateRange) -> StoreResult<Vec<OrderFact>> {
        Ok(self
            .read()?
            .orders
            .iter()
            .filter(|o| range.contains(o.placed_at))
            .map(OrderFact::from)
            .collect())
    }

    async fn product_stock_facts(&self) -> StoreResult<Vec<ProductStockFact>> {
        Ok(self
            .read()?
            .products
            .values()
            .map(|p| ProductStockFact {
                product_id: p.id,
                name: p.name.clone(),
                price: p.price,
                stock: p.stock,
                image_url: p.image_url.clone(),
            })
            .collect())
    }

    async fn rating_facts(&self) -> StoreResult<Vec<RatingFact>> {
        Ok(self
            .read()?
            .reviews
            .iter()
            .map(|r| RatingFact {
                product_id: r.product_id,
                rating: r.rating,
            })
            .collect())
    }
}
