use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use storefront_catalog::{
    Category, CategoryDraft, CategoryWithCount, Product, ProductDraft, ProductLite,
    ProductSearchFilters,
};
use storefront_core::{
    ADMIN_PAGE_SIZE, CategoryId, DomainError, Page, PageRequest, ProductId, STOREFRONT_PAGE_SIZE,
};

use super::{ServiceError, ServiceResult};
use crate::store::{CatalogStore, ReviewStore};

/// Product as shown on a listing card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    pub summary: String,
    pub in_stock: bool,
    pub average_rating: Option<f64>,
}

impl ProductCard {
    fn new(product: Product, average_rating: Option<f64>) -> Self {
        Self {
            summary: product.summary(),
            in_stock: product.in_stock(),
            product,
            average_rating,
        }
    }
}

/// Product page: the card plus its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub card: ProductCard,
    pub category: Option<Category>,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    reviews: Arc<dyn ReviewStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, reviews: Arc<dyn ReviewStore>) -> Self {
        Self { catalog, reviews }
    }

    // --- categories -------------------------------------------------------

    pub async fn list_categories(&self) -> ServiceResult<Vec<CategoryWithCount>> {
        Ok(self.catalog.list_categories().await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> ServiceResult<Category> {
        self.catalog
            .get_category(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    #[instrument(skip(self, draft), err)]
    pub async fn create_category(&self, draft: CategoryDraft) -> ServiceResult<Category> {
        let category = Category::create(CategoryId::new(), draft)?;
        self.catalog.insert_category(&category).await?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, draft), fields(category_id = %id), err)]
    pub async fn update_category(
        &self,
        id: CategoryId,
        draft: CategoryDraft,
    ) -> ServiceResult<Category> {
        let mut category = self.get_category(id).await?;
        category.update(draft)?;
        self.catalog.update_category(&category).await?;
        Ok(category)
    }

    /// Categories that still hold products cannot be deleted.
    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete_category(&self, id: CategoryId) -> ServiceResult<()> {
        let listed = self.catalog.list_categories().await?;
        let entry = listed
            .iter()
            .find(|c| c.category.id == id)
            .ok_or_else(|| ServiceError::not_found("category", id))?;
        if entry.product_count > 0 {
            return Err(DomainError::conflict(format!(
                "category '{}' has {} product(s) and cannot be deleted",
                entry.category.name, entry.product_count
            ))
            .into());
        }
        self.catalog.delete_category(id).await?;
        tracing::info!("category deleted");
        Ok(())
    }

    // --- storefront -------------------------------------------------------

    /// Storefront listing with average ratings.
    #[instrument(skip(self, filters), fields(sort = ?filters.sort), err)]
    pub async fn search(
        &self,
        filters: &ProductSearchFilters,
        page: PageRequest,
    ) -> ServiceResult<Page<ProductCard>> {
        if let (Some(min), Some(max)) = (filters.min_price, filters.max_price) {
            if min > max {
                return Err(DomainError::validation("min_price must not exceed max_price").into());
            }
        }
        let page = page.normalize(STOREFRONT_PAGE_SIZE);
        let products = self.catalog.search_products(filters, page).await?;

        let ids: Vec<ProductId> = products.items.iter().map(|p| p.id).collect();
        let ratings = self.reviews.average_ratings(&ids).await?;
        Ok(products.map(|p| {
            let rating = ratings.get(&p.id).copied();
            ProductCard::new(p, rating)
        }))
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<ProductDetails> {
        let product = self
            .catalog
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))?;
        let category = self.catalog.get_category(product.category_id).await?;
        let rating = self.reviews.average_ratings(&[id]).await?.get(&id).copied();
        Ok(ProductDetails {
            card: ProductCard::new(product, rating),
            category,
        })
    }

    /// Lightweight lookups for carts and recently-viewed lists; unknown ids are skipped.
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> ServiceResult<Vec<ProductLite>> {
        let mut products = self.catalog.products_by_ids(ids).await?;
        products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
        Ok(products.iter().map(Product::lite).collect())
    }

    // --- admin ------------------------------------------------------------

    pub async fn list_products(&self, page: PageRequest) -> ServiceResult<Page<Product>> {
        Ok(self
            .catalog
            .list_products(page.normalize(ADMIN_PAGE_SIZE))
            .await?)
    }

    async fn ensure_category(&self, id: CategoryId) -> ServiceResult<()> {
        match self.catalog.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::validation(format!("category {id} does not exist")).into()),
        }
    }

    #[instrument(skip(self, draft), fields(category_id = %draft.category_id), err)]
    pub async fn create_product(&self, draft: ProductDraft) -> ServiceResult<Product> {
        let product = Product::create(ProductId::new(), draft)?;
        self.ensure_category(product.category_id).await?;
        self.catalog.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, draft), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, draft: ProductDraft) -> ServiceResult<Product> {
        let mut product = self
            .catalog
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))?;
        product.update(draft)?;
        self.ensure_category(product.category_id).await?;
        self.catalog.update_product(&product).await?;
        Ok(product)
    }

    /// Products that were ever ordered stay, so order history keeps its lines.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        let product = self
            .catalog
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))?;
        if self.catalog.product_has_orders(id).await? {
            return Err(DomainError::conflict(format!(
                "product '{}' has orders and cannot be deleted",
                product.name
            ))
            .into());
        }
        self.catalog.delete_product(id).await?;
        tracing::info!("product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Services;
    use storefront_core::Money;

    fn draft(category_id: CategoryId, name: &str, cents: i64, stock: i64) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            description: Some(format!("{name} description")),
            price: Money::from_cents(cents),
            stock,
            image_url: None,
            category_id,
        }
    }

    async fn with_category(services: &Services) -> Category {
        services
            .catalog
            .create_category(CategoryDraft {
                name: "Vinhos".into(),
                description: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn product_needs_an_existing_category() {
        let services = Services::in_memory();
        let err = services
            .catalog
            .create_product(draft(CategoryId::new(), "Malbec", 100, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn category_with_products_is_protected() {
        let services = Services::in_memory();
        let c = with_category(&services).await;
        let p = services.catalog.create_product(draft(c.id, "Malbec", 100, 1)).await.unwrap();

        let err = services.catalog.delete_category(c.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        services.catalog.delete_product(p.id).await.unwrap();
        services.catalog.delete_category(c.id).await.unwrap();
        assert!(matches!(
            services.catalog.get_category(c.id).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn search_pages_with_storefront_default_size() {
        let services = Services::in_memory();
        let c = with_category(&services).await;
        for i in 0..15 {
            services
                .catalog
                .create_product(draft(c.id, &format!("Vinho {i:02}"), 100 + i, 1))
                .await
                .unwrap();
        }

        let page = services
            .catalog
            .search(&ProductSearchFilters::default(), PageRequest::new(2, 0))
            .await
            .unwrap();
        assert_eq!(page.page_size, STOREFRONT_PAGE_SIZE);
        assert_eq!(page.total_count, 15);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].product.name, "Vinho 12");
        assert!(page.items[0].average_rating.is_none());
    }

    #[tokio::test]
    async fn inverted_price_window_is_rejected() {
        let services = Services::in_memory();
        let filters = ProductSearchFilters {
            min_price: Some(Money::from_cents(500)),
            max_price: Some(Money::from_cents(100)),
            ..Default::default()
        };
        assert!(services.catalog.search(&filters, PageRequest::new(1, 12)).await.is_err());
    }

    #[tokio::test]
    async fn by_ids_keeps_request_order_and_skips_unknown() {
        let services = Services::in_memory();
        let c = with_category(&services).await;
        let a = services.catalog.create_product(draft(c.id, "A", 100, 1)).await.unwrap();
        let b = services.catalog.create_product(draft(c.id, "B", 100, 1)).await.unwrap();

        let lites = services
            .catalog
            .products_by_ids(&[b.id, ProductId::new(), a.id])
            .await
            .unwrap();
        let names: Vec<&str> = lites.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[tokio::test]
    async fn product_details_include_category() {
        let services = Services::in_memory();
        let c = with_category(&services).await;
        let p = services.catalog.create_product(draft(c.id, "Malbec", 100, 0)).await.unwrap();

        let details = services.catalog.get_product(p.id).await.unwrap();
        assert_eq!(details.category.map(|c| c.name), Some("Vinhos".to_string()));
        assert!(!details.card.in_stock);
    }
}
