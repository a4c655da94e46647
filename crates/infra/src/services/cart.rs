use std::sync::Arc;

use tracing::instrument;

use storefront_core::{DomainResult, ProductId, UserId};
use storefront_sales::Cart;

use super::{ServiceError, ServiceResult};
use crate::store::{CartStore, CatalogStore, KeyedStore, StoreError};

/// Per-user carts held by the server.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { carts, catalog }
    }

    pub fn cart(&self, user: UserId) -> Cart {
        self.carts.get(&user).unwrap_or_default()
    }

    pub fn count(&self, user: UserId) -> i64 {
        self.cart(user).count()
    }

    /// Add `quantity` of a product, refreshing the line's name, price and image.
    #[instrument(skip(self), fields(user_id = %user, product_id = %product_id), err)]
    pub async fn add(&self, user: UserId, product_id: ProductId, quantity: i64) -> ServiceResult<Cart> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", product_id))?;
        let lite = product.lite();
        self.modify(user, |cart| cart.add(&lite, quantity))
    }

    pub fn remove(&self, user: UserId, product_id: ProductId) -> ServiceResult<Cart> {
        self.modify(user, |cart| {
            cart.remove(product_id);
            Ok(())
        })
    }

    pub fn clear(&self, user: UserId) {
        self.carts.remove(&user);
    }

    /// Apply `change` under the store lock and return the resulting cart.
    fn modify(
        &self,
        user: UserId,
        mut change: impl FnMut(&mut Cart) -> DomainResult<()>,
    ) -> ServiceResult<Cart> {
        let mut outcome = None;
        self.carts.update(user, &mut |cart| {
            outcome = Some(change(cart).map(|()| cart.clone()));
        });
        match outcome {
            Some(result) => Ok(result?),
            None => Err(StoreError::Backend("cart store skipped the update".into()).into()),
        }
    }
}
