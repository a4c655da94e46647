use serde::{Deserialize, Serialize};

use storefront_catalog::ProductLite;
use storefront_core::{DomainError, DomainResult, Money, ProductId};

use crate::checkout::CheckoutItem;

/// A cart line. Name, price and image are refreshed every time the product
/// is added again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image_url: Option<String>,
    pub quantity: i64,
}

impl CartLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Server-held shopping cart (one per user). Lines keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product: &ProductLite, quantity: i64) -> DomainResult<()> {
        if quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::validation("quantity is too large"))?;
                line.name = product.name.clone();
                line.unit_price = product.price;
                line.image_url = product.image_url.clone();
            }
            None => self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                image_url: product.image_url.clone(),
                quantity,
            }),
        }
        Ok(())
    }

    /// Removing a product that is not in the cart is a no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Take checked-out quantities off their lines, dropping lines that
    /// reach zero. Anything added after the checkout snapshot stays.
    pub fn remove_ordered(&mut self, ordered: &[CheckoutItem]) {
        for item in ordered {
            if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == item.product_id) {
                line.quantity = line.quantity.saturating_sub(item.quantity);
            }
        }
        self.lines.retain(|l| l.quantity > 0);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units (not distinct lines).
    pub fn count(&self) -> i64 {
        self.lines
            .iter()
            .fold(0i64, |acc, l| acc.saturating_add(l.quantity))
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    pub fn checkout_items(&self) -> Vec<CheckoutItem> {
        self.lines
            .iter()
            .map(|l| CheckoutItem {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    }
}
