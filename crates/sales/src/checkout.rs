//! Checkout pricing.
//!
//! `price_order` validates a checkout request against a catalog snapshot and
//! produces the order plus the stock decrements the store must apply in the
//! same transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::Product;
use storefront_core::{DomainError, DomainResult, Money, OrderId, ProductId};

use crate::order::{Customer, Order, OrderItem, OrderStatus, ShippingAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub address: ShippingAddress,
    #[serde(default)]
    pub shipping_fee: Money,
}

/// Stock to take from a product when the order is saved. The store checks
/// availability again under its own lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A priced order ready to be persisted atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order: Order,
    pub decrements: Vec<StockDecrement>,
}

/// Merge duplicate lines, keeping first-seen order.
fn merge_lines(items: &[CheckoutItem]) -> DomainResult<Vec<CheckoutItem>> {
    let mut merged: Vec<CheckoutItem> = Vec::with_capacity(items.len());
    for item in items {
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(m) => {
                m.quantity = m
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| DomainError::validation("quantity is too large"))?;
            }
            None => merged.push(*item),
        }
    }
    Ok(merged)
}

/// Validate and price a checkout.
///
/// Checks run in this order: empty cart, non-positive quantities, unknown
/// products, stock, then the shipping address. Unit prices come from
/// `catalog`, never from the request.
pub fn price_order(
    customer: Customer,
    request: CheckoutRequest,
    catalog: &HashMap<ProductId, Product>,
    now: DateTime<Utc>,
) -> DomainResult<NewOrder> {
    if request.items.is_empty() {
        return Err(DomainError::validation("cart is empty"));
    }
    if request.items.iter().any(|i| i.quantity <= 0) {
        return Err(DomainError::validation(
            "quantity must be positive for every item",
        ));
    }

    let lines = merge_lines(&request.items)?;
    if lines.iter().any(|l| l.quantity <= 0) {
        return Err(DomainError::validation(
            "quantity must be positive for every item",
        ));
    }

    if lines.iter().any(|l| !catalog.contains_key(&l.product_id)) {
        return Err(DomainError::validation("one or more products were not found"));
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut decrements = Vec::with_capacity(lines.len());
    for line in &lines {
        let Some(product) = catalog.get(&line.product_id) else {
            continue;
        };
        if line.quantity > product.stock {
            return Err(DomainError::validation(format!(
                "quantity above stock for '{}'. Available: {}",
                product.name, product.stock
            )));
        }
        items.push(OrderItem {
            product_id: product.id,
            product_name: product.name.clone(),
            image_url: product.image_url.clone(),
            quantity: line.quantity,
            unit_price: product.price,
        });
        decrements.push(StockDecrement {
            product_id: product.id,
            quantity: line.quantity,
        });
    }

    let shipping_address = request.address.validated()?;

    let subtotal: Money = items.iter().map(OrderItem::subtotal).sum();
    let total = subtotal + request.shipping_fee.clamp_non_negative();

    Ok(NewOrder {
        order: Order {
            id: OrderId::new(),
            customer,
            placed_at: now,
            status: OrderStatus::Processing,
            shipping_address,
            items,
            total,
        },
        decrements,
    })
}
