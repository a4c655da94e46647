use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Money, OrderId, ProductId, UserId};
use storefront_sales::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFact {
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFact {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Money,
    pub items: Vec<ItemFact>,
}

impl From<&Order> for OrderFact {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_id: order.customer.id,
            placed_at: order.placed_at,
            status: order.status,
            total: order.total,
            items: order
                .items
                .iter()
                .map(|i| ItemFact {
                    product_id: i.product_id,
                    product_name: i.product_name.clone(),
                    image_url: i.image_url.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockFact {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingFact {
    pub product_id: ProductId,
    pub rating: u8,
}
