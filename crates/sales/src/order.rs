use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::validate::{optional_text, required};
use storefront_core::{DomainError, DomainResult, Entity, Money, OrderId, ProductId, UserId, ValueObject};

/// Order status lifecycle.
///
/// Administrators may move an order to any status; there is no enforced
/// transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Processing,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Stable storage code.
    pub fn code(self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Display label for dashboards.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "In preparation",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn from_code(code: &str) -> DomainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| DomainError::validation(format!("unknown order status '{code}'")))
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Delivery address captured on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    pub neighborhood: String,
    pub city: String,
    #[serde(default)]
    pub complement: Option<String>,
}

impl ValueObject for ShippingAddress {}

impl ShippingAddress {
    /// Street, city and neighborhood are required; optional parts are trimmed.
    pub fn validated(self) -> DomainResult<Self> {
        let street = required(&self.street, "shipping address street is required")?.to_string();
        let city = required(&self.city, "shipping address city is required")?.to_string();
        let neighborhood =
            required(&self.neighborhood, "shipping address neighborhood is required")?.to_string();
        Ok(Self {
            street,
            number: optional_text(self.number.as_deref()),
            neighborhood,
            city,
            complement: optional_text(self.complement.as_deref()),
        })
    }
}

impl core::fmt::Display for ShippingAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.street)?;
        if let Some(n) = &self.number {
            write!(f, ", {n}")?;
        }
        if let Some(c) = &self.complement {
            write!(f, " ({c})")?;
        }
        write!(f, " - {}, {}", self.neighborhood, self.city)
    }
}

/// Customer snapshot taken from the identity token at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
}

/// Order line. The unit price is frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: Customer,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub total: Money,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Order {
    /// Sum of the line subtotals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Whatever the total carries on top of the lines.
    pub fn shipping_fee(&self) -> Money {
        self.total - self.subtotal()
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Returns `true` when the status actually changed.
    pub fn set_status(&mut self, status: OrderStatus) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        true
    }

    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.customer.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: " Rua das Flores ".into(),
            number: Some("12".into()),
            neighborhood: "Centro".into(),
            city: "Campinas".into(),
            complement: Some(" ".into()),
        }
    }

    #[test]
    fn status_codes_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(status.code()).unwrap(), status);
        }
        assert!(OrderStatus::from_code("lost").is_err());
    }

    #[test]
    fn address_requires_street_city_and_neighborhood() {
        let ok = address().validated().unwrap();
        assert_eq!(ok.street, "Rua das Flores");
        assert_eq!(ok.complement, None);

        let mut missing_city = address();
        missing_city.city = "  ".into();
        let err = missing_city.validated().unwrap_err();
        assert_eq!(err, DomainError::validation("shipping address city is required"));

        let mut missing_neighborhood = address();
        missing_neighborhood.neighborhood = String::new();
        assert!(missing_neighborhood.validated().is_err());
    }

    #[test]
    fn address_display_is_single_line() {
        let a = address().validated().unwrap();
        assert_eq!(a.to_string(), "Rua das Flores, 12 - Centro, Campinas");
    }

    #[test]
    fn shipping_fee_is_total_minus_lines() {
        let mut order = Order {
            id: OrderId::new(),
            customer: Customer {
                id: UserId::new(),
                name: "Ana".into(),
                email: None,
            },
            placed_at: Utc::now(),
            status: OrderStatus::Processing,
            shipping_address: address(),
            items: vec![OrderItem {
                product_id: ProductId::new(),
                product_name: "Seda".into(),
                image_url: None,
                quantity: 3,
                unit_price: Money::from_cents(500),
            }],
            total: Money::from_cents(2000),
        };
        assert_eq!(order.subtotal(), Money::from_cents(1500));
        assert_eq!(order.shipping_fee(), Money::from_cents(500));

        assert!(order.set_status(OrderStatus::Shipped));
        assert!(!order.set_status(OrderStatus::Shipped));
    }
}
