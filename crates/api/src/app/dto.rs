use serde::Deserialize;

use storefront_catalog::{ProductSearchFilters, ProductSortOrder};
use storefront_core::{CategoryId, Money, PageRequest, ProductId};
use storefront_sales::{OrderStatus, ShippingAddress};

use crate::app::errors;

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// A missing size is left at zero so the service applies its own default.
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.page_size.unwrap_or(0))
    }
}

/// Storefront listing query. Prices are in cents.
#[derive(Debug, Default, Deserialize)]
pub struct ProductSearchQuery {
    pub term: Option<String>,
    pub category_id: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default)]
    pub in_stock_only: bool,
    pub sort: Option<ProductSortOrder>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductSearchQuery {
    pub fn into_parts(self) -> Result<(ProductSearchFilters, PageRequest), axum::response::Response> {
        let category_id = match self.category_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(errors::parse_id::<CategoryId>(raw, "category")?),
        };
        let filters = ProductSearchFilters {
            term: self.term,
            category_id,
            min_price: self.min_price.map(Money::from_cents),
            max_price: self.max_price.map(Money::from_cents),
            in_stock_only: self.in_stock_only,
            sort: self.sort.unwrap_or_default(),
        };
        let page = PageRequest::new(self.page.unwrap_or(1), self.page_size.unwrap_or(0));
        Ok((filters, page))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewsQuery {
    #[serde(default)]
    pub with_comments_only: bool,
}

// -------------------------
// Request bodies
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProductIdsRequest {
    pub ids: Vec<ProductId>,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CartCheckoutRequest {
    pub address: ShippingAddress,
    #[serde(default)]
    pub shipping_fee: Money,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusRequest {
    pub status: String,
}

impl OrderStatusRequest {
    pub fn status(&self) -> Result<OrderStatus, axum::response::Response> {
        OrderStatus::from_code(self.status.trim()).map_err(errors::domain_error_to_response)
    }
}

#[derive(Debug, Deserialize)]
pub struct AgeVerificationRequest {
    pub verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn search_query_maps_onto_filters() {
        let category = CategoryId::new();
        let query = ProductSearchQuery {
            term: Some("malbec".into()),
            category_id: Some(category.to_string()),
            min_price: Some(1_000),
            sort: Some(ProductSortOrder::PriceDesc),
            page: Some(3),
            ..Default::default()
        };
        let (filters, page) = query.into_parts().unwrap();
        assert_eq!(filters.category_id, Some(category));
        assert_eq!(filters.min_price, Some(Money::from_cents(1_000)));
        assert_eq!(filters.max_price, None);
        assert_eq!(filters.sort, ProductSortOrder::PriceDesc);
        assert_eq!(page, PageRequest::new(3, 0));
    }

    #[test]
    fn blank_category_is_ignored_and_garbage_rejected() {
        let blank = ProductSearchQuery {
            category_id: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(blank.into_parts().unwrap().0.category_id, None);

        let garbage = ProductSearchQuery {
            category_id: Some("wine".into()),
            ..Default::default()
        };
        assert_eq!(garbage.into_parts().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let req = OrderStatusRequest { status: "lost".into() };
        assert_eq!(req.status().unwrap_err().status(), StatusCode::BAD_REQUEST);
        let req = OrderStatusRequest { status: "shipped".into() };
        assert_eq!(req.status().unwrap(), OrderStatus::Shipped);
    }
}
