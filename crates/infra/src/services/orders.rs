use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use storefront_core::{ADMIN_PAGE_SIZE, Money, OrderId, Page, PageRequest, ProductId, UserId};
use storefront_sales::{
    CheckoutRequest, Customer, Order, OrderStatus, ShippingAddress, price_order,
};

use super::{ServiceError, ServiceResult};
use crate::store::{CartStore, CatalogStore, KeyedStore, OrderStore};

/// Checkout and order management.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
    carts: Arc<dyn CartStore>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogStore>,
        carts: Arc<dyn CartStore>,
    ) -> Self {
        Self {
            orders,
            catalog,
            carts,
        }
    }

    /// Price the request against current catalog data and save the order,
    /// decrementing stock in the same unit of work.
    #[instrument(
        skip(self, customer, request),
        fields(customer_id = %customer.id, lines = request.items.len()),
        err
    )]
    pub async fn checkout(
        &self,
        customer: Customer,
        request: CheckoutRequest,
    ) -> ServiceResult<Order> {
        let ids: Vec<ProductId> = request.items.iter().map(|i| i.product_id).collect();
        let catalog: HashMap<ProductId, _> = self
            .catalog
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let new_order = price_order(customer, request, &catalog, Utc::now())?;
        self.orders.place_order(&new_order).await?;

        let order = new_order.order;
        tracing::info!(order_id = %order.id, total = %order.total, "order placed");
        Ok(order)
    }

    /// Check out the user's server-held cart. Once the order is saved the
    /// ordered quantities leave the cart; lines added meanwhile stay.
    pub async fn checkout_cart(
        &self,
        customer: Customer,
        address: ShippingAddress,
        shipping_fee: Money,
    ) -> ServiceResult<Order> {
        let user = customer.id;
        let items = self.carts.get(&user).unwrap_or_default().checkout_items();
        let request = CheckoutRequest {
            items: items.clone(),
            address,
            shipping_fee,
        };
        let order = self.checkout(customer, request).await?;
        self.carts.update(user, &mut |cart| cart.remove_ordered(&items));
        Ok(order)
    }

    /// The customer's orders, newest first.
    pub async fn list_for(&self, customer: UserId) -> ServiceResult<Vec<Order>> {
        Ok(self.orders.orders_for_customer(customer).await?)
    }

    /// Every order, newest first (back office).
    pub async fn list_all(&self, page: PageRequest) -> ServiceResult<Page<Order>> {
        Ok(self.orders.list_orders(page.normalize(ADMIN_PAGE_SIZE)).await?)
    }

    pub async fn get(&self, id: OrderId) -> ServiceResult<Order> {
        self.orders
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))
    }

    /// Someone else's order is reported as missing.
    pub async fn get_for(&self, customer: UserId, id: OrderId) -> ServiceResult<Order> {
        match self.orders.get_order(id).await? {
            Some(order) if order.belongs_to(customer) => Ok(order),
            _ => Err(ServiceError::not_found("order", id)),
        }
    }

    /// Any status may be set; setting the current one again changes nothing.
    #[instrument(skip(self), fields(order_id = %id, status = %status), err)]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> ServiceResult<Order> {
        let mut order = self.get(id).await?;
        let previous = order.status;
        if order.set_status(status) {
            self.orders.set_order_status(id, status).await?;
            tracing::info!(from = %previous, to = %status, "order status changed");
        }
        Ok(order)
    }
}
