//! Sales domain module: carts, checkout pricing and orders.
//!
//! Pure domain logic (no IO, no HTTP, no storage). Persisting a priced order
//! together with its stock decrements is the store's job.

pub mod cart;
pub mod checkout;
pub mod order;

pub use cart::{Cart, CartLine};
pub use checkout::{CheckoutItem, CheckoutRequest, NewOrder, StockDecrement, price_order};
pub use order::{Customer, Order, OrderItem, OrderStatus, ShippingAddress};
