//! Domain layer for the shop backend.
//!
//! This crate provides:
//! - Cart management priced with live product data
//! - The inventory ledger, the only path that lowers stock
//! - Order assembly with frozen unit prices
//! - Checkout as one all-or-nothing transaction with bounded retries
//! - Paginated, owner-scoped order queries

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod order;
pub mod ownership;
pub mod shop;

pub use cart::{CartItemView, CartService, CartView};
pub use catalog::{CatalogService, NewProduct};
pub use checkout::{CheckoutService, CheckoutSettings, CheckoutState};
pub use error::{Entity, ErrorKind, ShopError};
pub use inventory::InventoryLedger;
pub use order::{
    MAX_PAGE_SIZE, Order, OrderAssembler, OrderItem, OrderQuery, OrderStatus, PageMeta,
    PageRequest, ReservedLine,
};
pub use ownership::Owned;
pub use shop::Shop;
