//! Row-shaped records exchanged with the store.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, Money, OrderId, OrderItemId, ProductId, UserId};

/// A catalog product as the core sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

/// Catalog-owned fields of a product. Stock is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub is_active: Option<bool>,
}

/// A user's cart row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecord {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A single cart line, joined with the owner of its cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineRecord {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A cart line together with the product it currently refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartContentRecord {
    pub line: CartLineRecord,
    pub product: ProductRecord,
}

/// A persisted order with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: String,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineRecord>,
}

/// A persisted order line. Price and name are the values captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRecord {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Outcome of the locked check-and-decrement on a product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockReservation {
    /// Stock was decremented. Carries the price in effect under the lock.
    Reserved {
        unit_price: Money,
        product_name: String,
        remaining: u32,
    },
    /// Not enough stock; nothing was changed.
    Insufficient { available: u32 },
    /// The product does not exist or is inactive.
    Unavailable,
}
