//! Shared types for the shop backend.

mod money;
mod types;

pub use money::Money;
pub use types::{CartId, CartItemId, OrderId, OrderItemId, ProductId, UserId};
