//! Cart aggregate: a user's pending selection, validated against live stock.

mod service;
mod view;

pub use service::CartService;
pub use view::{CartItemView, CartView};
