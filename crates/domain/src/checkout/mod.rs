//! Checkout transaction: cart in, one placed order out.

mod service;
mod state;

pub use service::{CheckoutService, CheckoutSettings};
pub use state::CheckoutState;
