//! Domain error types.

use std::time::Duration;

use common::ProductId;
use shop_store::StoreError;
use thiserror::Error;

/// Entities a [`ShopError::NotFound`] can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Product,
    Cart,
    CartItem,
    Order,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Product => "Product",
            Entity::Cart => "Cart",
            Entity::CartItem => "Cart item",
            Entity::Order => "Order",
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during shop operations.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Malformed input. Not retryable as-is.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity does not exist or is not owned by the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    /// Not enough stock to satisfy the requested quantity.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Checkout was attempted on an absent or empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The storage layer aborted the transaction.
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[from] StoreError),

    /// The transaction did not finish in time and was rolled back.
    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),
}

impl ShopError {
    pub(crate) fn not_found(entity: Entity, id: impl std::fmt::Display) -> Self {
        ShopError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the stable kind callers branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShopError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ShopError::NotFound { .. } => ErrorKind::NotFound,
            ShopError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ShopError::EmptyCart => ErrorKind::EmptyCart,
            ShopError::TransactionFailed(_) | ShopError::Timeout(_) => ErrorKind::TransactionFailed,
        }
    }

    /// Returns true if the whole operation may be re-run without caller
    /// intervention. Only transient storage aborts qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            ShopError::TransactionFailed(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Stable error kinds exposed to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InsufficientStock,
    EmptyCart,
    TransactionFailed,
}

impl ErrorKind {
    /// Returns the machine-readable code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::EmptyCart => "empty_cart",
            ErrorKind::TransactionFailed => "transaction_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
