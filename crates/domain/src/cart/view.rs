use common::{CartId, CartItemId, Money, ProductId, UserId};
use serde::Serialize;
use shop_store::{CartContentRecord, CartRecord};

use crate::error::ShopError;

/// A cart as returned to callers, priced with live product prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// `None` until the user's cart row exists.
    pub cart_id: Option<CartId>,
    pub user_id: UserId,
    pub items: Vec<CartItemView>,
    #[serde(rename = "total_cents")]
    pub total: Money,
}

/// One cart line. `subtotal` is computed on read; nothing is frozen before
/// checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(rename = "unit_price_cents")]
    pub unit_price: Money,
    #[serde(rename = "subtotal_cents")]
    pub subtotal: Money,
    pub available_stock: u32,
}

impl CartView {
    /// View of a user who has no cart yet.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            cart_id: None,
            user_id,
            items: Vec::new(),
            total: Money::zero(),
        }
    }

    /// Prices the cart lines. Fails if a subtotal or the total does not fit
    /// in `Money`.
    pub(crate) fn from_contents(
        cart: &CartRecord,
        contents: Vec<CartContentRecord>,
    ) -> Result<Self, ShopError> {
        let items = contents
            .into_iter()
            .map(|c| {
                let subtotal = c
                    .product
                    .price
                    .checked_multiply(c.line.quantity)
                    .ok_or_else(overflow)?;
                Ok(CartItemView {
                    id: c.line.id,
                    product_id: c.product.id,
                    product_name: c.product.name,
                    quantity: c.line.quantity,
                    unit_price: c.product.price,
                    subtotal,
                    available_stock: c.product.stock,
                })
            })
            .collect::<Result<Vec<_>, ShopError>>()?;
        let total = Money::checked_sum(items.iter().map(|i| i.subtotal)).ok_or_else(overflow)?;

        Ok(Self {
            cart_id: Some(cart.id),
            user_id: cart.user_id,
            items,
            total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn overflow() -> ShopError {
    ShopError::InvalidArgument("cart total overflows".to_string())
}
