//! Turns reserved stock lines into one priced order.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId, UserId};

use super::{Order, OrderItem, OrderStatus};
use crate::error::ShopError;

/// A cart line whose stock has been reserved, with the price read under the
/// product lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Pure order construction. No I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderAssembler;

impl OrderAssembler {
    /// Builds a single `Placed` order from all reserved lines.
    ///
    /// Each line keeps the given price; the total is the sum of the same
    /// line totals stored on the items.
    pub fn assemble(
        &self,
        user_id: UserId,
        lines: Vec<ReservedLine>,
        placed_at: DateTime<Utc>,
    ) -> Result<Order, ShopError> {
        if lines.is_empty() {
            return Err(ShopError::InvalidArgument(
                "an order needs at least one line".to_string(),
            ));
        }

        let mut total = Money::zero();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity == 0 {
                return Err(ShopError::InvalidArgument(format!(
                    "line for product {} has zero quantity",
                    line.product_id
                )));
            }
            let line_total = line
                .unit_price
                .checked_multiply(line.quantity)
                .and_then(|lt| total.checked_add(lt).map(|t| (lt, t)));
            let Some((line_total, running)) = line_total else {
                return Err(ShopError::InvalidArgument(
                    "order total overflows".to_string(),
                ));
            };
            total = running;

            items.push(OrderItem {
                id: OrderItemId::new(),
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total,
            });
        }

        Ok(Order {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Placed,
            total,
            created_at: placed_at,
            items,
        })
    }
}
