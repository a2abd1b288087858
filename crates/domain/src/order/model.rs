//! Immutable order records as seen by callers.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderItemId, ProductId, UserId};
use serde::Serialize;
use shop_store::{OrderLineRecord, OrderRecord, StoreError};

use super::OrderStatus;

/// A placed order. Lines and total are frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    #[serde(rename = "total_cents")]
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Price captured under the stock lock. Never re-read from the product.
    #[serde(rename = "unit_price_cents")]
    pub unit_price: Money,
    #[serde(rename = "line_total_cents")]
    pub line_total: Money,
}

impl Order {
    /// Sum of the line totals, `None` on overflow. Equals `total` for every
    /// order built by the assembler.
    pub fn line_sum(&self) -> Option<Money> {
        Money::checked_sum(self.items.iter().map(|i| i.line_total))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            user_id: self.user_id,
            status: self.status.as_str().to_string(),
            total: self.total,
            created_at: self.created_at,
            items: self
                .items
                .iter()
                .map(|item| OrderLineRecord {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = StoreError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&record.status).ok_or_else(|| {
            StoreError::CorruptRecord(format!(
                "order {} has unknown status {:?}",
                record.id, record.status
            ))
        })?;

        let items = record
            .items
            .into_iter()
            .map(|line| {
                let line_total = line.unit_price.checked_multiply(line.quantity).ok_or_else(|| {
                    StoreError::CorruptRecord(format!(
                        "order {} line {} total overflows",
                        record.id, line.id
                    ))
                })?;
                Ok(OrderItem {
                    line_total,
                    id: line.id,
                    product_id: line.product_id,
                    product_name: line.product_name,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let order = Order {
            id: record.id,
            user_id: record.user_id,
            status,
            total: record.total,
            created_at: record.created_at,
            items,
        };
        if order.line_sum() != Some(order.total) {
            return Err(StoreError::CorruptRecord(format!(
                "order {} total does not match its lines",
                order.id
            )));
        }
        Ok(order)
    }
}
