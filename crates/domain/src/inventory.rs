//! Inventory ledger: the only path that lowers product stock.

use common::ProductId;
use shop_store::{StockReservation, StoreTransaction};

use crate::error::{Entity, ShopError};
use crate::order::ReservedLine;

/// Locked check-and-decrement of product stock inside an open transaction.
///
/// There is no separate "read stock" / "write stock" pair: the store locks the
/// row, compares and decrements in one call, so two transactions can never
/// both decrement from the same observed value.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    /// Reserves `quantity` units of a product and returns the line with the
    /// price in effect under the lock.
    ///
    /// On `InsufficientStock` nothing is written, but the caller must still
    /// roll back the enclosing transaction to undo earlier reservations.
    #[tracing::instrument(skip(self, tx))]
    pub async fn check_and_reserve<T: StoreTransaction>(
        &self,
        tx: &mut T,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<ReservedLine, ShopError> {
        if quantity == 0 {
            return Err(ShopError::InvalidArgument(
                "quantity must be at least 1".to_string(),
            ));
        }

        match tx.reserve_stock(product_id, quantity).await? {
            StockReservation::Reserved {
                unit_price,
                product_name,
                remaining,
            } => {
                tracing::debug!(%product_id, quantity, remaining, "stock reserved");
                Ok(ReservedLine {
                    product_id,
                    product_name,
                    quantity,
                    unit_price,
                })
            }
            StockReservation::Insufficient { available } => {
                tracing::warn!(%product_id, quantity, available, "insufficient stock");
                Err(ShopError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                })
            }
            StockReservation::Unavailable => Err(ShopError::not_found(Entity::Product, product_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use shop_store::{InMemoryStore, ProductRecord, Store};

    use super::*;

    async fn seeded(stock: u32, is_active: bool) -> (InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let product = ProductRecord {
            id: ProductId::new(),
            sku: "SKU-001".to_string(),
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            stock,
            is_active,
        };
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&product).await.unwrap();
        tx.commit().await.unwrap();
        (store, product.id)
    }

    #[tokio::test]
    async fn test_reserve_returns_price_and_decrements() {
        let (store, product_id) = seeded(5, true).await;

        let mut tx = store.begin().await.unwrap();
        let line = InventoryLedger
            .check_and_reserve(&mut tx, product_id, 3)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(line.unit_price, Money::from_cents(1000));
        assert_eq!(line.quantity, 3);
        assert_eq!(store.product_stock(product_id).await, Some(2));
    }

    #[tokio::test]
    async fn test_insufficient_stock_carries_product() {
        let (store, product_id) = seeded(2, true).await;

        let mut tx = store.begin().await.unwrap();
        let err = InventoryLedger
            .check_and_reserve(&mut tx, product_id, 4)
            .await
            .unwrap_err();

        match err {
            ShopError::InsufficientStock {
                product_id: failed,
                requested,
                available,
            } => {
                assert_eq!(failed, product_id);
                assert_eq!(requested, 4);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_inactive_product_is_not_found() {
        let (store, product_id) = seeded(5, false).await;

        let mut tx = store.begin().await.unwrap();
        let err = InventoryLedger
            .check_and_reserve(&mut tx, product_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::NotFound {
                entity: Entity::Product,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (store, product_id) = seeded(5, true).await;

        let mut tx = store.begin().await.unwrap();
        let err = InventoryLedger
            .check_and_reserve(&mut tx, product_id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidArgument(_)));
    }
}
