//! Cart to order conversion as one all-or-nothing transaction.

use std::time::{Duration, Instant};

use chrono::Utc;
use common::UserId;
use shop_store::{Store, StoreTransaction};

use super::state::{CheckoutProgress, CheckoutState};
use crate::error::ShopError;
use crate::inventory::InventoryLedger;
use crate::order::{Order, OrderAssembler};

/// Retry and timeout policy for checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Attempts per checkout, counting the first. Only transient storage
    /// aborts are retried.
    pub max_attempts: u32,
    /// Deadline per attempt. An attempt that runs over is rolled back.
    pub timeout: Duration,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Converts a user's cart into a placed order.
///
/// Stock reservation, order insert and cart clear share one store
/// transaction. Any failure before commit drops the transaction, so stock,
/// cart and orders are left exactly as they were.
pub struct CheckoutService<S: Store> {
    store: S,
    ledger: InventoryLedger,
    assembler: OrderAssembler,
    settings: CheckoutSettings,
}

impl<S: Store> CheckoutService<S> {
    pub fn new(store: S, settings: CheckoutSettings) -> Self {
        Self {
            store,
            ledger: InventoryLedger,
            assembler: OrderAssembler,
            settings,
        }
    }

    /// Checks out the user's cart.
    ///
    /// Transient storage failures are retried up to `max_attempts`; business
    /// failures are returned at once.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<Order, ShopError> {
        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();
        let max_attempts = self.settings.max_attempts.max(1);

        let mut attempt = 1;
        let result = loop {
            match self.attempt(user_id).await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(attempt, error = %err, "transient checkout failure, retrying");
                    metrics::counter!("checkout_retries_total").increment(1);
                    attempt += 1;
                }
                other => break other,
            }
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(order) => tracing::info!(
                order_id = %order.id,
                total = %order.total,
                items = order.item_count(),
                attempt,
                "checkout committed"
            ),
            Err(err) => {
                metrics::counter!("checkout_failures_total", "kind" => err.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %err, kind = %err.kind(), attempt, "checkout failed");
            }
        }
        result
    }

    /// One pass through the state machine inside a fresh transaction.
    ///
    /// The deadline covers everything up to the commit. A commit that has
    /// been sent runs to completion, so a placed order is never reported as
    /// a timeout.
    async fn attempt(&self, user_id: UserId) -> Result<Order, ShopError> {
        let mut progress = CheckoutProgress::default();
        let deadline = self.settings.timeout;

        // On timeout the dropped future takes its transaction with it, which
        // rolls the transaction back.
        let prepared = tokio::time::timeout(deadline, self.prepare(&mut progress, user_id))
            .await
            .unwrap_or_else(|_| Err(ShopError::Timeout(deadline)));

        let outcome = match prepared {
            Ok((tx, order)) => tx.commit().await.map(|()| order).map_err(ShopError::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(order) => {
                progress.advance(CheckoutState::Committed);
                Ok(order)
            }
            Err(err) => {
                tracing::debug!(failed_in = %progress.state(), "checkout rolled back");
                progress.advance(CheckoutState::RolledBack);
                Err(err)
            }
        }
    }

    /// Runs the conversion and hands back the open transaction for commit.
    async fn prepare(
        &self,
        progress: &mut CheckoutProgress,
        user_id: UserId,
    ) -> Result<(S::Tx, Order), ShopError> {
        let mut tx = self.store.begin().await?;
        match self.convert(&mut tx, progress, user_id).await {
            Ok(order) => Ok((tx, order)),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn convert(
        &self,
        tx: &mut S::Tx,
        progress: &mut CheckoutProgress,
        user_id: UserId,
    ) -> Result<Order, ShopError> {
        progress.advance(CheckoutState::StockValidating);

        // Locking the cart serializes concurrent checkouts by the same user.
        let cart = tx.lock_cart(user_id).await?.ok_or(ShopError::EmptyCart)?;
        let lines = tx.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        // Rows are locked in product id order so that two carts holding the
        // same products in different orders cannot deadlock. Items keep cart
        // order in the placed order.
        let mut lock_order: Vec<usize> = (0..lines.len()).collect();
        lock_order.sort_by_key(|&i| lines[i].product_id);

        let mut slots = vec![None; lines.len()];
        for i in lock_order {
            let line = &lines[i];
            slots[i] = Some(
                self.ledger
                    .check_and_reserve(tx, line.product_id, line.quantity)
                    .await?,
            );
        }
        let reserved = slots.into_iter().flatten().collect();
        progress.advance(CheckoutState::StockReserved);

        let order = self.assembler.assemble(user_id, reserved, Utc::now())?;
        tx.insert_order(&order.to_record()).await?;
        progress.advance(CheckoutState::OrderPersisted);

        tx.clear_cart(cart.id).await?;
        progress.advance(CheckoutState::CartCleared);

        Ok(order)
    }
}
