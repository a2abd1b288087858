use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartItemId, OrderId, ProductId, UserId};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::records::{
    CartContentRecord, CartLineRecord, CartRecord, OrderRecord, ProductRecord, ProductUpdate,
    StockReservation,
};
use crate::store::{Store, StoreTransaction};
use crate::{Result, StoreError};

/// Places where the in-memory store can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    ReserveStock,
    InsertOrder,
    ClearCart,
    Commit,
}

impl FaultPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultPoint::ReserveStock => "reserve_stock",
            FaultPoint::InsertOrder => "insert_order",
            FaultPoint::ClearCart => "clear_cart",
            FaultPoint::Commit => "commit",
        }
    }
}

impl std::fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, ProductRecord>,
    carts: HashMap<UserId, CartRecord>,
    /// Insertion order doubles as cart-item order.
    cart_lines: Vec<CartLineRecord>,
    /// Insertion order doubles as creation order.
    orders: Vec<OrderRecord>,
}

impl MemoryState {
    fn owner_of(&self, cart_id: CartId) -> Option<UserId> {
        self.carts
            .values()
            .find(|c| c.id == cart_id)
            .map(|c| c.user_id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    pending: Vec<(FaultPoint, bool)>,
    commit_stall: Option<Duration>,
}

/// In-memory shop store for testing and local development.
///
/// A transaction holds an exclusive lock on the whole store and works on a
/// private copy, which replaces the shared state on commit. Transactions are
/// therefore fully serialized.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<AsyncMutex<MemoryState>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next operation at `point` fail. Faults queue up and fire
    /// once each.
    pub fn fail_next(&self, point: FaultPoint, transient: bool) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .push((point, transient));
    }

    /// Makes the next commit wait for `delay` before publishing its changes.
    pub fn stall_next_commit(&self, delay: Duration) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commit_stall = Some(delay);
    }

    /// Returns the committed stock of a product.
    pub async fn product_stock(&self, product_id: ProductId) -> Option<u32> {
        self.state
            .lock()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }

    /// Returns the total number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of committed cart lines.
    pub async fn cart_line_count(&self) -> usize {
        self.state.lock().await.cart_lines.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            working,
            faults: self.faults.clone(),
        })
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryTransaction {
    fn check_fault(&self, point: FaultPoint) -> Result<()> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.pending.iter().position(|(p, _)| *p == point) {
            Some(index) => {
                let (operation, transient) = faults.pending.remove(index);
                Err(StoreError::Fault {
                    operation,
                    transient,
                })
            }
            None => Ok(()),
        }
    }

    fn take_commit_stall(&self) -> Option<Duration> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commit_stall
            .take()
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.working.products.get(&product_id).cloned())
    }

    async fn insert_product(&mut self, product: &ProductRecord) -> Result<()> {
        if self.working.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        if self.working.products.values().any(|p| p.sku == product.sku) {
            return Err(StoreError::Conflict(format!(
                "sku {} already exists",
                product.sku
            )));
        }
        self.working.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(
        &mut self,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<bool> {
        let Some(product) = self.working.products.get_mut(&product_id) else {
            return Ok(false);
        };
        if let Some(name) = &update.name {
            product.name = name.clone();
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(is_active) = update.is_active {
            product.is_active = is_active;
        }
        Ok(true)
    }

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self.working.carts.get(&user_id).cloned())
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        // The whole store is already held exclusively.
        self.find_cart(user_id).await
    }

    async fn get_or_create_cart(&mut self, user_id: UserId) -> Result<CartRecord> {
        let cart = self
            .working
            .carts
            .entry(user_id)
            .or_insert_with(|| CartRecord {
                id: CartId::new(),
                user_id,
                created_at: Utc::now(),
            });
        Ok(cart.clone())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLineRecord>> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn cart_contents(&mut self, cart_id: CartId) -> Result<Vec<CartContentRecord>> {
        self.working
            .cart_lines
            .iter()
            .filter(|l| l.cart_id == cart_id)
            .map(|line| {
                let product = self
                    .working
                    .products
                    .get(&line.product_id)
                    .cloned()
                    .ok_or_else(|| {
                        StoreError::CorruptRecord(format!(
                            "cart line {} refers to missing product {}",
                            line.id, line.product_id
                        ))
                    })?;
                Ok(CartContentRecord {
                    line: line.clone(),
                    product,
                })
            })
            .collect()
    }

    async fn find_cart_line(&mut self, item_id: CartItemId) -> Result<Option<CartLineRecord>> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .find(|l| l.id == item_id)
            .cloned())
    }

    async fn find_cart_line_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLineRecord>> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .find(|l| l.cart_id == cart_id && l.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineRecord> {
        let user_id = self
            .working
            .owner_of(cart_id)
            .ok_or_else(|| StoreError::CorruptRecord(format!("cart {cart_id} does not exist")))?;
        if self
            .working
            .cart_lines
            .iter()
            .any(|l| l.cart_id == cart_id && l.product_id == product_id)
        {
            return Err(StoreError::Conflict(format!(
                "cart {cart_id} already holds product {product_id}"
            )));
        }

        let line = CartLineRecord {
            id: CartItemId::new(),
            cart_id,
            user_id,
            product_id,
            quantity,
        };
        self.working.cart_lines.push(line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(&mut self, item_id: CartItemId, quantity: u32) -> Result<()> {
        if let Some(line) = self
            .working
            .cart_lines
            .iter_mut()
            .find(|l| l.id == item_id)
        {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_line(&mut self, item_id: CartItemId) -> Result<bool> {
        let before = self.working.cart_lines.len();
        self.working.cart_lines.retain(|l| l.id != item_id);
        Ok(self.working.cart_lines.len() != before)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64> {
        self.check_fault(FaultPoint::ClearCart)?;
        let before = self.working.cart_lines.len();
        self.working.cart_lines.retain(|l| l.cart_id != cart_id);
        Ok((before - self.working.cart_lines.len()) as u64)
    }

    async fn reserve_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<StockReservation> {
        self.check_fault(FaultPoint::ReserveStock)?;
        let Some(product) = self.working.products.get_mut(&product_id) else {
            tracing::debug!(%product_id, "reservation refused: product missing");
            return Ok(StockReservation::Unavailable);
        };
        if !product.is_active {
            tracing::debug!(%product_id, "reservation refused: product inactive");
            return Ok(StockReservation::Unavailable);
        }
        if product.stock < quantity {
            tracing::debug!(
                %product_id,
                requested = quantity,
                available = product.stock,
                "reservation refused: insufficient stock"
            );
            return Ok(StockReservation::Insufficient {
                available: product.stock,
            });
        }

        product.stock -= quantity;
        tracing::debug!(%product_id, quantity, remaining = product.stock, "stock reserved");
        Ok(StockReservation::Reserved {
            unit_price: product.price,
            product_name: product.name.clone(),
            remaining: product.stock,
        })
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        self.check_fault(FaultPoint::InsertOrder)?;
        if self.working.orders.iter().any(|o| o.id == order.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.working.orders.push(order.clone());
        Ok(())
    }

    async fn count_orders(&mut self, user_id: UserId) -> Result<u64> {
        Ok(self
            .working
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .count() as u64)
    }

    async fn list_orders(
        &mut self,
        user_id: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<OrderRecord>> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(self
            .working
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self
            .working
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned())
    }

    async fn commit(mut self) -> Result<()> {
        self.check_fault(FaultPoint::Commit)?;
        if let Some(delay) = self.take_commit_stall() {
            tokio::time::sleep(delay).await;
        }
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
