use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, ProductId, UserId};

use crate::Result;
use crate::records::{
    CartContentRecord, CartLineRecord, CartRecord, OrderRecord, ProductRecord, ProductUpdate,
    StockReservation,
};

/// Core trait for shop store implementations.
///
/// All reads and writes happen inside a [`StoreTransaction`]. Implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: StoreTransaction;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// A unit of work against the store.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it
/// back. No effect of an uncommitted transaction is observable by others.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Loads a product by ID regardless of its active flag.
    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<ProductRecord>>;

    /// Inserts a new catalog product, including its initial stock.
    async fn insert_product(&mut self, product: &ProductRecord) -> Result<()>;

    /// Applies catalog-owned changes. Returns false if the product is unknown.
    async fn update_product(&mut self, product_id: ProductId, update: &ProductUpdate)
    -> Result<bool>;

    /// Finds the user's cart without locking it.
    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Finds the user's cart and holds a write lock on it until the
    /// transaction ends.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Returns the user's cart, creating it first if absent. The cart is
    /// locked as with [`lock_cart`](Self::lock_cart).
    async fn get_or_create_cart(&mut self, user_id: UserId) -> Result<CartRecord>;

    /// Lines of a cart in insertion order.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLineRecord>>;

    /// Lines of a cart in insertion order, each with its current product.
    async fn cart_contents(&mut self, cart_id: CartId) -> Result<Vec<CartContentRecord>>;

    /// Loads a cart line by ID, whoever owns it.
    async fn find_cart_line(&mut self, item_id: CartItemId) -> Result<Option<CartLineRecord>>;

    /// Loads the line for a product in a given cart.
    async fn find_cart_line_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLineRecord>>;

    async fn insert_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineRecord>;

    async fn set_cart_line_quantity(&mut self, item_id: CartItemId, quantity: u32) -> Result<()>;

    /// Hard-deletes one cart line. Returns false if it did not exist.
    async fn delete_cart_line(&mut self, item_id: CartItemId) -> Result<bool>;

    /// Hard-deletes every line of a cart. Returns the number removed.
    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64>;

    /// Locks the product row, checks stock and decrements it by `quantity`.
    ///
    /// This is the only operation that lowers stock. No concurrent
    /// transaction can observe the pre-decrement value and decrement too.
    async fn reserve_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<StockReservation>;

    /// Persists an order and all of its lines.
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()>;

    async fn count_orders(&mut self, user_id: UserId) -> Result<u64>;

    /// A page of the user's orders, newest first.
    async fn list_orders(
        &mut self,
        user_id: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<OrderRecord>>;

    /// Loads an order by ID, whoever owns it.
    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Makes every effect of this transaction durable and visible.
    async fn commit(self) -> Result<()>;

    /// Discards every effect of this transaction.
    async fn rollback(self) -> Result<()>;
}
