//! Cart operations. Carts never hold stock; quantities are checked against
//! live stock on every change and re-checked at checkout.

use common::{CartItemId, ProductId, UserId};
use shop_store::{CartRecord, ProductRecord, Store, StoreTransaction};

use super::CartView;
use crate::error::{Entity, ShopError};
use crate::ownership::assert_owned;

/// Service for managing a user's cart.
pub struct CartService<S: Store> {
    store: S,
}

fn require_positive(quantity: u32) -> Result<(), ShopError> {
    if quantity == 0 {
        return Err(ShopError::InvalidArgument(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Loads an active product or reports it as not found.
async fn active_product<T: StoreTransaction>(
    tx: &mut T,
    product_id: ProductId,
) -> Result<ProductRecord, ShopError> {
    tx.get_product(product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ShopError::not_found(Entity::Product, product_id))
}

fn check_stock(product: &ProductRecord, requested: u32) -> Result<(), ShopError> {
    if requested > product.stock {
        return Err(ShopError::InsufficientStock {
            product_id: product.id,
            requested,
            available: product.stock,
        });
    }
    Ok(())
}

async fn load_view<T: StoreTransaction>(
    tx: &mut T,
    cart: &CartRecord,
) -> Result<CartView, ShopError> {
    let contents = tx.cart_contents(cart.id).await?;
    CartView::from_contents(cart, contents)
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart with live prices.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> Result<CartView, ShopError> {
        let mut tx = self.store.begin().await?;
        let view = match tx.find_cart(user_id).await? {
            Some(cart) => load_view(&mut tx, &cart).await?,
            None => CartView::empty(user_id),
        };
        tx.commit().await?;
        Ok(view)
    }

    /// Creates the user's cart if it does not exist yet.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_cart(&self, user_id: UserId) -> Result<CartView, ShopError> {
        let mut tx = self.store.begin().await?;
        let cart = tx.get_or_create_cart(user_id).await?;
        let view = load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// The merged quantity must not exceed current stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, ShopError> {
        require_positive(quantity)?;
        metrics::counter!("cart_operations_total", "operation" => "add_item").increment(1);

        let mut tx = self.store.begin().await?;
        let cart = tx.get_or_create_cart(user_id).await?;
        let product = active_product(&mut tx, product_id).await?;

        match tx.find_cart_line_for_product(cart.id, product_id).await? {
            Some(line) => {
                let merged = line.quantity.checked_add(quantity).unwrap_or(u32::MAX);
                check_stock(&product, merged)?;
                tx.set_cart_line_quantity(line.id, merged).await?;
            }
            None => {
                check_stock(&product, quantity)?;
                tx.insert_cart_line(cart.id, product_id, quantity).await?;
            }
        }

        let view = load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Sets the quantity of one of the user's cart lines.
    ///
    /// A line in another user's cart is reported as not found. On failure the
    /// previous quantity is kept.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartView, ShopError> {
        require_positive(quantity)?;
        metrics::counter!("cart_operations_total", "operation" => "update_item").increment(1);

        let mut tx = self.store.begin().await?;
        let cart = tx
            .lock_cart(user_id)
            .await?
            .ok_or_else(|| ShopError::not_found(Entity::CartItem, item_id))?;
        let line = assert_owned(
            tx.find_cart_line(item_id).await?,
            user_id,
            Entity::CartItem,
            item_id,
        )?;

        let product = active_product(&mut tx, line.product_id).await?;
        check_stock(&product, quantity)?;
        tx.set_cart_line_quantity(line.id, quantity).await?;

        let view = load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Deletes one of the user's cart lines.
    ///
    /// Idempotent: removing a missing line, or one in another user's cart, is
    /// a successful no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), ShopError> {
        metrics::counter!("cart_operations_total", "operation" => "remove_item").increment(1);

        let mut tx = self.store.begin().await?;
        if tx.lock_cart(user_id).await?.is_none() {
            return Ok(());
        }
        match assert_owned(
            tx.find_cart_line(item_id).await?,
            user_id,
            Entity::CartItem,
            item_id,
        ) {
            Ok(line) => {
                tx.delete_cart_line(line.id).await?;
            }
            Err(_) => tracing::debug!(%item_id, "nothing to remove"),
        }
        tx.commit().await?;
        Ok(())
    }
}
