//! Single entry point that wires the shop services over one store.

use common::{CartItemId, OrderId, ProductId, UserId};
use shop_store::Store;

use crate::cart::{CartService, CartView};
use crate::catalog::CatalogService;
use crate::checkout::{CheckoutService, CheckoutSettings};
use crate::error::ShopError;
use crate::order::{Order, OrderQuery, PageMeta};

/// The shop backend: carts, checkout and order history over a shared store.
pub struct Shop<S: Store + Clone> {
    carts: CartService<S>,
    checkout: CheckoutService<S>,
    orders: OrderQuery<S>,
    catalog: CatalogService<S>,
}

impl<S: Store + Clone> Shop<S> {
    pub fn new(store: S, settings: CheckoutSettings) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            checkout: CheckoutService::new(store.clone(), settings),
            orders: OrderQuery::new(store.clone()),
            catalog: CatalogService::new(store),
        }
    }

    pub fn catalog(&self) -> &CatalogService<S> {
        &self.catalog
    }

    pub async fn view_cart(&self, user_id: UserId) -> Result<CartView, ShopError> {
        self.carts.view(user_id).await
    }

    pub async fn ensure_cart(&self, user_id: UserId) -> Result<CartView, ShopError> {
        self.carts.ensure_cart(user_id).await
    }

    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, ShopError> {
        self.carts.add_item(user_id, product_id, quantity).await
    }

    pub async fn update_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartView, ShopError> {
        self.carts.update_item(user_id, item_id, quantity).await
    }

    pub async fn remove_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<(), ShopError> {
        self.carts.remove_item(user_id, item_id).await
    }

    pub async fn checkout(&self, user_id: UserId) -> Result<Order, ShopError> {
        self.checkout.checkout(user_id).await
    }

    pub async fn list_orders(
        &self,
        user_id: UserId,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, PageMeta), ShopError> {
        self.orders.list_orders(user_id, page, page_size).await
    }

    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order, ShopError> {
        self.orders.get_order(user_id, order_id).await
    }
}
