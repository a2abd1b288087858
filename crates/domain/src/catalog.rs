//! Minimal catalog surface used to seed products and change their prices.
//!
//! Full catalog management lives elsewhere. Nothing here changes the stock of
//! an existing product; that is reserved to the inventory ledger.

use common::{Money, ProductId};
use shop_store::{ProductRecord, ProductUpdate, Store, StoreError, StoreTransaction};

use crate::error::{Entity, ShopError};

/// A product to add to the catalog.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl NewProduct {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            price,
            stock,
        }
    }
}

pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds an active product with its initial stock.
    #[tracing::instrument(skip(self))]
    pub async fn register_product(&self, product: NewProduct) -> Result<ProductRecord, ShopError> {
        if product.sku.trim().is_empty() || product.name.trim().is_empty() {
            return Err(ShopError::InvalidArgument(
                "sku and name are required".to_string(),
            ));
        }
        if product.price.is_negative() {
            return Err(ShopError::InvalidArgument(
                "price must not be negative".to_string(),
            ));
        }

        let record = ProductRecord {
            id: ProductId::new(),
            sku: product.sku,
            name: product.name,
            price: product.price,
            stock: product.stock,
            is_active: true,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_product(&record).await.map_err(|e| match e {
            StoreError::Conflict(msg) => ShopError::InvalidArgument(msg),
            other => ShopError::from(other),
        })?;
        tx.commit().await?;
        Ok(record)
    }

    /// Changes the current price. Placed orders keep the price they captured.
    #[tracing::instrument(skip(self))]
    pub async fn reprice(&self, product_id: ProductId, price: Money) -> Result<(), ShopError> {
        if price.is_negative() {
            return Err(ShopError::InvalidArgument(
                "price must not be negative".to_string(),
            ));
        }
        self.update(
            product_id,
            ProductUpdate {
                price: Some(price),
                ..Default::default()
            },
        )
        .await
    }

    /// Soft-deletes a product. It stays referenced by carts and orders but can
    /// no longer be added or checked out.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, product_id: ProductId) -> Result<(), ShopError> {
        self.update(
            product_id,
            ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<ProductRecord, ShopError> {
        let mut tx = self.store.begin().await?;
        let product = tx.get_product(product_id).await?;
        tx.commit().await?;
        product.ok_or_else(|| ShopError::not_found(Entity::Product, product_id))
    }

    async fn update(&self, product_id: ProductId, update: ProductUpdate) -> Result<(), ShopError> {
        let mut tx = self.store.begin().await?;
        if !tx.update_product(product_id, &update).await? {
            return Err(ShopError::not_found(Entity::Product, product_id));
        }
        tx.commit().await?;
        Ok(())
    }
}
