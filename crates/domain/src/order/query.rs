//! Read path for a user's orders.

use common::{OrderId, UserId};
use serde::Serialize;
use shop_store::{Store, StoreTransaction};

use super::Order;
use crate::error::{Entity, ShopError};
use crate::ownership::assert_owned;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A clamped page request: `page >= 1`, `1 <= page_size <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Clamps raw caller input into range.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.clamp(1, i64::from(u32::MAX)) as u32,
            page_size: page_size.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Pagination metadata for a listed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page(),
            page_size: request.page_size(),
            total,
            total_pages: total.div_ceil(u64::from(request.page_size())),
        }
    }
}

/// Order lookups scoped to the requesting user.
pub struct OrderQuery<S: Store> {
    store: S,
}

impl<S: Store> OrderQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists the user's orders, newest first.
    ///
    /// Count and page are read in the same transaction so `total` matches the
    /// filtered set the page was cut from.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: UserId,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Order>, PageMeta), ShopError> {
        let request = PageRequest::new(page, page_size);

        let mut tx = self.store.begin().await?;
        let total = tx.count_orders(user_id).await?;
        let records = tx
            .list_orders(user_id, request.page_size(), request.offset())
            .await?;
        tx.commit().await?;

        let orders = records
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, PageMeta::new(request, total)))
    }

    /// Loads one order. Someone else's order is reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order, ShopError> {
        let mut tx = self.store.begin().await?;
        let record = tx.find_order(order_id).await?;
        tx.commit().await?;

        let record = assert_owned(record, user_id, Entity::Order, order_id)?;
        Ok(Order::try_from(record)?)
    }
}
