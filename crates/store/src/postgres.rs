use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, Money, OrderId, OrderItemId, ProductId, UserId};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::records::{
    CartContentRecord, CartLineRecord, CartRecord, OrderLineRecord, OrderRecord, ProductRecord,
    ProductUpdate, StockReservation,
};
use crate::store::{Store, StoreTransaction};
use crate::{Result, StoreError};

/// PostgreSQL-backed shop store implementation.
///
/// Runs at READ COMMITTED and serializes contended rows with
/// `SELECT ... FOR UPDATE`: the cart row during cart edits and checkout, the
/// product row during stock reservation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL shop store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }


    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back by sqlx when dropped
/// uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::CorruptRecord(format!("{column} out of range: {value}")))
}

fn row_to_product(row: &PgRow) -> Result<ProductRecord> {
    Ok(ProductRecord {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_cart(row: &PgRow) -> Result<CartRecord> {
    Ok(CartRecord {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_cart_line(row: &PgRow) -> Result<CartLineRecord> {
    Ok(CartLineRecord {
        id: CartItemId::from_uuid(row.try_get::<Uuid, _>("line_id")?),
        cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        status: row.try_get("status")?,
        total: Money::from_cents(row.try_get("total_cents")?),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        items: Vec::new(),
    })
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLineRecord> {
    Ok(OrderLineRecord {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

const CART_LINE_COLUMNS: &str = r#"
    ci.id AS line_id, ci.cart_id, c.user_id, ci.product_id, ci.quantity
"#;

impl PostgresTransaction {
    /// Attaches lines to already-loaded orders.
    async fn load_order_lines(&mut self, orders: &mut [OrderRecord]) -> Result<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderLineRecord>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id")?;
            by_order
                .entry(order_id)
                .or_default()
                .push(row_to_order_line(row)?);
        }
        for order in orders.iter_mut() {
            order.items = by_order.remove(&order.id.as_uuid()).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id AS product_id, sku, name, price_cents, stock, is_active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn insert_product(&mut self, product: &ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, price_cents, stock, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(product.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(format!(
                    "product {} or sku {} already exists",
                    product.id, product.sku
                ));
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn update_product(
        &mut self,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                price_cents = COALESCE($3, price_cents),
                is_active = COALESCE($4, is_active),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(update.name.as_deref())
        .bind(update.price.map(|p| p.cents()))
        .bind(update.is_active)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at FROM carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn get_or_create_cart(&mut self, user_id: UserId) -> Result<CartRecord> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        self.lock_cart(user_id).await?.ok_or_else(|| {
            StoreError::CorruptRecord(format!("cart for user {user_id} vanished after upsert"))
        })
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLineRecord>> {
        let sql = format!(
            r#"
            SELECT {CART_LINE_COLUMNS}
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            WHERE ci.cart_id = $1
            ORDER BY ci.seq ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(cart_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(row_to_cart_line).collect()
    }

    async fn cart_contents(&mut self, cart_id: CartId) -> Result<Vec<CartContentRecord>> {
        let sql = format!(
            r#"
            SELECT {CART_LINE_COLUMNS}, p.sku, p.name, p.price_cents, p.stock, p.is_active
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.seq ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(cart_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(CartContentRecord {
                    line: row_to_cart_line(row)?,
                    product: row_to_product(row)?,
                })
            })
            .collect()
    }

    async fn find_cart_line(&mut self, item_id: CartItemId) -> Result<Option<CartLineRecord>> {
        let sql = format!(
            r#"
            SELECT {CART_LINE_COLUMNS}
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            WHERE ci.id = $1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(item_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_cart_line).transpose()
    }

    async fn find_cart_line_for_product(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartLineRecord>> {
        let sql = format!(
            r#"
            SELECT {CART_LINE_COLUMNS}
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            WHERE ci.cart_id = $1 AND ci.product_id = $2
            "#
        );
        let row = sqlx::query(&sql)
            .bind(cart_id.as_uuid())
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_cart_line).transpose()
    }

    async fn insert_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLineRecord> {
        let item_id = CartItemId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING (SELECT user_id FROM carts WHERE id = $2) AS user_id
            "#,
        )
        .bind(item_id.as_uuid())
        .bind(cart_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict(format!(
                    "cart {cart_id} already holds product {product_id}"
                ));
            }
            StoreError::Database(e)
        })?;

        Ok(CartLineRecord {
            id: item_id,
            cart_id,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            product_id,
            quantity,
        })
    }

    async fn set_cart_line_quantity(&mut self, item_id: CartItemId, quantity: u32) -> Result<()> {
        sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = now() WHERE id = $1")
            .bind(item_id.as_uuid())
            .bind(i64::from(quantity))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_cart_line(&mut self, item_id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn reserve_stock(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<StockReservation> {
        let row = sqlx::query(
            r#"
            SELECT name, price_cents, stock, is_active
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            tracing::debug!(%product_id, "reservation refused: product missing");
            return Ok(StockReservation::Unavailable);
        };
        if !row.try_get::<bool, _>("is_active")? {
            tracing::debug!(%product_id, "reservation refused: product inactive");
            return Ok(StockReservation::Unavailable);
        }
        let stock = to_u32(row.try_get("stock")?, "stock")?;
        if stock < quantity {
            tracing::debug!(
                %product_id,
                requested = quantity,
                available = stock,
                "reservation refused: insufficient stock"
            );
            return Ok(StockReservation::Insufficient { available: stock });
        }

        let remaining: i64 = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1
            RETURNING stock
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_one(&mut *self.tx)
        .await?;

        tracing::debug!(%product_id, quantity, remaining, "stock reserved");
        Ok(StockReservation::Reserved {
            unit_price: Money::from_cents(row.try_get("price_cents")?),
            product_name: row.try_get("name")?,
            remaining: to_u32(remaining, "stock")?,
        })
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(&order.status)
        .bind(order.total.cents())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn count_orders(&mut self, user_id: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn list_orders(
        &mut self,
        user_id: UserId,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(i64::from(limit))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&mut *self.tx)
        .await?;

        let mut orders = rows
            .iter()
            .map(row_to_order)
            .collect::<Result<Vec<_>>>()?;
        self.load_order_lines(&mut orders).await?;
        Ok(orders)
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, total_cents, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut orders = vec![row_to_order(&row)?];
        self.load_order_lines(&mut orders).await?;
        Ok(orders.pop())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
