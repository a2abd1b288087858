//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p shop-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{Money, OrderId, OrderItemId, ProductId, UserId};
use shop_store::{
    OrderLineRecord, OrderRecord, PostgresStore, ProductRecord, ProductUpdate, StockReservation,
    Store, StoreError, StoreTransaction,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_shop_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, cart_items, carts, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

async fn seed_product(store: &PostgresStore, stock: u32, price_cents: i64) -> ProductRecord {
    let product = ProductRecord {
        id: ProductId::new(),
        sku: format!("SKU-{}", uuid::Uuid::new_v4()),
        name: "Widget".to_string(),
        price: Money::from_cents(price_cents),
        stock,
        is_active: true,
    };
    let mut tx = store.begin().await.unwrap();
    tx.insert_product(&product).await.unwrap();
    tx.commit().await.unwrap();
    product
}

async fn committed_stock(store: &PostgresStore, product_id: ProductId) -> u32 {
    let mut tx = store.begin().await.unwrap();
    tx.get_product(product_id).await.unwrap().unwrap().stock
}

#[tokio::test]
async fn reserve_stock_decrements_and_returns_locked_price() {
    let store = get_test_store().await;
    let product = seed_product(&store, 5, 1000).await;

    let mut tx = store.begin().await.unwrap();
    let outcome = tx.reserve_stock(product.id, 3).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        outcome,
        StockReservation::Reserved {
            unit_price: Money::from_cents(1000),
            product_name: "Widget".to_string(),
            remaining: 2,
        }
    );
    assert_eq!(committed_stock(&store, product.id).await, 2);
}

#[tokio::test]
async fn reserve_stock_reports_insufficient_without_writing() {
    let store = get_test_store().await;
    let product = seed_product(&store, 2, 1000).await;

    let mut tx = store.begin().await.unwrap();
    let outcome = tx.reserve_stock(product.id, 4).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(outcome, StockReservation::Insufficient { available: 2 });
    assert_eq!(committed_stock(&store, product.id).await, 2);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let product = seed_product(&store, 5, 1000).await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.reserve_stock(product.id, 5).await.unwrap();
    }

    assert_eq!(committed_stock(&store, product.id).await, 5);
}

#[tokio::test]
async fn concurrent_reservations_never_oversell() {
    let store = get_test_store().await;
    let product = seed_product(&store, 3, 1000).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let outcome = tx.reserve_stock(product.id, 1).await.unwrap();
                tx.commit().await.unwrap();
                outcome
            })
        })
        .collect();

    let outcomes = futures_util::future::join_all(tasks).await;
    let reserved = outcomes
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|o| matches!(o, StockReservation::Reserved { .. }))
        .count();

    assert_eq!(reserved, 3);
    assert_eq!(committed_stock(&store, product.id).await, 0);
}

#[tokio::test]
async fn one_cart_per_user() {
    let store = get_test_store().await;
    let user_id = UserId::new();

    let mut tx = store.begin().await.unwrap();
    let first = tx.get_or_create_cart(user_id).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let second = tx.get_or_create_cart(user_id).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn cart_lines_are_ordered_and_unique_per_product() {
    let store = get_test_store().await;
    let first = seed_product(&store, 5, 1000).await;
    let second = seed_product(&store, 5, 500).await;
    let user_id = UserId::new();

    let mut tx = store.begin().await.unwrap();
    let cart = tx.get_or_create_cart(user_id).await.unwrap();
    tx.insert_cart_line(cart.id, second.id, 1).await.unwrap();
    tx.insert_cart_line(cart.id, first.id, 2).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let contents = tx.cart_contents(cart.id).await.unwrap();
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[0].product.id, second.id);
    assert_eq!(contents[1].line.quantity, 2);
    assert_eq!(contents[1].line.user_id, user_id);

    let duplicate = tx.insert_cart_line(cart.id, first.id, 1).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn order_lines_keep_captured_price_after_reprice() {
    let store = get_test_store().await;
    let product = seed_product(&store, 5, 1000).await;
    let user_id = UserId::new();

    let order = OrderRecord {
        id: OrderId::new(),
        user_id,
        status: "placed".to_string(),
        total: Money::from_cents(2000),
        created_at: Utc::now(),
        items: vec![OrderLineRecord {
            id: OrderItemId::new(),
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: 2,
            unit_price: Money::from_cents(1000),
        }],
    };

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.update_product(
        product.id,
        &ProductUpdate {
            price: Some(Money::from_cents(9999)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let loaded = tx.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.items[0].unit_price, Money::from_cents(1000));
    assert_eq!(loaded.total, Money::from_cents(2000));

    assert_eq!(tx.count_orders(user_id).await.unwrap(), 1);
    let page = tx.list_orders(user_id, 10, 0).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].items.len(), 1);
}
