//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, ProductId, UserId};
use domain::{CheckoutSettings, NewProduct};
use metrics_exporter_prometheus::PrometheusHandle;
use shop_store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, Arc<api::AppState<InMemoryStore>>) {
    let state = api::create_state(
        InMemoryStore::new(),
        "memory",
        CheckoutSettings::default(),
    );
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn seed_product(state: &api::AppState<InMemoryStore>, stock: u32) -> ProductId {
    state
        .shop
        .catalog()
        .register_product(NewProduct::new(
            format!("SKU-{}", ProductId::new()),
            "Widget",
            Money::from_cents(1000),
            stock,
        ))
        .await
        .unwrap()
        .id
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<UserId>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user.to_string());
    }
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn add_to_cart(
    app: &axum::Router,
    user: UserId,
    product_id: ProductId,
    quantity: i64,
) -> (StatusCode, serde_json::Value) {
    send(
        app,
        "POST",
        "/api/v1/cart/items",
        Some(user),
        Some(serde_json::json!({
            "product_id": product_id.to_string(),
            "quantity": quantity,
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn test_missing_or_invalid_user_is_unauthorized() {
    let (app, _) = setup();

    let (status, json) = send(&app, "GET", "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "unauthorized");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/orders")
                .header("x-user-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_cart_view() {
    let (app, _) = setup();

    let (status, json) = send(&app, "GET", "/api/v1/cart", Some(UserId::new()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["data"]["cart_id"].is_null());
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 0);
    assert_eq!(json["data"]["total_cents"], 0);
}

#[tokio::test]
async fn test_cart_lifecycle() {
    let (app, state) = setup();
    let product_id = seed_product(&state, 5).await;
    let user = UserId::new();

    let (status, json) = add_to_cart(&app, user, product_id, 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total_cents"], 2000);
    let item_id = json["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/cart/items/{item_id}"),
        Some(user),
        Some(serde_json::json!({ "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["items"][0]["quantity"], 4);
    assert_eq!(json["data"]["items"][0]["subtotal_cents"], 4000);

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/cart/items/{item_id}"),
        Some(user),
        Some(serde_json::json!({ "quantity": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "insufficient_stock");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/v1/cart/items/{item_id}"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, "GET", "/api/v1/cart", Some(user), None).await;
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_add_item_validation() {
    let (app, state) = setup();
    let product_id = seed_product(&state, 5).await;
    let user = UserId::new();

    let (status, json) = add_to_cart(&app, user, product_id, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_argument");

    let (status, json) = add_to_cart(&app, user, ProductId::new(), 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/cart/items",
        Some(user),
        Some(serde_json::json!({ "product_id": "nope", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_and_order_history() {
    let (app, state) = setup();
    let product_id = seed_product(&state, 5).await;
    let user = UserId::new();

    add_to_cart(&app, user, product_id, 3).await;

    let (status, json) = send(&app, "POST", "/api/v1/orders", Some(user), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "placed");
    assert_eq!(json["data"]["total_cents"], 3000);
    assert_eq!(json["data"]["items"][0]["unit_price_cents"], 1000);
    let order_id = json["data"]["id"].as_str().unwrap().to_string();

    let (status, json) = send(&app, "GET", "/api/v1/orders", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["meta"]["page"], 1);
    assert_eq!(json["meta"]["limit"], 10);
    assert_eq!(json["meta"]["total"], 1);
    assert_eq!(json["meta"]["total_pages"], 1);

    let (status, json) = send(
        &app,
        "GET",
        &format!("/api/v1/orders/{order_id}"),
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], order_id.as_str());

    // Another user cannot see it.
    let (status, json) = send(
        &app,
        "GET",
        &format!("/api/v1/orders/{order_id}"),
        Some(UserId::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_checkout_failures() {
    let (app, state) = setup();
    let product_id = seed_product(&state, 5).await;
    let first = UserId::new();
    let second = UserId::new();

    let (status, json) = send(&app, "POST", "/api/v1/orders", Some(first), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "empty_cart");

    add_to_cart(&app, first, product_id, 3).await;
    add_to_cart(&app, second, product_id, 4).await;

    let (status, _) = send(&app, "POST", "/api/v1/orders", Some(first), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(&app, "POST", "/api/v1/orders", Some(second), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "insufficient_stock");

    let (_, json) = send(&app, "GET", "/api/v1/cart", Some(second), None).await;
    assert_eq!(json["data"]["items"][0]["quantity"], 4);
    assert_eq!(json["data"]["items"][0]["available_stock"], 2);
}

#[tokio::test]
async fn test_orders_pagination_clamps_limit() {
    let (app, state) = setup();
    let product_id = seed_product(&state, 50).await;
    let user = UserId::new();

    for _ in 0..3 {
        add_to_cart(&app, user, product_id, 1).await;
        send(&app, "POST", "/api/v1/orders", Some(user), None).await;
    }

    let (status, json) = send(
        &app,
        "GET",
        "/api/v1/orders?page=2&limit=2",
        Some(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["meta"]["total_pages"], 2);

    let (_, json) = send(
        &app,
        "GET",
        "/api/v1/orders?page=1&limit=500",
        Some(user),
        None,
    )
    .await;
    assert_eq!(json["meta"]["limit"], 100);
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, state) = setup();
    let product_id = seed_product(&state, 5).await;
    let user = UserId::new();
    add_to_cart(&app, user, product_id, 1).await;
    send(&app, "POST", "/api/v1/orders", Some(user), None).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_total"));
}
