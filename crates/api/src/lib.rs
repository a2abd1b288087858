//! HTTP API server with observability for the shop backend.
//!
//! Provides REST endpoints for carts, checkout and order history, with
//! structured logging (tracing) and Prometheus metrics. Caller identity comes
//! from the `X-User-Id` header set by the upstream auth layer.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{CheckoutSettings, Shop};
use metrics_exporter_prometheus::PrometheusHandle;
use shop_store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store + Clone> {
    pub shop: Shop<S>,
    pub store: S,
    /// Store backend name reported by the health check.
    pub backend: &'static str,
}

/// Builds the application state over a store.
pub fn create_state<S: Store + Clone + 'static>(
    store: S,
    backend: &'static str,
    settings: CheckoutSettings,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        shop: Shop::new(store.clone(), settings),
        store,
        backend,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{id}",
            put(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::checkout::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>));

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
