//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use common::OrderId;
use domain::Order;
use serde::Deserialize;
use shop_store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{Envelope, Reply};

/// Page size used when the caller sends none.
const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/v1/orders: checks out the caller's cart.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Reply<Order>, ApiError> {
    let order = state.shop.checkout(user_id).await?;
    Ok(Reply::created(Envelope::data("Order created", order)))
}

/// GET /api/v1/orders?page=&limit=
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Reply<Vec<Order>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = params.page.unwrap_or(1);
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);

    let (orders, meta) = state.shop.list_orders(user_id, page, limit).await?;
    Ok(Reply::ok(Envelope::page("Orders retrieved", orders, meta)))
}

/// GET /api/v1/orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Reply<Order>, ApiError> {
    let order_id = OrderId::from_uuid(parse_id(&id, "order id")?);
    let order = state.shop.get_order(user_id, order_id).await?;
    Ok(Reply::ok(Envelope::data("Order retrieved", order)))
}
