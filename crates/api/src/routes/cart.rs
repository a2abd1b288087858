//! Cart endpoints for the authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::{CartItemId, ProductId};
use domain::CartView;
use serde::Deserialize;
use shop_store::Store;

use super::parse_id;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::response::{Envelope, Reply};

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

fn quantity(raw: i64) -> Result<u32, ApiError> {
    u32::try_from(raw)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| ApiError::BadRequest("quantity must be a positive integer".to_string()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(req)| req)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// -- Handlers --

/// GET /api/v1/cart
#[tracing::instrument(skip(state))]
pub async fn view<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Reply<CartView>, ApiError> {
    let cart = state.shop.view_cart(user_id).await?;
    Ok(Reply::ok(Envelope::data("Cart retrieved", cart)))
}

/// POST /api/v1/cart/items
#[tracing::instrument(skip(state, payload))]
pub async fn add_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Reply<CartView>, ApiError> {
    let req = body(payload)?;
    let product_id = ProductId::from_uuid(parse_id(&req.product_id, "product_id")?);
    let quantity = quantity(req.quantity)?;

    let cart = state.shop.add_to_cart(user_id, product_id, quantity).await?;
    Ok(Reply::ok(Envelope::data("Item added to cart", cart)))
}

/// PUT /api/v1/cart/items/{id}
#[tracing::instrument(skip(state, payload))]
pub async fn update_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Reply<CartView>, ApiError> {
    let item_id = CartItemId::from_uuid(parse_id(&id, "cart item id")?);
    let quantity = quantity(body(payload)?.quantity)?;

    let cart = state
        .shop
        .update_cart_item(user_id, item_id, quantity)
        .await?;
    Ok(Reply::ok(Envelope::data("Cart item updated", cart)))
}

/// DELETE /api/v1/cart/items/{id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Reply<()>, ApiError> {
    let item_id = CartItemId::from_uuid(parse_id(&id, "cart item id")?);
    state.shop.remove_cart_item(user_id, item_id).await?;
    Ok(Reply::ok(Envelope::message("Cart item removed")))
}
