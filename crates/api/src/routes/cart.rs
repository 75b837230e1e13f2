//! Cart endpoints. Guests are served by `x-session-id`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{CartItemId, ProductId};
use domain::CartView;
use serde::Deserialize;
use store::Storage;

use crate::AppState;
use crate::error::ApiError;
use crate::principal::Caller;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// GET /cart: the caller's cart with price and stock drift flags.
#[tracing::instrument(skip(state, caller))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.get_cart(&caller).await?))
}

/// DELETE /cart
#[tracing::instrument(skip(state, caller))]
pub async fn clear<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.clear_cart(&caller).await?))
}

/// POST /cart/items
#[tracing::instrument(skip(state, caller))]
pub async fn add_item<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .add_item(&caller, ProductId::new(req.product_id), req.quantity)
        .await?;
    Ok(Json(view))
}

/// PATCH /cart/items/{item_id}
#[tracing::instrument(skip(state, caller))]
pub async fn update_item<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(item_id): Path<i64>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .update_item_quantity(&caller, CartItemId::new(item_id), req.quantity)
        .await?;
    Ok(Json(view))
}

/// DELETE /cart/items/{item_id}
#[tracing::instrument(skip(state, caller))]
pub async fn remove_item<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(item_id): Path<i64>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .remove_item(&caller, CartItemId::new(item_id))
        .await?;
    Ok(Json(view))
}
