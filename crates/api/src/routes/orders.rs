//! Order endpoints: checkout, history, cancellation and admin status changes.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{Order, OrderDetail, OrderStatus};
use fulfillment::ShopError;
use serde::Deserialize;
use store::Storage;

use crate::AppState;
use crate::error::ApiError;
use crate::principal::Caller;

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /orders: check out the caller's cart.
#[tracing::instrument(skip(state, caller))]
pub async fn create<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.engine.create_order(&caller).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state, caller))]
pub async fn list<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.engine.list_my_orders(&caller).await?))
}

/// GET /orders/{id}: the order with its lines.
#[tracing::instrument(skip(state, caller))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = state
        .engine
        .get_order_detail(&caller, OrderId::new(id))
        .await?;
    Ok(Json(detail))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state, caller))]
pub async fn cancel<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
) -> Result<Json<Order>, ApiError> {
    let order = state.engine.cancel_order(&caller, OrderId::new(id)).await?;
    Ok(Json(order))
}

/// PATCH /orders/{id}/status: admin only.
#[tracing::instrument(skip(state, caller))]
pub async fn update_status<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let status: OrderStatus = req.status.parse().map_err(ShopError::from)?;
    let order = state
        .engine
        .update_order_status(&caller, OrderId::new(id), status)
        .await?;
    Ok(Json(order))
}
