//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::Product;
use fulfillment::{ProductInput, ProductPatch};
use store::Storage;

use crate::AppState;
use crate::error::ApiError;
use crate::principal::Caller;

/// POST /products: list a product owned by the caller.
#[tracing::instrument(skip(state, caller, input))]
pub async fn create<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(&caller, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    let product = state.catalog.get_product(ProductId::new(id)).await?;
    Ok(Json(product))
}

/// PATCH /products/{id}: change any subset of name, price, stock and SKU.
#[tracing::instrument(skip(state, caller, patch))]
pub async fn update<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .catalog
        .update_product(&caller, ProductId::new(id), patch)
        .await?;
    Ok(Json(product))
}

/// DELETE /products/{id}: remove a product no cart or order refers to.
#[tracing::instrument(skip(state, caller))]
pub async fn delete<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .delete_product(&caller, ProductId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
