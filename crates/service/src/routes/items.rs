//! Item route handlers.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use shopcart_core::{ItemId, ShopcartId};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::models::Record;
use crate::services;
use crate::state::AppState;

/// List a shopcart's items.
///
/// GET /shopcarts/{id}/items
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Value>> {
    let items = services::list_items(state.pool(), ShopcartId::new(id)).await?;
    tracing::info!(count = items.len(), "returning items");
    Ok(Json(Value::Array(
        items.iter().map(Record::serialize).collect(),
    )))
}

/// Add an item to a shopcart, merging with an existing row for the same
/// product.
///
/// POST /shopcarts/{id}/items
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let shopcart_id = ShopcartId::new(id);
    let item = services::add_item(state.pool(), shopcart_id, &body).await?;
    let item_id = item.id.ok_or(AppError::Database(RepositoryError::NotFound))?;
    let location = format!("/shopcarts/{shopcart_id}/items/{item_id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(item.serialize()),
    ))
}

/// Read an item.
///
/// GET /shopcarts/{id}/items/{item_id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
) -> Result<Json<Value>> {
    let item = services::get_item(state.pool(), ShopcartId::new(id), ItemId::new(item_id)).await?;
    Ok(Json(item.serialize()))
}

/// Replace an item's fields from a full payload.
///
/// PUT /shopcarts/{id}/items/{item_id}
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let item = services::update_item(
        state.pool(),
        ShopcartId::new(id),
        ItemId::new(item_id),
        &body,
    )
    .await?;
    Ok(Json(item.serialize()))
}

/// Delete an item. Missing or mis-owned items are a silent no-op.
///
/// DELETE /shopcarts/{id}/items/{item_id}
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
) -> Result<StatusCode> {
    services::delete_item(state.pool(), ShopcartId::new(id), ItemId::new(item_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
