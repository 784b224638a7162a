//! Shopcart route handlers.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use shopcart_core::{CustomerId, ShopcartId};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::models::Record;
use crate::services;
use crate::state::AppState;

/// Query parameters for the list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub customer_id: Option<i32>,
}

/// Service index.
///
/// GET /
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": "shopcart-service",
        "version": env!("CARGO_PKG_VERSION"),
        "resources": { "shopcarts": "/shopcarts" },
    }))
}

/// List all shopcarts, optionally filtered by customer.
///
/// GET /shopcarts
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    let carts =
        services::list_shopcarts(state.pool(), params.customer_id.map(CustomerId::new)).await?;
    tracing::info!(count = carts.len(), "returning shopcarts");
    Ok(Json(Value::Array(
        carts.iter().map(Record::serialize).collect(),
    )))
}

/// Create a shopcart.
///
/// POST /shopcarts
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse> {
    let cart = services::create_shopcart(state.pool(), &body).await?;
    let id = cart.id.ok_or(AppError::Database(RepositoryError::NotFound))?;
    let location = format!("/shopcarts/{id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(cart.serialize()),
    ))
}

/// Read a shopcart.
///
/// GET /shopcarts/{id}
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Value>> {
    let cart = services::get_shopcart(state.pool(), ShopcartId::new(id)).await?;
    Ok(Json(cart.serialize()))
}

/// Update a shopcart from a full payload.
///
/// PUT /shopcarts/{id}
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let cart = services::update_shopcart(state.pool(), ShopcartId::new(id), &body).await?;
    Ok(Json(cart.serialize()))
}

/// Delete a shopcart and its items.
///
/// DELETE /shopcarts/{id}
#[instrument(skip(state))]
pub async fn destroy(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    services::delete_shopcart(state.pool(), ShopcartId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
