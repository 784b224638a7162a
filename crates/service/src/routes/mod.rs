//! HTTP route handlers for the shopcart service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                                - Service index
//! GET    /health                          - Health check
//!
//! # Shopcarts
//! GET    /shopcarts[?customer_id=N]       - List shopcarts
//! POST   /shopcarts                       - Create a shopcart (201 + Location)
//! GET    /shopcarts/{id}                  - Read a shopcart
//! PUT    /shopcarts/{id}                  - Update a shopcart (full payload)
//! DELETE /shopcarts/{id}                  - Delete a shopcart (cascade, 204)
//!
//! # Items
//! GET    /shopcarts/{id}/items            - List a cart's items
//! POST   /shopcarts/{id}/items            - Add an item (merge-or-create, 201 + Location)
//! GET    /shopcarts/{id}/items/{item_id}  - Read an item
//! PUT    /shopcarts/{id}/items/{item_id}  - Update an item (full payload)
//! DELETE /shopcarts/{id}/items/{item_id}  - Delete an item (204)
//! ```

pub mod items;
pub mod shopcarts;

use axum::{
    Router,
    routing::get,
};

use crate::state::AppState;

/// Create the shopcart routes router.
pub fn shopcart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shopcarts::list).post(shopcarts::create))
        .route(
            "/{id}",
            get(shopcarts::show)
                .put(shopcarts::update)
                .delete(shopcarts::destroy),
        )
        .route("/{id}/items", get(items::list).post(items::create))
        .route(
            "/{id}/items/{item_id}",
            get(items::show).put(items::update).delete(items::destroy),
        )
}

/// Create all routes for the service.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(shopcarts::index))
        .route("/health", get(health))
        .nest("/shopcarts", shopcart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
