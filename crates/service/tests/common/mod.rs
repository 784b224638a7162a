//! Shared helpers for the service integration tests.
//!
//! Every test gets its own in-memory `SQLite` database with the schema
//! applied, so tests are hermetic and need no external services.

use std::str::FromStr;

use axum::Router;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use shopcart_service::config::ServiceConfig;
use shopcart_service::state::AppState;
use shopcart_service::{db, routes};

/// A fresh in-memory database with migrations applied.
///
/// Capped at one connection: each pooled connection to `sqlite::memory:`
/// would otherwise open its own private database.
#[allow(dead_code)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid connection string")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// The full service router wired to a fresh in-memory database.
#[allow(dead_code)]
pub async fn test_app() -> Router {
    let config = ServiceConfig {
        database_url: "sqlite::memory:".to_owned(),
        host: [127, 0, 0, 1].into(),
        port: 0,
    };
    let pool = test_pool().await;
    routes::router().with_state(AppState::new(config, pool))
}
