//! The record contract shared by every aggregate member.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::db::RepositoryError;

use super::ValidationError;

/// Capability set implemented by both `Shopcart` and `Item`.
///
/// The persistence context (the pool) is passed explicitly into every
/// operation rather than held as ambient state, so the entities stay
/// testable against any database handle.
#[allow(async_fn_in_trait)]
pub trait Record: Sized {
    /// Store-assigned identifier type.
    type Id: Copy + core::fmt::Display;

    /// Convert the entity into a JSON value.
    fn serialize(&self) -> Value;

    /// Build an entity from a JSON value, validating required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first missing or invalid field,
    /// or a type-mismatch error when the input is not an object.
    fn deserialize(data: &Value) -> Result<Self, ValidationError>;

    /// Persist a new row. Any caller-supplied id is cleared and replaced by
    /// the store-assigned one.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the insert fails.
    async fn create(&mut self, pool: &SqlitePool) -> Result<(), RepositoryError>;

    /// Persist the entity in place, keyed by its current id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the entity has no id or no
    /// matching row exists.
    async fn update(&self, pool: &SqlitePool) -> Result<(), RepositoryError>;

    /// Remove the entity from the store. Deleting an entity that is absent
    /// from the store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the delete statement fails.
    async fn delete(&self, pool: &SqlitePool) -> Result<(), RepositoryError>;

    /// Find a record by its id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the query fails.
    async fn find(pool: &SqlitePool, id: Self::Id) -> Result<Option<Self>, RepositoryError>;

    /// Return all records.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the query fails.
    async fn all(pool: &SqlitePool) -> Result<Vec<Self>, RepositoryError>;
}
