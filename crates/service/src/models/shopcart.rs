//! The shopcart aggregate root.

use serde_json::{Value, json};
use sqlx::SqlitePool;

use shopcart_core::{CustomerId, ShopcartId};

use crate::db::RepositoryError;

use super::item::Item;
use super::record::Record;
use super::{ValidationError, as_object, optional_i32, require_i32};

/// A customer's cart together with the items it owns.
///
/// The cart and its items form one consistency boundary: creating a cart
/// persists its items in the same transaction, and deleting it cascades to
/// every item at the store level.
#[derive(Debug, Clone, PartialEq)]
pub struct Shopcart {
    pub id: Option<ShopcartId>,
    pub customer_id: CustomerId,
    pub items: Vec<Item>,
}

/// Internal row type for shopcart queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopcartRow {
    id: i32,
    customer_id: i32,
}

impl Shopcart {
    async fn from_row(pool: &SqlitePool, row: ShopcartRow) -> Result<Self, RepositoryError> {
        let id = ShopcartId::new(row.id);
        let items = Item::find_by_shopcart(pool, id).await?;
        Ok(Self {
            id: Some(id),
            customer_id: CustomerId::new(row.customer_id),
            items,
        })
    }

    /// Return every shopcart belonging to one customer, items included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn find_by_customer_id(
        pool: &SqlitePool,
        customer_id: CustomerId,
    ) -> Result<Vec<Self>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopcartRow>(
            "SELECT id, customer_id FROM shopcarts WHERE customer_id = ?1 ORDER BY id",
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;

        let mut carts = Vec::with_capacity(rows.len());
        for row in rows {
            carts.push(Self::from_row(pool, row).await?);
        }
        Ok(carts)
    }

    /// Overwrite `customer_id` and replace the item set wholesale, in one
    /// transaction. Used when an update payload supplied an `items` list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart row is gone,
    /// `RepositoryError::Conflict` if the new items collide on a product.
    pub(crate) async fn save_with_items(&mut self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        let id = self.id.ok_or(RepositoryError::NotFound)?;

        tracing::debug!(shopcart_id = %id, "replacing shopcart items");

        let mut tx = pool.begin().await?;

        let result = sqlx::query("UPDATE shopcarts SET customer_id = ?1 WHERE id = ?2")
            .bind(self.customer_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM items WHERE shopcart_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for item in &mut self.items {
            item.id = None;
            item.shopcart_id = Some(id);
            item.insert(&mut tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

impl Record for Shopcart {
    type Id = ShopcartId;

    /// Emits `{id, customer_id, items: [...]}`. Item order is whatever the
    /// store returns and carries no meaning.
    fn serialize(&self) -> Value {
        json!({
            "id": self.id,
            "customer_id": self.customer_id,
            "items": self.items.iter().map(Record::serialize).collect::<Vec<_>>(),
        })
    }

    /// Requires `customer_id`; `id` and `items` are optional. A nested item
    /// that fails validation aborts the whole deserialize, leaving nothing
    /// half-populated.
    fn deserialize(data: &Value) -> Result<Self, ValidationError> {
        let obj = as_object(data)?;

        let id = optional_i32(obj, "id")?.map(ShopcartId::new);
        let customer_id = CustomerId::new(require_i32(obj, "customer_id")?);

        let items = match obj.get("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .map(Item::deserialize)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "items",
                    expected: "an array",
                });
            }
        };

        Ok(Self {
            id,
            customer_id,
            items,
        })
    }

    /// Inserts the cart row and every owned item in one transaction.
    async fn create(&mut self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        self.id = None;

        tracing::debug!(customer_id = %self.customer_id, "creating shopcart");

        let mut tx = pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO shopcarts (customer_id) VALUES (?1) RETURNING id",
        )
        .bind(self.customer_id)
        .fetch_one(&mut *tx)
        .await?;
        let cart_id = ShopcartId::new(id);

        for item in &mut self.items {
            item.id = None;
            item.shopcart_id = Some(cart_id);
            item.insert(&mut tx).await?;
        }

        tx.commit().await?;
        self.id = Some(cart_id);
        Ok(())
    }

    /// Overwrites `customer_id` only; the items collection is untouched.
    async fn update(&self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        let id = self.id.ok_or(RepositoryError::NotFound)?;

        tracing::debug!(shopcart_id = %id, "updating shopcart");

        let result = sqlx::query("UPDATE shopcarts SET customer_id = ?1 WHERE id = ?2")
            .bind(self.customer_id)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Removes the cart; its items go with it via the store-level cascade.
    /// Deleting an absent cart is a no-op.
    async fn delete(&self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        let Some(id) = self.id else {
            return Ok(());
        };

        tracing::debug!(shopcart_id = %id, "deleting shopcart");

        sqlx::query("DELETE FROM shopcarts WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn find(pool: &SqlitePool, id: ShopcartId) -> Result<Option<Self>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopcartRow>(
            "SELECT id, customer_id FROM shopcarts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::from_row(pool, row).await?)),
            None => Ok(None),
        }
    }

    async fn all(pool: &SqlitePool) -> Result<Vec<Self>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, ShopcartRow>("SELECT id, customer_id FROM shopcarts ORDER BY id")
                .fetch_all(pool)
                .await?;

        let mut carts = Vec::with_capacity(rows.len());
        for row in rows {
            carts.push(Self::from_row(pool, row).await?);
        }
        Ok(carts)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trip_preserves_fields() {
        let payload = json!({
            "id": 4,
            "customer_id": 42,
            "items": [
                { "name": "mouse", "product_id": 5, "count": 2 },
                { "name": "desk", "product_id": 7, "count": 1 },
            ],
        });
        let cart = Shopcart::deserialize(&payload).expect("valid payload");
        let back = Shopcart::deserialize(&cart.serialize()).expect("round trip");
        assert_eq!(back.id, Some(ShopcartId::new(4)));
        assert_eq!(back.customer_id, CustomerId::new(42));
        assert_eq!(back.items.len(), 2);
    }

    #[test]
    fn test_deserialize_without_items_is_empty() {
        let cart = Shopcart::deserialize(&json!({ "customer_id": 42 })).expect("valid");
        assert_eq!(cart.id, None);
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_deserialize_requires_customer_id() {
        let err = Shopcart::deserialize(&json!({ "id": 1 })).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("customer_id"));
    }

    #[test]
    fn test_deserialize_rejects_non_array_items() {
        let err = Shopcart::deserialize(&json!({ "customer_id": 1, "items": 3 })).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidField { field: "items", .. }
        ));
    }

    #[test]
    fn test_nested_item_failure_aborts_deserialize() {
        let payload = json!({
            "customer_id": 1,
            "items": [
                { "name": "mouse", "product_id": 5, "count": 2 },
                { "product_id": 7, "count": 1 },
            ],
        });
        let err = Shopcart::deserialize(&payload).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("name"));
    }

    #[test]
    fn test_deserialize_rejects_non_object() {
        let err = Shopcart::deserialize(&json!("cart")).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject);
    }
}
