//! The item entity: one line of a shopcart.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Value, json};
use sqlx::{SqliteConnection, SqlitePool};

use shopcart_core::{ItemId, ProductId, ShopcartId};

use crate::db::RepositoryError;

use super::record::Record;
use super::{ValidationError, as_object, optional_decimal, optional_i32, require_i32, require_string};

const ITEM_COLUMNS: &str = "id, shopcart_id, product_id, name, count, price";

/// A product line belonging to one shopcart.
///
/// `id` and `shopcart_id` are `None` until the store assigns them; an item
/// whose `shopcart_id` no longer references a live cart is invalid state and
/// cannot be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Option<ItemId>,
    pub shopcart_id: Option<ShopcartId>,
    pub product_id: ProductId,
    pub name: String,
    pub count: i32,
    /// Only populated when supplied on input; the merge path never touches it.
    pub price: Option<Decimal>,
}

/// Internal row type for item queries.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i32,
    shopcart_id: i32,
    product_id: i32,
    name: String,
    count: i32,
    price: Option<String>,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let price = row
            .price
            .as_deref()
            .map(Decimal::from_str)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
            })?;

        Ok(Self {
            id: Some(ItemId::new(row.id)),
            shopcart_id: Some(ShopcartId::new(row.shopcart_id)),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            count: row.count,
            price,
        })
    }
}

impl Item {
    /// Insert this item on an existing connection (used inside aggregate
    /// transactions as well as by `Record::create`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the cart already has a row for
    /// this product, `RepositoryError::Database` for other failures.
    pub(crate) async fn insert(&mut self, conn: &mut SqliteConnection) -> Result<(), RepositoryError> {
        let shopcart_id = self.shopcart_id.ok_or_else(|| {
            RepositoryError::DataCorruption("item has no owning shopcart".to_owned())
        })?;

        tracing::debug!(%shopcart_id, product_id = %self.product_id, "creating item");

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO items (shopcart_id, product_id, name, count, price)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
        )
        .bind(shopcart_id)
        .bind(self.product_id)
        .bind(&self.name)
        .bind(self.count)
        .bind(self.price.map(|p| p.to_string()))
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "shopcart {shopcart_id} already has an item for product {}",
                    self.product_id
                ));
            }
            RepositoryError::Database(e)
        })?;

        self.id = Some(ItemId::new(id));
        Ok(())
    }

    /// Return the items belonging to one shopcart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn find_by_shopcart(
        pool: &SqlitePool,
        shopcart_id: ShopcartId,
    ) -> Result<Vec<Self>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE shopcart_id = ?1 ORDER BY id"
        ))
        .bind(shopcart_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Self::try_from).collect()
    }

    /// Return the item for a `(shopcart, product)` pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn find_by_shopcart_and_product(
        pool: &SqlitePool,
        shopcart_id: ShopcartId,
        product_id: ProductId,
    ) -> Result<Option<Self>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE shopcart_id = ?1 AND product_id = ?2"
        ))
        .bind(shopcart_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;

        row.map(Self::try_from).transpose()
    }

    /// Atomically add `extra` to an item's count and return the updated row.
    ///
    /// A single `UPDATE ... SET count = count + ?` keeps concurrent merges
    /// from losing increments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row vanished.
    pub async fn accumulate_count(
        pool: &SqlitePool,
        id: ItemId,
        extra: i32,
    ) -> Result<Self, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE items SET count = count + ?1 WHERE id = ?2 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(extra)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}

impl Record for Item {
    type Id = ItemId;

    /// Emits `{id, shopcart_id, name, product_id, count}`; `price` is added
    /// only when populated.
    fn serialize(&self) -> Value {
        let mut value = json!({
            "id": self.id,
            "shopcart_id": self.shopcart_id,
            "name": self.name,
            "product_id": self.product_id,
            "count": self.count,
        });
        if let Some(price) = self.price.as_ref().and_then(Decimal::to_f64) {
            value["price"] = Value::from(price);
        }
        value
    }

    fn deserialize(data: &Value) -> Result<Self, ValidationError> {
        let obj = as_object(data)?;

        let id = optional_i32(obj, "id")?.map(ItemId::new);
        let name = require_string(obj, "name")?;
        let shopcart_id = optional_i32(obj, "shopcart_id")?.map(ShopcartId::new);
        let product_id = ProductId::new(require_i32(obj, "product_id")?);

        let count = require_i32(obj, "count")?;
        if count < 1 {
            return Err(ValidationError::InvalidField {
                field: "count",
                expected: "a positive integer",
            });
        }

        let price = optional_decimal(obj, "price")?;
        if price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(ValidationError::InvalidField {
                field: "price",
                expected: "a non-negative number",
            });
        }

        Ok(Self {
            id,
            shopcart_id,
            product_id,
            name,
            count,
            price,
        })
    }

    async fn create(&mut self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        self.id = None;
        let mut conn = pool.acquire().await?;
        self.insert(&mut conn).await
    }

    async fn update(&self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        let id = self.id.ok_or(RepositoryError::NotFound)?;
        let shopcart_id = self.shopcart_id.ok_or_else(|| {
            RepositoryError::DataCorruption("item has no owning shopcart".to_owned())
        })?;

        tracing::debug!(%shopcart_id, product_id = %self.product_id, "updating item");

        let result = sqlx::query(
            "UPDATE items
             SET shopcart_id = ?1, product_id = ?2, name = ?3, count = ?4, price = ?5
             WHERE id = ?6",
        )
        .bind(shopcart_id)
        .bind(self.product_id)
        .bind(&self.name)
        .bind(self.count)
        .bind(self.price.map(|p| p.to_string()))
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "shopcart {shopcart_id} already has an item for product {}",
                    self.product_id
                ));
            }
            RepositoryError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, pool: &SqlitePool) -> Result<(), RepositoryError> {
        let Some(id) = self.id else {
            return Ok(());
        };

        tracing::debug!(item_id = %id, "deleting item");

        sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn find(pool: &SqlitePool, id: ItemId) -> Result<Option<Self>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.map(Self::try_from).transpose()
    }

    async fn all(pool: &SqlitePool) -> Result<Vec<Self>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY id"
        ))
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Self::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn item_payload() -> Value {
        json!({
            "id": 3,
            "shopcart_id": 9,
            "name": "mouse",
            "product_id": 5,
            "count": 2,
            "price": 10.5,
        })
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let item = Item::deserialize(&item_payload()).expect("valid payload");
        let back = Item::deserialize(&item.serialize()).expect("round trip");
        assert_eq!(back.id, Some(ItemId::new(3)));
        assert_eq!(back.shopcart_id, Some(ShopcartId::new(9)));
        assert_eq!(back.name, "mouse");
        assert_eq!(back.product_id, ProductId::new(5));
        assert_eq!(back.count, 2);
        assert_eq!(back.price, Decimal::from_str("10.5").ok());
    }

    #[test]
    fn test_serialize_omits_absent_price() {
        let mut payload = item_payload();
        payload
            .as_object_mut()
            .expect("object")
            .remove("price");
        let item = Item::deserialize(&payload).expect("valid payload");
        assert_eq!(item.serialize().get("price"), None);
    }

    #[test]
    fn test_deserialize_names_first_missing_field() {
        let err = Item::deserialize(&json!({ "product_id": 5, "count": 1 })).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("name"));

        let err = Item::deserialize(&json!({ "name": "mouse" })).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("product_id"));
    }

    #[test]
    fn test_deserialize_rejects_non_object() {
        let err = Item::deserialize(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject);
    }

    #[test]
    fn test_deserialize_rejects_non_positive_count() {
        let mut payload = item_payload();
        payload["count"] = json!(0);
        let err = Item::deserialize(&payload).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidField { field: "count", .. }
        ));
    }

    #[test]
    fn test_deserialize_rejects_negative_price() {
        let mut payload = item_payload();
        payload["price"] = json!(-1);
        let err = Item::deserialize(&payload).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidField { field: "price", .. }
        ));
    }

    #[test]
    fn test_deserialize_accepts_zero_price() {
        let mut payload = item_payload();
        payload["price"] = json!(0);
        let item = Item::deserialize(&payload).expect("zero price is valid");
        assert_eq!(item.price, Some(Decimal::ZERO));
    }
}
