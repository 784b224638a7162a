//! The shopcart operation contract: everything callers can do to a cart
//! and its items.
//!
//! The add-item path is the merge resolver: adding a product that is
//! already in the cart accumulates onto the existing row instead of
//! creating a second one. Concurrent adds for the same product cannot
//! create duplicate rows: the `(shopcart_id, product_id)` unique constraint
//! plus a conflict-driven retry guard the insert, and the accumulation is a
//! single atomic `UPDATE`.

use serde_json::Value;
use sqlx::SqlitePool;

use shopcart_core::{CustomerId, ItemId, ShopcartId};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::models::{Item, Record, Shopcart};

fn shopcart_not_found(id: ShopcartId) -> AppError {
    AppError::NotFound(format!("shopcart {id} could not be found"))
}

fn item_not_found(id: ItemId) -> AppError {
    AppError::NotFound(format!("item {id} could not be found"))
}

fn item_not_in_shopcart(item_id: ItemId, shopcart_id: ShopcartId) -> AppError {
    AppError::NotFound(format!(
        "item {item_id} could not be found in shopcart {shopcart_id}"
    ))
}

/// List every shopcart, optionally filtered by customer.
///
/// # Errors
///
/// Returns `AppError::Database` if a query fails.
pub async fn list_shopcarts(
    pool: &SqlitePool,
    customer_id: Option<CustomerId>,
) -> Result<Vec<Shopcart>, AppError> {
    let carts = match customer_id {
        Some(customer_id) => Shopcart::find_by_customer_id(pool, customer_id).await?,
        None => Shopcart::all(pool).await?,
    };
    Ok(carts)
}

/// Fetch one shopcart with its items.
///
/// # Errors
///
/// Returns `AppError::NotFound` if no cart has this id.
pub async fn get_shopcart(pool: &SqlitePool, id: ShopcartId) -> Result<Shopcart, AppError> {
    Shopcart::find(pool, id)
        .await?
        .ok_or_else(|| shopcart_not_found(id))
}

/// Create a shopcart (and any items supplied with it) from a request body.
///
/// # Errors
///
/// Returns `AppError::Validation` for a malformed payload.
pub async fn create_shopcart(pool: &SqlitePool, data: &Value) -> Result<Shopcart, AppError> {
    let mut cart = Shopcart::deserialize(data)?;
    cart.create(pool).await?;
    Ok(cart)
}

/// Overwrite a shopcart from a full payload. When the payload carries an
/// `items` list the cart's items are replaced wholesale; without the key
/// the existing items are kept.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown cart, `AppError::Validation`
/// for a malformed payload.
pub async fn update_shopcart(
    pool: &SqlitePool,
    id: ShopcartId,
    data: &Value,
) -> Result<Shopcart, AppError> {
    if Shopcart::find(pool, id).await?.is_none() {
        return Err(shopcart_not_found(id));
    }

    let mut cart = Shopcart::deserialize(data)?;
    cart.id = Some(id);

    if data.get("items").is_some() {
        cart.save_with_items(pool).await?;
    } else {
        cart.update(pool).await?;
    }

    get_shopcart(pool, id).await
}

/// Delete a shopcart and, via the store-level cascade, all of its items.
/// Deleting an absent cart succeeds silently.
///
/// # Errors
///
/// Returns `AppError::Database` if the delete fails.
pub async fn delete_shopcart(pool: &SqlitePool, id: ShopcartId) -> Result<(), AppError> {
    if let Some(cart) = Shopcart::find(pool, id).await? {
        cart.delete(pool).await?;
    }
    Ok(())
}

/// List the items of one shopcart. An unknown cart yields an empty list.
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_items(pool: &SqlitePool, shopcart_id: ShopcartId) -> Result<Vec<Item>, AppError> {
    Ok(Item::find_by_shopcart(pool, shopcart_id).await?)
}

/// Resolve an item and check it belongs to the given cart.
///
/// Both failure modes are NotFound; the messages differ ("not found" vs.
/// "not found under this shopcart") but callers must not branch on them.
async fn find_owned_item(
    pool: &SqlitePool,
    shopcart_id: ShopcartId,
    item_id: ItemId,
) -> Result<Item, AppError> {
    let item = Item::find(pool, item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;

    if item.shopcart_id != Some(shopcart_id) {
        return Err(item_not_in_shopcart(item_id, shopcart_id));
    }

    Ok(item)
}

/// Fetch one item, enforcing the ownership check.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the item is absent or owned by another
/// cart.
pub async fn get_item(
    pool: &SqlitePool,
    shopcart_id: ShopcartId,
    item_id: ItemId,
) -> Result<Item, AppError> {
    find_owned_item(pool, shopcart_id, item_id).await
}

/// The merge resolver: add an item to a cart, accumulating the count onto
/// an existing row for the same product.
///
/// On the merge path every candidate field except `count` is ignored. On
/// the create path the candidate is validated in full and persisted with a
/// store-assigned id. An insert that loses a race against a concurrent add
/// for the same product hits the unique constraint and retries as a merge.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown cart, `AppError::Validation`
/// for a malformed candidate.
pub async fn add_item(
    pool: &SqlitePool,
    shopcart_id: ShopcartId,
    data: &Value,
) -> Result<Item, AppError> {
    let mut candidate = Item::deserialize(data)?;

    if Shopcart::find(pool, shopcart_id).await?.is_none() {
        return Err(shopcart_not_found(shopcart_id));
    }

    if let Some(existing) =
        Item::find_by_shopcart_and_product(pool, shopcart_id, candidate.product_id).await?
    {
        return merge_counts(pool, &existing, candidate.count).await;
    }

    candidate.shopcart_id = Some(shopcart_id);
    match candidate.create(pool).await {
        Ok(()) => Ok(candidate),
        Err(RepositoryError::Conflict(_)) => {
            // Lost the insert race; fold the count into the row that won.
            let existing =
                Item::find_by_shopcart_and_product(pool, shopcart_id, candidate.product_id)
                    .await?
                    .ok_or(AppError::Database(RepositoryError::NotFound))?;
            merge_counts(pool, &existing, candidate.count).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn merge_counts(pool: &SqlitePool, existing: &Item, extra: i32) -> Result<Item, AppError> {
    let id = existing.id.ok_or(RepositoryError::NotFound)?;
    tracing::debug!(item_id = %id, extra, "merging item counts");
    Ok(Item::accumulate_count(pool, id, extra).await?)
}

/// Replace an item's fields from a full payload, after the ownership check.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the item is absent or owned by another
/// cart, `AppError::Validation` when the payload is malformed, `count <= 0`,
/// or `price < 0`.
pub async fn update_item(
    pool: &SqlitePool,
    shopcart_id: ShopcartId,
    item_id: ItemId,
    data: &Value,
) -> Result<Item, AppError> {
    find_owned_item(pool, shopcart_id, item_id).await?;

    let mut replacement = Item::deserialize(data)?;
    replacement.id = Some(item_id);
    replacement.shopcart_id = Some(shopcart_id);
    replacement.update(pool).await?;

    Ok(replacement)
}

/// Delete an item. An absent item or one owned by another cart is left
/// alone and the call still succeeds.
///
/// # Errors
///
/// Returns `AppError::Database` if the delete fails.
pub async fn delete_item(
    pool: &SqlitePool,
    shopcart_id: ShopcartId,
    item_id: ItemId,
) -> Result<(), AppError> {
    match find_owned_item(pool, shopcart_id, item_id).await {
        Ok(item) => Ok(item.delete(pool).await?),
        // Permissive delete: missing or mis-owned items are a no-op.
        Err(AppError::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
