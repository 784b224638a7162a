//! Domain models for the shopcart aggregate.
//!
//! A [`Shopcart`] owns a collection of [`Item`]s; both implement the
//! [`Record`] contract (serialize, deserialize, create, update, delete,
//! find, all). Deserialization works on untyped JSON and reports the first
//! offending field through [`ValidationError`].

pub mod item;
pub mod record;
pub mod shopcart;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

pub use item::Item;
pub use record::Record;
pub use shopcart::Shopcart;

/// Errors raised when deserializing a request body into an entity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The input was not a keyed structure at all.
    #[error("body contained bad or no data: expected a JSON object")]
    NotAnObject,

    /// A required field was absent; names the first missing key.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field was present but had the wrong type or an out-of-range value.
    #[error("field {field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Interpret the input as a JSON object.
pub(crate) fn as_object(data: &Value) -> Result<&Map<String, Value>, ValidationError> {
    data.as_object().ok_or(ValidationError::NotAnObject)
}

/// Read a required integer field.
pub(crate) fn require_i32(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<i32, ValidationError> {
    let value = obj.get(field).ok_or(ValidationError::MissingField(field))?;
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or(ValidationError::InvalidField {
            field,
            expected: "an integer",
        })
}

/// Read an optional integer field; absent or `null` becomes `None`.
pub(crate) fn optional_i32(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<i32>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or(ValidationError::InvalidField {
                field,
                expected: "an integer",
            }),
    }
}

/// Read a required string field.
pub(crate) fn require_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<String, ValidationError> {
    let value = obj.get(field).ok_or(ValidationError::MissingField(field))?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(ValidationError::InvalidField {
            field,
            expected: "a string",
        })
}

/// Read an optional decimal field; absent or `null` becomes `None`.
///
/// JSON numbers are parsed through their literal representation so values
/// like `10` and `9.99` survive exactly.
pub(crate) fn optional_decimal(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<Decimal>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map(Some)
            .map_err(|_| ValidationError::InvalidField {
                field,
                expected: "a number",
            }),
        Some(_) => Err(ValidationError::InvalidField {
            field,
            expected: "a number",
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_require_i32_missing_names_field() {
        let obj = json!({ "other": 1 });
        let err = require_i32(obj.as_object().expect("object"), "count").unwrap_err();
        assert_eq!(err, ValidationError::MissingField("count"));
    }

    #[test]
    fn test_require_i32_rejects_wrong_type() {
        let obj = json!({ "count": "three" });
        let err = require_i32(obj.as_object().expect("object"), "count").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidField { field: "count", .. }
        ));
    }

    #[test]
    fn test_optional_i32_null_is_none() {
        let obj = json!({ "id": null });
        let value = optional_i32(obj.as_object().expect("object"), "id").expect("valid");
        assert_eq!(value, None);
    }

    #[test]
    fn test_optional_decimal_parses_integers_and_fractions() {
        let obj = json!({ "price": 10, "sale": 9.99 });
        let map = obj.as_object().expect("object");
        assert_eq!(
            optional_decimal(map, "price").expect("valid"),
            Some(Decimal::from(10))
        );
        assert_eq!(
            optional_decimal(map, "sale").expect("valid"),
            Decimal::from_str("9.99").ok()
        );
    }
}
