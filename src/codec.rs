//! Encode/decode for semi-structured columns and whole rows.
//!
//! Metrics and lab test results live inside a text-bearing column. The store
//! may hand that column back either as raw text or, when it parses JSON
//! columns itself, as an already-structured value; [`decode_column`] accepts
//! both transparently. [`encode_column`] always produces text so the
//! outbound payload never depends on the store's column typing.
//!
//! Whole rows are validated through typed deserialization: any missing
//! required field or enum mismatch surfaces as a [`DecodeError`] instead of
//! an unchecked shape assumption.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Decode a text-bearing column into `T`, accepting raw text or an
/// already-structured value.
pub fn decode_column<T: DeserializeOwned>(
    context: &'static str,
    raw: &Value,
) -> Result<T, DecodeError> {
    match raw {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|source| DecodeError::json(context, source))
        }
        structured => serde_json::from_value(structured.clone())
            .map_err(|source| DecodeError::json(context, source)),
    }
}

/// Serialize a nested structure into the column's text representation.
pub fn encode_column<T: Serialize>(context: &'static str, value: &T) -> Result<String, DecodeError> {
    serde_json::to_string(value).map_err(|source| DecodeError::json(context, source))
}

/// Validate and decode a fetched row into a typed record.
pub fn decode_row<T: DeserializeOwned>(context: &'static str, row: Value) -> Result<T, DecodeError> {
    serde_json::from_value(row).map_err(|source| DecodeError::json(context, source))
}

/// Serialize a typed record into its row representation.
pub fn encode_row<T: Serialize>(context: &'static str, record: &T) -> Result<Value, DecodeError> {
    serde_json::to_value(record).map_err(|source| DecodeError::json(context, source))
}
