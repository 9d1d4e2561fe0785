//! Opaque keyset-pagination cursors
//!
//! A cursor is URL-safe base64 (no padding) over a compact JSON object
//! holding the keyset column, the boundary value and the sort direction.
//! The value keeps its JSON type, so `"00123"` and `123` stay distinct.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use restql_common::error::{Error, Result};

use crate::identifier::is_valid_identifier;

/// Decoded resume position
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub column: String,
    pub value: JsonValue,
    pub desc: bool,
}

#[derive(Serialize, Deserialize)]
struct CursorPayload {
    #[serde(rename = "c")]
    column: String,
    #[serde(rename = "v")]
    value: JsonValue,
    #[serde(rename = "d")]
    desc: bool,
}

fn check_column(column: &str) -> Result<()> {
    if is_valid_identifier(column) {
        Ok(())
    } else {
        Err(Error::InvalidCursor(format!(
            "cursor column '{column}' is not a valid identifier"
        )))
    }
}

/// Only string, number and boolean boundaries can be compared against
fn check_value(value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_) => Ok(()),
        other => Err(Error::InvalidCursor(format!(
            "cursor value must be a string, number or boolean, got {other}"
        ))),
    }
}

/// Encode `(column, value, desc)` into a cursor token
pub fn encode_cursor(column: &str, value: &JsonValue, desc: bool) -> Result<String> {
    check_column(column)?;
    check_value(value)?;
    let payload = CursorPayload {
        column: column.to_string(),
        value: value.clone(),
        desc,
    };
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?))
}

/// Decode a cursor token, rejecting tokens whose column is not a valid identifier
pub fn decode_cursor(token: &str) -> Result<Cursor> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| Error::InvalidCursor(format!("not a cursor token: {e}")))?;
    let payload: CursorPayload = serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidCursor(format!("malformed cursor payload: {e}")))?;
    check_column(&payload.column)?;
    check_value(&payload.value)?;
    Ok(Cursor {
        column: payload.column,
        value: payload.value,
        desc: payload.desc,
    })
}

impl Cursor {
    pub fn encode(&self) -> Result<String> {
        encode_cursor(&self.column, &self.value, self.desc)
    }
}

/// Cursor pointing past `row`, or `None` when the row has no usable value in `column`
pub fn next_cursor(row: &JsonValue, column: &str, desc: bool) -> Result<Option<String>> {
    match row.get(column) {
        Some(value @ (JsonValue::String(_) | JsonValue::Number(_) | JsonValue::Bool(_))) => {
            encode_cursor(column, value, desc).map(Some)
        }
        _ => Ok(None),
    }
}
