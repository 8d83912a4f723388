//! Value codec between [`Value`]/[`Key`] and SQLite storage classes.
//!
//! Timestamps persist as RFC 3339 text and are re-hydrated on load using
//! the descriptor's declared field kind; booleans ride in INTEGER columns.

use chrono::{DateTime, Utc};
use roster_core::{Error, Key, Result, Value};
use roster_schema::FieldKind;
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Encode a field value for a statement parameter.
pub(crate) fn encode(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(t) => SqlValue::Text(t.to_rfc3339()),
    }
}

/// Encode a primary key for a statement parameter.
pub(crate) fn encode_key(key: &Key) -> SqlValue {
    match key {
        Key::Int(i) => SqlValue::Integer(*i),
        Key::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// Decode a column back into the declared field kind.
pub(crate) fn decode(raw: ValueRef<'_>, kind: FieldKind) -> Result<Value> {
    if matches!(raw, ValueRef::Null) {
        return Ok(Value::Null);
    }
    match kind {
        FieldKind::Int => Ok(Value::Int(as_int(raw)?)),
        FieldKind::Bool => Ok(Value::Bool(as_int(raw)? != 0)),
        FieldKind::Float => match raw {
            ValueRef::Real(f) => Ok(Value::Float(f)),
            ValueRef::Integer(i) => Ok(Value::Float(i as f64)),
            other => Err(type_error("REAL", other)),
        },
        FieldKind::Text => Ok(Value::Text(as_text(raw)?.to_string())),
        FieldKind::Timestamp => {
            let text = as_text(raw)?;
            let parsed = DateTime::parse_from_rfc3339(text).map_err(|e| {
                Error::Database(format!("malformed stored timestamp {:?}: {}", text, e))
            })?;
            Ok(Value::Timestamp(parsed.with_timezone(&Utc)))
        }
    }
}

/// Decode a primary-key column.
pub(crate) fn decode_key(raw: ValueRef<'_>, kind: FieldKind) -> Result<Key> {
    match kind {
        FieldKind::Int => Ok(Key::Int(as_int(raw)?)),
        FieldKind::Text => Ok(Key::Text(as_text(raw)?.to_string())),
        other => Err(Error::Database(format!(
            "{:?} is not a primary-key kind",
            other
        ))),
    }
}

fn as_int(raw: ValueRef<'_>) -> Result<i64> {
    match raw {
        ValueRef::Integer(i) => Ok(i),
        other => Err(type_error("INTEGER", other)),
    }
}

fn as_text(raw: ValueRef<'_>) -> Result<&str> {
    match raw {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| Error::Database(format!("non-UTF-8 text column: {}", e))),
        other => Err(type_error("TEXT", other)),
    }
}

fn type_error(expected: &str, got: ValueRef<'_>) -> Error {
    Error::Database(format!(
        "expected {} storage class, got {:?}",
        expected,
        got.data_type()
    ))
}
