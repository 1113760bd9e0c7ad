//! libSQL-backed roster store and row helpers shared by the repositories

use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};

/// libSQL implementation of the roster repositories
pub struct LibSqlStore<'a> {
    pub(super) conn: &'a Connection,
}

impl<'a> LibSqlStore<'a> {
    /// Create a new store over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

pub(super) fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

pub(super) fn optional_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

pub(super) fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(super) fn optional_i64(row: &Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected integer or NULL in column {idx}, found {other:?}"
        ))),
    }
}

pub(super) fn optional_string(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(value) => Ok(Some(value)),
        other => Err(Error::Database(format!(
            "expected text or NULL in column {idx}, found {other:?}"
        ))),
    }
}

pub(super) fn parse_id<T: std::str::FromStr>(raw: &str, kind: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::Database(format!("invalid {kind} id stored: {raw}")))
}
