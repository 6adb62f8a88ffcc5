//! Conversions between SQLite rows and JSON records.

use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::Row;
use serde_json::Value;

use repocache_core::entity::{Record, DELETED_AT_FIELD, ID_FIELD};
use repocache_core::storage::records::writable;
use repocache_core::storage::{RepositoryError, Result};

/// Converts a row read with `ROW_COLUMNS` into a record.
pub fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let id: i64 = row.get(0)?;
    let attributes: String = row.get(1)?;
    let deleted_at: Option<String> = row.get(2)?;

    let mut record: Record = serde_json::from_str(&attributes)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    record.insert(ID_FIELD.to_string(), Value::from(id));
    if let Some(deleted_at) = deleted_at {
        record.insert(DELETED_AT_FIELD.to_string(), Value::from(deleted_at));
    }
    Ok(record)
}

/// Serializes the writable part of a record for the `attributes` column.
pub fn attributes_json(record: Record) -> Result<String> {
    serde_json::to_string(&writable(record))
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Parses a stored `attributes` column back into a record.
pub fn parse_attributes(text: &str) -> Result<Record> {
    serde_json::from_str(text).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Maps a JSON value to the SQL value `json_extract` yields for it.
///
/// Returns `None` for null, which callers compare with `IS NULL`.
pub fn json_to_sql(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Some(SqlValue::Text(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_sql() {
        assert_eq!(json_to_sql(&json!(null)), None);
        assert_eq!(json_to_sql(&json!(true)), Some(SqlValue::Integer(1)));
        assert_eq!(json_to_sql(&json!(7)), Some(SqlValue::Integer(7)));
        assert_eq!(json_to_sql(&json!(1.5)), Some(SqlValue::Real(1.5)));
        assert_eq!(
            json_to_sql(&json!("draft")),
            Some(SqlValue::Text("draft".to_string()))
        );
        assert_eq!(
            json_to_sql(&json!([1, 2])),
            Some(SqlValue::Text("[1,2]".to_string()))
        );
    }

    #[test]
    fn test_attributes_json_strips_identity() {
        let record = match json!({"id": 4, "title": "x", "deleted_at": "now"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(attributes_json(record).unwrap(), r#"{"title":"x"}"#);
    }

    #[test]
    fn test_parse_attributes_rejects_garbage() {
        assert!(parse_attributes(r#"{"a":1}"#).is_ok());
        assert!(matches!(
            parse_attributes("not json"),
            Err(RepositoryError::Serialization(_))
        ));
    }
}
