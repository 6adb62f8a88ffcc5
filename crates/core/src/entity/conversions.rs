//! Pure conversions between typed entities and untyped records.

use serde_json::Value;

use crate::storage::{RepositoryError, Result};

use super::{Entity, Record};

/// Converts an entity into a record.
///
/// Fails with `InvalidData` when the entity does not serialize to a JSON object.
pub fn to_record<E: Entity>(entity: &E) -> Result<Record> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RepositoryError::InvalidData(format!(
            "{} must serialize to an object, got {}",
            E::NAME,
            json_type_name(&other)
        ))),
        Err(e) => Err(RepositoryError::Serialization(e.to_string())),
    }
}

/// Converts a record into an entity.
pub fn from_record<E: Entity>(record: Record) -> Result<E> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| RepositoryError::Serialization(format!("{}: {}", E::NAME, e)))
}

/// Converts a batch of records into entities, stopping at the first failure.
pub fn from_records<E: Entity>(records: Vec<Record>) -> Result<Vec<E>> {
    records.into_iter().map(from_record).collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
