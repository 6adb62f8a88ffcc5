//! Pure helpers over untyped records.
//!
//! Persistence backends share these so that filtering, ordering, projection
//! and relation loading behave the same everywhere.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::entity::{
    EntityId, EntitySchema, Record, Relation, RelationKind, DELETED_AT_FIELD, ID_FIELD,
};
use crate::query::{Columns, OrderBy, Query, SortOrder};

use super::{RepositoryError, Result};

/// Total order over JSON values.
///
/// Values of different kinds order as null < bool < number < string < array
/// < object. Numbers compare numerically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                let ordering = compare_values(left, right);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Equality used by filters. `1` and `1.0` are equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

static NULL: Value = Value::Null;

/// Reads a field, treating a missing field as null.
pub fn field<'a>(record: &'a Record, name: &str) -> &'a Value {
    record.get(name).unwrap_or(&NULL)
}

/// Primary key of a record.
pub fn record_id(record: &Record) -> Option<EntityId> {
    record.get(ID_FIELD).and_then(Value::as_i64)
}

/// Returns true if the record carries a deletion timestamp.
pub fn is_trashed(record: &Record) -> bool {
    !field(record, DELETED_AT_FIELD).is_null()
}

/// Returns true if the record satisfies every equality filter.
pub fn matches_filters(record: &Record, filters: &[(String, Value)]) -> bool {
    filters
        .iter()
        .all(|(column, expected)| values_equal(field(record, column), expected))
}

/// Stable sort on one column.
pub fn sort_records(records: &mut [Record], order: &OrderBy) {
    records.sort_by(|a, b| {
        let ordering = compare_values(field(a, &order.column), field(b, &order.column));
        match order.direction {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Applies offset and limit.
pub fn window(records: Vec<Record>, offset: Option<u64>, limit: Option<u64>) -> Vec<Record> {
    let to_usize = |n: u64| usize::try_from(n).unwrap_or(usize::MAX);
    let skip = offset.map_or(0, to_usize);
    let take = limit.map_or(usize::MAX, to_usize);
    records.into_iter().skip(skip).take(take).collect()
}

/// Keeps the selected columns plus any loaded relations.
pub fn project(record: Record, columns: &Columns, relations: &BTreeSet<String>) -> Record {
    match columns {
        Columns::All => record,
        Columns::Only(_) => record
            .into_iter()
            .filter(|(key, _)| columns.includes(key) || relations.contains(key))
            .collect(),
    }
}

/// Removes the fields callers may not write.
pub fn writable(mut record: Record) -> Record {
    record.remove(ID_FIELD);
    record.remove(DELETED_AT_FIELD);
    record
}

/// Resolves relation names against the schema.
pub fn resolve_relations<'a, 'n>(
    schema: &'a EntitySchema,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<Vec<&'a Relation>> {
    names
        .into_iter()
        .map(|name| {
            schema
                .relation(name)
                .ok_or_else(|| RepositoryError::UnknownRelation {
                    entity_type: schema.name,
                    relation: name.to_string(),
                })
        })
        .collect()
}

/// Fails with `UnknownRelation` if the query names a relation the schema
/// does not declare.
pub fn validate_query(schema: &EntitySchema, query: &Query) -> Result<()> {
    resolve_relations(schema, query.relation_names()).map(|_| ())
}

/// Returns true if `related` matches `parent` through `relation`.
pub fn is_related(parent: &Record, relation: &Relation, related: &Record) -> bool {
    if is_trashed(related) {
        return false;
    }
    match relation.kind {
        RelationKind::HasMany => match record_id(parent) {
            Some(id) => values_equal(field(related, relation.foreign_key), &Value::from(id)),
            None => false,
        },
        RelationKind::BelongsTo => {
            let key = field(parent, relation.foreign_key);
            !key.is_null() && values_equal(field(related, ID_FIELD), key)
        }
    }
}

/// Returns true if at least one of `related` belongs to `parent`.
pub fn has_related(parent: &Record, relation: &Relation, related: &[Record]) -> bool {
    related.iter().any(|row| is_related(parent, relation, row))
}

/// Attaches a relation to each parent under the relation name: an array for
/// has-many, an object or null for belongs-to.
pub fn attach_relation(parents: &mut [Record], relation: &Relation, related: &[Record]) {
    for parent in parents.iter_mut() {
        let value = related_value(parent, relation, related);
        parent.insert(relation.name.to_string(), value);
    }
}

fn related_value(parent: &Record, relation: &Relation, related: &[Record]) -> Value {
    match relation.kind {
        RelationKind::HasMany => Value::Array(
            related
                .iter()
                .filter(|row| is_related(parent, relation, row))
                .cloned()
                .map(Value::Object)
                .collect(),
        ),
        RelationKind::BelongsTo => related
            .iter()
            .find(|row| is_related(parent, relation, row))
            .cloned()
            .map(Value::Object)
            .unwrap_or(Value::Null),
    }
}
