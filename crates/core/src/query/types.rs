use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{EntitySchema, Record};
use crate::storage::RepositoryError;

/// Equality filters or write payload, keyed by field name.
///
/// Keys are kept ordered so that two maps with the same content serialize
/// identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, consuming and returning the map.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces an attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the attributes into an untyped record.
    pub fn into_record(self) -> Record {
        self.0.into_iter().collect()
    }

    /// Canonical JSON form, used inside cache keys.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Attributes
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Record> for Attributes {
    fn from(record: Record) -> Self {
        Self(record.into_iter().collect())
    }
}

/// Column selection for read queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Columns {
    /// Every column (`*`).
    #[default]
    All,
    /// Only the listed columns.
    Only(Vec<String>),
}

impl Columns {
    /// Selects the given columns.
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(columns.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Columns::All)
    }

    /// Returns true if `column` is part of the selection.
    pub fn includes(&self, column: &str) -> bool {
        match self {
            Columns::All => true,
            Columns::Only(columns) => columns.iter().any(|c| c == column),
        }
    }

    /// Canonical JSON form: `["*"]` or the column list.
    pub fn to_value(&self) -> Value {
        match self {
            Columns::All => Value::Array(vec![Value::String("*".to_string())]),
            Columns::Only(columns) => {
                Value::Array(columns.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(RepositoryError::InvalidData(format!(
                "Invalid sort order: {other}"
            ))),
        }
    }
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortOrder,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, direction: SortOrder) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

/// A query against one entity table.
///
/// Filters are a conjunction of equality constraints. Rows marked as deleted
/// are excluded unless `with_trashed` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order: Option<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub columns: Columns,
    /// Relations to eager-load.
    pub with: BTreeSet<String>,
    /// Only rows that have at least one related row through this relation.
    pub has: Option<String>,
    pub with_trashed: bool,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query preloaded with the schema's eager relations.
    pub fn for_schema(schema: &EntitySchema) -> Self {
        Self {
            with: schema.eager_relations().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// Adds an equality constraint.
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Adds one equality constraint per attribute.
    pub fn filters(mut self, attributes: &Attributes) -> Self {
        self.filters
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortOrder) -> Self {
        self.order = Some(OrderBy::new(column, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Adds relations to eager-load.
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with.extend(relations.into_iter().map(Into::into));
        self
    }

    /// Removes relations from the eager-load set.
    pub fn without<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for relation in relations {
            self.with.remove(relation.as_ref());
        }
        self
    }

    /// Restricts the result to rows that have the given relation.
    pub fn has(mut self, relation: impl Into<String>) -> Self {
        self.has = Some(relation.into());
        self
    }

    pub fn with_trashed(mut self) -> Self {
        self.with_trashed = true;
        self
    }

    /// Returns the same query without limit, offset or ordering.
    ///
    /// Used to count the rows a windowed query would page through.
    pub fn unwindowed(&self) -> Self {
        Self {
            order: None,
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// Every relation name the query refers to.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.with.iter().map(String::as_str).chain(self.has.as_deref())
    }
}
