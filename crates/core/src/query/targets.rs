//! Polymorphic write targets.
//!
//! `delete` accepts an entity instance, a single identifier or a batch of
//! identifiers; `update` accepts an entity instance or an identifier. The
//! caller picks the variant; nothing is inspected at runtime.

use std::str::FromStr;

use crate::entity::EntityId;
use crate::storage::RepositoryError;

/// What to delete.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget<E> {
    /// Per-instance deletion.
    Entity(E),
    /// A single identifier, deleted through the batch path.
    Id(EntityId),
    /// A batch of identifiers.
    Ids(Vec<EntityId>),
}

impl<E> DeleteTarget<E> {
    /// Parses a numeric identifier.
    ///
    /// Numeric strings are coerced to an integer identifier, so `"5"` and
    /// `"5.0"` both become `Id(5)`. Fractional parts are truncated.
    pub fn parse(input: &str) -> Result<Self, RepositoryError> {
        parse_numeric_id(input).map(DeleteTarget::Id)
    }

    /// Identifiers for the batch deletion path, or `None` for an instance.
    pub fn batch_ids(&self) -> Option<Vec<EntityId>> {
        match self {
            DeleteTarget::Entity(_) => None,
            DeleteTarget::Id(id) => Some(vec![*id]),
            DeleteTarget::Ids(ids) => Some(ids.clone()),
        }
    }
}

impl<E> From<EntityId> for DeleteTarget<E> {
    fn from(id: EntityId) -> Self {
        DeleteTarget::Id(id)
    }
}

impl<E> From<Vec<EntityId>> for DeleteTarget<E> {
    fn from(ids: Vec<EntityId>) -> Self {
        DeleteTarget::Ids(ids)
    }
}

impl<E> From<&[EntityId]> for DeleteTarget<E> {
    fn from(ids: &[EntityId]) -> Self {
        DeleteTarget::Ids(ids.to_vec())
    }
}

impl<E> FromStr for DeleteTarget<E> {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What to update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateTarget<E> {
    Entity(E),
    Id(EntityId),
}

impl<E> From<EntityId> for UpdateTarget<E> {
    fn from(id: EntityId) -> Self {
        UpdateTarget::Id(id)
    }
}

fn parse_numeric_id(input: &str) -> Result<EntityId, RepositoryError> {
    let trimmed = input.trim();
    if let Ok(id) = trimmed.parse::<EntityId>() {
        return Ok(id);
    }
    // 2^63: the first float past the identifier range.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    match trimmed.parse::<f64>().map(f64::trunc) {
        Ok(value) if (-BOUND..BOUND).contains(&value) => Ok(value as EntityId),
        Ok(value) if value.is_finite() => Err(RepositoryError::InvalidData(format!(
            "Identifier out of range: {input:?}"
        ))),
        _ => Err(RepositoryError::InvalidData(format!(
            "Not a numeric identifier: {input:?}"
        ))),
    }
}
