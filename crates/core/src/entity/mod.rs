mod conversions;
mod types;

pub use conversions::{from_record, from_records, to_record};
pub use types::{
    Entity, EntityId, EntitySchema, Record, Relation, RelationKind, DELETED_AT_FIELD, ID_FIELD,
};
