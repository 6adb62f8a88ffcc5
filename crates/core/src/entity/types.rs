use serde::de::DeserializeOwned;
use serde::Serialize;

/// Primary key type shared by every entity.
pub type EntityId = i64;

/// Untyped row exchanged with the persistence layer.
///
/// The primary key travels as the `id` field and soft deletion as the
/// `deleted_at` field.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Field holding the primary key inside a [`Record`].
pub const ID_FIELD: &str = "id";

/// Field holding the soft-deletion timestamp inside a [`Record`].
pub const DELETED_AT_FIELD: &str = "deleted_at";

/// A domain record type managed by a repository.
///
/// Entities are plain serde types. Fields that may be missing from a
/// projected query (see `Columns`) should be `#[serde(default)]`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity name, used as table key, cache namespace and invalidation tag.
    const NAME: &'static str;

    /// Whether `delete` marks rows as deleted instead of removing them.
    const SOFT_DELETES: bool = false;

    /// Returns the primary key, or `None` if the entity was never persisted.
    fn id(&self) -> Option<EntityId>;

    /// Relations that can be eager-loaded or used with `has`.
    fn relations() -> Vec<Relation> {
        Vec::new()
    }

    /// Returns the schema handed to the persistence layer.
    fn schema() -> EntitySchema {
        EntitySchema {
            name: Self::NAME,
            soft_deletes: Self::SOFT_DELETES,
            relations: Self::relations(),
        }
    }
}

/// How a relation links two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Related rows carry `foreign_key` pointing at the parent id.
    HasMany,
    /// The parent carries `foreign_key` pointing at the related id.
    BelongsTo,
}

/// A named relation between an entity and another entity's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Relation name; eager-loaded data is attached under this field.
    pub name: &'static str,
    pub kind: RelationKind,
    /// Entity name of the related table.
    pub related: &'static str,
    pub foreign_key: &'static str,
    /// Loaded by default unless removed with `without`.
    pub eager: bool,
}

impl Relation {
    /// Creates a has-many relation.
    pub fn has_many(name: &'static str, related: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany,
            related,
            foreign_key,
            eager: false,
        }
    }

    /// Creates a belongs-to relation.
    pub fn belongs_to(
        name: &'static str,
        related: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo,
            related,
            foreign_key,
            eager: false,
        }
    }

    /// Marks the relation as loaded by default.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }
}

/// Everything the persistence layer needs to know about an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: &'static str,
    pub soft_deletes: bool,
    pub relations: Vec<Relation>,
}

impl EntitySchema {
    /// Creates a schema without relations.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            soft_deletes: false,
            relations: Vec::new(),
        }
    }

    /// Enables soft deletes.
    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    /// Adds a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Looks up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Names of the relations loaded by default.
    pub fn eager_relations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.relations.iter().filter(|r| r.eager).map(|r| r.name)
    }
}
