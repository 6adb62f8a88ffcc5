//! SQL generation for the SQLite backend.
//!
//! Every entity lives in its own table holding the JSON attributes, the
//! primary key and the soft-delete timestamp. Statements are built here as
//! pure data, no I/O; identifiers are validated before they are spliced in.

use rusqlite::types::Value as SqlValue;

use repocache_core::entity::{EntitySchema, Relation, RelationKind, DELETED_AT_FIELD, ID_FIELD};
use repocache_core::query::{Query, SortOrder};
use repocache_core::storage::records::resolve_relations;
use repocache_core::storage::{RepositoryError, Result};

use super::conversions::json_to_sql;

/// Columns every entity table is read with, in row order.
pub const ROW_COLUMNS: &str = "t.id, t.attributes, t.deleted_at";

/// Returns an error unless `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(RepositoryError::InvalidData(format!(
            "Invalid identifier: {name:?}"
        )))
    }
}

/// `CREATE TABLE IF NOT EXISTS` for an entity table.
pub fn create_table(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (\n    \
             id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
             attributes TEXT NOT NULL DEFAULT '{{}}',\n    \
             deleted_at TEXT\n\
         );"
    ))
}

/// Creates the entity table and every table its relations point to.
pub fn create_tables(schema: &EntitySchema) -> Result<String> {
    let mut statements = vec![create_table(schema.name)?];
    for relation in &schema.relations {
        statements.push(create_table(relation.related)?);
    }
    Ok(statements.join("\n"))
}

/// SQL expression reading `column` from the row aliased `alias`.
pub fn column_expr(alias: &str, column: &str) -> Result<String> {
    validate_identifier(column)?;
    Ok(match column {
        ID_FIELD => format!("{alias}.id"),
        DELETED_AT_FIELD => format!("{alias}.deleted_at"),
        _ => format!("json_extract({alias}.attributes, '$.\"{column}\"')"),
    })
}

/// A statement and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

fn where_clause(schema: &EntitySchema, query: &Query) -> Result<Statement> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if !query.with_trashed {
        conditions.push("t.deleted_at IS NULL".to_string());
    }

    for (column, value) in &query.filters {
        let expr = column_expr("t", column)?;
        match json_to_sql(value) {
            None => conditions.push(format!("{expr} IS NULL")),
            Some(param) => {
                params.push(param);
                conditions.push(format!("{expr} = ?{}", params.len()));
            }
        }
    }

    if let Some(name) = &query.has {
        let relation = resolve_relations(schema, [name.as_str()])?.remove(0);
        conditions.push(exists_related(relation)?);
    }

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    Ok(Statement { sql, params })
}

/// SQLite windows are signed; anything larger means "no bound".
fn clamp_to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn exists_related(relation: &Relation) -> Result<String> {
    validate_identifier(relation.related)?;
    let related = relation.related;
    let link = match relation.kind {
        RelationKind::HasMany => format!("{} = t.id", column_expr("r", relation.foreign_key)?),
        RelationKind::BelongsTo => format!("r.id = {}", column_expr("t", relation.foreign_key)?),
    };
    Ok(format!(
        "EXISTS (SELECT 1 FROM \"{related}\" AS r WHERE r.deleted_at IS NULL AND {link})"
    ))
}

/// `SELECT` for `query`, with ordering and window applied.
pub fn select(schema: &EntitySchema, query: &Query) -> Result<Statement> {
    validate_identifier(schema.name)?;
    let filter = where_clause(schema, query)?;
    let mut sql = format!(
        "SELECT {ROW_COLUMNS} FROM \"{}\" AS t{}",
        schema.name, filter.sql
    );

    match &query.order {
        Some(order) => {
            let direction = match order.direction {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY {} {direction}, t.id ASC",
                column_expr("t", &order.column)?
            ));
        }
        None => sql.push_str(" ORDER BY t.id ASC"),
    }

    if query.limit.is_some() || query.offset.is_some() {
        let limit = query.limit.map_or(-1, clamp_to_i64);
        let offset = query.offset.map_or(0, clamp_to_i64);
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
    }

    Ok(Statement {
        sql,
        params: filter.params,
    })
}

/// `SELECT COUNT(*)` for `query`, ignoring ordering and window.
pub fn count(schema: &EntitySchema, query: &Query) -> Result<Statement> {
    validate_identifier(schema.name)?;
    let filter = where_clause(schema, query)?;
    Ok(Statement {
        sql: format!(
            "SELECT COUNT(*) FROM \"{}\" AS t{}",
            schema.name, filter.sql
        ),
        params: filter.params,
    })
}

/// Live rows related to a batch of parents.
///
/// Takes one parameter: a JSON array of parent ids (has-many) or of foreign
/// key values (belongs-to).
pub fn select_related(relation: &Relation) -> Result<String> {
    validate_identifier(relation.related)?;
    let key = match relation.kind {
        RelationKind::HasMany => column_expr("t", relation.foreign_key)?,
        RelationKind::BelongsTo => "t.id".to_string(),
    };
    Ok(format!(
        "SELECT {ROW_COLUMNS} FROM \"{}\" AS t \
         WHERE t.deleted_at IS NULL AND {key} IN (SELECT value FROM json_each(?1)) \
         ORDER BY t.id ASC",
        relation.related
    ))
}

pub fn select_by_id(table: &str) -> String {
    format!("SELECT {ROW_COLUMNS} FROM \"{table}\" AS t WHERE t.id = ?1 AND t.deleted_at IS NULL")
}

pub fn insert(table: &str) -> String {
    format!("INSERT INTO \"{table}\" (attributes) VALUES (?1)")
}

pub fn update_attributes(table: &str) -> String {
    format!("UPDATE \"{table}\" SET attributes = ?2 WHERE id = ?1 AND deleted_at IS NULL")
}

pub fn soft_delete(table: &str) -> String {
    format!("UPDATE \"{table}\" SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL")
}

pub fn hard_delete(table: &str) -> String {
    format!("DELETE FROM \"{table}\" WHERE id = ?1 AND deleted_at IS NULL")
}

pub fn force_delete(table: &str) -> String {
    format!("DELETE FROM \"{table}\" WHERE id = ?1")
}

/// Empties the table and resets its auto-increment counter.
pub fn truncate(table: &str) -> String {
    format!("DELETE FROM \"{table}\";\nDELETE FROM sqlite_sequence WHERE name = '{table}';")
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocache_core::query::Columns;

    fn posts() -> EntitySchema {
        EntitySchema::new("posts")
            .with_relation(Relation::has_many("comments", "comments", "post_id"))
            .with_relation(Relation::belongs_to("author", "users", "author_id"))
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("posts").is_ok());
        assert!(validate_identifier("_blog_posts2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2posts").is_err());
        assert!(validate_identifier("posts\"; DROP TABLE x; --").is_err());
    }

    #[test]
    fn test_create_tables_includes_related() {
        let sql = create_tables(&posts()).unwrap();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"posts\""));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"comments\""));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"users\""));
        assert!(sql.contains("AUTOINCREMENT"));
    }

    #[test]
    fn test_column_expr() {
        assert_eq!(column_expr("t", "id").unwrap(), "t.id");
        assert_eq!(column_expr("t", "deleted_at").unwrap(), "t.deleted_at");
        assert_eq!(
            column_expr("t", "title").unwrap(),
            "json_extract(t.attributes, '$.\"title\"')"
        );
        assert!(column_expr("t", "title') OR 1=1 --").is_err());
    }

    #[test]
    fn test_select_with_filters_order_and_window() {
        let query = Query::new()
            .filter("status", "published")
            .filter("author_id", serde_json::Value::Null)
            .order_by("title", SortOrder::Desc)
            .limit(10)
            .offset(20);

        let statement = select(&posts(), &query).unwrap();

        assert_eq!(
            statement.sql,
            "SELECT t.id, t.attributes, t.deleted_at FROM \"posts\" AS t \
             WHERE t.deleted_at IS NULL \
             AND json_extract(t.attributes, '$.\"status\"') = ?1 \
             AND json_extract(t.attributes, '$.\"author_id\"') IS NULL \
             ORDER BY json_extract(t.attributes, '$.\"title\"') DESC, t.id ASC \
             LIMIT 10 OFFSET 20"
        );
        assert_eq!(statement.params, vec![SqlValue::Text("published".into())]);
    }

    #[test]
    fn test_select_offset_without_limit() {
        let statement = select(&posts(), &Query::new().offset(5).with_trashed()).unwrap();
        assert!(statement.sql.ends_with("ORDER BY t.id ASC LIMIT -1 OFFSET 5"));
        assert!(!statement.sql.contains("WHERE"));
    }

    #[test]
    fn test_select_clamps_window_to_signed_range() {
        let query = Query::new().limit(u64::MAX).offset(u64::MAX).with_trashed();
        let statement = select(&posts(), &query).unwrap();
        assert!(statement.sql.ends_with(&format!(
            "LIMIT {max} OFFSET {max}",
            max = i64::MAX
        )));
    }

    #[test]
    fn test_has_uses_exists() {
        let has_many = select(&posts(), &Query::new().has("comments")).unwrap();
        assert!(has_many.sql.contains(
            "EXISTS (SELECT 1 FROM \"comments\" AS r WHERE r.deleted_at IS NULL \
             AND json_extract(r.attributes, '$.\"post_id\"') = t.id)"
        ));

        let belongs_to = count(&posts(), &Query::new().has("author")).unwrap();
        assert!(belongs_to
            .sql
            .contains("r.id = json_extract(t.attributes, '$.\"author_id\"')"));

        assert!(select(&posts(), &Query::new().has("likes")).is_err());
    }

    #[test]
    fn test_count_ignores_columns() {
        let query = Query::new().columns(Columns::only(["id"])).filter("id", 3);
        let statement = count(&posts(), &query).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) FROM \"posts\" AS t WHERE t.deleted_at IS NULL AND t.id = ?1"
        );
        assert_eq!(statement.params, vec![SqlValue::Integer(3)]);
    }

    #[test]
    fn test_select_related() {
        let schema = posts();
        let comments = select_related(schema.relation("comments").unwrap()).unwrap();
        assert!(comments.contains("json_extract(t.attributes, '$.\"post_id\"') IN"));

        let author = select_related(schema.relation("author").unwrap()).unwrap();
        assert!(author.contains("t.id IN (SELECT value FROM json_each(?1))"));
    }
}
