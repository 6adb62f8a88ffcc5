//! Placeholder values derived from the command line.

use crate::error::{GeneratorError, Result};
use crate::naming::{is_identifier, namespace_segments, pascal_case, snake_case};

pub const DEFAULT_NAMESPACE: &str = "crate::repositories";

/// Module holding entity types when `--entity-path` is not given.
pub const DEFAULT_ENTITY_MODULE: &str = "crate::models";

/// Every name substituted into the templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Names {
    /// Lower-cased entity name, e.g. `post`.
    pub entity: String,
    /// Entity type name, e.g. `Post`.
    pub entity_type: String,
    /// Full path of the entity type, e.g. `crate::models::Post`.
    pub entity_path: String,
    pub namespace: String,
    pub repository: String,
    /// Module (file stem) of the contract, e.g. `post_repository`.
    pub repository_module: String,
    pub decorator: String,
    pub decorator_module: String,
}

impl Names {
    pub fn resolve(
        entity: &str,
        namespace: Option<&str>,
        repository: Option<&str>,
        decorator: Option<&str>,
        entity_path: Option<&str>,
    ) -> Result<Self> {
        let entity = entity.trim().to_lowercase();
        if !is_identifier(&entity) || pascal_case(&entity).is_empty() {
            return Err(GeneratorError::InvalidEntity(entity));
        }

        let namespace = namespace.unwrap_or(DEFAULT_NAMESPACE).to_string();
        namespace_segments(&namespace)?;

        let (entity_type, entity_path) = match entity_path {
            Some(path) => {
                let segments = namespace_segments(path)
                    .map_err(|_| GeneratorError::InvalidEntity(path.to_string()))?;
                let entity_type = segments.last().copied().unwrap_or_default().to_string();
                (entity_type, path.to_string())
            }
            None => {
                let entity_type = pascal_case(&entity);
                let path = format!("{DEFAULT_ENTITY_MODULE}::{entity_type}");
                (entity_type, path)
            }
        };

        let base = pascal_case(&entity);
        let repository = identifier(
            "repository",
            repository.map_or_else(|| format!("{base}Repository"), str::to_string),
        )?;
        let decorator = identifier(
            "decorator",
            decorator.map_or_else(|| format!("{base}Decorator"), str::to_string),
        )?;

        Ok(Self {
            repository_module: snake_case(&repository),
            decorator_module: snake_case(&decorator),
            entity,
            entity_type,
            entity_path,
            namespace,
            repository,
            decorator,
        })
    }
}

fn identifier(kind: &'static str, name: String) -> Result<String> {
    if is_identifier(&name) {
        Ok(name)
    } else {
        Err(GeneratorError::InvalidName { kind, name })
    }
}
