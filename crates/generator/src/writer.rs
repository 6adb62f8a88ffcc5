//! Lays out and writes the generated files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GeneratorError, Result};
use crate::names::Names;
use crate::naming::namespace_dir;
use crate::templates;

/// A rendered file and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub source: String,
}

/// Renders the contract, direct implementation and cache decorator.
///
/// With the default namespace the layout is:
///
/// ```text
/// src/repositories/post_repository.rs
/// src/repositories/direct/direct_post_repository.rs
/// src/repositories/cache/cache_post_decorator.rs
/// ```
///
/// No `mod.rs` is touched; each file's header names the `mod` line it needs.
pub fn plan(names: &Names, root: &Path) -> Result<Vec<GeneratedFile>> {
    let dir = namespace_dir(root, &names.namespace)?;

    Ok(vec![
        GeneratedFile {
            path: dir.join(format!("{}.rs", names.repository_module)),
            source: templates::contract(names)?,
        },
        GeneratedFile {
            path: dir
                .join("direct")
                .join(format!("direct_{}.rs", names.repository_module)),
            source: templates::direct(names)?,
        },
        GeneratedFile {
            path: dir
                .join("cache")
                .join(format!("cache_{}.rs", names.decorator_module)),
            source: templates::cache(names)?,
        },
    ])
}

/// Writes a file, creating parent directories. Existing files are overwritten.
pub fn write(file: &GeneratedFile) -> Result<()> {
    if let Some(parent) = file.path.parent() {
        fs::create_dir_all(parent).map_err(|e| GeneratorError::io(parent, e))?;
    }
    fs::write(&file.path, &file.source).map_err(|e| GeneratorError::io(&file.path, e))?;
    tracing::debug!(path = %file.path.display(), "Wrote file");
    Ok(())
}
