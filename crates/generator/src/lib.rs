//! Scaffolding for repocache repositories.
//!
//! Given an entity name, renders a contract trait, a direct implementation
//! and a cache decorator into the directory of a module namespace.

pub mod cli;
pub mod error;
pub mod names;
pub mod naming;
mod templates;
pub mod writer;

use std::path::PathBuf;

pub use cli::Cli;
pub use error::{GeneratorError, Result};
pub use names::Names;

/// Renders and writes every file for `cli`, returning the written paths.
pub fn generate(cli: &Cli) -> Result<Vec<PathBuf>> {
    let names = cli.names()?;
    tracing::debug!(
        entity = %names.entity,
        namespace = %names.namespace,
        repository = %names.repository,
        decorator = %names.decorator,
        "Generating repository"
    );

    let files = writer::plan(&names, &cli.root)?;
    for file in &files {
        writer::write(file)?;
    }
    Ok(files.into_iter().map(|file| file.path).collect())
}
