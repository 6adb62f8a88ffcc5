use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::names::{Names, DEFAULT_NAMESPACE};

/// Generate a repository contract, its direct implementation and its cache
/// decorator for an entity.
#[derive(Debug, Parser)]
#[command(name = "repocache-gen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Entity name, e.g. `post` or `blog_post`
    pub entity: String,

    /// Module path to create the repository in
    #[arg(long, short = 's', default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Contract name [default: {Entity}Repository]
    #[arg(long, short = 'r')]
    pub repository: Option<String>,

    /// Cache decorator name [default: {Entity}Decorator]
    #[arg(long, short = 'd')]
    pub decorator: Option<String>,

    /// Path of the entity type [default: crate::models::{Entity}]
    #[arg(long)]
    pub entity_path: Option<String>,

    /// Crate root the namespace is resolved against
    #[arg(long, default_value = ".", env = "REPOCACHE_GEN_ROOT")]
    pub root: PathBuf,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    pub fn names(&self) -> Result<Names> {
        Names::resolve(
            &self.entity,
            Some(&self.namespace),
            self.repository.as_deref(),
            self.decorator.as_deref(),
            self.entity_path.as_deref(),
        )
    }
}
