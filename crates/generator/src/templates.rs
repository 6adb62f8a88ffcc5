//! Askama templates for the three generated files.
//!
//! Templates live in `templates/` and render Rust source, so escaping is off.

use askama::Template;

use crate::error::{GeneratorError, Result};
use crate::names::Names;

#[derive(Template)]
#[template(path = "contract.rs.txt", escape = "none")]
struct ContractTemplate<'a> {
    namespace: &'a str,
    entity: &'a str,
    entity_type: &'a str,
    entity_path: &'a str,
    repository: &'a str,
    repository_module: &'a str,
}

#[derive(Template)]
#[template(path = "direct.rs.txt", escape = "none")]
struct DirectTemplate<'a> {
    namespace: &'a str,
    entity_type: &'a str,
    entity_path: &'a str,
    repository: &'a str,
    repository_module: &'a str,
}

#[derive(Template)]
#[template(path = "cache.rs.txt", escape = "none")]
struct CacheTemplate<'a> {
    namespace: &'a str,
    entity_type: &'a str,
    entity_path: &'a str,
    repository: &'a str,
    repository_module: &'a str,
    decorator: &'a str,
    decorator_module: &'a str,
}

fn render(template: &impl Template, name: &'static str) -> Result<String> {
    let mut source = template.render().map_err(|e| GeneratorError::Render {
        template: name,
        message: e.to_string(),
    })?;
    if !source.ends_with('\n') {
        source.push('\n');
    }
    Ok(source)
}

/// Source of the contract trait.
pub fn contract(names: &Names) -> Result<String> {
    let template = ContractTemplate {
        namespace: &names.namespace,
        entity: &names.entity,
        entity_type: &names.entity_type,
        entity_path: &names.entity_path,
        repository: &names.repository,
        repository_module: &names.repository_module,
    };
    render(&template, "contract")
}

/// Source of the direct implementation.
pub fn direct(names: &Names) -> Result<String> {
    let template = DirectTemplate {
        namespace: &names.namespace,
        entity_type: &names.entity_type,
        entity_path: &names.entity_path,
        repository: &names.repository,
        repository_module: &names.repository_module,
    };
    render(&template, "direct")
}

/// Source of the cache decorator.
pub fn cache(names: &Names) -> Result<String> {
    let template = CacheTemplate {
        namespace: &names.namespace,
        entity_type: &names.entity_type,
        entity_path: &names.entity_path,
        repository: &names.repository,
        repository_module: &names.repository_module,
        decorator: &names.decorator,
        decorator_module: &names.decorator_module,
    };
    render(&template, "cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Names {
        Names::resolve("Post", None, None, None, None).unwrap()
    }

    #[test]
    fn test_contract() {
        let source = contract(&names()).unwrap();

        assert!(source.starts_with("//! Repository contract for `post` entities."));
        assert!(source.contains("use crate::models::Post;"));
        assert!(source.contains("pub trait PostRepository: Repository<Post> {}"));
        assert!(source.ends_with('\n'));
    }

    #[test]
    fn test_headers_name_module_declarations() {
        let names = names();

        let contract = contract(&names).unwrap();
        assert!(contract.contains("//! Declare it in `crate::repositories` next to"));
        assert!(contract.contains("//! pub mod post_repository;\n//! pub mod direct;\n//! pub mod cache;"));

        let direct = direct(&names).unwrap();
        assert!(direct.contains(
            "//! Declare it in `crate::repositories::direct` with\n//! `pub mod direct_post_repository;`."
        ));

        let cache = cache(&names).unwrap();
        assert!(cache.contains(
            "//! Declare it in `crate::repositories::cache` with\n//! `pub mod cache_post_decorator;`."
        ));
    }

    #[test]
    fn test_direct() {
        let source = direct(&names()).unwrap();

        assert!(source.contains("use crate::repositories::post_repository::PostRepository;"));
        assert!(source.contains("pub struct DirectPostRepository {"));
        assert!(source.contains("inner: DirectRepository<Post>,"));
        assert!(source.contains("delegate_repository!(DirectPostRepository => Post, inner);"));
        assert!(source.contains("impl PostRepository for DirectPostRepository {}"));
    }

    #[test]
    fn test_cache() {
        let source = cache(&names()).unwrap();

        assert!(source.contains(
            "use crate::repositories::direct::direct_post_repository::DirectPostRepository;"
        ));
        assert!(source.contains("inner: CachedRepository<Post, dyn PostRepository>,"));
        assert!(source.contains("delegate_repository!(PostDecorator => Post, inner);"));
        assert!(source.contains("builder.bind_contract::<dyn PostRepository, Post, _>(|wiring| {"));
        assert!(source.contains("Arc::new(PostDecorator::new(wiring.cached(direct)))"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn test_overrides_are_substituted() {
        let names = Names::resolve(
            "blog_post",
            Some("app::data"),
            Some("Articles"),
            Some("ArticleCache"),
            Some("app::entities::Article"),
        )
        .unwrap();

        let source = cache(&names).unwrap();
        assert!(source.contains("use app::entities::Article;"));
        assert!(source.contains("use app::data::articles::Articles;"));
        assert!(source.contains("pub struct ArticleCache {"));
        assert!(source.contains("CachedRepository<Article, dyn Articles>"));
    }
}
