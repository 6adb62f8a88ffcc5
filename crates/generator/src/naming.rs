//! Identifier casing and namespace-to-path mapping.

use std::path::{Path, PathBuf};

use crate::error::{GeneratorError, Result};

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `blog_post` → `BlogPost`, `post` → `Post`.
pub fn pascal_case(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `PostRepository` → `post_repository`, `HTTPCache` → `http_cache`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits a `::`-separated module path into validated segments.
pub fn namespace_segments(namespace: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = namespace.split("::").collect();
    if segments.iter().all(|segment| is_identifier(segment)) {
        Ok(segments)
    } else {
        Err(GeneratorError::InvalidNamespace(namespace.to_string()))
    }
}

/// Directory a namespace lives in under `root`.
///
/// A leading `crate` segment maps to `src`; the other segments map to nested
/// directories of the same name.
pub fn namespace_dir(root: &Path, namespace: &str) -> Result<PathBuf> {
    let mut dir = root.to_path_buf();
    for (i, segment) in namespace_segments(namespace)?.into_iter().enumerate() {
        if i == 0 && segment == "crate" {
            dir.push("src");
        } else {
            dir.push(segment);
        }
    }
    Ok(dir)
}
