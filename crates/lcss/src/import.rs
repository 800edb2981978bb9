//! The import collaborator.
//!
//! The compiler never touches the filesystem. Every `@import` of a Less file
//! is handed to an [`ImportResolver`], which returns the source text and a
//! canonical file name. The canonical name is what `(once)` deduplicates on.

use crate::error::ImportError;
use std::collections::HashMap;

/// Source text returned by a resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedImport {
    /// Canonical identity of the file, e.g. a normalized path.
    pub filename: String,
    pub contents: String,
}

/// Resolves `@import` paths to source text.
pub trait ImportResolver {
    /// Resolves `path` as written in `current_file`, trying `search_paths`
    /// after the importing file's own directory.
    fn resolve(
        &self,
        path: &str,
        current_file: &str,
        search_paths: &[String],
    ) -> Result<ResolvedImport, ImportError>;
}

/// A resolver that knows no files.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&self, path: &str, _: &str, _: &[String]) -> Result<ResolvedImport, ImportError> {
        Err(ImportError::not_found(path))
    }
}

/// Resolves imports against an in-memory file map.
///
/// ```
/// use lcss::{Compiler, CompileOptions, MemoryImportResolver};
///
/// let resolver = MemoryImportResolver::new().with_file("vars.less", "@c: red;");
/// let compiler = Compiler::new(CompileOptions::default()).with_resolver(Box::new(resolver));
/// let output = compiler.compile("@import \"vars\";\n.a { color: @c; }").unwrap();
/// assert_eq!(output.css, ".a {\n  color: red;\n}\n");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryImportResolver {
    files: HashMap<String, String>,
}

impl MemoryImportResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(normalize_path(&name.into()), contents.into());
    }

    fn lookup(&self, candidate: &str) -> Option<ResolvedImport> {
        let candidate = normalize_path(candidate);
        self.files.get(&candidate).map(|contents| ResolvedImport {
            filename: candidate.clone(),
            contents: contents.clone(),
        })
    }
}

impl ImportResolver for MemoryImportResolver {
    fn resolve(
        &self,
        path: &str,
        current_file: &str,
        search_paths: &[String],
    ) -> Result<ResolvedImport, ImportError> {
        let bases = std::iter::once(dirname(current_file).to_string())
            .chain(search_paths.iter().map(|p| with_trailing_slash(p)));
        for base in bases {
            for name in candidate_names(path) {
                if let Some(found) = self.lookup(&format!("{}{}", base, name)) {
                    return Ok(found);
                }
            }
        }
        Err(ImportError::not_found(path))
    }
}

/// `path`, then `path.less` when it has no extension.
pub fn candidate_names(path: &str) -> Vec<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    if file_name.contains('.') {
        vec![path.to_string()]
    } else {
        vec![path.to_string(), format!("{}.less", path)]
    }
}

/// Directory part of a `/`-separated path, including the trailing slash.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Resolves `.` and `..` segments without touching the filesystem.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a/./b/../c.less"), "a/c.less");
        assert_eq!(normalize_path("../x/y"), "../x/y");
        assert_eq!(normalize_path("/a/../b"), "/b");
    }

    #[test]
    fn test_memory_resolver_appends_extension() {
        let resolver = MemoryImportResolver::new().with_file("lib/mixins.less", ".m {}");
        let found = resolver.resolve("mixins", "lib/main.less", &[]).unwrap();
        assert_eq!(found.filename, "lib/mixins.less");
    }

    #[test]
    fn test_memory_resolver_search_paths() {
        let resolver = MemoryImportResolver::new().with_file("vendor/grid.less", "");
        assert!(resolver.resolve("grid", "main.less", &[]).is_err());
        let found = resolver
            .resolve("grid.less", "main.less", &["vendor".to_string()])
            .unwrap();
        assert_eq!(found.filename, "vendor/grid.less");
    }

    #[test]
    fn test_relative_to_importing_file() {
        let resolver = MemoryImportResolver::new().with_file("a/c.less", "");
        let found = resolver.resolve("../c", "a/b/main.less", &[]).unwrap();
        assert_eq!(found.filename, "a/c.less");
    }

    #[test]
    fn test_no_imports() {
        let err = NoImports.resolve("x.less", "main.less", &[]).unwrap_err();
        assert_eq!(err.path, "x.less");
    }
}
