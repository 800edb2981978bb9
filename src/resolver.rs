//! Filesystem-backed import resolution.

use lcss::import::{candidate_names, dirname, normalize_path};
use lcss::{ImportError, ImportResolver, ResolvedImport};
use std::fs;
use std::io::ErrorKind;

/// Reads `@import`ed files from disk.
///
/// Relative paths are tried against the importing file's directory first,
/// then against each search path in order. Paths without an extension also
/// try `.less`. The canonical name is the normalized path that was read.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImportResolver;

impl FileImportResolver {
    pub fn new() -> Self {
        Self
    }

    fn bases(path: &str, current_file: &str, search_paths: &[String]) -> Vec<String> {
        if path.starts_with('/') {
            return vec![String::new()];
        }
        let mut bases = vec![dirname(current_file).to_string()];
        for search in search_paths {
            if search.is_empty() || search.ends_with('/') {
                bases.push(search.clone());
            } else {
                bases.push(format!("{}/", search));
            }
        }
        bases
    }
}

impl ImportResolver for FileImportResolver {
    fn resolve(
        &self,
        path: &str,
        current_file: &str,
        search_paths: &[String],
    ) -> Result<ResolvedImport, ImportError> {
        for base in Self::bases(path, current_file, search_paths) {
            for name in candidate_names(path) {
                let candidate = normalize_path(&format!("{}{}", base, name));
                match fs::read_to_string(&candidate) {
                    Ok(contents) => {
                        log::debug!("resolved import {} to {}", path, candidate);
                        return Ok(ResolvedImport {
                            filename: candidate,
                            contents,
                        });
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(ImportError::new(path, e.to_string())),
                }
            }
        }
        Err(ImportError::not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order() {
        let search = ["lib".to_string(), "vendor/".to_string()];
        let bases = FileImportResolver::bases("a", "styles/main.less", &search);
        assert_eq!(bases, vec!["styles/", "lib/", "vendor/"]);
    }

    #[test]
    fn test_absolute_path_ignores_bases() {
        let search = ["lib".to_string()];
        let bases = FileImportResolver::bases("/x/a.less", "styles/main.less", &search);
        assert_eq!(bases, vec![""]);
    }

    #[test]
    fn test_missing_file() {
        let err = FileImportResolver
            .resolve("definitely-not-here-7f3a", "main.less", &[])
            .unwrap_err();
        assert_eq!(err.path, "definitely-not-here-7f3a");
    }
}
