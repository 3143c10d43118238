// src/resolve.rs

//! Resolution of tracked-item identifiers to filesystem locations.

use std::path::PathBuf;

use tracing::debug;

/// A successfully resolved tracked item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Canonical identifier, unique within the registry.
    pub name: String,
    /// Directory to watch recursively.
    pub root: PathBuf,
}

/// Maps an identifier to a watchable directory, or reports "not found".
pub trait Resolver: Send + Sync {
    fn resolve(&self, ident: &str) -> Option<ResolvedItem>;
}

/// Resolver that looks for a directory named after the identifier under a
/// list of search roots, first hit wins.
#[derive(Debug, Clone)]
pub struct DirResolver {
    roots: Vec<PathBuf>,
}

impl DirResolver {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }
}

impl Resolver for DirResolver {
    fn resolve(&self, ident: &str) -> Option<ResolvedItem> {
        for root in &self.roots {
            let candidate = root.join(ident);
            if candidate.is_dir() {
                debug!(item = %ident, path = ?candidate, "resolved item");
                return Some(ResolvedItem {
                    name: ident.to_string(),
                    root: candidate,
                });
            }
        }
        debug!(item = %ident, "item not found under any search root");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_directory_under_first_matching_root() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::create_dir(b.path().join("foo")).unwrap();

        let resolver = DirResolver::new([a.path(), b.path()]);
        let resolved = resolver.resolve("foo").unwrap();
        assert_eq!(resolved.name, "foo");
        assert_eq!(resolved.root, b.path().join("foo"));
    }

    #[test]
    fn plain_files_do_not_resolve() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo"), "not a dir").unwrap();

        let resolver = DirResolver::new([dir.path()]);
        assert!(resolver.resolve("foo").is_none());
    }

    #[test]
    fn unknown_identifier_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirResolver::new([dir.path()]);
        assert!(resolver.resolve("missing").is_none());
    }
}
