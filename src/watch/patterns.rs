// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled glob patterns deciding whether a changed file is relevant.
///
/// Patterns without a path separator are matched against the file's base
/// name only (`*.py` matches `src/deep/mod.py`). Patterns containing `/`
/// are matched against the whole path relative to the watched root
/// (`src/*.py` matches `src/mod.py` but not `src/deep/mod.py`).
///
/// An empty pattern list compiles to the single pattern `*`: it matches
/// every file, never nothing.
#[derive(Clone)]
pub struct PatternSet {
    name_set: GlobSet,
    path_set: Option<GlobSet>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("has_path_patterns", &self.path_set.is_some())
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    /// Compile a pattern list. Invalid globs fail compilation with the
    /// offending pattern named in the error.
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut name_patterns: Vec<&str> = Vec::new();
        let mut path_patterns: Vec<&str> = Vec::new();

        for pat in patterns {
            if pat.contains('/') {
                path_patterns.push(pat);
            } else {
                name_patterns.push(pat);
            }
        }

        // No patterns at all means "match everything".
        if name_patterns.is_empty() && path_patterns.is_empty() {
            name_patterns.push("*");
        }

        let name_set = build_globset(&name_patterns)?;
        let path_set = if path_patterns.is_empty() {
            None
        } else {
            Some(build_globset(&path_patterns)?)
        };

        Ok(Self { name_set, path_set })
    }

    /// Returns true if the path (relative to the watched root, forward
    /// slashes) is relevant to this pattern set.
    pub fn matches(&self, rel_path: &str) -> bool {
        let base = Path::new(rel_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.to_string());

        if self.name_set.is_match(&base) {
            return true;
        }
        if let Some(path_set) = &self.path_set {
            if path_set.is_match(rel_path) {
                return true;
            }
        }
        false
    }
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob =
            Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
