// src/staging/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::NamespaceFiles;
use crate::fs::FileSystem;

/// Compiled include/exclude patterns for namespace files.
///
/// Patterns are relative to the namespace directory; [`matches`] receives
/// relative paths with forward slashes (e.g. `"scripts/gpu.py"`).
///
/// [`matches`]: FileSelector::matches
#[derive(Clone)]
pub struct FileSelector {
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for FileSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSelector")
            .field("has_include", &self.include_set.is_some())
            .field("has_exclude", &self.exclude_set.is_some())
            .finish()
    }
}

impl FileSelector {
    /// Empty `include` selects every file.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(build_globset(include).context("building include globset")?)
        };
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };
        Ok(Self {
            include_set,
            exclude_set,
        })
    }

    pub fn from_config(ns: &NamespaceFiles) -> Result<Self> {
        Self::new(&ns.include, &ns.exclude)
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if let Some(include) = &self.include_set {
            if !include.is_match(rel_path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` selected by `selector`, as
/// `(absolute path, relative path)` pairs sorted by relative path.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    selector: &FileSelector,
) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if selector.matches(&rel_str) {
                        files.push((path, rel_str));
                    }
                }
            }
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}
