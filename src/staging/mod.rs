// src/staging/mod.rs

//! File transfer between the caller and the working directory.
//!
//! Before the commands run, namespace files and then inline input files are
//! written into the working directory (an input file wins over a namespace
//! file of the same name). After the run, every declared output file that
//! exists is copied into the output directory and mapped to its new path.
//! Missing outputs are simply left out of the mapping; the
//! [`ResultParser`](crate::task::ResultParser) decides that this is fatal.

pub mod patterns;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::model::FilesManifest;
use crate::errors::{Result, TaskError};
use crate::fs::{FileSystem, RealFileSystem};

pub use patterns::{FileSelector, collect_matching_files};

/// Stages inputs into, and retrieves outputs from, a working directory.
pub trait FileTransfer: Send + Sync {
    /// Materialize the manifest's input and namespace files in `workdir`.
    /// Returns the relative names that were written.
    fn stage(&self, files: &FilesManifest, workdir: &Path) -> Result<Vec<String>>;

    /// Retrieve produced output files: declared name -> storage reference.
    fn collect(&self, output_files: &[String], workdir: &Path) -> Result<BTreeMap<String, String>>;
}

/// File transfer backed by a [`FileSystem`], storing outputs under a local
/// directory.
#[derive(Debug, Clone)]
pub struct LocalFileTransfer {
    fs: Arc<dyn FileSystem>,
    output_dir: PathBuf,
}

impl LocalFileTransfer {
    pub fn new(fs: Arc<dyn FileSystem>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_dir: output_dir.into(),
        }
    }

    /// Real filesystem, outputs copied to `output_dir`.
    pub fn on_disk(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(RealFileSystem), output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn stage_namespace_files(&self, files: &FilesManifest, workdir: &Path) -> Result<Vec<String>> {
        let Some(ns) = files.namespace_files.as_ref().filter(|ns| ns.enabled) else {
            return Ok(Vec::new());
        };
        let Some(dir) = ns.directory.as_deref() else {
            return Err(TaskError::ConfigError(
                "namespace files are enabled but no directory is configured".to_string(),
            ));
        };
        if !self.fs.is_dir(dir) {
            return Err(TaskError::ConfigError(format!(
                "namespace directory {:?} does not exist",
                dir
            )));
        }

        let selector = FileSelector::from_config(ns)?;
        let mut staged = Vec::new();
        for (source, rel) in collect_matching_files(self.fs.as_ref(), dir, &selector)? {
            self.fs
                .copy(&source, &workdir.join(&rel))
                .with_context(|| format!("staging namespace file {rel}"))?;
            staged.push(rel);
        }

        debug!(count = staged.len(), directory = ?dir, "staged namespace files");
        Ok(staged)
    }
}

impl FileTransfer for LocalFileTransfer {
    fn stage(&self, files: &FilesManifest, workdir: &Path) -> Result<Vec<String>> {
        let mut staged = self.stage_namespace_files(files, workdir)?;

        for (name, content) in files.input_files.iter() {
            self.fs
                .write(&workdir.join(name), content.as_bytes())
                .with_context(|| format!("staging input file {name}"))?;
            if !staged.contains(name) {
                staged.push(name.clone());
            }
        }

        info!(count = staged.len(), workdir = ?workdir, "staged input files");
        Ok(staged)
    }

    fn collect(&self, output_files: &[String], workdir: &Path) -> Result<BTreeMap<String, String>> {
        let mut produced = BTreeMap::new();

        for name in output_files {
            let source = workdir.join(name);
            if !self.fs.is_file(&source) {
                debug!(file = %name, "declared output file not found in working directory");
                continue;
            }

            let target = self.output_dir.join(name);
            self.fs
                .copy(&source, &target)
                .with_context(|| format!("retrieving output file {name}"))?;
            produced.insert(name.clone(), target.display().to_string());
        }

        info!(count = produced.len(), "retrieved output files");
        Ok(produced)
    }
}
