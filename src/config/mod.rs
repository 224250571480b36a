// src/config/mod.rs

//! Task configuration: loading, validation and effective-config resolution.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a task file from disk (`loader.rs`).
//! - Validate commands and file declarations (`validate.rs`).
//! - Merge runner options with built-in defaults (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod resolve;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_task_file};
pub use model::{
    DockerOptions, FilesManifest, NamespaceFiles, ProcessOptions, RawTaskFile, RunnerOptions,
    TaskParameters,
};
pub use resolve::{ContainerConfig, DEFAULT_IMAGE, EffectiveConfig, resolve};
