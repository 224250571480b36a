// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every fatal condition of a task execution maps to exactly one variant, so
//! callers can match on the kind instead of parsing messages.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    /// Invalid task configuration; execution never starts.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A template could not be rendered (unknown reference, bad syntax).
    #[error("Rendering error: {0}")]
    RenderError(String),

    /// The execution environment could not be created or started.
    #[error("Runner launch error: {0}")]
    RunnerLaunch(String),

    /// The command sequence finished with a non-zero status.
    #[error("Command sequence exited with non-zero status {0}")]
    NonZeroExit(i32),

    /// A declared output file was not produced by the run.
    #[error("Declared output file was not produced: {0}")]
    MissingOutputFile(String),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Execution timed out after {0:?}")]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskError>;
