// src/exec/mod.rs

//! Execution backends.
//!
//! This module is responsible for actually running an assembled
//! [`ExecutionRequest`](crate::task::ExecutionRequest) using
//! `tokio::process::Command` and returning the raw
//! [`ExecutionResult`](crate::task::ExecutionResult).
//!
//! - [`backend`] provides the `Runner` trait, the cancellation signal and the
//!   dispatching `SystemRunner` used in production; tests replace it with a
//!   fake implementation.
//! - [`child`] drives a spawned process: output capture, timeout, cancel.
//! - [`process`] runs the commands directly on the host.
//! - [`docker`] runs the commands inside a container image.

pub mod backend;
pub mod child;
pub mod docker;
pub mod process;

pub use backend::{CancellationToken, RunFuture, Runner, SystemRunner};
pub use docker::DockerRunner;
pub use process::ProcessRunner;
