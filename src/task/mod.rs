// src/task/mod.rs

//! The command execution wrapper.
//!
//! - [`commands`] assembles setup + main commands.
//! - [`request`] is the immutable value handed to a runner.
//! - [`result`] turns raw runner output into a typed result.
//! - [`facade`] orchestrates the whole run.

pub mod commands;
pub mod facade;
pub mod request;
pub mod result;

pub use facade::TaskFacade;
pub use request::{ExecutionRequest, INTERPRETER};
pub use result::{ExecutionResult, Metric, MetricKind, ResultParser, TaskResult};
