// src/task/result.rs

//! Runner output and its parsed, typed form.
//!
//! Commands report structured values by printing marker lines:
//!
//! ```text
//! ::{"outputs":{"key":"value"}}::
//! ::{"metrics":[{"name":"rows","type":"counter","value":42}]}::
//! ```
//!
//! Every other line is plain log output and is ignored here.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, TaskError};

/// Raw result of one execution, as produced by a runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
}

/// Kind of a metric reported through a marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Timer,
}

/// A metric reported through a marker line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub value: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Typed result returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskResult {
    pub exit_code: i32,
    /// Values from `outputs` markers, in first-emission order.
    pub vars: IndexMap<String, String>,
    /// Declared output file name -> storage reference.
    pub output_files: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
}

impl TaskResult {
    /// Treat a non-zero exit as failure.
    pub fn ensure_success(self) -> Result<Self> {
        if self.exit_code != 0 {
            return Err(TaskError::NonZeroExit(self.exit_code));
        }
        Ok(self)
    }
}

/// JSON payload of a `::{...}::` marker line, if `line` is one.
fn marker_payload(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("::")
        .and_then(|rest| rest.strip_suffix("::"))
        .filter(|payload| payload.starts_with('{') && payload.ends_with('}'))
}

/// Extracts exit code, vars, metrics and output files from a raw result.
#[derive(Debug, Clone, Copy)]
pub struct ResultParser {
    scan_stderr: bool,
}

impl ResultParser {
    /// `scan_stderr` also looks for markers on stderr (warning-on-stderr
    /// mode). stdout is always scanned first.
    pub fn new(scan_stderr: bool) -> Self {
        Self { scan_stderr }
    }

    /// Parse a finished execution.
    ///
    /// `declared_outputs` are the task's `output_files`; `produced` is what
    /// the file-transfer layer actually retrieved. A declared name missing
    /// from `produced` fails the whole parse. The exit code never prevents
    /// parsing.
    ///
    /// The two streams are captured separately, so their relative timing is
    /// lost. All stdout markers are applied first and stderr markers after
    /// them: when both streams set the same key, the stderr value wins even
    /// if the stdout line was printed later.
    pub fn parse(
        &self,
        result: &ExecutionResult,
        declared_outputs: &[String],
        produced: &BTreeMap<String, String>,
    ) -> Result<TaskResult> {
        let mut vars = IndexMap::new();
        let mut metrics = Vec::new();

        let stderr: &[String] = if self.scan_stderr {
            &result.stderr_lines
        } else {
            &[]
        };
        for line in result.stdout_lines.iter().chain(stderr.iter()) {
            apply_marker(line, &mut vars, &mut metrics);
        }

        let mut output_files = BTreeMap::new();
        for name in declared_outputs {
            let reference = produced
                .get(name)
                .ok_or_else(|| TaskError::MissingOutputFile(name.clone()))?;
            output_files.insert(name.clone(), reference.clone());
        }

        Ok(TaskResult {
            exit_code: result.exit_code,
            vars,
            output_files,
            metrics,
        })
    }
}

/// Merge one line into the running vars/metrics if it is a marker.
fn apply_marker(line: &str, vars: &mut IndexMap<String, String>, metrics: &mut Vec<Metric>) {
    let Some(payload) = marker_payload(line) else {
        return;
    };

    let payload: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(line = %line, error = %e, "invalid output marker payload; treating as log line");
            return;
        }
    };

    if let Some(outputs) = payload.get("outputs").and_then(Value::as_object) {
        for (key, value) in outputs {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            debug!(key = %key, "captured output var");
            vars.insert(key.clone(), value);
        }
    }

    if let Some(entries) = payload.get("metrics").and_then(Value::as_array) {
        for entry in entries {
            match serde_json::from_value::<Metric>(entry.clone()) {
                Ok(metric) => metrics.push(metric),
                Err(e) => warn!(error = %e, "ignoring malformed metric in output marker"),
            }
        }
    }
}
