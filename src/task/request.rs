// src/task/request.rs

//! The immutable value handed to a [`Runner`](crate::exec::Runner).

use std::collections::BTreeMap;

use crate::config::model::FilesManifest;
use crate::config::resolve::EffectiveConfig;

/// Shell used to run every assembled command. Not configurable.
pub const INTERPRETER: [&str; 2] = ["/bin/sh", "-c"];

/// Everything a runner needs for one execution.
///
/// Owned by a single run and never reused; all fields are read-only after
/// [`ExecutionRequest::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    config: EffectiveConfig,
    command_sequence: Vec<String>,
    env: BTreeMap<String, String>,
    files: FilesManifest,
    warning_on_stderr: bool,
}

impl ExecutionRequest {
    /// Bundle resolved config, built commands, environment and file
    /// declarations. `env` of `None` becomes an empty mapping.
    pub fn assemble(
        config: EffectiveConfig,
        command_sequence: Vec<String>,
        env: Option<BTreeMap<String, String>>,
        files: FilesManifest,
        warning_on_stderr: bool,
    ) -> Self {
        Self {
            config,
            command_sequence,
            env: env.unwrap_or_default(),
            files,
            warning_on_stderr,
        }
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn interpreter(&self) -> [&'static str; 2] {
        INTERPRETER
    }

    pub fn command_sequence(&self) -> &[String] {
        &self.command_sequence
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn files(&self) -> &FilesManifest {
        &self.files
    }

    pub fn warning_on_stderr(&self) -> bool {
        self.warning_on_stderr
    }

    /// The command sequence as one shell script, one statement per line.
    pub fn script(&self) -> String {
        self.command_sequence.join("\n")
    }

    /// Full argv: interpreter followed by the script.
    pub fn invocation(&self) -> Vec<String> {
        INTERPRETER
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(self.script()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ProcessOptions;

    #[test]
    fn missing_env_becomes_empty_map() {
        let req = ExecutionRequest::assemble(
            EffectiveConfig::Process(ProcessOptions::default()),
            vec!["echo hi".to_string()],
            None,
            FilesManifest::default(),
            true,
        );
        assert!(req.env().is_empty());
        assert_eq!(req.interpreter(), ["/bin/sh", "-c"]);
    }

    #[test]
    fn invocation_joins_commands_with_newlines() {
        let req = ExecutionRequest::assemble(
            EffectiveConfig::Process(ProcessOptions::default()),
            vec!["cd sub".to_string(), "echo a | tr a b".to_string()],
            None,
            FilesManifest::default(),
            true,
        );
        assert_eq!(
            req.invocation(),
            vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "cd sub\necho a | tr a b".to_string()
            ]
        );
    }
}
