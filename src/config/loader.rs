// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawTaskFile, TaskParameters};
use crate::errors::Result;

/// Load a task file from a given path and return the raw `RawTaskFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTaskFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_task_file(&contents)
}

/// Deserialize a task file from TOML text.
pub fn parse_task_file(contents: &str) -> Result<RawTaskFile> {
    let raw: RawTaskFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a task file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (`serde` defaults + `TaskParameters` construction).
/// - Checks `commands`, file declarations and runner sections.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<TaskParameters> {
    let raw = load_from_path(&path)?;
    TaskParameters::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RunnerOptions;
    use crate::types::PullPolicy;
    use std::time::Duration;

    #[test]
    fn parses_full_task_file() {
        let raw = parse_task_file(
            r#"
before_commands = ["pip install -q modal"]
commands = ["modal run hello.py"]
output_files = ["result.json"]

[env]
MODAL_TOKEN_ID = "{{ env.MODAL_TOKEN_ID }}"

[runner]
type = "docker"
image = "python:3.12-slim"
pull_policy = "always"
timeout = "10m"

[input_files]
"hello.py" = "print('hello')"
"#,
        )
        .unwrap();

        let params = TaskParameters::try_from(raw).unwrap();
        assert_eq!(params.commands, vec!["modal run hello.py".to_string()]);
        assert_eq!(
            params.before_commands,
            Some(vec!["pip install -q modal".to_string()])
        );
        assert_eq!(params.files.output_files, vec!["result.json".to_string()]);
        assert!(params.files.input_files.contains_key("hello.py"));

        match params.runner {
            Some(RunnerOptions::Docker(opts)) => {
                assert_eq!(opts.image.as_deref(), Some("python:3.12-slim"));
                assert_eq!(opts.pull_policy, Some(PullPolicy::Always));
                assert_eq!(opts.timeout, Some(Duration::from_secs(600)));
            }
            other => panic!("expected docker runner, got {:?}", other),
        }
    }

    #[test]
    fn parses_process_runner() {
        let raw = parse_task_file(
            r#"
commands = ["echo hi"]

[runner]
type = "process"
"#,
        )
        .unwrap();
        assert!(matches!(raw.runner, Some(RunnerOptions::Process(_))));
    }

    #[test]
    fn malformed_runner_options_are_rejected() {
        let err = parse_task_file(
            r#"
commands = ["echo hi"]

[runner]
type = "kubernetes"
"#,
        );
        assert!(err.is_err());

        let err = parse_task_file(
            r#"
commands = ["echo hi"]

[runner]
type = "docker"
timeout = "ten minutes"
"#,
        );
        assert!(err.is_err());
    }
}
