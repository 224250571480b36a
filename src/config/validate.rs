// src/config/validate.rs

use std::path::{Component, Path};

use tracing::warn;

use crate::config::model::{RawTaskFile, RunnerOptions, TaskParameters};
use crate::errors::{Result, TaskError};

/// File names that can never denote a produced output file.
pub const RESERVED_OUTPUT_NAMES: &[&str] = &["", ".", ".."];

impl TryFrom<RawTaskFile> for TaskParameters {
    type Error = TaskError;

    fn try_from(raw: RawTaskFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_task(&raw)?;
        let runner = effective_runner_options(&raw)?;
        if runner.as_ref().is_some_and(|r| !r.is_container()) && raw.container_image.is_some() {
            warn!("`container_image` is set but the process runner ignores it");
        }
        Ok(TaskParameters::new_unchecked(raw, runner))
    }
}

fn validate_raw_task(raw: &RawTaskFile) -> Result<()> {
    ensure_has_commands(raw)?;
    validate_namespace_files(raw)?;

    for name in raw.input_files.keys() {
        validate_relative_path("input_files", name)?;
    }
    for name in raw.output_files.iter() {
        validate_output_name(name)?;
    }
    Ok(())
}

fn ensure_has_commands(raw: &RawTaskFile) -> Result<()> {
    match raw.commands.as_deref() {
        None => Err(TaskError::ConfigError(
            "task must declare `commands`".to_string(),
        )),
        Some([]) => Err(TaskError::ConfigError(
            "`commands` must contain at least one command".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

fn validate_namespace_files(raw: &RawTaskFile) -> Result<()> {
    if let Some(ns) = &raw.namespace_files {
        if ns.enabled && ns.directory.is_none() {
            return Err(TaskError::ConfigError(
                "[namespace_files] is enabled but has no `directory`".to_string(),
            ));
        }
    }
    Ok(())
}

/// Pick the runner options, folding the deprecated `[docker]` section into
/// `[runner]`.
fn effective_runner_options(raw: &RawTaskFile) -> Result<Option<RunnerOptions>> {
    match (&raw.runner, &raw.docker) {
        (Some(_), Some(_)) => Err(TaskError::ConfigError(
            "`[runner]` and the deprecated `[docker]` section cannot both be set".to_string(),
        )),
        (None, Some(docker)) => {
            warn!("`[docker]` is deprecated; use `[runner]` with type = \"docker\"");
            Ok(Some(RunnerOptions::Docker(docker.clone())))
        }
        (runner, None) => Ok(runner.clone()),
    }
}

/// Check that a declared output file name is a usable relative path.
pub fn validate_output_name(name: &str) -> Result<()> {
    if RESERVED_OUTPUT_NAMES.contains(&name) || name.ends_with('/') {
        return Err(TaskError::ConfigError(format!(
            "output_files entry '{}' is a reserved name",
            name
        )));
    }
    validate_relative_path("output_files", name)
}

/// Reject absolute paths and parent-directory components.
pub fn validate_relative_path(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TaskError::ConfigError(format!(
            "{} contains an empty file name",
            field
        )));
    }

    let path = Path::new(name);
    if path.is_absolute() || name.starts_with('/') {
        return Err(TaskError::ConfigError(format!(
            "{} entry '{}' must be a relative path",
            field, name
        )));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(TaskError::ConfigError(format!(
            "{} entry '{}' must not leave the working directory",
            field, name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::DockerOptions;

    fn raw_with_commands(commands: &[&str]) -> RawTaskFile {
        RawTaskFile {
            commands: Some(commands.iter().map(|c| c.to_string()).collect()),
            ..RawTaskFile::default()
        }
    }

    #[test]
    fn missing_commands_is_config_error() {
        let err = TaskParameters::try_from(RawTaskFile::default()).unwrap_err();
        assert!(matches!(err, TaskError::ConfigError(msg) if msg.contains("commands")));
    }

    #[test]
    fn empty_commands_is_config_error() {
        let err = TaskParameters::try_from(raw_with_commands(&[])).unwrap_err();
        assert!(matches!(err, TaskError::ConfigError(_)));
    }

    #[test]
    fn defaults_are_applied() {
        let params = TaskParameters::try_from(raw_with_commands(&["echo hi"])).unwrap();
        assert_eq!(params.commands, vec!["echo hi".to_string()]);
        assert!(params.env.is_empty());
        assert!(params.warning_on_stderr);
        assert!(params.runner.is_none());
        assert!(params.before_commands.is_none());
    }

    #[test]
    fn deprecated_docker_section_becomes_runner() {
        let mut raw = raw_with_commands(&["echo hi"]);
        raw.docker = Some(DockerOptions {
            image: Some("alpine:3".to_string()),
            ..DockerOptions::default()
        });

        let params = TaskParameters::try_from(raw).unwrap();
        match params.runner {
            Some(RunnerOptions::Docker(opts)) => {
                assert_eq!(opts.image.as_deref(), Some("alpine:3"))
            }
            other => panic!("expected docker runner, got {:?}", other),
        }
    }

    #[test]
    fn runner_and_docker_together_are_rejected() {
        let mut raw = raw_with_commands(&["echo hi"]);
        raw.docker = Some(DockerOptions::default());
        raw.runner = Some(RunnerOptions::Docker(DockerOptions::default()));
        assert!(TaskParameters::try_from(raw).is_err());
    }

    #[test]
    fn output_names_must_be_relative_and_not_reserved() {
        assert!(validate_output_name("result.json").is_ok());
        assert!(validate_output_name("out/result.json").is_ok());
        assert!(validate_output_name("/etc/passwd").is_err());
        assert!(validate_output_name("../escape.txt").is_err());
        assert!(validate_output_name(".").is_err());
        assert!(validate_output_name("dir/").is_err());
        assert!(validate_output_name("").is_err());
    }

    #[test]
    fn input_file_names_are_checked() {
        let mut raw = raw_with_commands(&["echo hi"]);
        raw.input_files
            .insert("../hello.py".to_string(), "print(1)".to_string());
        assert!(TaskParameters::try_from(raw).is_err());
    }

    #[test]
    fn container_image_with_process_runner_is_accepted() {
        let mut raw = raw_with_commands(&["echo hi"]);
        raw.runner = Some(RunnerOptions::Process(Default::default()));
        raw.container_image = Some("python:3.12".to_string());
        let params = TaskParameters::try_from(raw).unwrap();
        assert!(!params.runner.as_ref().is_some_and(|r| r.is_container()));
        assert_eq!(params.container_image.as_deref(), Some("python:3.12"));
    }
}
