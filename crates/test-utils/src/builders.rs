#![allow(dead_code)]

use std::collections::BTreeMap;

use modaltask::config::{
    DockerOptions, NamespaceFiles, ProcessOptions, RawTaskFile, RunnerOptions, TaskParameters,
};

/// Builder for `TaskParameters` to simplify test setup.
///
/// Goes through `TaskParameters::try_from`, so every built value has passed
/// the same validation as a task file.
pub struct TaskParametersBuilder {
    raw: RawTaskFile,
}

impl TaskParametersBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawTaskFile::default(),
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.raw
            .commands
            .get_or_insert_with(Vec::new)
            .push(cmd.to_string());
        self
    }

    pub fn before_command(mut self, cmd: &str) -> Self {
        self.raw
            .before_commands
            .get_or_insert_with(Vec::new)
            .push(cmd.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.raw
            .env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn container_image(mut self, image: &str) -> Self {
        self.raw.container_image = Some(image.to_string());
        self
    }

    pub fn docker(mut self, options: DockerOptions) -> Self {
        self.raw.runner = Some(RunnerOptions::Docker(options));
        self
    }

    pub fn process(mut self) -> Self {
        self.raw.runner = Some(RunnerOptions::Process(ProcessOptions::default()));
        self
    }

    pub fn process_with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.raw.runner = Some(RunnerOptions::Process(ProcessOptions {
            timeout: Some(timeout),
        }));
        self
    }

    pub fn warning_on_stderr(mut self, val: bool) -> Self {
        self.raw.warning_on_stderr = Some(val);
        self
    }

    pub fn input_file(mut self, name: &str, content: &str) -> Self {
        self.raw
            .input_files
            .insert(name.to_string(), content.to_string());
        self
    }

    pub fn namespace_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.raw.namespace_files = Some(NamespaceFiles {
            enabled: true,
            directory: Some(dir.into()),
            ..NamespaceFiles::default()
        });
        self
    }

    pub fn output_file(mut self, name: &str) -> Self {
        self.raw.output_files.push(name.to_string());
        self
    }

    pub fn build(self) -> TaskParameters {
        TaskParameters::try_from(self.raw).expect("Failed to build valid task from builder")
    }
}

impl Default for TaskParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}
