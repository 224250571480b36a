// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{PullPolicy, deserialize_duration};

/// Task definition as read from a TOML file.
///
/// ```toml
/// before_commands = ["pip install -q modal"]
/// commands = ["modal run hello.py"]
///
/// [env]
/// MODAL_TOKEN_ID = "{{ env.MODAL_TOKEN_ID }}"
///
/// [runner]
/// type = "docker"
/// pull_policy = "always"
///
/// [input_files]
/// "hello.py" = "print('hello')"
/// ```
///
/// Every field is optional at this level; [`TaskParameters`] is the
/// validated form the rest of the crate works with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTaskFile {
    /// Commands executed before the main list of commands.
    #[serde(default)]
    pub before_commands: Option<Vec<String>>,

    /// The commands to run. Required and non-empty.
    #[serde(default)]
    pub commands: Option<Vec<String>>,

    /// Additional environment variables for the process. Keys and values are
    /// both templates.
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,

    /// Execution backend and its options.
    #[serde(default)]
    pub runner: Option<RunnerOptions>,

    /// Deprecated: use `[runner]` with `type = "docker"`.
    #[serde(default)]
    pub docker: Option<DockerOptions>,

    /// Container image override, only used by the container runner.
    #[serde(default)]
    pub container_image: Option<String>,

    /// Log stderr at warn level and scan it for output markers. Defaults to
    /// `true`.
    #[serde(default)]
    pub warning_on_stderr: Option<bool>,

    #[serde(default)]
    pub namespace_files: Option<NamespaceFiles>,

    /// Inline files written into the working directory: name -> content.
    #[serde(default)]
    pub input_files: BTreeMap<String, String>,

    /// Files the commands promise to produce in the working directory.
    #[serde(default)]
    pub output_files: Vec<String>,
}

/// Polymorphic runner configuration, selected by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RunnerOptions {
    Docker(DockerOptions),
    Process(ProcessOptions),
}

impl RunnerOptions {
    /// Whether the runner executes inside a container image.
    pub fn is_container(&self) -> bool {
        matches!(self, RunnerOptions::Docker(_))
    }
}

/// Options for the container runner. Unset fields fall back to defaults in
/// [`crate::config::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DockerOptions {
    #[serde(default)]
    pub image: Option<String>,

    /// Image entrypoint override. Unset or empty suppresses the image's own
    /// entrypoint.
    #[serde(default)]
    pub entry_point: Option<Vec<String>>,

    #[serde(default)]
    pub pull_policy: Option<PullPolicy>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub network_mode: Option<String>,

    /// Extra `host:container` bind mounts.
    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default)]
    pub memory: Option<String>,

    #[serde(default)]
    pub cpus: Option<String>,

    /// Container CLI binary (`docker`, `podman`, ...).
    #[serde(default)]
    pub binary: Option<String>,

    #[serde(default, deserialize_with = "deserialize_duration")]
    pub timeout: Option<Duration>,
}

/// Options for the local subprocess runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProcessOptions {
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub timeout: Option<Duration>,
}

/// Files copied from a local "namespace" directory into the working
/// directory before the commands run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamespaceFiles {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Glob patterns relative to `directory`; empty means every file.
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// The three file-transfer declarations, passed through to the runner and
/// the file-transfer layer as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesManifest {
    pub input_files: BTreeMap<String, String>,
    pub namespace_files: Option<NamespaceFiles>,
    pub output_files: Vec<String>,
}

/// Validated task parameters.
///
/// Construct via `TaskParameters::try_from(raw)`, which enforces that
/// `commands` is non-empty and every declared file name is a safe relative
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskParameters {
    pub before_commands: Option<Vec<String>>,
    pub commands: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub runner: Option<RunnerOptions>,
    pub container_image: Option<String>,
    pub warning_on_stderr: bool,
    pub files: FilesManifest,
}

impl TaskParameters {
    /// Build parameters from already-validated parts without re-checking.
    pub(crate) fn new_unchecked(raw: RawTaskFile, runner: Option<RunnerOptions>) -> Self {
        Self {
            before_commands: raw.before_commands,
            commands: raw.commands.unwrap_or_default(),
            env: raw.env.unwrap_or_default(),
            runner,
            container_image: raw.container_image,
            warning_on_stderr: raw.warning_on_stderr.unwrap_or(true),
            files: FilesManifest {
                input_files: raw.input_files,
                namespace_files: raw.namespace_files,
                output_files: raw.output_files,
            },
        }
    }
}
