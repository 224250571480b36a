// src/config/resolve.rs

//! Effective runtime configuration.
//!
//! Merges the caller's partially-specified runner options with built-in
//! defaults. Precedence for the container image is:
//!
//! 1. `container_image` override (container runners only)
//! 2. `runner.image`
//! 3. the default image
//!
//! Resolution is pure and idempotent: feeding an `EffectiveConfig` back in
//! through [`RunnerOptions::from`] yields the same configuration.

use std::time::Duration;

use tracing::debug;

use crate::config::model::{DockerOptions, ProcessOptions, RunnerOptions};
use crate::types::PullPolicy;

/// Image used when neither `container_image` nor `runner.image` is set.
pub const DEFAULT_IMAGE: &str = "ghcr.io/kestra-io/modal";

/// Container CLI used when `runner.binary` is unset.
pub const DEFAULT_CONTAINER_BINARY: &str = "docker";

/// Fully resolved configuration handed to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveConfig {
    Container(ContainerConfig),
    Process(ProcessOptions),
}

impl EffectiveConfig {
    /// Resolved image, if the runner is container-based.
    pub fn image(&self) -> Option<&str> {
        match self {
            EffectiveConfig::Container(c) => Some(&c.image),
            EffectiveConfig::Process(_) => None,
        }
    }

    /// Resolved entrypoint, if the runner is container-based.
    pub fn entry_point(&self) -> Option<&[String]> {
        match self {
            EffectiveConfig::Container(c) => Some(&c.entry_point),
            EffectiveConfig::Process(_) => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self {
            EffectiveConfig::Container(c) => c.timeout,
            EffectiveConfig::Process(p) => p.timeout,
        }
    }
}

/// Container runner configuration with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    pub image: String,
    /// Never empty: `[""]` explicitly clears the image's own entrypoint.
    pub entry_point: Vec<String>,
    pub pull_policy: PullPolicy,
    pub user: Option<String>,
    pub network_mode: Option<String>,
    pub volumes: Vec<String>,
    pub memory: Option<String>,
    pub cpus: Option<String>,
    pub binary: String,
    pub timeout: Option<Duration>,
}

/// Resolve the effective configuration.
///
/// No runner options at all selects the container runner with every default
/// applied. `container_image` is ignored for non-container runners. Blank
/// strings count as unset.
pub fn resolve(
    options: Option<&RunnerOptions>,
    container_image: Option<&str>,
    default_image: &str,
) -> EffectiveConfig {
    match options {
        None => EffectiveConfig::Container(resolve_container(
            &DockerOptions::default(),
            container_image,
            default_image,
        )),
        Some(RunnerOptions::Docker(docker)) => {
            EffectiveConfig::Container(resolve_container(docker, container_image, default_image))
        }
        Some(RunnerOptions::Process(process)) => {
            if non_blank(container_image).is_some() {
                debug!("container_image is set but the process runner ignores it");
            }
            EffectiveConfig::Process(process.clone())
        }
    }
}

fn resolve_container(
    docker: &DockerOptions,
    container_image: Option<&str>,
    default_image: &str,
) -> ContainerConfig {
    let image = non_blank(container_image)
        .or_else(|| non_blank(docker.image.as_deref()))
        .unwrap_or(default_image)
        .to_string();

    let entry_point = match &docker.entry_point {
        Some(ep) if !ep.is_empty() => ep.clone(),
        _ => vec![String::new()],
    };

    ContainerConfig {
        image,
        entry_point,
        pull_policy: docker.pull_policy.unwrap_or_default(),
        user: docker.user.clone(),
        network_mode: docker.network_mode.clone(),
        volumes: docker.volumes.clone(),
        memory: docker.memory.clone(),
        cpus: docker.cpus.clone(),
        binary: non_blank(docker.binary.as_deref())
            .unwrap_or(DEFAULT_CONTAINER_BINARY)
            .to_string(),
        timeout: docker.timeout,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<&EffectiveConfig> for RunnerOptions {
    fn from(config: &EffectiveConfig) -> Self {
        match config {
            EffectiveConfig::Container(c) => RunnerOptions::Docker(DockerOptions {
                image: Some(c.image.clone()),
                entry_point: Some(c.entry_point.clone()),
                pull_policy: Some(c.pull_policy),
                user: c.user.clone(),
                network_mode: c.network_mode.clone(),
                volumes: c.volumes.clone(),
                memory: c.memory.clone(),
                cpus: c.cpus.clone(),
                binary: Some(c.binary.clone()),
                timeout: c.timeout,
            }),
            EffectiveConfig::Process(p) => RunnerOptions::Process(p.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker(image: Option<&str>, entry_point: Option<Vec<&str>>) -> RunnerOptions {
        RunnerOptions::Docker(DockerOptions {
            image: image.map(str::to_string),
            entry_point: entry_point.map(|ep| ep.into_iter().map(str::to_string).collect()),
            ..DockerOptions::default()
        })
    }

    #[test]
    fn no_options_uses_default_image_and_blank_entrypoint() {
        let cfg = resolve(None, None, DEFAULT_IMAGE);
        assert_eq!(cfg.image(), Some(DEFAULT_IMAGE));
        assert_eq!(cfg.entry_point(), Some(&[String::new()][..]));
    }

    #[test]
    fn runner_image_beats_default() {
        let opts = docker(Some("python:3.12"), None);
        let cfg = resolve(Some(&opts), None, DEFAULT_IMAGE);
        assert_eq!(cfg.image(), Some("python:3.12"));
    }

    #[test]
    fn container_image_beats_runner_image() {
        let opts = docker(Some("python:3.12"), None);
        let cfg = resolve(Some(&opts), Some("alpine:3"), DEFAULT_IMAGE);
        assert_eq!(cfg.image(), Some("alpine:3"));
    }

    #[test]
    fn blank_overrides_count_as_unset() {
        let opts = docker(Some("  "), None);
        let cfg = resolve(Some(&opts), Some(""), DEFAULT_IMAGE);
        assert_eq!(cfg.image(), Some(DEFAULT_IMAGE));
    }

    #[test]
    fn empty_entrypoint_is_replaced() {
        let opts = docker(None, Some(vec![]));
        let cfg = resolve(Some(&opts), None, DEFAULT_IMAGE);
        assert_eq!(cfg.entry_point(), Some(&[String::new()][..]));
    }

    #[test]
    fn explicit_entrypoint_is_kept() {
        let opts = docker(None, Some(vec!["tini", "--"]));
        let cfg = resolve(Some(&opts), None, DEFAULT_IMAGE);
        assert_eq!(
            cfg.entry_point(),
            Some(&["tini".to_string(), "--".to_string()][..])
        );
    }

    #[test]
    fn process_runner_ignores_container_image() {
        let opts = RunnerOptions::Process(ProcessOptions::default());
        let cfg = resolve(Some(&opts), Some("alpine:3"), DEFAULT_IMAGE);
        assert_eq!(cfg, EffectiveConfig::Process(ProcessOptions::default()));
        assert_eq!(cfg.image(), None);
    }

    #[test]
    fn resolve_is_idempotent() {
        let cases = [
            None,
            Some(docker(Some("python:3.12"), Some(vec!["bash"]))),
            Some(docker(None, Some(vec![]))),
            Some(RunnerOptions::Process(ProcessOptions::default())),
        ];

        for opts in cases.iter() {
            for override_image in [None, Some("alpine:3")] {
                let once = resolve(opts.as_ref(), override_image, DEFAULT_IMAGE);
                let again = resolve(
                    Some(&RunnerOptions::from(&once)),
                    override_image,
                    DEFAULT_IMAGE,
                );
                assert_eq!(once, again);
            }
        }
    }
}
