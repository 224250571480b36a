// src/exec/docker.rs

//! Container runner built on the `docker` CLI (or a compatible one such as
//! `podman`).
//!
//! The staged working directory is bind-mounted at [`CONTAINER_WORKDIR`].
//! Environment values are handed to the container CLI through its own
//! environment (`--env KEY`), so they never appear on the argument list.
//!
//! Every container gets a name derived from its working directory. Killing
//! the CLI client does not stop the container, so on timeout or cancellation
//! the runner removes it by name (`<binary> rm -f <name>`).

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::resolve::{ContainerConfig, EffectiveConfig};
use crate::errors::TaskError;
use crate::task::request::{ExecutionRequest, INTERPRETER};
use crate::task::result::ExecutionResult;

use super::backend::{CancellationToken, RunFuture, Runner};
use super::child::run_child;

/// Mount point of the working directory inside the container.
pub const CONTAINER_WORKDIR: &str = "/workdir";

/// Prefix of every container name.
pub const CONTAINER_NAME_PREFIX: &str = "modaltask-";

#[derive(Debug, Clone, Default)]
pub struct DockerRunner;

impl DockerRunner {
    /// Arguments for `<binary> run ...`, excluding the binary itself.
    pub fn args(config: &ContainerConfig, request: &ExecutionRequest, workdir: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "--rm".into(),
            "--name".into(),
            Self::container_name(workdir),
            "--workdir".into(),
            CONTAINER_WORKDIR.into(),
            "--volume".into(),
            format!("{}:{}", workdir.display(), CONTAINER_WORKDIR),
            "--pull".into(),
            config.pull_policy.as_docker_flag().into(),
        ];

        let (entry, entry_rest) = match config.entry_point.split_first() {
            Some((first, rest)) => (first.as_str(), rest),
            None => ("", &[][..]),
        };
        args.push(format!("--entrypoint={entry}"));

        if let Some(user) = &config.user {
            args.extend(["--user".into(), user.clone()]);
        }
        if let Some(network) = &config.network_mode {
            args.extend(["--network".into(), network.clone()]);
        }
        if let Some(memory) = &config.memory {
            args.extend(["--memory".into(), memory.clone()]);
        }
        if let Some(cpus) = &config.cpus {
            args.extend(["--cpus".into(), cpus.clone()]);
        }
        for volume in config.volumes.iter() {
            args.extend(["--volume".into(), volume.clone()]);
        }
        for key in request.env().keys() {
            args.extend(["--env".into(), key.clone()]);
        }

        args.push(config.image.clone());
        args.extend(entry_rest.iter().cloned());
        args.extend(INTERPRETER.iter().map(|s| s.to_string()));
        args.push(request.script());
        args
    }

    /// Container name for a run in `workdir`.
    ///
    /// The working directory is unique per run, so its file name makes the
    /// container name unique too. Characters docker rejects become `-`.
    pub fn container_name(workdir: &Path) -> String {
        let base = workdir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = base.strip_prefix(CONTAINER_NAME_PREFIX).unwrap_or(&base);
        let mut suffix: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        if suffix.is_empty() {
            suffix = std::process::id().to_string();
        }
        format!("{CONTAINER_NAME_PREFIX}{suffix}")
    }

    /// Arguments that force-remove a running container.
    pub fn remove_args(name: &str) -> Vec<String> {
        vec!["rm".into(), "-f".into(), name.to_string()]
    }

    /// Build the command without spawning it.
    pub fn command(config: &ContainerConfig, request: &ExecutionRequest, workdir: &Path) -> Command {
        let mut cmd = Command::new(&config.binary);
        cmd.args(Self::args(config, request, workdir))
            .envs(request.env());
        cmd
    }
}

impl Runner for DockerRunner {
    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
        workdir: &'a Path,
        cancel: CancellationToken,
    ) -> RunFuture<'a> {
        let EffectiveConfig::Container(config) = request.config() else {
            return Box::pin(async {
                Err::<ExecutionResult, _>(TaskError::RunnerLaunch(
                    "container runner received a non-container configuration".to_string(),
                ))
            });
        };

        let name = Self::container_name(workdir);
        debug!(image = %config.image, binary = %config.binary, container = %name, "launching container");
        let cmd = Self::command(config, request, workdir);
        Box::pin(async move {
            let result = run_child(
                cmd,
                "docker",
                request.warning_on_stderr(),
                config.timeout,
                cancel,
            )
            .await;

            if matches!(result, Err(TaskError::Cancelled | TaskError::TimedOut(_))) {
                remove_container(&config.binary, &name).await;
            }
            result
        })
    }
}

/// Force-remove `name`; failures are logged, the original error wins.
async fn remove_container(binary: &str, name: &str) {
    info!(container = %name, "removing container after aborted run");
    let output = Command::new(binary)
        .args(DockerRunner::remove_args(name))
        .stdin(Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) if out.status.success() => debug!(container = %name, "container removed"),
        Ok(out) => warn!(
            container = %name,
            status = ?out.status.code(),
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "failed to remove container"
        ),
        Err(e) => warn!(container = %name, error = %e, "failed to run container removal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{DockerOptions, FilesManifest, RunnerOptions};
    use crate::config::resolve::{DEFAULT_IMAGE, resolve};
    use std::collections::BTreeMap;

    fn request(options: Option<RunnerOptions>, env: &[(&str, &str)]) -> ExecutionRequest {
        let config = resolve(options.as_ref(), None, DEFAULT_IMAGE);
        let env: BTreeMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ExecutionRequest::assemble(
            config,
            vec!["modal --version".to_string(), "echo done".to_string()],
            Some(env),
            FilesManifest::default(),
            true,
        )
    }

    fn container(req: &ExecutionRequest) -> &ContainerConfig {
        match req.config() {
            EffectiveConfig::Container(c) => c,
            other => panic!("expected container config, got {:?}", other),
        }
    }

    #[test]
    fn default_invocation_clears_entrypoint_and_runs_shell() {
        let req = request(None, &[]);
        let args = DockerRunner::args(container(&req), &req, Path::new("/tmp/work"));

        assert_eq!(&args[..4], &["run", "--rm", "--name", "modaltask-work"]);
        assert!(args.contains(&"--entrypoint=".to_string()));
        assert!(args.contains(&"/tmp/work:/workdir".to_string()));

        let image_pos = args.iter().position(|a| a == DEFAULT_IMAGE).unwrap();
        assert_eq!(
            &args[image_pos + 1..],
            &["/bin/sh", "-c", "modal --version\necho done"]
        );
    }

    #[test]
    fn env_values_stay_off_the_command_line() {
        let req = request(None, &[("MODAL_TOKEN_SECRET", "s3cr3t")]);
        let args = DockerRunner::args(container(&req), &req, Path::new("/w"));

        assert!(args.windows(2).any(|w| w[0] == "--env" && w[1] == "MODAL_TOKEN_SECRET"));
        assert!(!args.iter().any(|a| a.contains("s3cr3t")));
    }

    #[test]
    fn entrypoint_tail_precedes_interpreter() {
        let opts = RunnerOptions::Docker(DockerOptions {
            image: Some("python:3.12".to_string()),
            entry_point: Some(vec!["tini".to_string(), "--".to_string()]),
            user: Some("1000".to_string()),
            ..DockerOptions::default()
        });
        let req = request(Some(opts), &[]);
        let args = DockerRunner::args(container(&req), &req, Path::new("/w"));

        assert!(args.contains(&"--entrypoint=tini".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "--user" && w[1] == "1000"));
        let image_pos = args.iter().position(|a| a == "python:3.12").unwrap();
        assert_eq!(args[image_pos + 1], "--");
        assert_eq!(args[image_pos + 2], "/bin/sh");
    }

    #[test]
    fn container_name_follows_the_working_directory() {
        assert_eq!(
            DockerRunner::container_name(Path::new("/tmp/modaltask-Ab12cd")),
            "modaltask-Ab12cd"
        );
        assert_eq!(
            DockerRunner::container_name(Path::new("/tmp/my work+dir")),
            "modaltask-my-work-dir"
        );
        assert!(DockerRunner::container_name(Path::new("/")).len() > CONTAINER_NAME_PREFIX.len());
    }

    #[test]
    fn abort_removes_the_named_container() {
        let workdir = Path::new("/tmp/modaltask-x1y2");
        let req = request(None, &[]);
        let args = DockerRunner::args(container(&req), &req, workdir);
        let name = DockerRunner::container_name(workdir);

        assert!(args.windows(2).any(|w| w[0] == "--name" && w[1] == name));
        assert_eq!(DockerRunner::remove_args(&name), ["rm", "-f", "modaltask-x1y2"]);
    }

    #[tokio::test]
    async fn timeout_runs_container_removal() {
        let bin = tempfile::TempDir::new().unwrap();
        let log = bin.path().join("calls.log");
        let fake = bin.path().join("fake-docker");
        std::fs::write(
            &fake,
            format!(
                "#!/bin/sh\necho \"$@\" >> {}\nif [ \"$1\" = run ]; then sleep 10; fi\n",
                log.display()
            ),
        )
        .unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let opts = RunnerOptions::Docker(DockerOptions {
            binary: Some(fake.display().to_string()),
            timeout: Some(std::time::Duration::from_millis(200)),
            ..DockerOptions::default()
        });
        let req = request(Some(opts), &[]);
        let workdir = tempfile::Builder::new().prefix("modaltask-").tempdir().unwrap();

        let err = DockerRunner
            .execute(&req, workdir.path(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::TimedOut(_)));

        let calls = std::fs::read_to_string(&log).unwrap();
        let name = DockerRunner::container_name(workdir.path());
        assert!(calls.lines().any(|l| l.starts_with("run --rm --name")));
        assert!(calls.lines().any(|l| l == format!("rm -f {name}")));
    }
}
