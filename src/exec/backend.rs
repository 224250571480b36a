// src/exec/backend.rs

//! Pluggable runner abstraction.
//!
//! The task facade talks to a `Runner` instead of spawning processes itself.
//! This makes it easy to swap in a fake runner in tests while keeping the
//! production implementations in [`process`](super::process) and
//! [`docker`](super::docker).
//!
//! - `SystemRunner` is the default implementation used by `modaltask`. It
//!   dispatches on the request's effective configuration.
//! - Tests can provide their own `Runner` that records requests and returns
//!   canned results.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::config::resolve::EffectiveConfig;
use crate::errors::Result;
use crate::task::request::ExecutionRequest;
use crate::task::result::ExecutionResult;

use super::docker::DockerRunner;
use super::process::ProcessRunner;

pub use tokio_util::sync::CancellationToken;

/// Boxed future returned by [`Runner::execute`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send + 'a>>;

/// Trait abstracting how an execution request is carried out.
pub trait Runner: Send + Sync {
    /// Execute the request with `workdir` as the staged working directory.
    ///
    /// A non-zero exit status is data, not an error. Implementations must
    /// stop the underlying process and return `TaskError::Cancelled` once
    /// `cancel` is triggered.
    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
        workdir: &'a Path,
        cancel: CancellationToken,
    ) -> RunFuture<'a>;
}

/// Production runner: container or subprocess depending on the config.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    docker: DockerRunner,
    process: ProcessRunner,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Runner for SystemRunner {
    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
        workdir: &'a Path,
        cancel: CancellationToken,
    ) -> RunFuture<'a> {
        match request.config() {
            EffectiveConfig::Container(_) => self.docker.execute(request, workdir, cancel),
            EffectiveConfig::Process(_) => self.process.execute(request, workdir, cancel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{FilesManifest, RunnerOptions};
    use crate::config::resolve::{DEFAULT_IMAGE, resolve};
    use crate::errors::TaskError;

    #[tokio::test]
    async fn system_runner_honours_pre_cancelled_token() {
        let options = RunnerOptions::Process(Default::default());
        let request = ExecutionRequest::assemble(
            resolve(Some(&options), None, DEFAULT_IMAGE),
            vec!["sleep 5".to_string()],
            None,
            FilesManifest::default(),
            true,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = SystemRunner::new()
            .execute(&request, Path::new("."), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Cancelled));
    }
}
