// src/exec/process.rs

//! Subprocess runner: executes the command sequence directly on the host.

use std::path::Path;

use tokio::process::Command;

use crate::task::request::{ExecutionRequest, INTERPRETER};

use super::backend::{CancellationToken, RunFuture, Runner};
use super::child::run_child;

/// Runs `/bin/sh -c <script>` with the working directory as cwd.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Build the command without spawning it.
    pub fn command(&self, request: &ExecutionRequest, workdir: &Path) -> Command {
        let mut cmd = Command::new(INTERPRETER[0]);
        cmd.arg(INTERPRETER[1])
            .arg(request.script())
            .current_dir(workdir)
            .envs(request.env());
        cmd
    }
}

impl Runner for ProcessRunner {
    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
        workdir: &'a Path,
        cancel: CancellationToken,
    ) -> RunFuture<'a> {
        let cmd = self.command(request, workdir);
        let timeout = request.config().timeout();
        Box::pin(run_child(
            cmd,
            "process",
            request.warning_on_stderr(),
            timeout,
            cancel,
        ))
    }
}
