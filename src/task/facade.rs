// src/task/facade.rs

//! Public entry point for running a task.
//!
//! `TaskFacade::run` is the whole pipeline:
//!
//! 1. render templates ([`Renderer`])
//! 2. resolve the effective config ([`resolve`])
//! 3. build the command sequence ([`commands::build`])
//! 4. assemble the [`ExecutionRequest`]
//! 5. stage files, execute, collect outputs ([`FileTransfer`], [`Runner`])
//! 6. parse the result ([`ResultParser`])
//!
//! Any fatal error aborts the run; there is no retry and no partial result.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::model::{FilesManifest, TaskParameters};
use crate::config::resolve::{DEFAULT_IMAGE, resolve};
use crate::config::validate::{validate_output_name, validate_relative_path};
use crate::errors::{Result, TaskError};
use crate::exec::{CancellationToken, Runner};
use crate::render::Renderer;
use crate::staging::FileTransfer;
use crate::task::commands;
use crate::task::request::ExecutionRequest;
use crate::task::result::{ResultParser, TaskResult};

/// Runs tasks through a runner and a file-transfer backend.
#[derive(Debug)]
pub struct TaskFacade<R, T> {
    runner: R,
    transfer: T,
}

impl<R, T> TaskFacade<R, T>
where
    R: Runner,
    T: FileTransfer,
{
    pub fn new(runner: R, transfer: T) -> Self {
        Self { runner, transfer }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Render, resolve and assemble the request without executing anything.
    pub fn prepare(
        &self,
        params: &TaskParameters,
        renderer: &dyn Renderer,
    ) -> Result<ExecutionRequest> {
        let before = params
            .before_commands
            .as_deref()
            .map(|c| renderer.render_all(c))
            .transpose()?;
        let main = renderer.render_all(&params.commands)?;
        let sequence = commands::build(before.as_deref(), &main)?;

        let env = render_env(renderer, &params.env)?;
        let container_image = params
            .container_image
            .as_deref()
            .map(|image| renderer.render(image))
            .transpose()?;
        let config = resolve(
            params.runner.as_ref(),
            container_image.as_deref(),
            DEFAULT_IMAGE,
        );
        let files = render_files(renderer, &params.files)?;

        debug!(?config, commands = sequence.len(), "assembled execution request");
        Ok(ExecutionRequest::assemble(
            config,
            sequence,
            Some(env),
            files,
            params.warning_on_stderr,
        ))
    }

    /// Execute the task end to end.
    ///
    /// A non-zero exit code is returned as data in the `TaskResult`; use
    /// [`TaskResult::ensure_success`] to treat it as a failure.
    pub async fn run(
        &self,
        params: &TaskParameters,
        renderer: &dyn Renderer,
        cancel: CancellationToken,
    ) -> Result<TaskResult> {
        let request = self.prepare(params, renderer)?;

        let workdir = tempfile::Builder::new()
            .prefix("modaltask-")
            .tempdir()
            .map_err(|e| TaskError::RunnerLaunch(format!("creating working directory: {e}")))?;

        self.transfer.stage(request.files(), workdir.path())?;

        info!(
            image = request.config().image().unwrap_or("-"),
            commands = request.command_sequence().len(),
            "executing task"
        );
        let result = self
            .runner
            .execute(&request, workdir.path(), cancel)
            .await?;

        let declared = &request.files().output_files;
        let produced = self.transfer.collect(declared, workdir.path())?;

        let parsed = ResultParser::new(request.warning_on_stderr()).parse(&result, declared, &produced)?;
        info!(
            exit_code = parsed.exit_code,
            vars = parsed.vars.len(),
            output_files = parsed.output_files.len(),
            "task finished"
        );
        Ok(parsed)
    }
}

fn render_env(
    renderer: &dyn Renderer,
    env: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    env.iter()
        .map(|(k, v)| Ok::<_, TaskError>((renderer.render(k)?, renderer.render(v)?)))
        .collect()
}

fn render_files(renderer: &dyn Renderer, files: &FilesManifest) -> Result<FilesManifest> {
    let mut input_files = BTreeMap::new();
    for (name, content) in files.input_files.iter() {
        let name = renderer.render(name)?;
        validate_relative_path("input_files", &name)?;
        input_files.insert(name, renderer.render(content)?);
    }

    let mut output_files = Vec::with_capacity(files.output_files.len());
    for name in files.output_files.iter() {
        let name = renderer.render(name)?;
        validate_output_name(&name)?;
        output_files.push(name);
    }

    Ok(FilesManifest {
        input_files,
        namespace_files: files.namespace_files.clone(),
        output_files,
    })
}
