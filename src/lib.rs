// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod render;
pub mod staging;
pub mod task;
pub mod types;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::resolve::EffectiveConfig;
use crate::exec::{CancellationToken, SystemRunner};
use crate::render::{RenderContext, TemplateRenderer};
use crate::staging::LocalFileTransfer;
use crate::task::{ExecutionRequest, TaskFacade};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading and validation
/// - template context (`--input` values and the process environment)
/// - the system runner and local file transfer
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let params = load_and_validate(&args.task_file)
        .with_context(|| format!("loading task file {:?}", args.task_file))?;

    let renderer = TemplateRenderer::new(
        RenderContext::new()
            .with_inputs(args.inputs.iter().cloned())
            .with_env(std::env::vars()),
    )?;

    let facade = TaskFacade::new(
        SystemRunner::new(),
        LocalFileTransfer::on_disk(&args.output_dir),
    );

    if args.dry_run {
        let request = facade.prepare(&params, &renderer)?;
        print_dry_run(&request);
        return Ok(());
    }

    // Ctrl-C → cancel the running command sequence.
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; cancelling task");
        handle.cancel();
    });

    let result = facade.run(&params, &renderer, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if args.allow_failure {
        debug!(exit_code = result.exit_code, "failures allowed; not checking exit code");
        return Ok(());
    }
    result.ensure_success()?;
    Ok(())
}

/// Simple dry-run output: print the resolved runner, env names and script.
fn print_dry_run(request: &ExecutionRequest) {
    println!("modaltask dry-run");
    match request.config() {
        EffectiveConfig::Container(c) => {
            println!("  runner = docker ({})", c.binary);
            println!("  image = {}", c.image);
            println!("  entry_point = {:?}", c.entry_point);
            println!("  pull_policy = {}", c.pull_policy.as_docker_flag());
        }
        EffectiveConfig::Process(_) => println!("  runner = process"),
    }
    if let Some(timeout) = request.config().timeout() {
        println!("  timeout = {timeout:?}");
    }
    println!("  warning_on_stderr = {}", request.warning_on_stderr());
    println!();

    if !request.env().is_empty() {
        // Values may hold secrets; only names are shown.
        let names: Vec<&str> = request.env().keys().map(String::as_str).collect();
        println!("env: {names:?}");
    }

    let files = request.files();
    if !files.input_files.is_empty() {
        let names: Vec<&str> = files.input_files.keys().map(String::as_str).collect();
        println!("input_files: {names:?}");
    }
    if let Some(ns) = files.namespace_files.as_ref().filter(|ns| ns.enabled) {
        println!("namespace_files: {:?}", ns.directory);
    }
    if !files.output_files.is_empty() {
        println!("output_files: {:?}", files.output_files);
    }

    println!("commands ({}):", request.command_sequence().len());
    for cmd in request.command_sequence() {
        println!("  - {cmd}");
    }
    println!("invocation: {:?}", request.interpreter());

    debug!("dry-run complete (no execution)");
}
