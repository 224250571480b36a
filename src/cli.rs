// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `modaltask`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "modaltask",
    version,
    about = "Run a CLI tool's commands inside a container or subprocess and capture structured outputs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Task.toml")]
    pub task_file: PathBuf,

    /// Template input, available as `{{ inputs.KEY }}`. Repeatable.
    #[arg(long = "input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub inputs: Vec<(String, String)>,

    /// Directory that receives declared output files.
    #[arg(long, value_name = "DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MODALTASK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Render and resolve the task, print the request, but don't execute it.
    #[arg(long)]
    pub dry_run: bool,

    /// Report a non-zero exit code without failing.
    #[arg(long)]
    pub allow_failure: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_inputs() {
        let args = CliArgs::try_parse_from([
            "modaltask",
            "--task-file",
            "hello.toml",
            "--input",
            "cpu=0.25",
            "--input",
            "query=a=b",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.task_file, PathBuf::from("hello.toml"));
        assert_eq!(
            args.inputs,
            vec![
                ("cpu".to_string(), "0.25".to_string()),
                ("query".to_string(), "a=b".to_string())
            ]
        );
        assert!(args.dry_run);
        assert!(!args.allow_failure);
    }

    #[test]
    fn rejects_input_without_equals() {
        assert!(CliArgs::try_parse_from(["modaltask", "--input", "cpu"]).is_err());
    }
}
