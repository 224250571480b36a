use std::io::Write;

use tempfile::NamedTempFile;

use modaltask::config::load_and_validate;
use modaltask::errors::TaskError;

fn task_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_missing_commands_returns_config_error() {
    let file = task_file(
        r#"
before_commands = ["pip install modal"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TaskError::ConfigError(msg)) => assert!(msg.contains("commands")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_empty_commands_returns_config_error() {
    let file = task_file("commands = []\n");
    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(TaskError::ConfigError(_))));
}

#[test]
fn test_reserved_output_name_returns_config_error() {
    let file = task_file(
        r#"
commands = ["modal run app.py"]
output_files = [".."]
"#,
    );
    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(TaskError::ConfigError(_))));
}

#[test]
fn test_runner_and_deprecated_docker_conflict() {
    let file = task_file(
        r#"
commands = ["modal run app.py"]

[runner]
type = "process"

[docker]
image = "python:3.12"
"#,
    );
    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(TaskError::ConfigError(_))));
}

#[test]
fn test_deprecated_docker_section_still_selects_container_runner() {
    let file = task_file(
        r#"
commands = ["modal run app.py"]

[docker]
image = "python:3.12"
"#,
    );
    let params = load_and_validate(file.path()).unwrap();
    assert!(params.runner.as_ref().is_some_and(|r| r.is_container()));
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = task_file("commands = [\"echo\"\n");
    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(TaskError::TomlError(_))));
}

#[test]
fn test_missing_file_returns_io_error() {
    let result = load_and_validate("/definitely/not/here/Task.toml");
    assert!(matches!(result, Err(TaskError::IoError(_))));
}
