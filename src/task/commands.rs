// src/task/commands.rs

//! Command sequence assembly.

use crate::errors::{Result, TaskError};

/// Concatenate rendered setup commands and main commands, in order.
///
/// No reordering, deduplication or filtering happens here. An empty main
/// command list is a configuration error: a task with nothing to execute is
/// never started.
pub fn build(before: Option<&[String]>, main: &[String]) -> Result<Vec<String>> {
    if main.is_empty() {
        return Err(TaskError::ConfigError(
            "no commands to execute after rendering".to_string(),
        ));
    }

    let before = before.unwrap_or_default();
    let mut sequence = Vec::with_capacity(before.len() + main.len());
    sequence.extend_from_slice(before);
    sequence.extend_from_slice(main);
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn before_commands_come_first() {
        let before = strings(&["pip install modal", "modal setup"]);
        let main = strings(&["modal run a.py", "modal run b.py"]);
        let seq = build(Some(&before), &main).unwrap();
        assert_eq!(
            seq,
            strings(&["pip install modal", "modal setup", "modal run a.py", "modal run b.py"])
        );
    }

    #[test]
    fn duplicates_are_kept() {
        let main = strings(&["echo a", "echo a"]);
        assert_eq!(build(None, &main).unwrap(), main);
    }

    #[test]
    fn empty_main_fails_with_or_without_before() {
        assert!(matches!(build(None, &[]), Err(TaskError::ConfigError(_))));
        assert!(matches!(build(Some(&[]), &[]), Err(TaskError::ConfigError(_))));
        let before = strings(&["echo setup"]);
        assert!(matches!(build(Some(&before), &[]), Err(TaskError::ConfigError(_))));
    }
}
