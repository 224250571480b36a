use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use modaltask::exec::{CancellationToken, RunFuture, Runner};
use modaltask::task::{ExecutionRequest, ExecutionResult};

/// A fake runner that:
/// - records every request it receives
/// - writes configured files into the working directory (simulating outputs)
/// - returns a canned `ExecutionResult` without spawning anything.
#[derive(Clone, Default)]
pub struct FakeRunner {
    result: ExecutionResult,
    produce: BTreeMap<String, String>,
    requests: Arc<Mutex<Vec<ExecutionRequest>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.result.exit_code = code;
        self
    }

    pub fn with_stdout(mut self, line: &str) -> Self {
        self.result.stdout_lines.push(line.to_string());
        self
    }

    pub fn with_stderr(mut self, line: &str) -> Self {
        self.result.stderr_lines.push(line.to_string());
        self
    }

    /// Write `content` to `name` inside the working directory during execution.
    pub fn producing(mut self, name: &str, content: &str) -> Self {
        self.produce.insert(name.to_string(), content.to_string());
        self
    }

    /// Clone of all requests seen so far.
    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Runner for FakeRunner {
    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
        workdir: &'a Path,
        _cancel: CancellationToken,
    ) -> RunFuture<'a> {
        self.requests.lock().unwrap().push(request.clone());

        Box::pin(async move {
            for (name, content) in self.produce.iter() {
                let path = workdir.join(name);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, content)?;
            }
            Ok(self.result.clone())
        })
    }
}
