//! Mock runner for testing
//!
//! Records every invocation and writes canned files into the working
//! directory instead of calling the real tool.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Invocation, ToolOutput, ToolRunner};
use crate::error::WxError;

/// Runner that pretends to be the translation tool
#[derive(Debug, Clone)]
pub struct MockRunner {
    /// Files written into the workdir on every run: (relative path, contents)
    files: Vec<(String, String)>,
    /// Result returned for every run
    output: ToolOutput,
    available: bool,
    /// Track all invocations (for assertions)
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl MockRunner {
    /// A runner that succeeds and writes nothing
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            output: ToolOutput::success(""),
            available: true,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Write `contents` to `path` (relative to the workdir) on each run
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.push((path.into(), contents.into()));
        self
    }

    /// Exit with `code` and `stderr` instead of succeeding
    pub fn failing(mut self, code: i32, stderr: impl Into<String>) -> Self {
        self.output = ToolOutput::failure(code, stderr);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Get all invocations made to this runner
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn last_command(&self) -> Option<String> {
        self.invocations().last().map(|i| i.command.clone())
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, invocation: Invocation) -> Result<ToolOutput, WxError> {
        if let Ok(mut guard) = self.invocations.lock() {
            guard.push(invocation.clone());
        }

        if self.output.success {
            for (path, contents) in &self.files {
                let dest = invocation.workdir.join(path);
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&dest, contents).await?;
            }
        }

        Ok(self.output.clone())
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}
