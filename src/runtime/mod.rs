//! # Tool Execution
//!
//! How a bound [`Task`](crate::task::Task) turns into files on disk:
//!
//! - [`ToolRunner`] - trait for running a rendered command in a directory
//! - [`ProcessRunner`] - production runner (`sh -c` with a timeout)
//! - [`MockRunner`] - test runner that records commands and fakes outputs
//! - [`TaskExecutor`] - stages inputs, runs the command, collects outputs
//!
//! ```rust,ignore
//! let executor = TaskExecutor::new(Arc::new(ProcessRunner::new()));
//! let outcome = executor.execute(&task, Path::new("out"), None).await?;
//! for output in &outcome.outputs {
//!     println!("{} -> {}", output.name, output.path.display());
//! }
//! ```

mod executor;
mod mock;
mod process;

pub use executor::{CollectedOutput, TaskExecutor, TaskOutcome};
pub use mock::MockRunner;
pub use process::ProcessRunner;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::WxError;

/// One command to run
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Rendered shell command
    pub command: String,
    /// Directory the command runs in
    pub workdir: PathBuf,
    pub timeout: Duration,
}

/// What a finished command left behind
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }
}

/// Runs rendered commands
#[async_trait]
pub trait ToolRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Run to completion; a non-zero exit is `Ok` with `success == false`
    async fn run(&self, invocation: Invocation) -> Result<ToolOutput, WxError>;

    /// Whether the external tool can be reached
    async fn is_available(&self) -> bool;
}
