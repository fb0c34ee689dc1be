//! Process runner using `sh -c`
//!
//! Runs on a blocking thread with a `wait-timeout` deadline. Output pipes
//! are drained on their own threads so a chatty tool cannot fill the pipe
//! buffer and stall before the deadline.
//!
//! On Unix the command leads its own process group. The whole group is
//! killed on timeout and once the command exits, so nothing it forked keeps
//! writing into a working directory that is about to be removed.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use super::{Invocation, ToolOutput, ToolRunner};
use crate::error::WxError;

/// Timeout for tool availability check
const TOOL_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra time to finish reading output once the command has exited
const PIPE_GRACE: Duration = Duration::from_millis(100);

/// Runner that executes commands through the system shell
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Executable probed by `is_available`
    tool: String,
    /// Prepended to `PATH` for every command
    tool_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            tool: "ladybug".to_string(),
            tool_dir: None,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = tool.into();
        self
    }

    pub fn with_tool_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tool_dir = dir;
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// `PATH` with the tool directory in front, if one is configured
    fn search_path(&self) -> Option<OsString> {
        let dir = self.tool_dir.as_ref()?;
        let existing = std::env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(dir.clone()).chain(std::env::split_paths(&existing));
        std::env::join_paths(paths).ok()
    }

    fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }
        cmd
    }

    /// Check if the tool answers `--version` within 5s
    fn check_tool(&self) -> bool {
        self.command(&self.tool)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .and_then(|mut child| match child.wait_timeout(TOOL_CHECK_TIMEOUT)? {
                Some(status) => Ok(status.success()),
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    Ok(false)
                }
            })
            .unwrap_or(false)
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a drained pipe until `deadline` (plus a short grace)
fn collect(pipe: &Receiver<String>, deadline: Instant) -> Option<String> {
    let wait = deadline
        .saturating_duration_since(Instant::now())
        .max(PIPE_GRACE);
    pipe.recv_timeout(wait).ok()
}

/// Kill every process in the child's group; the child leads its own group
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    // SAFETY: killpg only sends a signal; a stale group id yields ESRCH
    unsafe {
        libc::killpg(child.id() as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

fn run_blocking(mut cmd: Command, workdir: &Path, timeout: Duration) -> Result<ToolOutput, WxError> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let started = Instant::now();
    let deadline = started + timeout;
    let mut child: Child = cmd
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| WxError::Spawn(e.to_string()))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            kill_group(&mut child);
            let _ = child.kill();
            let _ = child.wait(); // Reap the zombie
            return Err(WxError::Timeout {
                after: started.elapsed(),
            });
        }
    };

    // The command is done; nothing it started in the background may outlive it
    kill_group(&mut child);

    let timed_out = || WxError::Timeout {
        after: started.elapsed(),
    };
    let stdout = collect(&stdout, deadline).ok_or_else(timed_out)?;
    let stderr = collect(&stderr, deadline).ok_or_else(timed_out)?;

    Ok(ToolOutput {
        success: status.success(),
        code: status.code(),
        stdout,
        stderr,
    })
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    #[instrument(skip(self, invocation), fields(workdir = %invocation.workdir.display()))]
    async fn run(&self, invocation: Invocation) -> Result<ToolOutput, WxError> {
        debug!(command = %invocation.command, "spawning");

        let mut cmd = self.command("sh");
        cmd.arg("-c").arg(&invocation.command);

        let output = tokio::task::spawn_blocking(move || {
            run_blocking(cmd, &invocation.workdir, invocation.timeout)
        })
        .await
        .map_err(|e| WxError::Spawn(format!("runner thread failed: {}", e)))??;

        if !output.success {
            warn!(status = %output.status_label(), "tool exited unsuccessfully");
        }
        Ok(output)
    }

    async fn is_available(&self) -> bool {
        let runner = self.clone();
        tokio::task::spawn_blocking(move || runner.check_tool())
            .await
            .unwrap_or(false)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn invocation(command: &str, workdir: &Path) -> Invocation {
        Invocation {
            command: command.to_string(),
            workdir: workdir.to_path_buf(),
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessRunner::new()
            .run(invocation("echo hello", dir.path()))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn runs_in_workdir() {
        let dir = tempfile::tempdir().unwrap();
        ProcessRunner::new()
            .run(invocation("echo data > made.txt", dir.path()))
            .await
            .unwrap();
        assert!(dir.path().join("made.txt").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessRunner::new()
            .run(invocation("echo broken >&2; exit 3", dir.path()))
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stderr.trim(), "broken");
    }

    #[tokio::test]
    async fn timeout_kills_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut inv = invocation("sleep 5", dir.path());
        inv.timeout = Duration::from_millis(200);
        let err = ProcessRunner::new().run(inv).await.unwrap_err();
        assert!(matches!(err, WxError::Timeout { after } if after >= Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn timeout_kills_forked_children() {
        let dir = tempfile::tempdir().unwrap();
        let mut inv = invocation("sh -c 'sleep 1; echo late > marker'; true", dir.path());
        inv.timeout = Duration::from_millis(200);

        let err = ProcessRunner::new().run(inv).await.unwrap_err();
        assert!(matches!(err, WxError::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn background_child_does_not_hold_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut inv = invocation("(sleep 3) & echo done", dir.path());
        inv.timeout = Duration::from_secs(2);

        let started = Instant::now();
        let out = ProcessRunner::new().run(inv).await.unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "done");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn tool_dir_is_searched_first() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let script = bin.path().join("fake-tool");
        std::fs::write(&script, "#!/bin/sh\necho fake $@\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = ProcessRunner::new()
            .with_tool("fake-tool")
            .with_tool_dir(Some(bin.path().to_path_buf()));
        assert!(runner.is_available().await);

        let work = tempfile::tempdir().unwrap();
        let out = runner.run(invocation("fake-tool go", work.path())).await.unwrap();
        assert_eq!(out.stdout.trim(), "fake go");
    }

    #[tokio::test]
    async fn missing_tool_is_unavailable() {
        let runner = ProcessRunner::new().with_tool("wxflow-no-such-tool-here");
        assert!(!runner.is_available().await);
    }
}
