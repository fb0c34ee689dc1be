//! Task executor
//!
//! Handles one task end to end: stage file inputs into the working
//! directory, run the rendered command, and copy the declared outputs out.
//! There is no retry; a failing tool fails the task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, info, instrument};

use super::{Invocation, ToolRunner};
use crate::config::{WxConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::WxError;
use crate::task::Task;

/// A declared output that was found and copied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedOutput {
    pub name: String,
    pub path: PathBuf,
}

/// Result of a successful task run
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub function: String,
    pub command: String,
    pub outputs: Vec<CollectedOutput>,
    pub stdout: String,
    pub stderr: String,
    /// Working directory, when it outlives the run
    pub workdir: Option<PathBuf>,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl TaskOutcome {
    pub fn output(&self, name: &str) -> Option<&Path> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.path.as_path())
    }
}

enum Workdir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl Workdir {
    fn path(&self) -> &Path {
        match self {
            Workdir::Temp(dir) => dir.path(),
            Workdir::Fixed(path) => path,
        }
    }
}

/// Executes bound tasks through a [`ToolRunner`]
#[derive(Clone)]
pub struct TaskExecutor {
    runner: Arc<dyn ToolRunner>,
    timeout: Duration,
    keep_workdir: bool,
}

impl TaskExecutor {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            keep_workdir: false,
        }
    }

    pub fn from_config(runner: Arc<dyn ToolRunner>, config: &WxConfig) -> Self {
        Self::new(runner)
            .with_timeout(config.timeout())
            .keep_workdir(config.keep_workdir)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn keep_workdir(mut self, keep: bool) -> Self {
        self.keep_workdir = keep;
        self
    }

    pub fn runner(&self) -> &dyn ToolRunner {
        self.runner.as_ref()
    }

    /// Run `task`, copying its outputs into `output_dir`
    ///
    /// `workdir` pins the working directory; otherwise a temporary one is
    /// created and removed afterwards (unless configured to keep it).
    #[instrument(skip(self, task, output_dir, workdir), fields(function = %task.name(), runner = %self.runner.name()))]
    pub async fn execute(
        &self,
        task: &Task,
        output_dir: &Path,
        workdir: Option<&Path>,
    ) -> Result<TaskOutcome, WxError> {
        let started = Instant::now();
        let command = task.command()?;

        let workdir = self.prepare_workdir(workdir).await?;
        debug!(workdir = %workdir.path().display(), "working directory ready");

        stage_inputs(task, workdir.path()).await?;

        let output = self
            .runner
            .run(Invocation {
                command: command.clone(),
                workdir: workdir.path().to_path_buf(),
                timeout: self.timeout,
            })
            .await?;

        if !output.success {
            return Err(WxError::CommandFailed {
                status: output.status_label(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        let outputs = collect_outputs(task, workdir.path(), output_dir).await?;

        let kept = match &workdir {
            Workdir::Fixed(path) => Some(path.clone()),
            Workdir::Temp(dir) if self.keep_workdir => Some(dir.path().to_path_buf()),
            Workdir::Temp(_) => None,
        };

        let elapsed = started.elapsed();
        info!(outputs = outputs.len(), elapsed_ms = elapsed.as_millis() as u64, "task finished");

        Ok(TaskOutcome {
            function: task.name().to_string(),
            command,
            outputs,
            stdout: output.stdout,
            stderr: output.stderr,
            workdir: kept,
            elapsed,
        })
    }

    async fn prepare_workdir(&self, workdir: Option<&Path>) -> Result<Workdir, WxError> {
        match workdir {
            Some(path) => {
                tokio::fs::create_dir_all(path).await?;
                Ok(Workdir::Fixed(path.to_path_buf()))
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("wxflow-")
                    .disable_cleanup(self.keep_workdir)
                    .tempdir()?;
                Ok(Workdir::Temp(dir))
            }
        }
    }
}

/// Copy every bound file input to its declared staging path
async fn stage_inputs(task: &Task, workdir: &Path) -> Result<(), WxError> {
    for (spec, source) in task.file_inputs() {
        if !tokio::fs::metadata(source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(WxError::InputFileNotFound {
                path: source.to_path_buf(),
            });
        }

        if !spec.accepts_extension(source) {
            return Err(WxError::BadExtension {
                input: spec.name.to_string(),
                path: source.to_path_buf(),
                expected: spec
                    .extensions
                    .iter()
                    .map(|e| format!(".{}", e.trim_start_matches('.')))
                    .collect::<Vec<_>>()
                    .join(" or "),
            });
        }

        // Validated as relative at declaration time
        let Some(rel) = spec.path.as_deref() else {
            continue;
        };
        let dest = workdir.join(rel);
        if same_file(source, &dest).await {
            continue;
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, &dest).await?;
        debug!(input = %spec.name, from = %source.display(), to = %dest.display(), "staged input");
    }
    Ok(())
}

/// Verify every declared output exists and copy it to `output_dir`
async fn collect_outputs(
    task: &Task,
    workdir: &Path,
    output_dir: &Path,
) -> Result<Vec<CollectedOutput>, WxError> {
    let mut collected = Vec::new();

    for (name, rel) in task.declared_outputs() {
        let produced = workdir.join(rel);
        let exists = tokio::fs::metadata(&produced)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !exists {
            return Err(WxError::MissingOutput {
                output: name.to_string(),
                path: rel.to_string(),
            });
        }

        let dest = output_dir.join(rel);
        if !same_file(&produced, &dest).await {
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&produced, &dest).await?;
        }
        debug!(output = name, path = %dest.display(), "collected output");

        collected.push(CollectedOutput {
            name: name.to_string(),
            path: dest,
        });
    }

    Ok(collected)
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRunner;
    use crate::translate::{epw_to_ddy, epw_to_wea, wea_to_constant};
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn bind(f: crate::function::Function, pairs: &[String]) -> Task {
        Task::bind_raw(Arc::new(f), pairs).unwrap()
    }

    #[tokio::test]
    async fn stages_runs_and_collects() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let epw = write(src.path(), "boston.epw", "LOCATION,Boston\n");

        let runner = Arc::new(MockRunner::new().with_file("weather.wea", "place Boston\n"));
        let executor = TaskExecutor::new(runner.clone());
        let task = bind(
            epw_to_wea().unwrap(),
            &[format!("epw={}", epw.display()), "timestep=2".into()],
        );

        let outcome = executor.execute(&task, out.path(), None).await.unwrap();

        assert_eq!(
            outcome.command,
            "ladybug translate epw-to-wea weather.epw --analysis-period \"\" --timestep 2 \
             --output-file weather.wea"
        );
        let wea = outcome.output("wea").unwrap();
        assert_eq!(wea, out.path().join("weather.wea"));
        assert_eq!(fs::read_to_string(wea).unwrap(), "place Boston\n");
        assert!(outcome.workdir.is_none());
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn input_is_copied_to_declared_path() {
        let src = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let epw = write(src.path(), "site.EPW", "LOCATION,Site\n");

        let executor =
            TaskExecutor::new(Arc::new(MockRunner::new().with_file("weather.ddy", "ddy")));
        let task = bind(epw_to_ddy().unwrap(), &[format!("epw={}", epw.display())]);

        let outcome = executor
            .execute(&task, out.path(), Some(work.path()))
            .await
            .unwrap();

        let staged = fs::read_to_string(work.path().join("weather.epw")).unwrap();
        assert_eq!(staged, "LOCATION,Site\n");
        assert_eq!(outcome.workdir.as_deref(), Some(work.path()));
    }

    #[tokio::test]
    async fn missing_output_is_an_error() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let wea = write(src.path(), "in.wea", "place x\n");

        let executor = TaskExecutor::new(Arc::new(MockRunner::new()));
        let task = bind(wea_to_constant().unwrap(), &[format!("wea={}", wea.display())]);

        let err = executor.execute(&task, out.path(), None).await.unwrap_err();
        assert!(
            matches!(err, WxError::MissingOutput { ref output, ref path } if output == "constant-wea" && path == "constant.wea")
        );
    }

    #[tokio::test]
    async fn tool_failure_carries_stderr() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let epw = write(src.path(), "a.epw", "");

        let executor =
            TaskExecutor::new(Arc::new(MockRunner::new().failing(2, "  not an epw  \n")));
        let task = bind(epw_to_ddy().unwrap(), &[format!("epw={}", epw.display())]);

        let err = executor.execute(&task, out.path(), None).await.unwrap_err();
        match err {
            WxError::CommandFailed { status, stderr } => {
                assert_eq!(status, "exit code 2");
                assert_eq!(stderr, "not an epw");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected_before_running() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let not_epw = write(src.path(), "weather.csv", "");

        let runner = Arc::new(MockRunner::new());
        let executor = TaskExecutor::new(runner.clone());
        let task = bind(epw_to_wea().unwrap(), &[format!("epw={}", not_epw.display())]);

        let err = executor.execute(&task, out.path(), None).await.unwrap_err();
        assert!(matches!(err, WxError::BadExtension { ref expected, .. } if expected == ".epw"));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn missing_input_file() {
        let out = tempfile::tempdir().unwrap();
        let executor = TaskExecutor::new(Arc::new(MockRunner::new()));
        let task = bind(epw_to_wea().unwrap(), &["epw=/no/such/file.epw".to_string()]);

        let err = executor.execute(&task, out.path(), None).await.unwrap_err();
        assert!(matches!(err, WxError::InputFileNotFound { .. }));
    }

    #[tokio::test]
    async fn kept_temp_workdir_is_reported() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let epw = write(src.path(), "a.epw", "");

        let executor = TaskExecutor::new(Arc::new(MockRunner::new().with_file("weather.ddy", "")))
            .keep_workdir(true);
        let task = bind(epw_to_ddy().unwrap(), &[format!("epw={}", epw.display())]);

        let outcome = executor.execute(&task, out.path(), None).await.unwrap();
        let kept = outcome.workdir.expect("kept workdir");
        assert!(kept.join("weather.epw").exists());
        fs::remove_dir_all(kept).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_tool_times_out() {
        use crate::runtime::ProcessRunner;

        let out = tempfile::tempdir().unwrap();
        let nap = crate::function::Function::builder("nap")
            .command("sleep 5")
            .build()
            .unwrap();
        let task = Task::bind(Arc::new(nap), Vec::new()).unwrap();

        let executor = TaskExecutor::new(Arc::new(ProcessRunner::new()))
            .with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let err = executor.execute(&task, out.path(), None).await.unwrap_err();

        assert!(matches!(err, WxError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn output_dir_equal_to_workdir() {
        let src = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wea = write(src.path(), "in.wea", "");

        let executor =
            TaskExecutor::new(Arc::new(MockRunner::new().with_file("constant.wea", "1000")));
        let task = bind(wea_to_constant().unwrap(), &[format!("wea={}", wea.display())]);

        let outcome = executor
            .execute(&task, work.path(), Some(work.path()))
            .await
            .unwrap();
        assert_eq!(
            fs::read_to_string(outcome.output("constant-wea").unwrap()).unwrap(),
            "1000"
        );
    }
}
