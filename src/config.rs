//! wxflow configuration
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`WXFLOW_TOOL_DIR`, `WXFLOW_TIMEOUT_SECS`, `WXFLOW_KEEP_WORKDIR`)
//! 3. Config file (`--config <file>`, else `./wxflow.yaml` when present)
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WxError;

/// Default config file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "wxflow.yaml";

/// Default timeout for a single tool run (10 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WxConfig {
    /// Directory prepended to `PATH` when running the tool
    pub tool_dir: Option<PathBuf>,

    /// Executable probed by `doctor`
    pub tool: String,

    /// Per-run timeout in seconds
    pub timeout_secs: u64,

    /// Keep temporary working directories after a run
    pub keep_workdir: bool,

    /// Extra function definition files loaded at startup
    pub definitions: Vec<PathBuf>,
}

impl Default for WxConfig {
    fn default() -> Self {
        Self {
            tool_dir: None,
            tool: "ladybug".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            keep_workdir: false,
            definitions: Vec::new(),
        }
    }
}

impl WxConfig {
    /// Load from `path`, or from `./wxflow.yaml` if it exists, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, WxError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, WxError> {
        let content = fs::read_to_string(path).map_err(|e| WxError::Config {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, WxError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| WxError::Config {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(self) -> Result<Self, WxError> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Merge with variables from an arbitrary source
    pub fn with_vars<F>(mut self, get: F) -> Result<Self, WxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = get("WXFLOW_TOOL_DIR").filter(|v| !v.is_empty()) {
            self.tool_dir = Some(PathBuf::from(dir));
        }

        if let Some(secs) = get("WXFLOW_TIMEOUT_SECS").filter(|v| !v.is_empty()) {
            self.timeout_secs = secs.trim().parse().map_err(|_| WxError::Config {
                reason: format!("WXFLOW_TIMEOUT_SECS must be a whole number, got '{}'", secs),
            })?;
        }

        if let Some(keep) = get("WXFLOW_KEEP_WORKDIR").filter(|v| !v.is_empty()) {
            self.keep_workdir = matches!(
                keep.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
