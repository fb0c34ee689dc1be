//! Error types with fix suggestions

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

pub type Result<T, E = WxError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum WxError {
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Declaration errors (WX-010 to WX-019)
    // ─────────────────────────────────────────────────────────────

    #[error("WX-010: Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("WX-011: Duplicate {what} '{name}' in function '{function}'")]
    Duplicate {
        what: &'static str,
        name: String,
        function: String,
    },

    #[error("WX-012: Invalid path '{path}' for '{name}': {reason}")]
    InvalidPath {
        name: String,
        path: String,
        reason: String,
    },

    #[error("WX-013: Command of '{function}' references undeclared input '{input}'")]
    UndeclaredReference { function: String, input: String },

    #[error("WX-014: Default for '{input}' is {found}, expected {expected}")]
    DefaultKind {
        input: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("WX-015: Function '{function}' is incomplete: {reason}")]
    Incomplete { function: String, reason: String },

    #[error("WX-016: Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("WX-017: Function '{name}' is already defined")]
    DuplicateFunction { name: String },

    // ─────────────────────────────────────────────────────────────
    // Binding errors (WX-020 to WX-029)
    // ─────────────────────────────────────────────────────────────

    #[error("WX-020: '{function}' has no input named '{input}'")]
    UnknownInput { function: String, input: String },

    #[error("WX-021: Missing required input '{input}' for '{function}'")]
    MissingInput { function: String, input: String },

    #[error("WX-022: Input '{input}' expects {expected}, got '{raw}'")]
    InvalidValue {
        input: String,
        expected: &'static str,
        raw: String,
    },

    #[error("WX-023: Malformed assignment '{raw}' (expected name=value)")]
    MalformedAssignment { raw: String },

    #[error("WX-024: Value of '{input}' contains '{ch}', which cannot be quoted safely")]
    UnsafeValue { input: String, ch: char },

    #[error("WX-025: Template references '{input}' but no value is bound")]
    UnboundInput { input: String },

    // ─────────────────────────────────────────────────────────────
    // Execution errors (WX-030 to WX-039)
    // ─────────────────────────────────────────────────────────────

    #[error("WX-030: Input file not found: {}", path.display())]
    InputFileNotFound { path: PathBuf },

    #[error("WX-031: Input '{input}' must have extension {expected}, got '{}'", path.display())]
    BadExtension {
        input: String,
        path: PathBuf,
        expected: String,
    },

    #[error("WX-032: Command failed with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("WX-033: Command timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("WX-034: Expected output '{output}' was not produced at '{path}'")]
    MissingOutput { output: String, path: String },

    #[error("WX-035: Failed to spawn tool: {0}")]
    Spawn(String),

    #[error("WX-036: Config error: {reason}")]
    Config { reason: String },
}

impl FixSuggestion for WxError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            WxError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            WxError::Json(_) => None,
            WxError::Io(_) => Some("Check file path and permissions"),
            WxError::InvalidName { .. } => {
                Some("Use 1-64 ASCII letters, digits, '-' or '_' for names")
            }
            WxError::Duplicate { .. } => Some("Give every input and output a unique name"),
            WxError::InvalidPath { .. } => {
                Some("Use a relative path inside the working directory, e.g. weather.epw")
            }
            WxError::UndeclaredReference { .. } => {
                Some("Declare the input or fix the {{self.name}} reference in the command")
            }
            WxError::DefaultKind { .. } => Some("Make the default match the input type"),
            WxError::Incomplete { .. } => Some("Every function needs a command"),
            WxError::UnknownFunction { .. } => Some("Run `wxflow list` to see available functions"),
            WxError::DuplicateFunction { .. } => {
                Some("Rename the function in your definitions file")
            }
            WxError::UnknownInput { .. } => {
                Some("Run `wxflow show <function>` to see its inputs")
            }
            WxError::MissingInput { .. } => Some("Pass it with --set name=value"),
            WxError::InvalidValue { .. } => Some("Check the value type with `wxflow show`"),
            WxError::MalformedAssignment { .. } => Some("Use --set name=value"),
            WxError::UnsafeValue { .. } => Some("Remove quotes, backticks, '$' and '\\' from the value"),
            WxError::UnboundInput { .. } => None,
            WxError::InputFileNotFound { .. } => Some("Check the input file path"),
            WxError::BadExtension { .. } => Some("Pass a file of the expected format"),
            WxError::CommandFailed { .. } => {
                Some("Check the tool's stderr above; run `wxflow doctor` to verify the tool")
            }
            WxError::Timeout { .. } => Some("Raise the timeout with --timeout or WXFLOW_TIMEOUT_SECS"),
            WxError::MissingOutput { .. } => {
                Some("The tool exited cleanly but did not write the declared file")
            }
            WxError::Spawn(_) => Some("Make sure `sh` is available and the working directory exists"),
            WxError::Config { .. } => Some("Check wxflow.yaml and WXFLOW_* environment variables"),
        }
    }
}

impl WxError {
    /// Stable error code (e.g. `WX-021`), if the variant has one
    pub fn code(&self) -> Option<&'static str> {
        let code = match self {
            WxError::YamlParse(_) | WxError::Json(_) | WxError::Io(_) => return None,
            WxError::InvalidName { .. } => "WX-010",
            WxError::Duplicate { .. } => "WX-011",
            WxError::InvalidPath { .. } => "WX-012",
            WxError::UndeclaredReference { .. } => "WX-013",
            WxError::DefaultKind { .. } => "WX-014",
            WxError::Incomplete { .. } => "WX-015",
            WxError::UnknownFunction { .. } => "WX-016",
            WxError::DuplicateFunction { .. } => "WX-017",
            WxError::UnknownInput { .. } => "WX-020",
            WxError::MissingInput { .. } => "WX-021",
            WxError::InvalidValue { .. } => "WX-022",
            WxError::MalformedAssignment { .. } => "WX-023",
            WxError::UnsafeValue { .. } => "WX-024",
            WxError::UnboundInput { .. } => "WX-025",
            WxError::InputFileNotFound { .. } => "WX-030",
            WxError::BadExtension { .. } => "WX-031",
            WxError::CommandFailed { .. } => "WX-032",
            WxError::Timeout { .. } => "WX-033",
            WxError::MissingOutput { .. } => "WX-034",
            WxError::Spawn(_) => "WX-035",
            WxError::Config { .. } => "WX-036",
        };
        Some(code)
    }
}
