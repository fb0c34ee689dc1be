//! wxflow - task definitions for EPW/WEA/DDY weather-file translation

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod function;
pub mod runtime;
pub mod task;
pub mod template;
pub mod translate;
pub mod types;
pub mod value;

pub use catalog::Catalog;
pub use config::WxConfig;
pub use error::{FixSuggestion, WxError};
pub use export::ExportFormat;
pub use function::{Function, FunctionBuilder, InputSpec, OutputSpec};
pub use runtime::{MockRunner, ProcessRunner, TaskExecutor, TaskOutcome, ToolRunner};
pub use task::Task;
pub use types::Name;
pub use value::{InputKind, InputValue};
