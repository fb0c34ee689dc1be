//! Declaration interchange
//!
//! Functions are exchanged with the orchestration host as typed documents:
//!
//! ```yaml
//! type: Function
//! name: epw-to-ddy
//! description: Translate an .epw file to a .ddy file.
//! inputs:
//!   - type: FunctionFileInput
//!     name: epw
//!     description: Weather file.
//!     path: weather.epw
//!     extensions: [epw]
//!   - type: FunctionNumberInput
//!     name: percentile
//!     description: ...
//!     default: 0.4
//! command: ladybug translate epw-to-ddy weather.epw --percentile {{inputs.percentile}} --output-file weather.ddy
//! outputs:
//!   - type: FunctionFileOutput
//!     name: ddy
//!     description: A ddy file generated from the input epw.
//!     path: weather.ddy
//! ```
//!
//! Exported commands use `{{inputs.x}}`; loading converts back to
//! `{{self.x}}` and validates every function.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WxError;
use crate::function::{Function, InputSpec, OutputSpec};
use crate::template;
use crate::types::Name;
use crate::value::{InputKind, InputValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FunctionTag {
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum OutputTag {
    FunctionFileOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ExportedInput {
    #[serde(rename = "FunctionFileInput")]
    File {
        name: Name,
        #[serde(default)]
        description: String,
        path: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        extensions: Vec<String>,
    },
    #[serde(rename = "FunctionStringInput")]
    Str {
        name: Name,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    #[serde(rename = "FunctionIntegerInput")]
    Int {
        name: Name,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<i64>,
    },
    #[serde(rename = "FunctionNumberInput")]
    Float {
        name: Name,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ExportedOutput {
    #[serde(rename = "type")]
    tag: OutputTag,
    name: Name,
    #[serde(default)]
    description: String,
    path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ExportedFunction {
    #[serde(rename = "type")]
    tag: FunctionTag,
    name: Name,
    #[serde(default)]
    description: String,
    #[serde(default)]
    inputs: Vec<ExportedInput>,
    command: String,
    #[serde(default)]
    outputs: Vec<ExportedOutput>,
}

/// A definitions file holding a list of functions under `functions:`
#[derive(Debug, Deserialize)]
struct ManyDocument {
    functions: Vec<ExportedFunction>,
}

#[derive(Serialize)]
struct ManyRef<'a> {
    functions: &'a [ExportedFunction],
}

impl ExportedInput {
    fn from_spec(spec: &InputSpec) -> Self {
        let name = spec.name.clone();
        let description = spec.description.clone();
        let default = spec.default.clone().and_then(|d| d.coerce(spec.kind));

        match spec.kind {
            InputKind::File => ExportedInput::File {
                name,
                description,
                path: spec.path.clone().unwrap_or_default(),
                extensions: spec.extensions.clone(),
            },
            InputKind::Str => ExportedInput::Str {
                name,
                description,
                default: match default {
                    Some(InputValue::Str(s)) => Some(s),
                    _ => None,
                },
            },
            InputKind::Int => ExportedInput::Int {
                name,
                description,
                default: match default {
                    Some(InputValue::Int(i)) => Some(i),
                    _ => None,
                },
            },
            InputKind::Float => ExportedInput::Float {
                name,
                description,
                default: match default {
                    Some(InputValue::Float(f)) => Some(f),
                    _ => None,
                },
            },
        }
    }

    fn into_spec(self) -> InputSpec {
        let (name, kind, description, default, path, extensions) = match self {
            ExportedInput::File {
                name,
                description,
                path,
                extensions,
            } => (name, InputKind::File, description, None, Some(path), extensions),
            ExportedInput::Str {
                name,
                description,
                default,
            } => (name, InputKind::Str, description, default.map(InputValue::Str), None, vec![]),
            ExportedInput::Int {
                name,
                description,
                default,
            } => (name, InputKind::Int, description, default.map(InputValue::Int), None, vec![]),
            ExportedInput::Float {
                name,
                description,
                default,
            } => (
                name,
                InputKind::Float,
                description,
                default.map(InputValue::Float),
                None,
                vec![],
            ),
        };

        InputSpec {
            name,
            kind,
            description,
            default,
            path,
            extensions,
        }
    }
}

impl From<&Function> for ExportedFunction {
    fn from(f: &Function) -> Self {
        Self {
            tag: FunctionTag::Function,
            name: f.name.clone(),
            description: f.description.clone(),
            inputs: f.inputs.iter().map(ExportedInput::from_spec).collect(),
            command: template::to_exported(&f.command),
            outputs: f
                .outputs
                .iter()
                .map(|o| ExportedOutput {
                    tag: OutputTag::FunctionFileOutput,
                    name: o.name.clone(),
                    description: o.description.clone(),
                    path: o.path.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<ExportedFunction> for Function {
    type Error = WxError;

    fn try_from(e: ExportedFunction) -> Result<Self, Self::Error> {
        let function = Function {
            name: e.name,
            description: e.description,
            inputs: e.inputs.into_iter().map(ExportedInput::into_spec).collect(),
            command: template::to_authoring(&e.command),
            outputs: e
                .outputs
                .into_iter()
                .map(|o| OutputSpec {
                    name: o.name,
                    description: o.description,
                    path: o.path,
                })
                .collect(),
        };
        function.validate()?;
        Ok(function)
    }
}

/// Serialize one function
pub fn export_function(function: &Function, format: ExportFormat) -> Result<String, WxError> {
    let exported = ExportedFunction::from(function);
    match format {
        ExportFormat::Yaml => Ok(serde_yaml::to_string(&exported)?),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&exported)?),
    }
}

/// Serialize several functions under a `functions:` key
pub fn export_functions<'a, I>(functions: I, format: ExportFormat) -> Result<String, WxError>
where
    I: IntoIterator<Item = &'a Function>,
{
    let exported: Vec<ExportedFunction> = functions.into_iter().map(ExportedFunction::from).collect();
    let doc = ManyRef {
        functions: &exported,
    };
    match format {
        ExportFormat::Yaml => Ok(serde_yaml::to_string(&doc)?),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&doc)?),
    }
}

/// Parse a definitions document (YAML or JSON)
///
/// The shape is decided up front so deserialization errors keep their
/// message and location.
pub fn load_str(text: &str) -> Result<Vec<Function>, WxError> {
    let shape: serde_yaml::Value = serde_yaml::from_str(text)?;
    let exported = if shape.get("functions").is_some() {
        serde_yaml::from_str::<ManyDocument>(text)?.functions
    } else {
        vec![serde_yaml::from_str::<ExportedFunction>(text)?]
    };
    exported.into_iter().map(Function::try_from).collect()
}

/// Parse a definitions file
pub fn load_file(path: &Path) -> Result<Vec<Function>, WxError> {
    let text = std::fs::read_to_string(path)?;
    let functions = load_str(&text)?;
    debug!(path = %path.display(), count = functions.len(), "loaded definitions");
    Ok(functions)
}
