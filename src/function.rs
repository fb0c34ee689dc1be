//! Function declarations
//!
//! A [`Function`] describes one task: its typed inputs, the command template
//! that invokes the external tool, and the files the command is expected to
//! leave behind. Declarations carry no behaviour of their own; binding and
//! execution live in [`crate::task`] and [`crate::runtime`].

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::error::WxError;
use crate::template;
use crate::types::Name;
use crate::value::{InputKind, InputValue};

/// A declared input
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: Name,
    pub kind: InputKind,
    pub description: String,
    pub default: Option<InputValue>,
    /// Where a file input is staged inside the working directory
    pub path: Option<String>,
    /// Accepted file extensions (without the dot); empty accepts any
    pub extensions: Vec<String>,
}

impl InputSpec {
    fn new(name: &str, kind: InputKind, description: &str) -> Result<Self, WxError> {
        Ok(Self {
            name: Name::new(name)?,
            kind,
            description: description.to_string(),
            default: None,
            path: None,
            extensions: Vec::new(),
        })
    }

    /// File input staged at `path`
    pub fn file(name: &str, description: &str, path: &str) -> Result<Self, WxError> {
        let mut spec = Self::new(name, InputKind::File, description)?;
        spec.path = Some(path.to_string());
        Ok(spec)
    }

    pub fn string(name: &str, description: &str) -> Result<Self, WxError> {
        Self::new(name, InputKind::Str, description)
    }

    pub fn int(name: &str, description: &str) -> Result<Self, WxError> {
        Self::new(name, InputKind::Int, description)
    }

    pub fn float(name: &str, description: &str) -> Result<Self, WxError> {
        Self::new(name, InputKind::Float, description)
    }

    pub fn with_default(mut self, value: impl Into<InputValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// An input with no default must be supplied at bind time
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Case-insensitive extension check; inputs without extensions accept any file
    pub fn accepts_extension(&self, file: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(ext) = file.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// A declared output file
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub name: Name,
    pub description: String,
    pub path: String,
}

impl OutputSpec {
    pub fn file(name: &str, description: &str, path: &str) -> Result<Self, WxError> {
        Ok(Self {
            name: Name::new(name)?,
            description: description.to_string(),
            path: path.to_string(),
        })
    }
}

/// A task declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Name,
    pub description: String,
    pub inputs: Vec<InputSpec>,
    /// Command template in `{{self.name}}` form
    pub command: String,
    pub outputs: Vec<OutputSpec>,
}

impl Function {
    pub fn builder(name: &str) -> FunctionBuilder {
        FunctionBuilder::new(name)
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Check the declaration is self-consistent
    pub fn validate(&self) -> Result<(), WxError> {
        let function = self.name.to_string();

        if self.command.trim().is_empty() {
            return Err(WxError::Incomplete {
                function,
                reason: "command is empty".into(),
            });
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.name.as_str()) {
                return Err(WxError::Duplicate {
                    what: "input",
                    name: input.name.to_string(),
                    function,
                });
            }
            validate_input(input)?;
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert(output.name.as_str()) {
                return Err(WxError::Duplicate {
                    what: "output",
                    name: output.name.to_string(),
                    function,
                });
            }
            check_relative_path(&output.name, &output.path)?;
        }

        for reference in template::references(&self.command) {
            if self.input(&reference).is_none() {
                return Err(WxError::UndeclaredReference {
                    function,
                    input: reference,
                });
            }
        }

        Ok(())
    }
}

fn validate_input(input: &InputSpec) -> Result<(), WxError> {
    match (&input.path, input.kind) {
        (Some(path), InputKind::File) => check_relative_path(&input.name, path)?,
        (None, InputKind::File) => {
            return Err(WxError::InvalidPath {
                name: input.name.to_string(),
                path: String::new(),
                reason: "file inputs need a staging path".into(),
            })
        }
        (Some(path), _) => {
            return Err(WxError::InvalidPath {
                name: input.name.to_string(),
                path: path.clone(),
                reason: format!("{} inputs are not staged", input.kind),
            })
        }
        (None, _) => {}
    }

    if let Some(default) = &input.default {
        if default.clone().coerce(input.kind).is_none() {
            return Err(WxError::DefaultKind {
                input: input.name.to_string(),
                expected: input.kind.as_str(),
                found: default.kind().as_str(),
            });
        }
    }

    Ok(())
}

/// A path is well-formed when it is non-empty, relative, and stays inside
/// the working directory
pub fn check_relative_path(name: &str, path: &str) -> Result<(), WxError> {
    let fail = |reason: &str| {
        Err(WxError::InvalidPath {
            name: name.to_string(),
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.trim().is_empty() {
        return fail("path is empty");
    }
    if path.contains('\0') {
        return fail("path contains a NUL byte");
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return fail("path must be relative");
    }
    if path.split(['/', '\\']).any(str::is_empty) {
        return fail("path has an empty segment");
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return fail("path escapes the working directory"),
            Component::RootDir | Component::Prefix(_) => return fail("path must be relative"),
        }
    }

    Ok(())
}

// ============================================================================
// FUNCTION BUILDER
// ============================================================================

/// Fluent builder for constructing function declarations
pub struct FunctionBuilder {
    name: String,
    description: String,
    inputs: Vec<Result<InputSpec, WxError>>,
    command: Option<String>,
    outputs: Vec<Result<OutputSpec, WxError>>,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            inputs: Vec::new(),
            command: None,
            outputs: Vec::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Add an input; construction errors surface from `build()`
    pub fn input(mut self, input: Result<InputSpec, WxError>) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.command = Some(command.to_string());
        self
    }

    pub fn output(mut self, output: Result<OutputSpec, WxError>) -> Self {
        self.outputs.push(output);
        self
    }

    /// Build and validate the function
    pub fn build(self) -> Result<Function, WxError> {
        let name = Name::new(self.name)?;
        let command = self.command.ok_or_else(|| WxError::Incomplete {
            function: name.to_string(),
            reason: "no command".into(),
        })?;

        let function = Function {
            name,
            description: self.description,
            inputs: self.inputs.into_iter().collect::<Result<_, _>>()?,
            command,
            outputs: self.outputs.into_iter().collect::<Result<_, _>>()?,
        };
        function.validate()?;
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_builder() -> FunctionBuilder {
        Function::builder("echo")
            .description("Echo a file")
            .input(InputSpec::file("src", "Source", "in.txt").map(|i| i.with_extensions(["txt"])))
            .command("cp in.txt out.txt")
            .output(OutputSpec::file("dst", "Copy", "out.txt"))
    }

    #[test]
    fn builds_valid_function() {
        let f = echo_builder().build().unwrap();
        assert_eq!(f.name, "echo");
        assert!(f.input("src").unwrap().is_required());
        assert_eq!(f.output("dst").unwrap().path, "out.txt");
    }

    #[test]
    fn missing_command_is_incomplete() {
        let err = Function::builder("x").build().unwrap_err();
        assert!(matches!(err, WxError::Incomplete { .. }));
    }

    #[test]
    fn undeclared_reference_rejected() {
        let err = echo_builder()
            .command("cp {{self.nope}} out.txt")
            .build()
            .unwrap_err();
        assert!(matches!(err, WxError::UndeclaredReference { input, .. } if input == "nope"));
    }

    #[test]
    fn duplicate_input_rejected() {
        let err = echo_builder()
            .input(InputSpec::string("src", "again"))
            .build()
            .unwrap_err();
        assert!(matches!(err, WxError::Duplicate { what: "input", .. }));
    }

    #[test]
    fn default_kind_mismatch_rejected() {
        let err = echo_builder()
            .input(InputSpec::int("n", "count").map(|i| i.with_default("many")))
            .build()
            .unwrap_err();
        assert!(matches!(err, WxError::DefaultKind { .. }));
    }

    #[test]
    fn int_default_is_valid_for_float_input() {
        let f = echo_builder()
            .input(InputSpec::float("p", "pct").map(|i| i.with_default(1i64)))
            .build();
        assert!(f.is_ok());
    }

    #[test]
    fn file_input_needs_path() {
        let mut f = echo_builder().build().unwrap();
        f.inputs[0].path = None;
        assert!(matches!(f.validate(), Err(WxError::InvalidPath { .. })));
    }

    #[test]
    fn output_paths_must_be_well_formed() {
        for bad in ["", "/tmp/out.wea", "../out.wea", "a//b.wea", "dir/"] {
            assert!(check_relative_path("o", bad).is_err(), "{bad:?} should fail");
        }
        for good in ["out.wea", "sub/out.wea", "./out.wea"] {
            assert!(check_relative_path("o", good).is_ok(), "{good:?} should pass");
        }
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let input = InputSpec::file("epw", "", "weather.epw")
            .unwrap()
            .with_extensions(["epw"]);
        assert!(input.accepts_extension(Path::new("a/BOSTON.EPW")));
        assert!(!input.accepts_extension(Path::new("boston.wea")));
        assert!(!input.accepts_extension(Path::new("boston")));
    }
}
