//! Task binding
//!
//! A [`Task`] is a [`Function`] with a concrete value for every input. It is
//! built once per invocation, rendered, executed and dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::WxError;
use crate::function::{Function, InputSpec};
use crate::template;
use crate::value::{InputKind, InputValue};

/// Characters that would break out of the double quotes a template wraps
/// string values in
const UNQUOTABLE: [char; 4] = ['"', '`', '$', '\\'];

/// A function with all inputs bound
#[derive(Debug, Clone)]
pub struct Task {
    function: Arc<Function>,
    values: BTreeMap<String, InputValue>,
}

impl Task {
    /// Bind typed values; inputs left out fall back to their defaults
    pub fn bind(
        function: Arc<Function>,
        args: impl IntoIterator<Item = (String, InputValue)>,
    ) -> Result<Self, WxError> {
        let mut values = BTreeMap::new();

        for (name, value) in args {
            let spec = lookup_input(&function, &name)?;
            let kind = spec.kind;
            let raw = value.render();
            let value = value.coerce(kind).ok_or_else(|| WxError::InvalidValue {
                input: name.clone(),
                expected: kind.as_str(),
                raw,
            })?;
            check_quotable(&name, &value)?;
            values.insert(name, value);
        }

        for spec in &function.inputs {
            if values.contains_key(spec.name.as_str()) {
                continue;
            }
            match &spec.default {
                Some(default) => {
                    let value = default.clone().coerce(spec.kind).ok_or_else(|| {
                        WxError::DefaultKind {
                            input: spec.name.to_string(),
                            expected: spec.kind.as_str(),
                            found: default.kind().as_str(),
                        }
                    })?;
                    values.insert(spec.name.to_string(), value);
                }
                None => {
                    return Err(WxError::MissingInput {
                        function: function.name.to_string(),
                        input: spec.name.to_string(),
                    })
                }
            }
        }

        debug!(function = %function.name, inputs = values.len(), "bound task");
        Ok(Self { function, values })
    }

    /// Bind `name=value` assignments from the command line
    pub fn bind_raw<S: AsRef<str>>(function: Arc<Function>, pairs: &[S]) -> Result<Self, WxError> {
        let mut args = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let (name, raw) = parse_assignment(pair.as_ref())?;
            let spec = lookup_input(&function, name)?;
            args.push((name.to_string(), InputValue::parse(spec.kind, name, raw)?));
        }
        Self::bind(function, args)
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn name(&self) -> &str {
        self.function.name.as_str()
    }

    pub fn value(&self, name: &str) -> Option<&InputValue> {
        self.values.get(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// File inputs with the host path they were bound to
    pub fn file_inputs(&self) -> impl Iterator<Item = (&InputSpec, &std::path::Path)> {
        self.function.inputs.iter().filter_map(|spec| {
            match self.values.get(spec.name.as_str()) {
                Some(InputValue::File(path)) => Some((spec, path.as_path())),
                _ => None,
            }
        })
    }

    /// Render the command template
    ///
    /// File inputs render as their staging path inside the working directory,
    /// since that is where the command will find them.
    pub fn command(&self) -> Result<String, WxError> {
        template::render(&self.function.command, |name| {
            let spec = self.function.input(name)?;
            match spec.kind {
                InputKind::File => spec.path.clone(),
                _ => self.values.get(name).map(InputValue::render),
            }
        })
    }

    /// `(output name, path in working directory)` for every declared output
    pub fn declared_outputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.function
            .outputs
            .iter()
            .map(|o| (o.name.as_str(), o.path.as_str()))
    }
}

fn lookup_input<'a>(function: &'a Function, name: &str) -> Result<&'a InputSpec, WxError> {
    function.input(name).ok_or_else(|| WxError::UnknownInput {
        function: function.name.to_string(),
        input: name.to_string(),
    })
}

fn check_quotable(name: &str, value: &InputValue) -> Result<(), WxError> {
    if let InputValue::Str(s) = value {
        if let Some(ch) = s.chars().find(|c| UNQUOTABLE.contains(c)) {
            return Err(WxError::UnsafeValue {
                input: name.to_string(),
                ch,
            });
        }
    }
    Ok(())
}

/// Split `name=value`; the value may itself contain `=`
pub fn parse_assignment(raw: &str) -> Result<(&str, &str), WxError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => Err(WxError::MalformedAssignment {
            raw: raw.to_string(),
        }),
    }
}
