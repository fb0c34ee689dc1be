//! Typed input values
//!
//! Values arrive either as defaults in declarations or as `name=value` text
//! on the command line, and leave as the text substituted into a command.

use std::fmt;
use std::path::PathBuf;

use crate::error::WxError;

/// The primitive type of a function input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    File,
    Str,
    Int,
    Float,
}

impl InputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InputKind::File => "file",
            InputKind::Str => "string",
            InputKind::Int => "integer",
            InputKind::Float => "number",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A concrete value bound to an input
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Int(i64),
    Float(f64),
    Str(String),
    File(PathBuf),
}

impl InputValue {
    /// Parse command-line text for an input of the given kind
    pub fn parse(kind: InputKind, input: &str, raw: &str) -> Result<Self, WxError> {
        let invalid = || WxError::InvalidValue {
            input: input.to_string(),
            expected: kind.as_str(),
            raw: raw.to_string(),
        };

        match kind {
            InputKind::Str => Ok(InputValue::Str(raw.to_string())),
            InputKind::File => {
                if raw.trim().is_empty() {
                    return Err(invalid());
                }
                Ok(InputValue::File(PathBuf::from(raw)))
            }
            InputKind::Int => raw.trim().parse::<i64>().map(InputValue::Int).map_err(|_| invalid()),
            InputKind::Float => {
                let parsed = raw.trim().parse::<f64>().map_err(|_| invalid())?;
                if parsed.is_finite() {
                    Ok(InputValue::Float(parsed))
                } else {
                    Err(invalid())
                }
            }
        }
    }

    /// The kind this value satisfies
    pub fn kind(&self) -> InputKind {
        match self {
            InputValue::File(_) => InputKind::File,
            InputValue::Str(_) => InputKind::Str,
            InputValue::Int(_) => InputKind::Int,
            InputValue::Float(_) => InputKind::Float,
        }
    }

    /// Coerce a document value into `kind`
    ///
    /// Integers widen to floats and strings name files; nothing else converts.
    pub fn coerce(self, kind: InputKind) -> Option<Self> {
        match (self, kind) {
            (v, k) if v.kind() == k => Some(v),
            (InputValue::Int(i), InputKind::Float) => Some(InputValue::Float(i as f64)),
            (InputValue::Str(s), InputKind::File) => Some(InputValue::File(PathBuf::from(s))),
            _ => None,
        }
    }

    /// Text substituted into a command template
    pub fn render(&self) -> String {
        match self {
            InputValue::Str(s) => s.clone(),
            InputValue::Int(i) => i.to_string(),
            InputValue::Float(f) => format_float(*f),
            InputValue::File(p) => p.display().to_string(),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<i64> for InputValue {
    fn from(v: i64) -> Self {
        InputValue::Int(v)
    }
}

impl From<f64> for InputValue {
    fn from(v: f64) -> Self {
        InputValue::Float(v)
    }
}

impl From<&str> for InputValue {
    fn from(v: &str) -> Self {
        InputValue::Str(v.to_string())
    }
}

impl From<String> for InputValue {
    fn from(v: String) -> Self {
        InputValue::Str(v)
    }
}

impl From<PathBuf> for InputValue {
    fn from(v: PathBuf) -> Self {
        InputValue::File(v)
    }
}

/// Format a float the way the translation tool's callers always have:
/// shortest round-trip digits, a fractional part on whole numbers, and
/// scientific notation with a signed two-digit exponent outside `[1e-4, 1e16)`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{:e}", v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if v != 0.0 && !(-4..16).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exp.abs());
    }

    let plain = v.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rendering_matches_documented_defaults() {
        assert_eq!(format_float(0.4), "0.4");
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(99.6), "99.6");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(-0.0), "-0.0");
    }

    #[test]
    fn float_rendering_switches_to_scientific() {
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e20), "1.5e+20");
        assert_eq!(format_float(1e15), "1000000000000000.0");
    }

    #[test]
    fn parse_int() {
        let v = InputValue::parse(InputKind::Int, "timestep", "6").unwrap();
        assert_eq!(v, InputValue::Int(6));
        assert!(InputValue::parse(InputKind::Int, "timestep", "1.5").is_err());
        assert!(InputValue::parse(InputKind::Int, "timestep", "six").is_err());
    }

    #[test]
    fn parse_float_accepts_integer_literal() {
        let v = InputValue::parse(InputKind::Float, "percentile", "1").unwrap();
        assert_eq!(v.render(), "1.0");
        assert!(InputValue::parse(InputKind::Float, "percentile", "inf").is_err());
    }

    #[test]
    fn parse_str_is_verbatim() {
        let v = InputValue::parse(InputKind::Str, "period", " 6/21 to 9/21 ").unwrap();
        assert_eq!(v.render(), " 6/21 to 9/21 ");
    }

    #[test]
    fn parse_file_rejects_blank() {
        assert!(InputValue::parse(InputKind::File, "epw", "  ").is_err());
        let v = InputValue::parse(InputKind::File, "epw", "data/boston.epw").unwrap();
        assert_eq!(v.kind(), InputKind::File);
    }

    #[test]
    fn coerce_widens_int_to_float() {
        assert_eq!(
            InputValue::Int(2).coerce(InputKind::Float),
            Some(InputValue::Float(2.0))
        );
        assert_eq!(InputValue::Float(2.0).coerce(InputKind::Int), None);
        assert_eq!(InputValue::Str("x".into()).coerce(InputKind::Int), None);
    }
}
