//! NewType wrappers for declaration names
//!
//! Function, input and output names end up in templates, file names and
//! exported documents, so they are validated once at construction.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::WxError;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid name regex"));

/// Strongly-typed declaration name
///
/// Guarantees:
/// - Non-empty, starts with an ASCII letter or digit
/// - Only ASCII alphanumerics, dash and underscore
/// - Maximum 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Maximum allowed length
    pub const MAX_LENGTH: usize = 64;

    /// Create a new name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, WxError> {
        let name = name.into();

        if name.is_empty() {
            return Err(invalid(name, "cannot be empty"));
        }
        if name.len() > Self::MAX_LENGTH {
            let reason = format!("too long ({} > {})", name.len(), Self::MAX_LENGTH);
            return Err(invalid(name, &reason));
        }
        if !NAME_RE.is_match(&name) {
            return Err(invalid(name, "contains invalid characters"));
        }

        Ok(Name(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn invalid(name: String, reason: &str) -> WxError {
    WxError::InvalidName {
        name,
        reason: reason.to_string(),
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Name {
    type Err = WxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = WxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl TryFrom<&str> for Name {
    type Error = WxError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_kebab_and_snake() {
        assert!(Name::new("epw-to-wea").is_ok());
        assert!(Name::new("constant_wea").is_ok());
        assert!(Name::new("ddy2").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(Name::new(""), Err(WxError::InvalidName { .. })));
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(Name::new("epw to wea").is_err());
        assert!(Name::new("-leading").is_err());
        assert!(Name::new("self.epw").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(Name::MAX_LENGTH + 1);
        assert!(Name::new(long).is_err());
        assert!(Name::new("a".repeat(Name::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn deserializes_with_validation() {
        let ok: Name = serde_yaml::from_str("epw").unwrap();
        assert_eq!(ok, "epw");
        assert!(serde_yaml::from_str::<Name>("'bad name'").is_err());
    }
}
