//! Single-pass command template resolver with caching
//!
//! Command templates reference inputs as `{{self.name}}` (authoring form) or
//! `{{inputs.name}}` (exported form). Both resolve against the same bound
//! values. Any other `{{...}}` sequence is kept as literal text.
//!
//! Templates are tokenized once and cached; the built-in functions render the
//! same handful of templates over and over.

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::WxError;

/// Which prefix a reference was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefStyle {
    /// `{{self.name}}`
    SelfRef,
    /// `{{inputs.name}}`
    Inputs,
}

impl RefStyle {
    fn prefix(self) -> &'static str {
        match self {
            RefStyle::SelfRef => "self",
            RefStyle::Inputs => "inputs",
        }
    }
}

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text (stores range in original string)
    Literal(Range<usize>),
    /// Input reference
    InputRef { name: String, style: RefStyle },
}

/// Template resolver with caching
pub struct TemplateResolver {
    cache: DashMap<String, Arc<Vec<Token>>>,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Parse template into tokens (with caching)
    pub fn tokenize(&self, template: &str) -> Arc<Vec<Token>> {
        if let Some(cached) = self.cache.get(template) {
            return Arc::clone(&cached);
        }

        let tokens = Arc::new(tokenize_uncached(template));
        self.cache.insert(template.to_string(), Arc::clone(&tokens));
        tokens
    }

    /// Resolve template, looking each referenced input up with `lookup`
    pub fn resolve<F>(&self, template: &str, mut lookup: F) -> Result<String, WxError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let tokens = self.tokenize(template);
        let mut result = String::with_capacity(template.len() + 32);

        for token in tokens.iter() {
            match token {
                Token::Literal(range) => result.push_str(&template[range.clone()]),
                Token::InputRef { name, .. } => {
                    let value = lookup(name).ok_or_else(|| WxError::UnboundInput {
                        input: name.clone(),
                    })?;
                    result.push_str(&value);
                }
            }
        }

        Ok(result)
    }

    /// Rewrite every reference into `style`, leaving literals untouched
    pub fn restyle(&self, template: &str, style: RefStyle) -> String {
        let tokens = self.tokenize(template);
        let mut result = String::with_capacity(template.len() + 16);

        for token in tokens.iter() {
            match token {
                Token::Literal(range) => result.push_str(&template[range.clone()]),
                Token::InputRef { name, .. } => {
                    result.push_str("{{");
                    result.push_str(style.prefix());
                    result.push('.');
                    result.push_str(name);
                    result.push_str("}}");
                }
            }
        }

        result
    }

    /// Names of referenced inputs, in order of first appearance
    pub fn references(&self, template: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for token in self.tokenize(template).iter() {
            if let Token::InputRef { name, .. } = token {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

fn tokenize_uncached(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find("{{") {
        let open = cursor + offset;
        let Some(close_offset) = template[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close_offset;

        match parse_reference(&template[open + 2..close]) {
            Some((name, style)) => {
                if open > literal_start {
                    tokens.push(Token::Literal(literal_start..open));
                }
                tokens.push(Token::InputRef { name, style });
                literal_start = close + 2;
                cursor = close + 2;
            }
            // Not ours: keep scanning after the opening braces
            None => cursor = open + 2,
        }
    }

    if literal_start < template.len() {
        tokens.push(Token::Literal(literal_start..template.len()));
    }

    tokens
}

/// Parse `self.name` / `inputs.name` (surrounding whitespace allowed)
fn parse_reference(content: &str) -> Option<(String, RefStyle)> {
    let content = content.trim();
    let (style, name) = if let Some(name) = content.strip_prefix("self.") {
        (RefStyle::SelfRef, name)
    } else if let Some(name) = content.strip_prefix("inputs.") {
        (RefStyle::Inputs, name)
    } else {
        return None;
    };

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| (name.to_string(), style))
}

/// Global template resolver instance
pub static TEMPLATE_RESOLVER: Lazy<TemplateResolver> = Lazy::new(TemplateResolver::new);

/// Render `template` against `lookup` using the global resolver
pub fn render<F>(template: &str, lookup: F) -> Result<String, WxError>
where
    F: FnMut(&str) -> Option<String>,
{
    TEMPLATE_RESOLVER.resolve(template, lookup)
}

/// Input names referenced by `template`
pub fn references(template: &str) -> Vec<String> {
    TEMPLATE_RESOLVER.references(template)
}

/// `{{self.x}}` → `{{inputs.x}}`
pub fn to_exported(template: &str) -> String {
    TEMPLATE_RESOLVER.restyle(template, RefStyle::Inputs)
}

/// `{{inputs.x}}` → `{{self.x}}`
pub fn to_authoring(template: &str) -> String {
    TEMPLATE_RESOLVER.restyle(template, RefStyle::SelfRef)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn tokenize_simple_literal() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("ladybug translate");
        assert_eq!(tokens.as_slice(), &[Token::Literal(0..17)]);
    }

    #[test]
    fn tokenize_self_ref() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("--value {{self.value}}");
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            tokens[1],
            Token::InputRef {
                name: "value".into(),
                style: RefStyle::SelfRef
            }
        );
    }

    #[test]
    fn tokenize_inputs_ref_with_spaces() {
        let resolver = TemplateResolver::new();
        let tokens = resolver.tokenize("{{ inputs.period }}");
        assert_eq!(
            tokens.as_slice(),
            &[Token::InputRef {
                name: "period".into(),
                style: RefStyle::Inputs
            }]
        );
    }

    #[test]
    fn foreign_braces_stay_literal() {
        let resolver = TemplateResolver::new();
        let out = resolver
            .resolve("echo {{other.x}} {{self.a}} {{", |_| Some("1".into()))
            .unwrap();
        assert_eq!(out, "echo {{other.x}} 1 {{");
    }

    #[test]
    fn resolve_substitutes_every_reference() {
        let resolver = TemplateResolver::new();
        let vals = values(&[("period", "6/21 to 9/21"), ("timestep", "2")]);
        let out = resolver
            .resolve(
                "--analysis-period \"{{self.period}}\" --timestep {{self.timestep}}",
                |n| vals.get(n).cloned(),
            )
            .unwrap();
        assert_eq!(out, "--analysis-period \"6/21 to 9/21\" --timestep 2");
    }

    #[test]
    fn resolve_unbound_is_error() {
        let resolver = TemplateResolver::new();
        let err = resolver.resolve("{{self.missing}}", |_| None).unwrap_err();
        assert!(matches!(err, WxError::UnboundInput { input } if input == "missing"));
    }

    #[test]
    fn restyle_round_trip() {
        let authoring = "a {{self.x}} b {{self.y}}";
        let exported = to_exported(authoring);
        assert_eq!(exported, "a {{inputs.x}} b {{inputs.y}}");
        assert_eq!(to_authoring(&exported), authoring);
    }

    #[test]
    fn references_are_deduplicated() {
        let refs = references("{{self.a}} {{inputs.b}} {{self.a}}");
        assert_eq!(refs, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn cache_reuse() {
        let resolver = TemplateResolver::new();
        let t1 = resolver.tokenize("{{self.epw}}");
        let t2 = resolver.tokenize("{{self.epw}}");
        assert!(Arc::ptr_eq(&t1, &t2));
    }
}
