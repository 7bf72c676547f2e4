//! Template rendering engine.
//!
//! This module provides:
//! - A parser for the placeholder template language
//!   (`{path.to.value:formatter(options):clause:clause}`)
//! - An immutable, ordered `FormatterRegistry` of named formatters with
//!   applicability predicates
//! - A `Renderer` that resolves dotted paths against a normalized `Value`
//!   and applies composable, recursively nestable formatters
//!
//! # Example
//!
//! ```ignore
//! let registry = Arc::new(FormatterRegistry::builtin());
//! let renderer = Renderer::new(registry);
//!
//! let data = normalize(r#"{"title":"Test Title"}"#)?;
//! let html = renderer.render_str("<h1>{title}</h1>", &data)?;
//! assert_eq!(html, "<h1>Test Title</h1>");
//! ```

mod builtins;
mod parser;
mod registry;

pub use parser::{parse, Node, Placeholder, Template};
pub use registry::{Formatter, FormatterRegistry, FormatterScope};

use std::sync::Arc;

use thiserror::Error;

use crate::value::Value;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Rendering-specific error type.
///
/// All variants are template-authoring defects: they fail the enclosing
/// render fast and are never retried. Unresolved path lookups are not
/// errors and render as empty text.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template parse error: {0}")]
    Parse(String),

    #[error("Formatter not found: {0}")]
    FormatterNotFound(String),

    #[error("Invalid options for formatter '{formatter}': {message}")]
    InvalidOptions { formatter: String, message: String },
}

impl RenderError {
    pub(crate) fn invalid_options(formatter: &str, message: impl Into<String>) -> Self {
        RenderError::InvalidOptions {
            formatter: formatter.to_string(),
            message: message.into(),
        }
    }
}

/// Template renderer.
///
/// Holds a shared, immutable formatter registry; a single renderer may be
/// used concurrently from many tasks since rendering is a pure, synchronous
/// recursive evaluation with no shared mutable state.
#[derive(Clone)]
pub struct Renderer {
    registry: Arc<FormatterRegistry>,
}

impl Renderer {
    /// Create a renderer over the given registry.
    pub fn new(registry: Arc<FormatterRegistry>) -> Self {
        Self { registry }
    }

    /// Create a renderer over the builtin registry.
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(FormatterRegistry::builtin()))
    }

    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// Parse and render a template source string against `data`.
    pub fn render_str(&self, template: &str, data: &Value) -> RenderResult<String> {
        let parsed = parse(template)?;
        self.render(&parsed, data)
    }

    /// Render a pre-parsed template against `data`.
    pub fn render(&self, template: &Template, data: &Value) -> RenderResult<String> {
        let mut out = String::new();
        self.render_into(template, Some(data), &mut out)?;
        Ok(out)
    }

    /// Render a template against a resolved value (or the unresolved
    /// marker). This is the recursion point used by clause rendering.
    pub(crate) fn render_into(
        &self,
        template: &Template,
        value: Option<&Value>,
        out: &mut String,
    ) -> RenderResult<()> {
        for node in template.nodes() {
            match node {
                Node::Literal(text) => out.push_str(text),
                Node::Placeholder(placeholder) => {
                    self.render_placeholder(placeholder, value, out)?;
                }
            }
        }
        Ok(())
    }

    fn render_placeholder(
        &self,
        placeholder: &Placeholder,
        current: Option<&Value>,
        out: &mut String,
    ) -> RenderResult<()> {
        let resolved = resolve_path(current, placeholder.path());

        // Build into a scratch buffer so a failing formatter leaves no
        // partial output for this placeholder.
        let mut scratch = String::new();

        match placeholder.formatter() {
            Some(name) => {
                let formatter = self
                    .registry
                    .lookup(name)
                    .ok_or_else(|| RenderError::FormatterNotFound(name.to_string()))?;

                let mut scope = FormatterScope::new(
                    self,
                    resolved,
                    placeholder.options(),
                    placeholder.clauses(),
                    false,
                    &mut scratch,
                );
                let handled = formatter.try_format(&mut scope)?;
                if !handled {
                    // An explicitly named formatter that declines renders
                    // nothing, mirroring how unresolved paths render empty.
                    scratch.clear();
                }
            }
            None => {
                let mut handled = false;
                for formatter in self.registry.iter() {
                    if !formatter.can_auto_detect() {
                        continue;
                    }
                    let mut scope = FormatterScope::new(
                        self,
                        resolved,
                        placeholder.options(),
                        placeholder.clauses(),
                        true,
                        &mut scratch,
                    );
                    if formatter.try_format(&mut scope)? {
                        handled = true;
                        break;
                    }
                    // A declining formatter must not leave output behind.
                    scratch.clear();
                }
                if !handled {
                    scratch.clear();
                }
            }
        }

        out.push_str(&scratch);
        Ok(())
    }
}

/// Resolve a dotted path against a value by successive key/index lookup.
///
/// A `Mapping` resolves by key and a `Sequence` by integer index. Resolving
/// through a scalar, a missing key, or an out-of-range index yields the
/// unresolved marker (`None`) rather than failing the render.
fn resolve_path<'a>(current: Option<&'a Value>, path: &[String]) -> Option<&'a Value> {
    let mut value = current?;
    for segment in path {
        value = match value {
            Value::Mapping(_) => value.get(segment)?,
            Value::Sequence(_) => value.index(segment.parse::<usize>().ok()?)?,
            Value::Scalar(_) => return None,
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::normalize;
    use pretty_assertions::assert_eq;

    fn render(template: &str, json: &str) -> RenderResult<String> {
        let data = normalize(json).unwrap();
        Renderer::with_builtins().render_str(template, &data)
    }

    #[test]
    fn test_literal_only_template() {
        let out = render("plain text, no placeholders", "{}").unwrap();
        assert_eq!(out, "plain text, no placeholders");
    }

    #[test]
    fn test_literal_brace_unescaping() {
        let out = render("{{\"quoted\": {title}}}", r#"{"title":"x"}"#).unwrap();
        assert_eq!(out, "{\"quoted\": x}");
    }

    #[test]
    fn test_simple_substitution() {
        let out = render("<h1>{title}</h1>", r#"{"title":"Test Title"}"#).unwrap();
        assert_eq!(out, "<h1>Test Title</h1>");
    }

    #[test]
    fn test_dotted_path() {
        let out = render(
            "{person.first_name} {person.last_name}",
            r#"{"person":{"first_name":"Mile","last_name":"Doe"}}"#,
        )
        .unwrap();
        assert_eq!(out, "Mile Doe");
    }

    #[test]
    fn test_sequence_index_path() {
        let out = render("{items.1}", r#"{"items":["a","b","c"]}"#).unwrap();
        assert_eq!(out, "b");
    }

    #[test]
    fn test_unresolved_path_renders_empty() {
        let out = render("[{missing.deep}]", r#"{"title":"x"}"#).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_resolving_through_scalar_is_unresolved() {
        let out = render("[{title.nested}]", r#"{"title":"x"}"#).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_unknown_formatter_fails_without_partial_output() {
        let err = render("before {title:no-such} after", r#"{"title":"x"}"#).unwrap_err();
        match err {
            RenderError::FormatterNotFound(name) => assert_eq!(name, "no-such"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_nested_dict_key_composition() {
        let out = render(
            "{person:dict-key(first_name)}-{person:dict-key(other):{somekey}}",
            r#"{"person":{"first_name":"Mile","other":{"somekey":"somevalue"}}}"#,
        )
        .unwrap();
        assert_eq!(out, "Mile-somevalue");
    }

    #[test]
    fn test_deep_nesting() {
        let out = render(
            "{current_action:dict-key(properties):{description}}",
            r#"{"current_action":{"properties":{"description":"deep"}}}"#,
        )
        .unwrap();
        assert_eq!(out, "deep");
    }
}
