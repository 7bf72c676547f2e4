//! Formatter abstraction and the ordered, immutable registry.
//!
//! Dispatch works two ways:
//! - **Explicit**: a placeholder names a formatter; lookup is by name and an
//!   unknown name fails the render with `FormatterNotFound`.
//! - **Auto-detect**: with no name, the registry is scanned in registration
//!   order and the first formatter whose `try_format` accepts wins.
//!
//! The registry is constructed once at startup and never mutated, so one
//! `Arc<FormatterRegistry>` can serve many concurrent render calls without
//! locking.

use std::collections::HashMap;

use crate::value::{Scalar, Value};

use super::{parser::Template, RenderResult, Renderer};

/// A named formatter with an applicability predicate folded into
/// `try_format`: returning `Ok(false)` declines the value, which lets
/// auto-detect scanning continue to the next candidate.
pub trait Formatter: Send + Sync {
    /// Registered name used for explicit dispatch.
    fn name(&self) -> &str;

    /// Whether auto-detect scanning may consider this formatter.
    fn can_auto_detect(&self) -> bool {
        true
    }

    /// Attempt to format the scoped value. `Ok(true)` means output was
    /// written (possibly empty), `Ok(false)` declines.
    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool>;
}

/// Everything a formatter sees for one placeholder: the resolved value (or
/// the unresolved marker), the raw options string, the ordered clause list,
/// and the recursive clause-rendering callback.
pub struct FormatterScope<'a> {
    renderer: &'a Renderer,
    value: Option<&'a Value>,
    options: &'a str,
    clauses: &'a [Template],
    auto_detect: bool,
    out: &'a mut String,
}

impl<'a> FormatterScope<'a> {
    pub(super) fn new(
        renderer: &'a Renderer,
        value: Option<&'a Value>,
        options: &'a str,
        clauses: &'a [Template],
        auto_detect: bool,
        out: &'a mut String,
    ) -> Self {
        Self {
            renderer,
            value,
            options,
            clauses,
            auto_detect,
            out,
        }
    }

    /// The resolved value, or `None` for an unresolved path.
    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    /// Raw options string (empty when none were given).
    pub fn options(&self) -> &'a str {
        self.options
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// True while the registry is being scanned without an explicit name.
    pub fn is_auto_detect(&self) -> bool {
        self.auto_detect
    }

    /// Append literal output text.
    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Write a value in its plain form: scalars via their natural string
    /// form (empty for null), unresolved as empty, containers as compact
    /// JSON.
    pub fn write_plain(&mut self, value: Option<&Value>) {
        match value {
            None => {}
            Some(Value::Scalar(scalar)) => {
                let text = scalar.to_string();
                self.out.push_str(&text);
            }
            Some(container) => {
                let text = container.to_json().to_string();
                self.out.push_str(&text);
            }
        }
    }

    /// Re-enter the renderer with clause `index` against `value`. Rendering
    /// a clause that does not exist writes nothing.
    pub fn render_clause(&mut self, index: usize, value: Option<&Value>) -> RenderResult<()> {
        if let Some(clause) = self.clauses.get(index) {
            self.renderer.render_into(clause, value, self.out)?;
        }
        Ok(())
    }

    /// The value's string form used for case matching: scalar display,
    /// empty for null and unresolved.
    pub fn value_text(&self) -> String {
        match self.value {
            Some(Value::Scalar(scalar)) => scalar.to_string(),
            Some(container) => container.to_json().to_string(),
            None => String::new(),
        }
    }

    /// Convenience accessor for string-scalar values.
    pub fn value_str(&self) -> Option<&'a str> {
        self.value.and_then(Value::as_str)
    }

    /// Boolean-like interpretation: booleans as themselves, numbers by
    /// non-zero test. Non boolean-like values yield `None`.
    pub fn value_truthy(&self) -> Option<bool> {
        match self.value? {
            Value::Scalar(Scalar::Bool(b)) => Some(*b),
            Value::Scalar(Scalar::Number(n)) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
            _ => None,
        }
    }
}

/// Ordered, immutable collection of named formatters.
///
/// Built once during process startup and passed explicitly into every
/// render call; registration order defines auto-detect precedence.
pub struct FormatterRegistry {
    formatters: Vec<Box<dyn Formatter>>,
    by_name: HashMap<String, usize>,
}

impl FormatterRegistry {
    /// Build a registry from an ordered formatter list. Later registrations
    /// with a duplicate name shadow earlier ones for explicit dispatch.
    pub fn from_formatters(formatters: Vec<Box<dyn Formatter>>) -> Self {
        let by_name = formatters
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name().to_string(), idx))
            .collect();
        Self {
            formatters,
            by_name,
        }
    }

    /// The builtin registry, in the canonical registration order.
    pub fn builtin() -> Self {
        Self::from_formatters(super::builtins::all())
    }

    /// Name-keyed lookup for explicit dispatch.
    pub fn lookup(&self, name: &str) -> Option<&dyn Formatter> {
        self.by_name
            .get(name)
            .map(|idx| self.formatters[*idx].as_ref())
    }

    /// Registration-ordered iteration for auto-detect scanning.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Formatter> {
        self.formatters.iter().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}
