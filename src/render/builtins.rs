//! Builtin formatters, registered in the canonical order.
//!
//! Auto-detect precedence follows registration order: container-specific
//! formatters come first, `default` is the unconditional catch-all at the
//! end.

use regex::Regex;

use crate::value::{Scalar, Value};

use super::{Formatter, FormatterScope, RenderError, RenderResult};

/// The builtin formatter list in registration order.
pub(super) fn all() -> Vec<Box<dyn Formatter>> {
    vec![
        Box::new(ListFormatter),
        Box::new(DictKeyFormatter),
        Box::new(PluralLocalizationFormatter),
        Box::new(ConditionalFormatter),
        Box::new(IsMatchFormatter),
        Box::new(NullFormatter),
        Box::new(ChooseFormatter),
        Box::new(SubStringFormatter),
        Box::new(DefaultFormatter),
    ]
}

/// Renders each sequence element through clause 0, joined by a separator
/// taken from the options (default: none).
pub struct ListFormatter;

impl Formatter for ListFormatter {
    fn name(&self) -> &str {
        "list"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let Some(Value::Sequence(items)) = scope.value() else {
            return Ok(false);
        };
        if scope.clause_count() == 0 {
            return Ok(false);
        }

        let separator = scope.options();
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                scope.write(separator);
            }
            scope.render_clause(0, Some(item))?;
        }
        Ok(true)
    }
}

/// Looks up a mapping entry named by the options. A nested mapping value is
/// handed to clause 0; anything else is written in its plain form. An
/// absent key declines.
pub struct DictKeyFormatter;

impl Formatter for DictKeyFormatter {
    fn name(&self) -> &str {
        "dict-key"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let Some(value @ Value::Mapping(_)) = scope.value() else {
            return Ok(false);
        };
        let key = scope.options();
        if key.is_empty() {
            return Ok(false);
        }

        let Some(entry) = value.get(key) else {
            return Ok(false);
        };
        match entry {
            Value::Mapping(_) => scope.render_clause(0, Some(entry))?,
            other => scope.write_plain(Some(other)),
        }
        Ok(true)
    }
}

/// Selects a clause bucket by the numeric value's plural class.
///
/// Options name the buckets positionally from `zero`/`one`/`other`
/// (semicolon-separated). Empty options default to `one;other` for two
/// clauses and `zero;one;other` for three or more.
pub struct PluralLocalizationFormatter;

impl Formatter for PluralLocalizationFormatter {
    fn name(&self) -> &str {
        "plural-localization"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let Some(number) = scope.value().and_then(Value::as_number) else {
            return Ok(false);
        };
        if scope.clause_count() == 0 {
            return Ok(false);
        }

        let buckets: Vec<&str> = if scope.options().is_empty() {
            match scope.clause_count() {
                1 => vec!["other"],
                2 => vec!["one", "other"],
                _ => vec!["zero", "one", "other"],
            }
        } else {
            scope.options().split(';').map(str::trim).collect()
        };

        for bucket in &buckets {
            if !matches!(*bucket, "zero" | "one" | "other") {
                return Err(RenderError::invalid_options(
                    self.name(),
                    format!("unknown plural class '{}'", bucket),
                ));
            }
        }

        let magnitude = number.as_f64().unwrap_or(0.0).abs();
        let class = if magnitude == 0.0 {
            "zero"
        } else if magnitude == 1.0 {
            "one"
        } else {
            "other"
        };

        // Unmatched class falls back to the last clause.
        let index = buckets
            .iter()
            .position(|bucket| *bucket == class)
            .unwrap_or(buckets.len().saturating_sub(1))
            .min(scope.clause_count() - 1);

        scope.render_clause(index, scope.value())?;
        Ok(true)
    }
}

/// Truthy values render clause 0, falsy values clause 1 (empty if absent).
/// Applies to booleans and numbers (non-zero is truthy).
pub struct ConditionalFormatter;

impl Formatter for ConditionalFormatter {
    fn name(&self) -> &str {
        "conditional"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let Some(truthy) = scope.value_truthy() else {
            return Ok(false);
        };
        if scope.clause_count() == 0 {
            return Ok(false);
        }

        let index = if truthy { 0 } else { 1 };
        scope.render_clause(index, scope.value())?;
        Ok(true)
    }
}

/// Tests a string scalar against a regex from the options. With clauses,
/// renders clause 0 on match and clause 1 otherwise; with no clauses,
/// writes `true`/`false`.
pub struct IsMatchFormatter;

impl Formatter for IsMatchFormatter {
    fn name(&self) -> &str {
        "is-match"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let Some(text) = scope.value_str() else {
            return Ok(false);
        };
        let pattern = scope.options();
        if pattern.is_empty() {
            return Ok(false);
        }

        let regex = Regex::new(pattern)
            .map_err(|e| RenderError::invalid_options(self.name(), e.to_string()))?;
        let matched = regex.is_match(text);

        if scope.clause_count() > 0 {
            scope.render_clause(if matched { 0 } else { 1 }, scope.value())?;
        } else {
            scope.write(if matched { "true" } else { "false" });
        }
        Ok(true)
    }
}

/// Null and unresolved values render clause 0 (empty if absent). For
/// anything else an explicit invocation falls through to default
/// formatting; auto-detect scanning declines.
pub struct NullFormatter;

impl Formatter for NullFormatter {
    fn name(&self) -> &str {
        "null"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        match scope.value() {
            None | Some(Value::Scalar(Scalar::Null)) => {
                scope.render_clause(0, scope.value())?;
                Ok(true)
            }
            _ if scope.is_auto_detect() => Ok(false),
            other => {
                scope.write_plain(other);
                Ok(true)
            }
        }
    }
}

/// Matches the value's string form against `;`-delimited literal cases in
/// the options, selecting the corresponding clause by position, else a
/// trailing default clause.
pub struct ChooseFormatter;

impl Formatter for ChooseFormatter {
    fn name(&self) -> &str {
        "choose"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let options = scope.options();
        if options.is_empty() || scope.clause_count() == 0 {
            return Ok(false);
        }

        let cases: Vec<&str> = options.split(';').collect();
        let text = scope.value_text();

        if let Some(index) = cases.iter().position(|case| *case == text) {
            if index < scope.clause_count() {
                scope.render_clause(index, scope.value())?;
                return Ok(true);
            }
        }

        if scope.clause_count() > cases.len() {
            scope.render_clause(cases.len(), scope.value())?;
            return Ok(true);
        }

        Err(RenderError::invalid_options(
            self.name(),
            format!(
                "no case matches '{}' and no default clause is present",
                text
            ),
        ))
    }
}

/// Slices a string scalar by `start` or `start,length` parsed from the
/// options. A negative start counts from the end; out-of-range indices
/// clamp. Indexing is by character, not byte.
pub struct SubStringFormatter;

impl Formatter for SubStringFormatter {
    fn name(&self) -> &str {
        "substring"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        let Some(text) = scope.value_str() else {
            return Ok(false);
        };
        let options = scope.options();
        if options.is_empty() {
            return Ok(false);
        }

        let mut parts = options.split(',').map(str::trim);
        let start: i64 = parts
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| RenderError::invalid_options(self.name(), "start must be an integer"))?;
        let length: Option<i64> = match parts.next() {
            Some(raw) => Some(raw.parse().map_err(|_| {
                RenderError::invalid_options(self.name(), "length must be an integer")
            })?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(RenderError::invalid_options(
                self.name(),
                "expected 'start' or 'start,length'",
            ));
        }

        let chars: Vec<char> = text.chars().collect();
        let len = chars.len() as i64;
        let begin = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        };
        let end = match length {
            None => len,
            Some(l) if l < 0 => {
                return Err(RenderError::invalid_options(
                    self.name(),
                    "length must be non-negative",
                ))
            }
            Some(l) => begin.saturating_add(l).min(len),
        };

        let slice: String = chars[begin as usize..end as usize].iter().collect();
        scope.write(&slice);
        Ok(true)
    }
}

/// Unconditional catch-all: scalars in their natural string form, null and
/// unresolved as empty text, containers as compact JSON.
pub struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn name(&self) -> &str {
        "default"
    }

    fn try_format(&self, scope: &mut FormatterScope<'_>) -> RenderResult<bool> {
        scope.write_plain(scope.value());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::render::{RenderError, Renderer};
    use crate::value::normalize;
    use pretty_assertions::assert_eq;

    fn render(template: &str, json: &str) -> Result<String, RenderError> {
        let data = normalize(json).unwrap();
        Renderer::with_builtins().render_str(template, &data)
    }

    #[test]
    fn test_list_joins_elements() {
        let out = render("{names:list(, ):{}}", r#"{"names":["a","b","c"]}"#).unwrap();
        assert_eq!(out, "a, b, c");
    }

    #[test]
    fn test_list_renders_clause_per_element() {
        let out = render(
            "{people:list(; ):{first_name}}",
            r#"{"people":[{"first_name":"Mile"},{"first_name":"John"}]}"#,
        )
        .unwrap();
        assert_eq!(out, "Mile; John");
    }

    #[test]
    fn test_list_empty_sequence_renders_empty() {
        let out = render("[{names:list(, ):{}}]", r#"{"names":[]}"#).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_list_auto_detect() {
        let out = render("{names:{}!}", r#"{"names":["a","b"]}"#).unwrap();
        assert_eq!(out, "a!b!");
    }

    #[test]
    fn test_dict_key_scalar_value() {
        let out = render("{person:dict-key(first_name)}", r#"{"person":{"first_name":"Mile"}}"#)
            .unwrap();
        assert_eq!(out, "Mile");
    }

    #[test]
    fn test_dict_key_null_value_renders_empty() {
        let out = render("[{person:dict-key(first_name)}]", r#"{"person":{"first_name":null}}"#)
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_dict_key_absent_key_declines_to_empty() {
        let out = render("[{person:dict-key(missing)}]", r#"{"person":{"first_name":"Mile"}}"#)
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_conditional_truthy() {
        let out = render("{gold:conditional:Gold member:Regular}", r#"{"gold":true}"#).unwrap();
        assert_eq!(out, "Gold member");
    }

    #[test]
    fn test_conditional_falsy() {
        let out = render("{gold:conditional:Gold member:Regular}", r#"{"gold":false}"#).unwrap();
        assert_eq!(out, "Regular");
    }

    #[test]
    fn test_conditional_falsy_without_clause_renders_empty() {
        let out = render("[{gold:conditional:Gold member}]", r#"{"gold":false}"#).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_conditional_numeric_truthiness() {
        let out = render("{count:conditional:some:none}", r#"{"count":3}"#).unwrap();
        assert_eq!(out, "some");
        let out = render("{count:conditional:some:none}", r#"{"count":0}"#).unwrap();
        assert_eq!(out, "none");
    }

    #[test]
    fn test_plural_default_buckets() {
        let template = "{count:plural-localization:one item:{} items}";
        assert_eq!(render(template, r#"{"count":1}"#).unwrap(), "one item");
        assert_eq!(render(template, r#"{"count":5}"#).unwrap(), "5 items");
    }

    #[test]
    fn test_plural_zero_bucket() {
        let template = "{count:plural-localization(zero;one;other):empty:single:many}";
        assert_eq!(render(template, r#"{"count":0}"#).unwrap(), "empty");
        assert_eq!(render(template, r#"{"count":1}"#).unwrap(), "single");
        assert_eq!(render(template, r#"{"count":7}"#).unwrap(), "many");
    }

    #[test]
    fn test_plural_unknown_class_is_invalid() {
        let err = render(
            "{count:plural-localization(few;many):a:b}",
            r#"{"count":2}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidOptions { .. }));
    }

    #[test]
    fn test_null_formatter_on_null() {
        let out = render("{gone:null:was null}", r#"{"gone":null}"#).unwrap();
        assert_eq!(out, "was null");
    }

    #[test]
    fn test_null_formatter_on_unresolved() {
        let out = render("{missing:null:was null}", r#"{"present":1}"#).unwrap();
        assert_eq!(out, "was null");
    }

    #[test]
    fn test_null_formatter_falls_through_for_values() {
        let out = render("{name:null:was null}", r#"{"name":"Mile"}"#).unwrap();
        assert_eq!(out, "Mile");
    }

    #[test]
    fn test_choose_matches_case() {
        let template = "{status:choose(new;active;closed):brand new:in progress:done}";
        assert_eq!(render(template, r#"{"status":"active"}"#).unwrap(), "in progress");
    }

    #[test]
    fn test_choose_trailing_default_clause() {
        let template = "{status:choose(new;active):brand new:in progress:unknown}";
        assert_eq!(render(template, r#"{"status":"weird"}"#).unwrap(), "unknown");
    }

    #[test]
    fn test_choose_no_match_no_default_is_invalid() {
        let err = render(
            "{status:choose(new;active):brand new:in progress}",
            r#"{"status":"weird"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::InvalidOptions { .. }));
    }

    #[test]
    fn test_substring_start_and_length() {
        assert_eq!(
            render("{name:substring(0,4)}", r#"{"name":"Mileva"}"#).unwrap(),
            "Mile"
        );
        assert_eq!(
            render("{name:substring(2)}", r#"{"name":"Mileva"}"#).unwrap(),
            "leva"
        );
    }

    #[test]
    fn test_substring_negative_start() {
        assert_eq!(
            render("{name:substring(-3)}", r#"{"name":"Mileva"}"#).unwrap(),
            "eva"
        );
    }

    #[test]
    fn test_substring_clamps_out_of_range() {
        assert_eq!(
            render("{name:substring(4,100)}", r#"{"name":"Mileva"}"#).unwrap(),
            "va"
        );
        assert_eq!(
            render(
                "{name:substring(5,9223372036854775806)}",
                r#"{"name":"Mileva"}"#
            )
            .unwrap(),
            "a"
        );
    }

    #[test]
    fn test_substring_invalid_options() {
        let err = render("{name:substring(abc)}", r#"{"name":"Mileva"}"#).unwrap_err();
        assert!(matches!(err, RenderError::InvalidOptions { .. }));
    }

    #[test]
    fn test_is_match_without_clauses_writes_bool() {
        assert_eq!(
            render("{mail:is-match(^\\S+@\\S+$)}", r#"{"mail":"a@b.cc"}"#).unwrap(),
            "true"
        );
        assert_eq!(
            render("{mail:is-match(^\\S+@\\S+$)}", r#"{"mail":"not mail"}"#).unwrap(),
            "false"
        );
    }

    #[test]
    fn test_is_match_with_clauses() {
        let template = "{mail:is-match(^\\S+@\\S+$):valid:invalid}";
        assert_eq!(render(template, r#"{"mail":"a@b.cc"}"#).unwrap(), "valid");
        assert_eq!(render(template, r#"{"mail":"nope"}"#).unwrap(), "invalid");
    }

    #[test]
    fn test_is_match_invalid_pattern() {
        let err = render("{mail:is-match([)}", r#"{"mail":"x"}"#).unwrap_err();
        assert!(matches!(err, RenderError::InvalidOptions { .. }));
    }

    #[test]
    fn test_default_formatter_explicit() {
        assert_eq!(render("{n:default}", r#"{"n":42}"#).unwrap(), "42");
        assert_eq!(render("[{n:default}]", r#"{"n":null}"#).unwrap(), "[]");
    }
}
