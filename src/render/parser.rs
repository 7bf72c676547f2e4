//! Parser for the placeholder template language.
//!
//! Grammar:
//!
//! ```text
//! Template    := (Literal | Placeholder)*
//! Placeholder := '{' PathExpr [':' FormatterName ['(' Options ')']] (':' Clause)* '}'
//! PathExpr    := Segment ('.' Segment)*
//! ```
//!
//! `{{` and `}}` denote one literal brace. Sections inside a placeholder are
//! split on `:` at placeholder nesting depth zero; braces inside a clause
//! shield nested colons. The first section is treated as a formatter
//! invocation only when it has the exact shape `name` or `name(options)`
//! where `name` is an identifier; otherwise every section is a clause and
//! formatter dispatch falls back to auto-detect.

use super::{RenderError, RenderResult};

/// A parsed template: literal text interleaved with placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// One template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(String),
    Placeholder(Placeholder),
}

/// A `{...}` span resolved against a value at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    path: Vec<String>,
    formatter: Option<String>,
    options: String,
    clauses: Vec<Template>,
}

impl Placeholder {
    /// Ordered path segments; empty means the current value itself.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Explicit formatter name, or `None` for auto-detect dispatch.
    pub fn formatter(&self) -> Option<&str> {
        self.formatter.as_deref()
    }

    /// Raw options string (empty when no options were given).
    pub fn options(&self) -> &str {
        &self.options
    }

    /// Ordered nested sub-templates consumed positionally by formatters.
    pub fn clauses(&self) -> &[Template] {
        &self.clauses
    }
}

/// Parse a template source string.
///
/// Fails with `RenderError::Parse` on unbalanced braces.
pub fn parse(input: &str) -> RenderResult<Template> {
    let mut nodes = Vec::new();
    let mut literal = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                if !literal.is_empty() {
                    nodes.push(Node::Literal(std::mem::take(&mut literal)));
                }
                let body = read_placeholder_body(&mut chars)?;
                nodes.push(Node::Placeholder(parse_placeholder(&body)?));
            }
            '}' => {
                return Err(RenderError::Parse(
                    "unbalanced '}' outside a placeholder".to_string(),
                ));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        nodes.push(Node::Literal(literal));
    }

    Ok(Template { nodes })
}

/// Consume characters up to the matching `}` of an already-opened
/// placeholder. Every brace counts toward nesting depth; `{{`/`}}` escapes
/// are a literal-text concern handled when the nested clause is parsed.
fn read_placeholder_body(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> RenderResult<String> {
    let mut body = String::new();
    let mut depth = 1usize;

    for c in chars {
        match c {
            '{' => {
                depth += 1;
                body.push('{');
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
                body.push('}');
            }
            other => body.push(other),
        }
    }

    Err(RenderError::Parse(
        "unbalanced '{': placeholder is never closed".to_string(),
    ))
}

fn parse_placeholder(body: &str) -> RenderResult<Placeholder> {
    let sections = split_sections(body);
    let (path_text, rest) = sections
        .split_first()
        .map(|(head, tail)| (head.as_str(), tail))
        .unwrap_or(("", &[]));

    let path: Vec<String> = if path_text.is_empty() {
        Vec::new()
    } else {
        path_text.split('.').map(str::to_string).collect()
    };

    let mut formatter = None;
    let mut options = String::new();
    let mut clause_sections = rest;

    if let Some((first, tail)) = rest.split_first() {
        if let Some((name, opts)) = parse_invocation(first) {
            formatter = Some(name);
            options = opts;
            clause_sections = tail;
        }
    }

    let clauses = clause_sections
        .iter()
        .map(|section| parse(section))
        .collect::<RenderResult<Vec<_>>>()?;

    Ok(Placeholder {
        path,
        formatter,
        options,
        clauses,
    })
}

/// Split a placeholder body on `:` at brace depth zero.
fn split_sections(body: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in body.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push('{');
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push('}');
            }
            ':' if depth == 0 => sections.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }

    sections.push(current);
    sections
}

/// Recognize `name` or `name(options)` formatter invocations.
fn parse_invocation(section: &str) -> Option<(String, String)> {
    let (name, options) = match section.find('(') {
        Some(open) if section.ends_with(')') => {
            (&section[..open], section[open + 1..section.len() - 1].to_string())
        }
        Some(_) => return None,
        None => (section, String::new()),
    };

    let mut chars = name.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }

    Some((name.to_string(), options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn placeholder(template: &Template, idx: usize) -> &Placeholder {
        match &template.nodes()[idx] {
            Node::Placeholder(p) => p,
            other => panic!("expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literal_only() {
        let t = parse("hello world").unwrap();
        assert_eq!(t.nodes(), &[Node::Literal("hello world".to_string())]);
    }

    #[test]
    fn test_parse_brace_escapes() {
        let t = parse("a {{b}} c").unwrap();
        assert_eq!(t.nodes(), &[Node::Literal("a {b} c".to_string())]);
    }

    #[test]
    fn test_parse_simple_placeholder() {
        let t = parse("<h1>{title}</h1>").unwrap();
        let p = placeholder(&t, 1);
        assert_eq!(p.path(), &["title".to_string()]);
        assert_eq!(p.formatter(), None);
        assert!(p.clauses().is_empty());
    }

    #[test]
    fn test_parse_dotted_path() {
        let t = parse("{person.other.somekey}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(
            p.path(),
            &["person".to_string(), "other".to_string(), "somekey".to_string()]
        );
    }

    #[test]
    fn test_parse_formatter_with_options() {
        let t = parse("{person:dict-key(first_name)}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(p.formatter(), Some("dict-key"));
        assert_eq!(p.options(), "first_name");
        assert!(p.clauses().is_empty());
    }

    #[test]
    fn test_parse_formatter_with_clause() {
        let t = parse("{person:dict-key(other):{somekey}}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(p.formatter(), Some("dict-key"));
        assert_eq!(p.options(), "other");
        assert_eq!(p.clauses().len(), 1);

        let clause = placeholder(&p.clauses()[0], 0);
        assert_eq!(clause.path(), &["somekey".to_string()]);
    }

    #[test]
    fn test_parse_clauses_without_formatter() {
        // First section is not identifier-shaped, so all sections are
        // clauses and dispatch is auto-detect.
        let t = parse("{flag:{yes {name}}:{no}}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(p.formatter(), None);
        assert_eq!(p.clauses().len(), 2);
    }

    #[test]
    fn test_parse_literal_clauses_without_formatter() {
        let t = parse("{flag:Yes!:No?}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(p.formatter(), None);
        assert_eq!(p.clauses().len(), 2);
        assert_eq!(
            p.clauses()[0].nodes(),
            &[Node::Literal("Yes!".to_string())]
        );
    }

    #[test]
    fn test_parse_explicit_formatter_with_two_clauses() {
        let t = parse("{flag:conditional:{on}:{off}}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(p.formatter(), Some("conditional"));
        assert_eq!(p.clauses().len(), 2);
    }

    #[test]
    fn test_nested_colon_does_not_split() {
        let t = parse("{person:dict-key(other):{somekey:upper-or-not}}").unwrap();
        let p = placeholder(&t, 0);
        assert_eq!(p.clauses().len(), 1);
    }

    #[test]
    fn test_empty_path_means_current_value() {
        let t = parse("{:conditional:{on}:{off}}").unwrap();
        let p = placeholder(&t, 0);
        assert!(p.path().is_empty());
        assert_eq!(p.formatter(), Some("conditional"));
    }

    #[test]
    fn test_unbalanced_open_fails() {
        assert!(matches!(parse("before {title"), Err(RenderError::Parse(_))));
    }

    #[test]
    fn test_unbalanced_close_fails() {
        assert!(matches!(parse("after } brace"), Err(RenderError::Parse(_))));
    }
}
