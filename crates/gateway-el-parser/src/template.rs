//! Template tokenizer
//!
//! Splits raw text into literal runs and delimited expression fragments. A
//! prefix only opens a fragment when the first non-space character after it is
//! `#`, `(` or a `T(` type reference; any other prefix occurrence is plain text,
//! which keeps JSON bodies such as `{ "status": "OK" }` intact.

use crate::combinators::{position, ws, Input};
use crate::expression::expression;
use gateway_el_ast::{Expression, Segment, Spanned, Template};
use gateway_el_diagnostics::{ElError, Result, Span, EL0001, EL0003, EL0006, EL0402};
use serde::{Deserialize, Serialize};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::stream::LocatingSlice;
use winnow::token::take;

/// Delimiters marking expression fragments inside a template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSyntax {
    pub prefix: String,
    pub suffix: String,
}

impl Default for TemplateSyntax {
    fn default() -> Self {
        Self {
            prefix: "{".to_string(),
            suffix: "}".to_string(),
        }
    }
}

impl TemplateSyntax {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Result<Self> {
        let syntax = Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        };
        syntax.validate()?;
        Ok(syntax)
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() || self.suffix.is_empty() {
            return Err(ElError::configuration(
                EL0402,
                "template prefix and suffix must not be empty",
            ));
        }
        Ok(())
    }
}

/// One piece of a template, as byte spans into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Literal(Span),
    /// Expression body, delimiters and leading spaces excluded
    Expression(Span),
}

fn starts_expression(rest: &str) -> bool {
    match rest.chars().next() {
        Some('#') | Some('(') => true,
        Some('T') => rest
            .get(1..)
            .is_some_and(|after| after.trim_start().starts_with('(')),
        _ => false,
    }
}

/// Offset of the suffix closing a fragment whose body starts at `from`.
///
/// Nested braces must balance and anything inside quotes is skipped.
fn find_fragment_end(text: &str, from: usize, suffix: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (offset, ch) in text.get(from..)?.char_indices() {
        let at = from + offset;
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        if depth == 0 && text[at..].starts_with(suffix) {
            return Some(at);
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

pub fn scan(text: &str, syntax: &TemplateSyntax) -> Result<Vec<Fragment>> {
    syntax.validate()?;
    let prefix = syntax.prefix.as_str();
    let suffix = syntax.suffix.as_str();

    let mut fragments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(found) = text.get(cursor..).and_then(|rest| rest.find(prefix)) {
        let open = cursor + found;
        let after_prefix = open + prefix.len();
        let rest = &text[after_prefix..];
        let body_start = after_prefix + (rest.len() - rest.trim_start_matches(' ').len());

        if !starts_expression(&text[body_start..]) {
            cursor = after_prefix;
            continue;
        }

        let Some(body_end) = find_fragment_end(text, body_start, suffix) else {
            return Err(ElError::parse_at(
                EL0003,
                format!("Expression fragment is missing its closing '{}'", suffix),
                text,
                Span::new(open, text.len()),
            ));
        };

        if literal_start < open {
            fragments.push(Fragment::Literal(Span::new(literal_start, open)));
        }
        fragments.push(Fragment::Expression(Span::new(body_start, body_end)));
        cursor = body_end + suffix.len();
        literal_start = cursor;
    }

    if literal_start < text.len() {
        fragments.push(Fragment::Literal(Span::new(literal_start, text.len())));
    }
    Ok(fragments)
}

/// Parse the expression body at `body`, keeping spans relative to `text`
pub fn parse_fragment(text: &str, body: Span) -> Result<Spanned<Expression>> {
    let bounded = text.get(..body.end).unwrap_or(text);
    let mut input: Input<'_> = LocatingSlice::new(bounded);
    let skipped = bounded.get(..body.start).map_or(0, |head| head.chars().count());
    take(skipped)
        .void()
        .parse_next(&mut input)
        .map_err(|_: ContextError| {
            ElError::parse_at(EL0006, "Empty expression", text, body)
        })?;

    if input.trim().is_empty() {
        return Err(ElError::parse_at(EL0006, "Empty expression", text, body));
    }

    let parsed = expression.parse_next(&mut input);
    let _ = ws.parse_next(&mut input);
    let at = position(&input);

    match parsed {
        Ok(expr) if input.is_empty() => Ok(expr),
        Ok(_) => {
            let token = input.chars().next().map(String::from).unwrap_or_default();
            Err(ElError::parse_at(
                EL0001,
                format!("Unexpected token '{}'", token),
                text,
                Span::new(at, at + token.len()),
            ))
        }
        Err(_) => {
            let message = match input.chars().next() {
                Some(ch) => format!("Unexpected token '{}'", ch),
                None => "Unexpected end of expression".to_string(),
            };
            Err(ElError::parse_at(EL0001, message, text, Span::new(at, body.end)))
        }
    }
}

/// Tokenize `text` and parse every expression fragment
pub fn parse(text: &str, syntax: &TemplateSyntax) -> Result<Template> {
    let mut segments = Vec::new();
    for fragment in scan(text, syntax)? {
        match fragment {
            Fragment::Literal(span) => {
                segments.push(Segment::Literal(text[span.as_range()].to_string()));
            }
            Fragment::Expression(body) => {
                segments.push(Segment::Expression(parse_fragment(text, body)?));
            }
        }
    }
    Ok(Template::new(segments))
}
