//! Templates: literal text interleaved with expression fragments

use crate::{Expression, Spanned};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    /// Text emitted verbatim
    Literal(String),
    /// Parsed body of one delimited fragment, spans relative to the template
    Expression(Spanned<Expression>),
}

impl Segment {
    pub fn as_expression(&self) -> Option<&Spanned<Expression>> {
        match self {
            Segment::Expression(expr) => Some(expr),
            Segment::Literal(_) => None,
        }
    }
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Template consisting of literal text only
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Literal(text.into())],
        }
    }

    /// The sole expression when the template is exactly one fragment.
    ///
    /// Such templates evaluate to the expression's own value instead of a
    /// concatenated string.
    pub fn single_expression(&self) -> Option<&Spanned<Expression>> {
        match self.segments.as_slice() {
            [Segment::Expression(expr)] => Some(expr),
            _ => None,
        }
    }

    pub fn is_literal_only(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Spanned<Expression>> {
        self.segments.iter().filter_map(Segment::as_expression)
    }

    pub fn expressions_mut(&mut self) -> impl Iterator<Item = &mut Spanned<Expression>> {
        self.segments.iter_mut().filter_map(|segment| match segment {
            Segment::Expression(expr) => Some(expr),
            Segment::Literal(_) => None,
        })
    }
}

/// Prints the template with default `{` / `}` delimiters
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Expression(expr) => write!(f, "{{{}}}", expr.inner)?,
            }
        }
        Ok(())
    }
}
