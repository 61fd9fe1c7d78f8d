//! Template and expression parser using Winnow
//!
//! Templates are tokenized into literal runs and delimited fragments; each
//! fragment body is parsed by a recursive descent parser with precedence
//! climbing. Spans in the resulting tree are byte offsets into the template.

mod combinators;
mod expression;
mod template;

pub use template::TemplateSyntax;

use gateway_el_ast::{Expression, Spanned, Template};
use gateway_el_diagnostics::{Result, Span};

/// Parser configured with template delimiters
#[derive(Debug, Clone, Default)]
pub struct Parser {
    syntax: TemplateSyntax,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntax(syntax: TemplateSyntax) -> Self {
        Self { syntax }
    }

    pub fn syntax(&self) -> &TemplateSyntax {
        &self.syntax
    }

    /// Parse a template into literal and expression segments
    pub fn parse_template(&self, text: &str) -> Result<Template> {
        template::parse(text, &self.syntax)
    }

    /// Parse a bare expression without template delimiters
    pub fn parse_expression(&self, text: &str) -> Result<Spanned<Expression>> {
        parse_expression(text)
    }
}

/// Parse a template using the default `{` / `}` delimiters
pub fn parse_template(text: &str) -> Result<Template> {
    template::parse(text, &TemplateSyntax::default())
}

/// Parse a bare expression such as `#request.headers['X'][0]`
pub fn parse_expression(text: &str) -> Result<Spanned<Expression>> {
    template::parse_fragment(text, Span::new(0, text.len()))
}
