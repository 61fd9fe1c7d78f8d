//! Compiled templates

use crate::analyzer::{extract_variables, requires};
use crate::rewriter::{rewrite, DeferredExpression, Rewrite};
use gateway_el_ast::Template;
use gateway_el_diagnostics::Result;
use gateway_el_parser::{Parser, TemplateSyntax};
use log::debug;
use std::collections::BTreeSet;

/// A parsed template together with everything evaluation needs to know
/// before running it: the variables it reads and, when deferred holders are
/// known, the rewritten form with its placeholder expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    template: Template,
    variables: BTreeSet<String>,
    holders: BTreeSet<String>,
    rewrite: Option<Rewrite>,
}

impl CompiledExpression {
    fn new(source: &str, template: Template, holders: &BTreeSet<String>) -> Self {
        let variables = extract_variables(&template);
        let rewrite = rewrite(&template, holders);
        Self {
            source: source.to_string(),
            template,
            variables,
            holders: holders.clone(),
            rewrite,
        }
    }

    /// Raw template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Template as parsed
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// Deferred holder names the rewrite was computed for
    pub fn holders(&self) -> &BTreeSet<String> {
        &self.holders
    }

    pub fn rewrite(&self) -> Option<&Rewrite> {
        self.rewrite.as_ref()
    }

    /// Template to evaluate: the rewritten one when holder calls were extracted
    pub fn executable(&self) -> &Template {
        self.rewrite
            .as_ref()
            .map_or(&self.template, |rewrite| &rewrite.template)
    }

    /// Placeholder expressions in dependency order
    pub fn deferred_expressions(&self) -> impl Iterator<Item = &DeferredExpression> {
        self.rewrite
            .iter()
            .flat_map(|rewrite| rewrite.deferred.values())
    }

    /// Whether a deferred source named `source` must be resolved first
    pub fn requires(&self, source: &str) -> bool {
        requires(&self.variables, source)
    }

    pub fn is_literal_only(&self) -> bool {
        self.template.is_literal_only()
    }

    /// Same template rewritten for another set of holders, without reparsing
    pub fn with_holders(&self, holders: &BTreeSet<String>) -> Self {
        if *holders == self.holders {
            return self.clone();
        }
        Self {
            source: self.source.clone(),
            template: self.template.clone(),
            variables: self.variables.clone(),
            holders: holders.clone(),
            rewrite: rewrite(&self.template, holders),
        }
    }
}

/// Compiles template text with a fixed delimiter syntax
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    parser: Parser,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_syntax(syntax: TemplateSyntax) -> Self {
        Self {
            parser: Parser::with_syntax(syntax),
        }
    }

    pub fn syntax(&self) -> &TemplateSyntax {
        self.parser.syntax()
    }

    pub fn compile(&self, text: &str) -> Result<CompiledExpression> {
        self.compile_with_holders(text, &BTreeSet::new())
    }

    /// Compile, extracting calls on the given deferred holders
    pub fn compile_with_holders(
        &self,
        text: &str,
        holders: &BTreeSet<String>,
    ) -> Result<CompiledExpression> {
        let template = self.parser.parse_template(text)?;
        let compiled = CompiledExpression::new(text, template, holders);
        debug!(
            "compiled template ({} fragments, {} variables, {} deferred)",
            compiled.template.expressions().count(),
            compiled.variables.len(),
            compiled.deferred_expressions().count()
        );
        Ok(compiled)
    }
}

/// Compile with the default `{` / `}` delimiters
pub fn compile(text: &str) -> Result<CompiledExpression> {
    Compiler::new().compile(text)
}
