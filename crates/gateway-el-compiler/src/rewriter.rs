//! Deferred rewriting
//!
//! A chain rooted at a deferred holder (`#custom.get('a').length()`) is split
//! after its first method call or index step. That prefix becomes a
//! placeholder variable (`#_1f0c...`) whose value the orchestrator resolves
//! asynchronously before the rewritten template runs; the remaining steps then
//! operate on the resolved value.
//!
//! Holder calls nested inside arguments are extracted first, so a placeholder
//! body only ever references placeholders registered before it.

use crate::analyzer::expression_variables;
use gateway_el_ast::{
    BinaryOpExpr, CompoundExpr, ConstructorExpr, ElvisExpr, Expression, FunctionCallExpr, IndexerExpr,
    InlineListExpr, InlineMapExpr, MapEntry, MethodCallExpr, Segment, Spanned, Template,
    TernaryExpr, UnaryOpExpr,
};
use indexmap::IndexMap;
use log::trace;
use std::collections::BTreeSet;

/// An extracted holder call
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredExpression {
    /// Placeholder variable name, without `#`
    pub name: String,
    pub body: Spanned<Expression>,
    /// Earlier placeholders the body reads
    pub depends_on: BTreeSet<String>,
}

impl DeferredExpression {
    /// Source form of the body
    pub fn source(&self) -> String {
        self.body.inner.to_string()
    }
}

/// Result of rewriting a template
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub template: Template,
    /// Placeholders in dependency order
    pub deferred: IndexMap<String, DeferredExpression>,
}

/// Rewrites holder calls into placeholder references
#[derive(Debug)]
pub struct DeferredRewriter<'a> {
    holders: &'a BTreeSet<String>,
    deferred: IndexMap<String, DeferredExpression>,
}

impl<'a> DeferredRewriter<'a> {
    pub fn new(holders: &'a BTreeSet<String>) -> Self {
        Self {
            holders,
            deferred: IndexMap::new(),
        }
    }

    /// Rewrite `template`; `None` when nothing needed extracting
    pub fn rewrite_template(mut self, template: &Template) -> Option<Rewrite> {
        if self.holders.is_empty() {
            return None;
        }

        let mut segments: Vec<Segment> = template
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => Segment::Literal(text.clone()),
                Segment::Expression(expr) => Segment::Expression(self.rewrite(expr)),
            })
            .collect();

        // A template that is exactly one placeholder gains nothing from the
        // extraction; evaluate the holder call directly instead.
        if let [Segment::Expression(expr)] = segments.as_mut_slice() {
            let last = self.deferred.last().map(|(name, _)| name.clone());
            if last.is_some() && expr.inner.as_variable() == last.as_deref() {
                if let Some(extracted) = last.and_then(|name| self.deferred.shift_remove(&name)) {
                    *expr = extracted.body;
                }
            }
        }

        if self.deferred.is_empty() {
            return None;
        }
        Some(Rewrite {
            template: Template::new(segments),
            deferred: self.deferred,
        })
    }

    pub fn rewrite(&mut self, expr: &Spanned<Expression>) -> Spanned<Expression> {
        let span = expr.span;
        let rewritten = match &expr.inner {
            Expression::Literal(_)
            | Expression::VariableRef(_)
            | Expression::TypeRef(_)
            | Expression::PropertyOrField(_) => expr.inner.clone(),
            Expression::InlineList(list) => Expression::InlineList(InlineListExpr {
                elements: list.elements.iter().map(|e| self.rewrite(e)).collect(),
            }),
            Expression::InlineMap(map) => Expression::InlineMap(InlineMapExpr {
                entries: map
                    .entries
                    .iter()
                    .map(|entry| MapEntry {
                        key: self.rewrite(&entry.key),
                        value: self.rewrite(&entry.value),
                    })
                    .collect(),
            }),
            Expression::FunctionCall(call) => Expression::FunctionCall(FunctionCallExpr {
                name: call.name.clone(),
                arguments: call.arguments.iter().map(|a| self.rewrite(a)).collect(),
            }),
            Expression::Constructor(ctor) => Expression::Constructor(ConstructorExpr {
                type_name: ctor.type_name.clone(),
                arguments: ctor.arguments.iter().map(|a| self.rewrite(a)).collect(),
            }),
            Expression::MethodCall(call) => Expression::MethodCall(MethodCallExpr {
                name: call.name.clone(),
                arguments: call.arguments.iter().map(|a| self.rewrite(a)).collect(),
                null_safe: call.null_safe,
            }),
            Expression::Indexer(indexer) => Expression::Indexer(IndexerExpr {
                index: Box::new(self.rewrite(&indexer.index)),
            }),
            Expression::Compound(compound) => return self.rewrite_chain(compound, expr),
            Expression::BinaryOp(op) => Expression::BinaryOp(BinaryOpExpr {
                left: Box::new(self.rewrite(&op.left)),
                op: op.op,
                right: Box::new(self.rewrite(&op.right)),
            }),
            Expression::UnaryOp(op) => Expression::UnaryOp(UnaryOpExpr {
                op: op.op,
                operand: Box::new(self.rewrite(&op.operand)),
            }),
            Expression::Ternary(t) => Expression::Ternary(TernaryExpr {
                condition: Box::new(self.rewrite(&t.condition)),
                then_branch: Box::new(self.rewrite(&t.then_branch)),
                else_branch: Box::new(self.rewrite(&t.else_branch)),
            }),
            Expression::Elvis(e) => Expression::Elvis(ElvisExpr {
                value: Box::new(self.rewrite(&e.value)),
                fallback: Box::new(self.rewrite(&e.fallback)),
            }),
            Expression::Parenthesized(inner) => {
                Expression::Parenthesized(Box::new(self.rewrite(inner)))
            }
        };
        Spanned::new(rewritten, span)
    }

    fn rewrite_chain(&mut self, compound: &CompoundExpr, original: &Spanned<Expression>) -> Spanned<Expression> {
        let nodes: Vec<Spanned<Expression>> = compound.nodes.iter().map(|n| self.rewrite(n)).collect();

        let holder_rooted = nodes
            .first()
            .and_then(|root| root.inner.as_variable())
            .is_some_and(|name| self.holders.contains(name));
        let split = nodes
            .iter()
            .skip(1)
            .position(|n| matches!(n.inner, Expression::MethodCall(_) | Expression::Indexer(_)))
            .map(|i| i + 1);

        let (true, Some(split)) = (holder_rooted, split) else {
            return Spanned::new(Expression::Compound(CompoundExpr { nodes }), original.span);
        };

        let mut rest = nodes;
        let tail = rest.split_off(split + 1);
        let body_span = rest[0].span.merge(rest[split].span);
        let body = Spanned::new(Expression::Compound(CompoundExpr { nodes: rest }), body_span);
        let name = self.placeholder(body);
        let reference = Spanned::new(Expression::VariableRef(name.as_str().into()), body_span);

        if tail.is_empty() {
            return reference;
        }
        let mut nodes = Vec::with_capacity(tail.len() + 1);
        nodes.push(reference);
        nodes.extend(tail);
        Spanned::new(Expression::Compound(CompoundExpr { nodes }), original.span)
    }

    /// Register `body` under a name derived from its source form
    fn placeholder(&mut self, body: Spanned<Expression>) -> String {
        let source = body.inner.to_string();
        let name = placeholder_name(&source);
        if !self.deferred.contains_key(&name) {
            trace!("deferring '{}' as #{}", source, name);
            let depends_on = expression_variables(&body.inner)
                .into_iter()
                .filter(|variable| self.deferred.contains_key(variable))
                .collect();
            self.deferred.insert(
                name.clone(),
                DeferredExpression {
                    name: name.clone(),
                    body,
                    depends_on,
                },
            );
        }
        name
    }
}

/// `_` followed by the 64-bit FNV-1a hash of `source` in hex
pub fn placeholder_name(source: &str) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let hash = source
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME));
    format!("_{hash:016x}")
}

/// Rewrite `template` against the known holder names
pub fn rewrite(template: &Template, holders: &BTreeSet<String>) -> Option<Rewrite> {
    DeferredRewriter::new(holders).rewrite_template(template)
}
