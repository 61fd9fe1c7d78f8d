//! Expression nodes

use crate::{Arguments, BinaryOp, BoxExpr, Identifier, Literal, Spanned, TypeName, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// All expression node kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    // === Literals ===
    Literal(Literal),
    /// Inline list (`{1, 2, 3}`)
    InlineList(InlineListExpr),
    /// Inline map (`{'a': 1}`, `{:}`)
    InlineMap(InlineMapExpr),

    // === References ===
    /// Context variable (`#request`)
    VariableRef(Identifier),
    /// Registered function call (`#name(args)`)
    FunctionCall(FunctionCallExpr),
    /// Host type reference (`T(java.lang.Math)`)
    TypeRef(TypeName),
    /// Constructor invocation (`new java.lang.String('x')`)
    Constructor(ConstructorExpr),

    // === Navigation ===
    /// Property read; inside a chain applies to the previous node
    PropertyOrField(PropertyRef),
    /// Method call; inside a chain applies to the previous node
    MethodCall(MethodCallExpr),
    /// Index access; inside a chain applies to the previous node
    Indexer(IndexerExpr),
    /// Ordered navigation chain: a root followed by property, method and index steps
    Compound(CompoundExpr),

    // === Operators ===
    BinaryOp(BinaryOpExpr),
    UnaryOp(UnaryOpExpr),
    /// `condition ? then : else`
    Ternary(TernaryExpr),
    /// `value ?: fallback`
    Elvis(ElvisExpr),
    Parenthesized(BoxExpr),
}

impl Expression {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Variable name when this is a bare `#name`
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::VariableRef(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Whether this node is a navigation step (valid after a chain root)
    pub fn is_chain_step(&self) -> bool {
        matches!(
            self,
            Self::PropertyOrField(_) | Self::MethodCall(_) | Self::Indexer(_)
        )
    }

    /// Direct sub-expressions in source order
    pub fn children(&self) -> Vec<&Spanned<Expression>> {
        match self {
            Self::Literal(_) | Self::VariableRef(_) | Self::TypeRef(_) | Self::PropertyOrField(_) => {
                Vec::new()
            }
            Self::InlineList(list) => list.elements.iter().collect(),
            Self::InlineMap(map) => map
                .entries
                .iter()
                .flat_map(|entry| [&entry.key, &entry.value])
                .collect(),
            Self::FunctionCall(call) => call.arguments.iter().collect(),
            Self::Constructor(ctor) => ctor.arguments.iter().collect(),
            Self::MethodCall(call) => call.arguments.iter().collect(),
            Self::Indexer(indexer) => vec![&*indexer.index],
            Self::Compound(compound) => compound.nodes.iter().collect(),
            Self::BinaryOp(op) => vec![&*op.left, &*op.right],
            Self::UnaryOp(op) => vec![&*op.operand],
            Self::Ternary(t) => vec![&*t.condition, &*t.then_branch, &*t.else_branch],
            Self::Elvis(e) => vec![&*e.value, &*e.fallback],
            Self::Parenthesized(inner) => vec![&**inner],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineListExpr {
    pub elements: Vec<Spanned<Expression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Spanned<Expression>,
    pub value: Spanned<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineMapExpr {
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallExpr {
    pub name: Identifier,
    pub arguments: Arguments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorExpr {
    pub type_name: TypeName,
    pub arguments: Arguments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRef {
    pub name: Identifier,
    /// Reached with `?.`
    pub null_safe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCallExpr {
    pub name: Identifier,
    pub arguments: Arguments,
    /// Reached with `?.`
    pub null_safe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerExpr {
    pub index: BoxExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundExpr {
    /// Root node followed by at least one step
    pub nodes: Vec<Spanned<Expression>>,
}

impl CompoundExpr {
    pub fn root(&self) -> Option<&Spanned<Expression>> {
        self.nodes.first()
    }

    pub fn steps(&self) -> &[Spanned<Expression>] {
        self.nodes.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOpExpr {
    pub left: BoxExpr,
    pub op: BinaryOp,
    pub right: BoxExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOpExpr {
    pub op: UnaryOp,
    pub operand: BoxExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TernaryExpr {
    pub condition: BoxExpr,
    pub then_branch: BoxExpr,
    pub else_branch: BoxExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElvisExpr {
    pub value: BoxExpr,
    pub fallback: BoxExpr,
}

// === Source reconstruction ===

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[Spanned<Expression>]) -> fmt::Result {
    f.write_str("(")?;
    for (i, arg) in arguments.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg.inner)?;
    }
    f.write_str(")")
}

/// Print a chain step as it appears after the previous node
fn write_step(f: &mut fmt::Formatter<'_>, step: &Expression) -> fmt::Result {
    match step {
        Expression::PropertyOrField(p) => {
            f.write_str(if p.null_safe { "?." } else { "." })?;
            write!(f, "{}", p.name)
        }
        Expression::MethodCall(m) => {
            f.write_str(if m.null_safe { "?." } else { "." })?;
            write!(f, "{}", m.name)?;
            write_arguments(f, &m.arguments)
        }
        Expression::Indexer(i) => write!(f, "[{}]", i.index.inner),
        other => write!(f, ".{}", other),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::InlineList(list) => {
                f.write_str("{")?;
                for (i, element) in list.elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element.inner)?;
                }
                f.write_str("}")
            }
            Expression::InlineMap(map) => {
                if map.entries.is_empty() {
                    return f.write_str("{:}");
                }
                f.write_str("{")?;
                for (i, entry) in map.entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", entry.key.inner, entry.value.inner)?;
                }
                f.write_str("}")
            }
            Expression::VariableRef(id) => write!(f, "#{}", id),
            Expression::FunctionCall(call) => {
                write!(f, "#{}", call.name)?;
                write_arguments(f, &call.arguments)
            }
            Expression::TypeRef(name) => write!(f, "T({})", name),
            Expression::Constructor(ctor) => {
                write!(f, "new {}", ctor.type_name)?;
                write_arguments(f, &ctor.arguments)
            }
            Expression::PropertyOrField(p) => write!(f, "{}", p.name),
            Expression::MethodCall(m) => {
                write!(f, "{}", m.name)?;
                write_arguments(f, &m.arguments)
            }
            Expression::Indexer(i) => write!(f, "[{}]", i.index.inner),
            Expression::Compound(chain) => {
                let mut nodes = chain.nodes.iter();
                if let Some(root) = nodes.next() {
                    write!(f, "{}", root.inner)?;
                }
                for step in nodes {
                    write_step(f, &step.inner)?;
                }
                Ok(())
            }
            Expression::BinaryOp(bin) => {
                write!(f, "{} {} {}", bin.left.inner, bin.op, bin.right.inner)
            }
            Expression::UnaryOp(un) => write!(f, "{}{}", un.op, un.operand.inner),
            Expression::Ternary(t) => write!(
                f,
                "{} ? {} : {}",
                t.condition.inner, t.then_branch.inner, t.else_branch.inner
            ),
            Expression::Elvis(e) => write!(f, "{} ?: {}", e.value.inner, e.fallback.inner),
            Expression::Parenthesized(inner) => write!(f, "({})", inner.inner),
        }
    }
}
