//! Dependency analysis: which context variables an expression reads
//!
//! A chain rooted at a variable contributes the dotted path formed by the
//! property reads directly following the root, so `#request.headers['X']`
//! depends on `request.headers`. Method arguments and index keys further along
//! the chain are searched for their own references.

use gateway_el_ast::{Expression, Template};
use std::collections::BTreeSet;

/// Variables read by any fragment of `template`
pub fn extract_variables(template: &Template) -> BTreeSet<String> {
    let mut variables = BTreeSet::new();
    for expression in template.expressions() {
        visit(&expression.inner, &mut variables);
    }
    variables
}

/// Variables read by a single expression
pub fn expression_variables(expression: &Expression) -> BTreeSet<String> {
    let mut variables = BTreeSet::new();
    visit(expression, &mut variables);
    variables
}

fn visit(expression: &Expression, variables: &mut BTreeSet<String>) {
    match expression {
        Expression::VariableRef(name) => {
            variables.insert(name.as_str().to_string());
        }
        Expression::Compound(compound) => {
            let mut nodes = compound.nodes.iter().peekable();
            while let Some(node) = nodes.next() {
                let Expression::VariableRef(root) = &node.inner else {
                    visit(&node.inner, variables);
                    continue;
                };
                let mut path = root.as_str().to_string();
                while let Some(property) = nodes.next_if(|n| matches!(n.inner, Expression::PropertyOrField(_))) {
                    if let Expression::PropertyOrField(p) = &property.inner {
                        path.push('.');
                        path.push_str(p.name.as_str());
                    }
                }
                variables.insert(path);
            }
        }
        other => {
            for child in other.children() {
                visit(&child.inner, variables);
            }
        }
    }
}

/// Whether a deferred source registered as `source` feeds any of `variables`.
///
/// A source is needed when its name equals a variable path or is a dotted
/// prefix of one (`request` feeds `request.headers`).
pub fn requires(variables: &BTreeSet<String>, source: &str) -> bool {
    variables.iter().any(|variable| {
        variable == source
            || variable
                .strip_prefix(source)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}
