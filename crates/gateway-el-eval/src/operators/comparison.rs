//! Comparison operators
//!
//! Implements: Equal, NotEqual, Less, LessOrEqual, Greater, GreaterOrEqual,
//! Matches

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use gateway_el_ast::{BinaryOp, BinaryOpExpr};
use gateway_el_model::pattern;
use gateway_el_types::Value;
use std::cmp::Ordering;

impl Evaluator<'_> {
    /// Evaluate Equal (==): numbers compare across widths, null equals null
    pub fn eval_equal(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        Ok(Value::Boolean(left == right))
    }

    /// Evaluate NotEqual (!=)
    pub fn eval_not_equal(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        Ok(Value::Boolean(left != right))
    }

    /// Evaluate an ordering comparison; null sorts below every other value
    pub fn eval_comparison(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        let ordering = match (&left, &right) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (a, b) => a.compare(b).ok_or_else(|| {
                EvalError::invalid_operand(
                    expr.op.symbol(),
                    format!("cannot compare {} with {}", a.type_name(), b.type_name()),
                )
            })?,
        };

        let result = match expr.op {
            BinaryOp::Less => ordering == Ordering::Less,
            BinaryOp::LessOrEqual => ordering != Ordering::Greater,
            BinaryOp::Greater => ordering == Ordering::Greater,
            BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
            other => {
                return Err(EvalError::invalid_operand(
                    other.symbol(),
                    "not an ordering comparison",
                ));
            }
        };
        Ok(Value::Boolean(result))
    }

    /// Evaluate Matches: the whole left operand must match the pattern
    pub fn eval_matches(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        let Value::String(pattern) = &right else {
            return Err(EvalError::invalid_operand(
                "matches",
                format!("pattern must be a string, got {}", right.type_name()),
            ));
        };
        match left {
            Value::Null => Ok(Value::Boolean(false)),
            Value::String(text) => Ok(Value::Boolean(pattern::full_match(pattern, &text)?)),
            other => Ok(Value::Boolean(pattern::full_match(
                pattern,
                &other.to_display_string(),
            )?)),
        }
    }
}
