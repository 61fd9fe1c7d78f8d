//! Logical and conditional operators
//!
//! Implements: And, Or, Not, ternary conditional and Elvis

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use gateway_el_ast::{BinaryOpExpr, ElvisExpr, Expression, TernaryExpr};
use gateway_el_types::Value;

impl Evaluator<'_> {
    /// Evaluate an operand that must be a boolean; null is not false here
    fn eval_condition(&self, operator: &str, expr: &Expression) -> EvalResult<bool> {
        match self.evaluate(expr)? {
            Value::Boolean(b) => Ok(b),
            Value::Deferred(_) => Err(EvalError::unresolved(format!("operator '{}'", operator))),
            other => Err(EvalError::invalid_operand(
                operator,
                format!("expected a boolean, got {}", describe(&other)),
            )),
        }
    }

    /// Evaluate And; the right operand only runs when the left is true
    pub fn eval_and(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        if !self.eval_condition("and", &expr.left.inner)? {
            return Ok(Value::Boolean(false));
        }
        Ok(Value::Boolean(self.eval_condition("and", &expr.right.inner)?))
    }

    /// Evaluate Or; the right operand only runs when the left is false
    pub fn eval_or(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        if self.eval_condition("or", &expr.left.inner)? {
            return Ok(Value::Boolean(true));
        }
        Ok(Value::Boolean(self.eval_condition("or", &expr.right.inner)?))
    }

    /// Evaluate Not (!)
    pub fn eval_not(&self, operand: &Value) -> EvalResult<Value> {
        match operand {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(EvalError::invalid_operand(
                "!",
                format!("expected a boolean, got {}", describe(other)),
            )),
        }
    }

    /// Evaluate `condition ? then : else`
    pub fn eval_ternary(&self, expr: &TernaryExpr) -> EvalResult<Value> {
        if self.eval_condition("?:", &expr.condition.inner)? {
            self.evaluate(&expr.then_branch.inner)
        } else {
            self.evaluate(&expr.else_branch.inner)
        }
    }

    /// Evaluate `value ?: fallback`; null and the empty string take the fallback
    pub fn eval_elvis(&self, expr: &ElvisExpr) -> EvalResult<Value> {
        match self.evaluate(&expr.value.inner)? {
            Value::Null => self.evaluate(&expr.fallback.inner),
            Value::String(s) if s.is_empty() => self.evaluate(&expr.fallback.inner),
            value => Ok(value),
        }
    }
}

fn describe(value: &Value) -> &str {
    match value {
        Value::Null => "null",
        other => other.type_name(),
    }
}
