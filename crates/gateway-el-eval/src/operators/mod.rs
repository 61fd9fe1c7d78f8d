//! Operator implementations
//!
//! Each submodule adds `eval_*` methods to [`Evaluator`]; this module holds the
//! binary and unary dispatch.

mod arithmetic;
mod comparison;
mod logical;

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use gateway_el_ast::{BinaryOp, BinaryOpExpr, UnaryOp, UnaryOpExpr};
use gateway_el_types::Value;

impl Evaluator<'_> {
    pub fn eval_binary(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        match expr.op {
            BinaryOp::And => self.eval_and(expr),
            BinaryOp::Or => self.eval_or(expr),
            BinaryOp::Equal => self.eval_equal(expr),
            BinaryOp::NotEqual => self.eval_not_equal(expr),
            BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
                self.eval_comparison(expr)
            }
            BinaryOp::Matches => self.eval_matches(expr),
            BinaryOp::Add => self.eval_add(expr),
            BinaryOp::Subtract => self.eval_subtract(expr),
            BinaryOp::Multiply => self.eval_multiply(expr),
            BinaryOp::Divide => self.eval_divide(expr),
            BinaryOp::Modulo => self.eval_modulo(expr),
            BinaryOp::Power => self.eval_power(expr),
        }
    }

    pub fn eval_unary(&self, expr: &UnaryOpExpr) -> EvalResult<Value> {
        let operand = self.evaluate(&expr.operand.inner)?;
        if operand.is_deferred() {
            return Err(EvalError::unresolved(format!("operator '{}'", expr.op)));
        }
        match expr.op {
            UnaryOp::Not => self.eval_not(&operand),
            UnaryOp::Negate => self.eval_negate(&operand),
        }
    }

    /// Evaluate both operands; deferred values never reach an operator
    fn eval_binary_operands(&self, expr: &BinaryOpExpr) -> EvalResult<(Value, Value)> {
        let left = self.evaluate(&expr.left.inner)?;
        let right = self.evaluate(&expr.right.inner)?;
        if left.is_deferred() || right.is_deferred() {
            return Err(EvalError::unresolved(format!("operator '{}'", expr.op)));
        }
        Ok((left, right))
    }
}
