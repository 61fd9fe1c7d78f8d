//! Arithmetic operators
//!
//! Implements: Add (including string concatenation), Subtract, Multiply,
//! Divide, Modulo, Power, Negate

use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use gateway_el_ast::{BinaryOp, BinaryOpExpr};
use gateway_el_types::Value;

/// Operands widened to a common numeric kind
enum Numeric {
    Integer(i32, i32),
    Long(i64, i64),
    Decimal(f64, f64),
}

fn numeric_operands(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Numeric> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Numeric::Integer(*a, *b)),
        _ => {
            if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
                return Ok(Numeric::Long(a, b));
            }
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => Ok(Numeric::Decimal(a, b)),
                _ => Err(EvalError::invalid_operand(
                    op.symbol(),
                    format!(
                        "cannot apply to {} and {}",
                        left.type_name(),
                        right.type_name()
                    ),
                )),
            }
        }
    }
}

/// Text of an operand joined by `+`; null reads as "null" here
fn concat_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        other => other.to_display_string(),
    }
}

impl Evaluator<'_> {
    // =========================================================================
    // Binary Arithmetic
    // =========================================================================

    /// Evaluate Add (+): string concatenation when either side is a string
    pub fn eval_add(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;

        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            let mut text = concat_text(&left);
            text.push_str(&concat_text(&right));
            return Ok(Value::String(text));
        }

        match numeric_operands(BinaryOp::Add, &left, &right)? {
            Numeric::Integer(a, b) => a
                .checked_add(b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("Add")),
            Numeric::Long(a, b) => a
                .checked_add(b)
                .map(Value::Long)
                .ok_or_else(|| EvalError::overflow("Add")),
            Numeric::Decimal(a, b) => Ok(Value::Decimal(a + b)),
        }
    }

    /// Evaluate Subtract (-)
    pub fn eval_subtract(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        match numeric_operands(BinaryOp::Subtract, &left, &right)? {
            Numeric::Integer(a, b) => a
                .checked_sub(b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("Subtract")),
            Numeric::Long(a, b) => a
                .checked_sub(b)
                .map(Value::Long)
                .ok_or_else(|| EvalError::overflow("Subtract")),
            Numeric::Decimal(a, b) => Ok(Value::Decimal(a - b)),
        }
    }

    /// Evaluate Multiply (*)
    pub fn eval_multiply(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        match numeric_operands(BinaryOp::Multiply, &left, &right)? {
            Numeric::Integer(a, b) => a
                .checked_mul(b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("Multiply")),
            Numeric::Long(a, b) => a
                .checked_mul(b)
                .map(Value::Long)
                .ok_or_else(|| EvalError::overflow("Multiply")),
            Numeric::Decimal(a, b) => Ok(Value::Decimal(a * b)),
        }
    }

    /// Evaluate Divide (/): integral division truncates
    pub fn eval_divide(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        match numeric_operands(BinaryOp::Divide, &left, &right)? {
            Numeric::Integer(_, 0) | Numeric::Long(_, 0) => Err(EvalError::DivisionByZero),
            Numeric::Integer(a, b) => a
                .checked_div(b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("Divide")),
            Numeric::Long(a, b) => a
                .checked_div(b)
                .map(Value::Long)
                .ok_or_else(|| EvalError::overflow("Divide")),
            Numeric::Decimal(a, b) => Ok(Value::Decimal(a / b)),
        }
    }

    /// Evaluate Modulo (%): the result takes the sign of the dividend
    pub fn eval_modulo(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        match numeric_operands(BinaryOp::Modulo, &left, &right)? {
            Numeric::Integer(_, 0) | Numeric::Long(_, 0) => Err(EvalError::DivisionByZero),
            Numeric::Integer(a, b) => a
                .checked_rem(b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("Modulo")),
            Numeric::Long(a, b) => a
                .checked_rem(b)
                .map(Value::Long)
                .ok_or_else(|| EvalError::overflow("Modulo")),
            Numeric::Decimal(a, b) => Ok(Value::Decimal(a % b)),
        }
    }

    /// Evaluate Power (^).
    ///
    /// Integral powers stay `Integer` while the result fits and widen to
    /// `Long` otherwise; a negative exponent yields a decimal.
    pub fn eval_power(&self, expr: &BinaryOpExpr) -> EvalResult<Value> {
        let (left, right) = self.eval_binary_operands(expr)?;
        let (base, exponent, narrow) = match numeric_operands(BinaryOp::Power, &left, &right)? {
            Numeric::Integer(a, b) => (i64::from(a), i64::from(b), true),
            Numeric::Long(a, b) => (a, b, false),
            Numeric::Decimal(a, b) => return Ok(Value::Decimal(a.powf(b))),
        };

        if exponent < 0 {
            return Ok(Value::Decimal((base as f64).powf(exponent as f64)));
        }
        let result = u32::try_from(exponent)
            .ok()
            .and_then(|e| base.checked_pow(e))
            .ok_or_else(|| EvalError::overflow("Power"))?;
        match i32::try_from(result) {
            Ok(small) if narrow => Ok(Value::Integer(small)),
            _ => Ok(Value::Long(result)),
        }
    }

    // =========================================================================
    // Unary Arithmetic
    // =========================================================================

    /// Evaluate Negate (-)
    pub fn eval_negate(&self, operand: &Value) -> EvalResult<Value> {
        match operand {
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| EvalError::overflow("Negate")),
            Value::Long(l) => l
                .checked_neg()
                .map(Value::Long)
                .ok_or_else(|| EvalError::overflow("Negate")),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            other => Err(EvalError::invalid_operand(
                "-",
                format!("cannot negate {}", other.type_name()),
            )),
        }
    }
}
