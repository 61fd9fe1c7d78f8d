//! Expression parser using recursive descent with precedence climbing
//!
//! Levels, loosest first: ternary / Elvis, `or`, `and`, equality, relational,
//! additive, multiplicative, power, unary, postfix navigation, primary.

use crate::combinators::{
    identifier, keyword, lit, number_literal, position, string_literal, type_name, ws, Input,
    PResult,
};
use gateway_el_ast::{
    Arguments, BinaryOp, BinaryOpExpr, CompoundExpr, ConstructorExpr, ElvisExpr, Expression,
    FunctionCallExpr, IndexerExpr, InlineListExpr, InlineMapExpr, Literal, MapEntry,
    MethodCallExpr, PropertyRef, Spanned, TernaryExpr, TypeName, UnaryOp, UnaryOpExpr,
};
use gateway_el_diagnostics::Span;
use winnow::error::ContextError;
use winnow::prelude::*;

/// Parse one expression (entry point)
pub fn expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    ws.parse_next(input)?;
    ternary_expression(input)
}

fn spanned(expr: Expression, start: usize, input: &Input<'_>) -> Spanned<Expression> {
    Spanned::new(expr, Span::new(start, position(input)))
}

fn binary(
    left: Spanned<Expression>,
    op: BinaryOp,
    right: Spanned<Expression>,
    start: usize,
    input: &Input<'_>,
) -> Spanned<Expression> {
    spanned(
        Expression::BinaryOp(BinaryOpExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }),
        start,
        input,
    )
}

/// Ternary and Elvis (lowest precedence, right-associative)
fn ternary_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let condition = or_expression(input)?;

    let checkpoint = *input;
    ws.parse_next(input)?;

    if lit("?:").parse_next(input).is_ok() {
        let fallback = expression(input)?;
        return Ok(spanned(
            Expression::Elvis(ElvisExpr {
                value: Box::new(condition),
                fallback: Box::new(fallback),
            }),
            start,
            input,
        ));
    }

    if !input.starts_with("?.") && lit("?").parse_next(input).is_ok() {
        let then_branch = expression(input)?;
        ws.parse_next(input)?;
        lit(":").parse_next(input)?;
        let else_branch = expression(input)?;
        return Ok(spanned(
            Expression::Ternary(TernaryExpr {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }),
            start,
            input,
        ));
    }

    *input = checkpoint;
    Ok(condition)
}

fn or_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut left = and_expression(input)?;

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        if lit("||").parse_next(input).is_ok() || keyword("or").parse_next(input).is_ok() {
            let right = and_expression(input)?;
            left = binary(left, BinaryOp::Or, right, start, input);
        } else {
            *input = checkpoint;
            break;
        }
    }

    Ok(left)
}

fn and_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut left = equality_expression(input)?;

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        if lit("&&").parse_next(input).is_ok() || keyword("and").parse_next(input).is_ok() {
            let right = equality_expression(input)?;
            left = binary(left, BinaryOp::And, right, start, input);
        } else {
            *input = checkpoint;
            break;
        }
    }

    Ok(left)
}

fn equality_operator(input: &mut Input<'_>) -> Option<BinaryOp> {
    if lit("==").parse_next(input).is_ok() || keyword("eq").parse_next(input).is_ok() {
        Some(BinaryOp::Equal)
    } else if lit("!=").parse_next(input).is_ok() || keyword("ne").parse_next(input).is_ok() {
        Some(BinaryOp::NotEqual)
    } else {
        None
    }
}

fn equality_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut left = relational_expression(input)?;

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        match equality_operator(input) {
            Some(op) => {
                let right = relational_expression(input)?;
                left = binary(left, op, right, start, input);
            }
            None => {
                *input = checkpoint;
                break;
            }
        }
    }

    Ok(left)
}

fn relational_operator(input: &mut Input<'_>) -> Option<BinaryOp> {
    // Two-character symbols first so `<=` is not read as `<`
    if lit("<=").parse_next(input).is_ok() || keyword("le").parse_next(input).is_ok() {
        Some(BinaryOp::LessOrEqual)
    } else if lit(">=").parse_next(input).is_ok() || keyword("ge").parse_next(input).is_ok() {
        Some(BinaryOp::GreaterOrEqual)
    } else if lit("<").parse_next(input).is_ok() || keyword("lt").parse_next(input).is_ok() {
        Some(BinaryOp::Less)
    } else if lit(">").parse_next(input).is_ok() || keyword("gt").parse_next(input).is_ok() {
        Some(BinaryOp::Greater)
    } else if keyword("matches").parse_next(input).is_ok() {
        Some(BinaryOp::Matches)
    } else {
        None
    }
}

fn relational_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut left = additive_expression(input)?;

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        match relational_operator(input) {
            Some(op) => {
                let right = additive_expression(input)?;
                left = binary(left, op, right, start, input);
            }
            None => {
                *input = checkpoint;
                break;
            }
        }
    }

    Ok(left)
}

fn additive_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut left = multiplicative_expression(input)?;

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        let op = if lit("+").parse_next(input).is_ok() {
            BinaryOp::Add
        } else if lit("-").parse_next(input).is_ok() {
            BinaryOp::Subtract
        } else {
            *input = checkpoint;
            break;
        };
        let right = multiplicative_expression(input)?;
        left = binary(left, op, right, start, input);
    }

    Ok(left)
}

fn multiplicative_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut left = power_expression(input)?;

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        let op = if lit("*").parse_next(input).is_ok() {
            BinaryOp::Multiply
        } else if lit("/").parse_next(input).is_ok() || keyword("div").parse_next(input).is_ok() {
            BinaryOp::Divide
        } else if lit("%").parse_next(input).is_ok() || keyword("mod").parse_next(input).is_ok() {
            BinaryOp::Modulo
        } else {
            *input = checkpoint;
            break;
        };
        let right = power_expression(input)?;
        left = binary(left, op, right, start, input);
    }

    Ok(left)
}

/// `^` binds tighter than multiplication and associates to the right
fn power_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let base = unary_expression(input)?;

    let checkpoint = *input;
    ws.parse_next(input)?;
    if lit("^").parse_next(input).is_ok() {
        let exponent = power_expression(input)?;
        return Ok(binary(base, BinaryOp::Power, exponent, start, input));
    }
    *input = checkpoint;
    Ok(base)
}

fn unary_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    ws.parse_next(input)?;
    let start = position(input);

    let op = if !input.starts_with("!=") && lit("!").parse_next(input).is_ok() {
        Some(UnaryOp::Not)
    } else if keyword("not").parse_next(input).is_ok() {
        Some(UnaryOp::Not)
    } else if lit("-").parse_next(input).is_ok() {
        Some(UnaryOp::Negate)
    } else {
        None
    };

    match op {
        Some(op) => {
            let operand = unary_expression(input)?;
            Ok(spanned(
                Expression::UnaryOp(UnaryOpExpr {
                    op,
                    operand: Box::new(operand),
                }),
                start,
                input,
            ))
        }
        None => postfix_expression(input),
    }
}

/// Primary followed by `.name`, `?.name`, `.call(..)` and `[index]` steps
fn postfix_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let mut nodes = vec![primary_expression(input)?];

    loop {
        let checkpoint = *input;
        ws.parse_next(input)?;
        let step_start = position(input);

        if lit("[").parse_next(input).is_ok() {
            let index = expression(input)?;
            ws.parse_next(input)?;
            lit("]").parse_next(input)?;
            nodes.push(spanned(
                Expression::Indexer(IndexerExpr {
                    index: Box::new(index),
                }),
                step_start,
                input,
            ));
            continue;
        }

        let null_safe = if lit("?.").parse_next(input).is_ok() {
            true
        } else if lit(".").parse_next(input).is_ok() {
            false
        } else {
            *input = checkpoint;
            break;
        };

        ws.parse_next(input)?;
        let name = identifier(input)?;
        let after_name = *input;
        ws.parse_next(input)?;
        let step = if lit("(").parse_next(input).is_ok() {
            Expression::MethodCall(MethodCallExpr {
                name: name.into(),
                arguments: arguments(input)?,
                null_safe,
            })
        } else {
            *input = after_name;
            Expression::PropertyOrField(PropertyRef {
                name: name.into(),
                null_safe,
            })
        };
        nodes.push(spanned(step, step_start, input));
    }

    if nodes.len() > 1 {
        return Ok(spanned(
            Expression::Compound(CompoundExpr { nodes }),
            start,
            input,
        ));
    }
    nodes.pop().ok_or_else(ContextError::new)
}

/// Call arguments after the opening parenthesis, through the closing one
fn arguments<'a>(input: &mut Input<'a>) -> PResult<Arguments> {
    let mut args = Arguments::new();
    ws.parse_next(input)?;
    if lit(")").parse_next(input).is_ok() {
        return Ok(args);
    }

    loop {
        args.push(expression(input)?);
        ws.parse_next(input)?;
        if lit(",").parse_next(input).is_ok() {
            continue;
        }
        lit(")").parse_next(input)?;
        return Ok(args);
    }
}

fn primary_expression<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    ws.parse_next(input)?;
    let start = position(input);

    if lit("(").parse_next(input).is_ok() {
        let inner = expression(input)?;
        ws.parse_next(input)?;
        lit(")").parse_next(input)?;
        return Ok(spanned(Expression::Parenthesized(Box::new(inner)), start, input));
    }

    if lit("#").parse_next(input).is_ok() {
        ws.parse_next(input)?;
        let name = identifier(input)?;
        let after_name = *input;
        ws.parse_next(input)?;
        if lit("(").parse_next(input).is_ok() {
            let call = FunctionCallExpr {
                name: name.into(),
                arguments: arguments(input)?,
            };
            return Ok(spanned(Expression::FunctionCall(call), start, input));
        }
        *input = after_name;
        return Ok(spanned(Expression::VariableRef(name.into()), start, input));
    }

    if input.starts_with('{') {
        return inline_collection(input, start);
    }

    if input.starts_with(['\'', '"']) {
        let value = string_literal(input)?;
        return Ok(spanned(Expression::Literal(Literal::String(value)), start, input));
    }

    if input.starts_with(|c: char| c.is_ascii_digit()) {
        let value = number_literal(input)?;
        return Ok(spanned(Expression::Literal(value), start, input));
    }

    let word = identifier(input)?;
    let expr = match word {
        "true" => Expression::Literal(Literal::Boolean(true)),
        "false" => Expression::Literal(Literal::Boolean(false)),
        "null" => Expression::Literal(Literal::Null),
        "new" => {
            ws.parse_next(input)?;
            let name = type_name(input)?;
            ws.parse_next(input)?;
            lit("(").parse_next(input)?;
            Expression::Constructor(ConstructorExpr {
                type_name: TypeName::new(name),
                arguments: arguments(input)?,
            })
        }
        "T" if type_reference_follows(input) => {
            ws.parse_next(input)?;
            lit("(").parse_next(input)?;
            ws.parse_next(input)?;
            let name = type_name(input)?;
            ws.parse_next(input)?;
            lit(")").parse_next(input)?;
            Expression::TypeRef(TypeName::new(name))
        }
        // Bare name: a property or method of the (absent) root object
        name => {
            let after_name = *input;
            ws.parse_next(input)?;
            if lit("(").parse_next(input).is_ok() {
                Expression::MethodCall(MethodCallExpr {
                    name: name.into(),
                    arguments: arguments(input)?,
                    null_safe: false,
                })
            } else {
                *input = after_name;
                Expression::PropertyOrField(PropertyRef {
                    name: name.into(),
                    null_safe: false,
                })
            }
        }
    };

    Ok(spanned(expr, start, input))
}

fn type_reference_follows(input: &Input<'_>) -> bool {
    input.trim_start().starts_with('(')
}

/// `{a, b}`, `{'k': v}`, `{}` or `{:}`
fn inline_collection<'a>(input: &mut Input<'a>, start: usize) -> PResult<Spanned<Expression>> {
    lit("{").parse_next(input)?;
    ws.parse_next(input)?;

    if lit("}").parse_next(input).is_ok() {
        let list = InlineListExpr { elements: vec![] };
        return Ok(spanned(Expression::InlineList(list), start, input));
    }
    if lit(":").parse_next(input).is_ok() {
        ws.parse_next(input)?;
        lit("}").parse_next(input)?;
        let map = InlineMapExpr { entries: vec![] };
        return Ok(spanned(Expression::InlineMap(map), start, input));
    }

    let checkpoint = *input;
    let is_map = map_key(input).is_ok() && ws.parse_next(input).is_ok() && input.starts_with(':');
    *input = checkpoint;
    if is_map {
        return inline_map(input, start);
    }

    let mut elements = Vec::new();
    loop {
        elements.push(expression(input)?);
        ws.parse_next(input)?;
        if lit(",").parse_next(input).is_ok() {
            continue;
        }
        lit("}").parse_next(input)?;
        break;
    }
    Ok(spanned(
        Expression::InlineList(InlineListExpr { elements }),
        start,
        input,
    ))
}

fn inline_map<'a>(input: &mut Input<'a>, start: usize) -> PResult<Spanned<Expression>> {
    let mut entries = Vec::new();
    loop {
        ws.parse_next(input)?;
        let key = map_key(input)?;
        ws.parse_next(input)?;
        lit(":").parse_next(input)?;
        let value = expression(input)?;
        entries.push(MapEntry { key, value });
        ws.parse_next(input)?;
        if lit(",").parse_next(input).is_ok() {
            continue;
        }
        lit("}").parse_next(input)?;
        break;
    }
    Ok(spanned(
        Expression::InlineMap(InlineMapExpr { entries }),
        start,
        input,
    ))
}

/// Map keys are literals; a bare word is taken as its own text
fn map_key<'a>(input: &mut Input<'a>) -> PResult<Spanned<Expression>> {
    let start = position(input);
    let key = if input.starts_with(['\'', '"']) {
        Literal::String(string_literal(input)?)
    } else if input.starts_with(|c: char| c.is_ascii_digit()) {
        number_literal(input)?
    } else {
        Literal::String(identifier(input)?.to_string())
    };
    Ok(spanned(Expression::Literal(key), start, input))
}
