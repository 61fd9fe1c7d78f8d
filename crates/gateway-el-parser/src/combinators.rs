//! Shared Winnow building blocks for the expression grammar

use gateway_el_ast::Literal;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Location};
use winnow::token::{any, literal, one_of, take_while};

/// Parser input; tracks byte offsets into the enclosing template
pub type Input<'a> = LocatingSlice<&'a str>;

pub type PResult<T> = Result<T, ContextError>;

/// Current byte offset into the template
#[inline]
pub fn position(input: &Input<'_>) -> usize {
    input.current_token_start()
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Skip whitespace
pub fn ws(input: &mut Input<'_>) -> PResult<()> {
    take_while(0.., char::is_whitespace)
        .void()
        .parse_next(input)
}

/// Match an exact symbol
pub fn lit<'a>(symbol: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| literal(symbol).parse_next(input)
}

/// Match a word operator such as `and`, refusing prefixes of longer identifiers
pub fn keyword<'a>(word: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        let checkpoint = *input;
        let matched = literal(word).parse_next(input)?;
        if input.starts_with(is_ident_char) {
            *input = checkpoint;
            return Err(ContextError::new());
        }
        Ok(matched)
    }
}

/// Keyword surrounded by optional whitespace
pub fn padded_keyword<'a>(word: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        ws.parse_next(input)?;
        let matched = keyword(word).parse_next(input)?;
        ws.parse_next(input)?;
        Ok(matched)
    }
}

pub fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    if !input.starts_with(is_ident_start) {
        return Err(ContextError::new());
    }
    take_while(1.., is_ident_char).parse_next(input)
}

/// Dotted type name (`java.lang.Math`, `java.util.Base64$Encoder`)
pub fn type_name<'a>(input: &mut Input<'a>) -> PResult<String> {
    let mut name = identifier(input)?.to_string();
    loop {
        let checkpoint = *input;
        if lit(".").parse_next(input).is_err() {
            break;
        }
        match identifier(input) {
            Ok(segment) => {
                name.push('.');
                name.push_str(segment);
            }
            Err(_) => {
                *input = checkpoint;
                break;
            }
        }
    }
    Ok(name)
}

/// Single or double quoted string; a doubled quote stands for itself
pub fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut value = String::new();
    loop {
        let chunk = take_while(0.., |c: char| c != quote).parse_next(input)?;
        value.push_str(chunk);
        // closing quote
        any.parse_next(input)?;
        if input.starts_with(quote) {
            any.parse_next(input)?;
            value.push(quote);
            continue;
        }
        return Ok(value);
    }
}

/// Integer, long (`10L`) or decimal (`2.5`) literal
pub fn number_literal(input: &mut Input<'_>) -> PResult<Literal> {
    let digits = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;

    let checkpoint = *input;
    if lit(".").parse_next(input).is_ok() {
        let fraction = take_while::<_, _, ContextError>(1.., |c: char| c.is_ascii_digit())
            .parse_next(input);
        if let Ok(fraction) = fraction {
            return format!("{}.{}", digits, fraction)
                .parse::<f64>()
                .map(Literal::Decimal)
                .map_err(|_| ContextError::new());
        }
        *input = checkpoint;
    }

    if one_of::<_, _, ContextError>(['L', 'l']).parse_next(input).is_ok() {
        return digits
            .parse::<i64>()
            .map(Literal::Long)
            .map_err(|_| ContextError::new());
    }

    match digits.parse::<i32>() {
        Ok(value) => Ok(Literal::Integer(value)),
        // Too wide for an int: widen instead of failing
        Err(_) => digits
            .parse::<i64>()
            .map(Literal::Long)
            .map_err(|_| ContextError::new()),
    }
}
