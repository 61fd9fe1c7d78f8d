//! Regular expressions used by `matches`, `replaceAll` and `split`

use gateway_el_diagnostics::{ElError, EL0210};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;

const CACHE_LIMIT: usize = 256;

static COMPILED: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Compile `pattern`, reusing earlier compilations
pub fn compile(pattern: &str) -> Result<Regex, ElError> {
    if let Some(regex) = COMPILED.lock().get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern).map_err(|err| {
        ElError::evaluation(EL0210, format!("invalid regular expression '{pattern}': {err}"))
    })?;
    let mut compiled = COMPILED.lock();
    if compiled.len() >= CACHE_LIMIT {
        compiled.clear();
    }
    compiled.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Whether the whole of `text` matches `pattern`
pub fn full_match(pattern: &str, text: &str) -> Result<bool, ElError> {
    let anchored = compile(&format!("^(?:{pattern})$"))?;
    Ok(anchored.is_match(text))
}

/// Translate a `$1`/`\$` style replacement into the regex crate's syntax
pub fn replacement(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('$') => out.push_str("$$"),
                Some(other) => out.push(other),
                None => {}
            },
            '$' if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push_str("${");
                while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                    out.push(digit);
                }
                out.push('}');
            }
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}

/// Split with trailing empty parts removed; a leading empty part from a
/// zero-width match at the start is dropped too.
pub fn split(pattern: &str, text: &str) -> Result<Vec<String>, ElError> {
    let regex = compile(pattern)?;
    let Some(first) = regex.find(text) else {
        return Ok(vec![text.to_string()]);
    };
    let mut parts: Vec<&str> = regex.split(text).collect();
    if first.start() == 0 && first.end() == 0 && parts.first() == Some(&"") {
        parts.remove(0);
    }
    while parts.last() == Some(&"") {
        parts.pop();
    }
    Ok(parts.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("[0-9]{2}", "78", true)]
    #[case("[0-9]{2}", "718", false)]
    #[case("[0-9]{2}", "abc", false)]
    #[case("/my/path/[A-Z]{1}[0-9]{2}", "/my/path/A58", true)]
    fn test_full_match(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(full_match(pattern, text).unwrap(), expected);
    }

    #[test]
    fn test_invalid_pattern() {
        assert_eq!(compile("(").unwrap_err().code(), EL0210);
    }

    #[rstest]
    #[case("$1-$2", "${1}-${2}")]
    #[case("\\$5", "$$5")]
    #[case("cost $", "cost $$")]
    fn test_replacement(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(replacement(input), expected);
    }

    #[rstest]
    #[case(",", "a,b,,", vec!["a", "b"])]
    #[case(",", "a", vec!["a"])]
    #[case(",", ",", vec![])]
    #[case("\\s+", "a  b c", vec!["a", "b", "c"])]
    fn test_split(#[case] pattern: &str, #[case] text: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split(pattern, text).unwrap(), expected);
    }
}
