//! `String.format` style formatting

use gateway_el_types::{HostError, Value};

#[derive(Default)]
struct Spec {
    index: Option<usize>,
    left: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

/// Format `args` into `pattern`.
///
/// Supports `%s %S %d %f %x %X %b %n %%`, explicit argument indexes (`%2$s`),
/// width, precision and the `-`/`0` flags.
pub fn format(pattern: &str, args: &[Value]) -> Result<String, HostError> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        let mut digits = String::new();
        while let Some(d) = chars.next_if(char::is_ascii_digit) {
            digits.push(d);
        }
        if chars.next_if_eq(&'$').is_some() {
            let position: usize = digits
                .parse()
                .map_err(|_| HostError::invalid_argument("invalid argument index"))?;
            spec.index = Some(position.saturating_sub(1));
            digits.clear();
        }
        if digits.is_empty() {
            loop {
                if chars.next_if_eq(&'-').is_some() {
                    spec.left = true;
                } else if chars.next_if_eq(&'0').is_some() {
                    spec.zero = true;
                } else {
                    break;
                }
            }
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                digits.push(d);
            }
        } else if digits.starts_with('0') && digits.len() > 1 {
            spec.zero = true;
        }
        spec.width = digits.parse().ok();
        if chars.next_if_eq(&'.').is_some() {
            let mut precision = String::new();
            while let Some(d) = chars.next_if(char::is_ascii_digit) {
                precision.push(d);
            }
            spec.precision = precision.parse().ok();
        }

        let conversion = chars
            .next()
            .ok_or_else(|| HostError::invalid_argument("format ends with '%'"))?;
        let rendered = match conversion {
            '%' => "%".to_string(),
            'n' => "\n".to_string(),
            _ => {
                let index = spec.index.unwrap_or_else(|| {
                    let current = next_arg;
                    next_arg += 1;
                    current
                });
                let value = args.get(index).ok_or_else(|| {
                    HostError::invalid_argument(format!("missing format argument for '%{conversion}'"))
                })?;
                convert(conversion, value, &spec)?
            }
        };
        pad(&mut out, &rendered, &spec);
    }
    Ok(out)
}

fn convert(conversion: char, value: &Value, spec: &Spec) -> Result<String, HostError> {
    let text = match conversion {
        's' | 'S' => {
            let mut text = match value {
                Value::Null => "null".to_string(),
                other => other.to_string(),
            };
            if let Some(precision) = spec.precision {
                text = text.chars().take(precision).collect();
            }
            if conversion == 'S' {
                text = text.to_uppercase();
            }
            text
        }
        'b' | 'B' => match value {
            Value::Null => "false".to_string(),
            Value::Boolean(b) => b.to_string(),
            _ => "true".to_string(),
        },
        'd' => match value {
            Value::Integer(i) => i.to_string(),
            Value::Long(l) => l.to_string(),
            other => return Err(mismatch(conversion, other)),
        },
        'x' | 'X' => {
            let hex = match value {
                Value::Integer(i) => format!("{:x}", *i as u32),
                Value::Long(l) => format!("{:x}", *l as u64),
                other => return Err(mismatch(conversion, other)),
            };
            if conversion == 'X' { hex.to_uppercase() } else { hex }
        }
        'f' => {
            let number = value.as_f64().ok_or_else(|| mismatch(conversion, value))?;
            format!("{:.*}", spec.precision.unwrap_or(6), number)
        }
        other => {
            return Err(HostError::invalid_argument(format!(
                "unsupported format conversion '%{other}'"
            )));
        }
    };
    Ok(text)
}

fn mismatch(conversion: char, value: &Value) -> HostError {
    HostError::invalid_argument(format!(
        "'%{conversion}' cannot format {}",
        value.type_name()
    ))
}

fn pad(out: &mut String, text: &str, spec: &Spec) {
    let len = text.chars().count();
    let fill = spec.width.unwrap_or(0).saturating_sub(len);
    if fill == 0 {
        out.push_str(text);
    } else if spec.left {
        out.push_str(text);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if spec.zero {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", text),
        };
        out.push_str(sign);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("%scd", vec![Value::from("ab")], "abcd")]
    #[case("%scd", vec![Value::from("{2}")], "{2}cd")]
    #[case("XX%sXX", vec![Value::from("/path")], "XX/pathXX")]
    #[case("%d%%", vec![Value::Integer(50)], "50%")]
    #[case("%05d", vec![Value::Integer(-42)], "-0042")]
    #[case("%-4s|", vec![Value::from("a")], "a   |")]
    #[case("%.2f", vec![Value::Decimal(3.14159)], "3.14")]
    #[case("%2$s %1$s", vec![Value::from("a"), Value::from("b")], "b a")]
    #[case("%x", vec![Value::Integer(255)], "ff")]
    #[case("%s", vec![Value::Null], "null")]
    #[case("%b", vec![Value::from("x")], "true")]
    fn test_format(#[case] pattern: &str, #[case] args: Vec<Value>, #[case] expected: &str) {
        assert_eq!(format(pattern, &args).unwrap(), expected);
    }

    #[test]
    fn test_format_errors() {
        assert!(format("%s", &[]).is_err());
        assert!(format("%d", &[Value::from("a")]).is_err());
        assert!(format("%q", &[Value::Integer(1)]).is_err());
        assert!(format("50%", &[]).is_err());
    }
}
