//! String and unit functions.

use super::{arg, dimension, text, wrong_type, BuiltinFn, FunctionError};
use crate::ast::{Quoted, Value};
use crate::types::dimension::conversion;
use crate::types::{Dimension, Unit};
use regex::RegexBuilder;
use std::collections::HashMap;

type Result = std::result::Result<Value, FunctionError>;

pub(crate) fn register(table: &mut HashMap<&'static str, BuiltinFn>) {
    table.insert("e", e);
    table.insert("escape", escape);
    table.insert("%", format);
    table.insert("replace", replace);
    table.insert("unit", unit);
    table.insert("get-unit", get_unit);
    table.insert("convert", convert);
}

fn e(args: &[Value]) -> Result {
    Ok(Value::Quoted(Quoted::new(text(arg(args, 0)?)?, None)))
}

/// Characters `escape()` leaves alone.
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b",/?@&+$-_.!~*'".contains(&b)
}

fn percent_encode(input: &str, keep: fn(u8) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if keep(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn escape(args: &[Value]) -> Result {
    Ok(Value::Anonymous(percent_encode(&text(arg(args, 0)?)?, is_unreserved)))
}

/// `%("%d/%s", a, b)`: `%s` inserts strings without quotes, `%d` and `%a`
/// insert CSS text; upper-case placeholders are URL-encoded.
fn format(args: &[Value]) -> Result {
    let (template, quote) = match arg(args, 0)? {
        Value::Quoted(q) => (q.content.clone(), q.quote),
        other => (text(other)?, None),
    };
    let mut rest = args[1..].iter();
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(p @ ('s' | 'S' | 'd' | 'D' | 'a' | 'A')) => {
                let Some(value) = rest.next() else {
                    out.push('%');
                    continue;
                };
                chars.next();
                let inserted = match value {
                    Value::Quoted(q) if p.eq_ignore_ascii_case(&'s') => q.content.clone(),
                    other => other.to_string(),
                };
                if p.is_ascii_uppercase() {
                    out.push_str(&percent_encode(&inserted, |b| {
                        b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b)
                    }));
                } else {
                    out.push_str(&inserted);
                }
            }
            _ => out.push('%'),
        }
    }
    Ok(Value::Quoted(Quoted::new(out, quote)))
}

/// `replace(string, pattern, replacement[, flags])` with a regular
/// expression pattern; flag `g` replaces every match, `i` ignores case.
fn replace(args: &[Value]) -> Result {
    let subject = arg(args, 0)?;
    let pattern = text(arg(args, 1)?)?;
    let replacement = text(arg(args, 2)?)?;
    let flags = match args.get(3) {
        Some(f) => text(f)?,
        None => String::new(),
    };
    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(flags.contains('i'))
        .build()
        .map_err(|e| FunctionError::failed(format!("invalid pattern `{}`: {}", pattern, e)))?;
    let replacement = replacement.replace("$&", "${0}");
    let input = text(subject)?;
    let result = if flags.contains('g') {
        regex.replace_all(&input, replacement.as_str())
    } else {
        regex.replace(&input, replacement.as_str())
    };
    Ok(match subject {
        Value::Quoted(q) => Value::Quoted(Quoted::new(result.into_owned(), q.quote)),
        _ => Value::Anonymous(result.into_owned()),
    })
}

fn unit(args: &[Value]) -> Result {
    let d = match arg(args, 0)? {
        Value::Dimension(d) => d,
        other => return Err(wrong_type(other, "a number")),
    };
    let unit = match args.get(1) {
        Some(Value::Dimension(u)) => u.unit.to_css(false),
        Some(other) => text(other)?,
        None => String::new(),
    };
    Ok(Value::Dimension(Dimension::with_unit(d.value, Unit::simple(&unit))))
}

fn get_unit(args: &[Value]) -> Result {
    Ok(Value::Anonymous(dimension(arg(args, 0)?)?.unit.to_css(false)))
}

fn convert(args: &[Value]) -> Result {
    let d = dimension(arg(args, 0)?)?;
    let target = text(arg(args, 1)?)?;
    match conversion(&target) {
        Some((group, _)) => Ok(Value::Dimension(d.convert_to(&[(group, target)]))),
        None => Ok(Value::Dimension(d.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, num, px};
    use crate::ast::{Quoted, Value};
    use crate::functions::dim;

    fn quoted(s: &str) -> Value {
        Value::Quoted(Quoted::new(s, Some('"')))
    }

    fn css(name: &str, args: &[Value]) -> String {
        call(name, args).unwrap().to_string()
    }

    #[test]
    fn test_escaping() {
        assert_eq!(css("e", &[quoted("a b")]), "a b");
        assert_eq!(css("escape", &[quoted("a=1 (x)")]), "a%3D1%20%28x%29");
    }

    #[test]
    fn test_format() {
        assert_eq!(
            css("%", &[quoted("repetitions: %d file: %s"), num(3.0), quoted("app.less")]),
            "\"repetitions: 3 file: app.less\""
        );
        assert_eq!(css("%", &[quoted("%A"), quoted("a b")]), "\"%22a%20b%22\"");
        assert_eq!(css("%", &[quoted("100%%")]), "\"100%\"");
    }

    #[test]
    fn test_replace() {
        assert_eq!(
            css("replace", &[quoted("Hello, Mars"), quoted("Mars\\??"), quoted("World!")]),
            "\"Hello, World!\""
        );
        assert_eq!(
            css("replace", &[quoted("a-b-c"), quoted("-"), quoted("+"), quoted("g")]),
            "\"a+b+c\""
        );
    }

    #[test]
    fn test_units() {
        assert_eq!(css("unit", &[px(5.0)]), "5");
        assert_eq!(css("unit", &[num(5.0), Value::keyword("em")]), "5em");
        assert_eq!(css("get-unit", &[dim(5.0, "rem")]), "rem");
        assert_eq!(css("convert", &[dim(1.0, "s"), Value::keyword("ms")]), "1000ms");
        assert_eq!(css("convert", &[px(1.0), Value::keyword("s")]), "1px");
    }
}
