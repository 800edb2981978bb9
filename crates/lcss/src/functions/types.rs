//! Type predicates and boolean helpers.

use super::{arg, text, BuiltinFn, FunctionError};
use crate::ast::Value;
use std::collections::HashMap;

type Result = std::result::Result<Value, FunctionError>;

pub(crate) fn register(table: &mut HashMap<&'static str, BuiltinFn>) {
    table.insert("isnumber", |a| is(a, |v| matches!(v, Value::Dimension(_))));
    table.insert("isstring", |a| is(a, |v| matches!(v, Value::Quoted(_))));
    table.insert("iscolor", |a| is(a, |v| matches!(v, Value::Color(_))));
    table.insert("iskeyword", |a| is(a, |v| matches!(v, Value::Keyword(_))));
    table.insert("isurl", |a| is(a, |v| matches!(v, Value::Url(_))));
    table.insert("isruleset", |a| is(a, |v| matches!(v, Value::DetachedRuleset(_))));
    table.insert("ispixel", |a| is(a, |v| has_unit(v, "px")));
    table.insert("isem", |a| is(a, |v| has_unit(v, "em")));
    table.insert("ispercentage", |a| is(a, |v| has_unit(v, "%")));
    table.insert("isunit", isunit);
    table.insert("boolean", boolean);
    table.insert("if", if_);
}

fn is(args: &[Value], predicate: fn(&Value) -> bool) -> Result {
    Ok(Value::boolean(predicate(arg(args, 0)?)))
}

fn has_unit(value: &Value, unit: &str) -> bool {
    matches!(value, Value::Dimension(d) if d.unit.is(unit))
}

fn isunit(args: &[Value]) -> Result {
    let unit = match arg(args, 1)? {
        Value::Dimension(d) => d.unit.to_css(false),
        other => text(other)?,
    };
    Ok(Value::boolean(has_unit(arg(args, 0)?, &unit)))
}

/// Conditions arrive already evaluated to `true` or `false`.
fn boolean(args: &[Value]) -> Result {
    Ok(Value::boolean(arg(args, 0)?.is_true()))
}

fn if_(args: &[Value]) -> Result {
    let chosen = if arg(args, 0)?.is_true() { args.get(1) } else { args.get(2) };
    Ok(chosen.cloned().unwrap_or_else(|| Value::Anonymous(String::new())))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, hex, num, px};
    use crate::ast::Value;
    use crate::functions::dim;

    #[test]
    fn test_predicates() {
        assert_eq!(call("isnumber", &[px(1.0)]).unwrap(), Value::boolean(true));
        assert_eq!(call("iscolor", &[hex("#fff")]).unwrap(), Value::boolean(true));
        assert_eq!(call("iskeyword", &[num(1.0)]).unwrap(), Value::boolean(false));
        assert_eq!(call("ispercentage", &[dim(5.0, "%")]).unwrap(), Value::boolean(true));
        assert_eq!(
            call("isunit", &[dim(5.0, "rem"), Value::keyword("rem")]).unwrap(),
            Value::boolean(true)
        );
    }

    #[test]
    fn test_if_picks_branch() {
        let args = [Value::boolean(false), Value::keyword("a"), Value::keyword("b")];
        assert_eq!(call("if", &args).unwrap(), Value::keyword("b"));
        assert_eq!(call("if", &args[..2]).unwrap(), Value::Anonymous(String::new()));
    }
}
