//! List functions.

use super::{arg, dimension, BuiltinFn, FunctionError};
use crate::ast::Value;
use crate::types::Dimension;
use std::collections::HashMap;

type Result = std::result::Result<Value, FunctionError>;

pub(crate) fn register(table: &mut HashMap<&'static str, BuiltinFn>) {
    table.insert("length", length);
    table.insert("extract", extract);
    table.insert("range", range);
}

fn length(args: &[Value]) -> Result {
    let count = match args {
        [single] => single.list_items().len(),
        many => many.len(),
    };
    Ok(Value::Dimension(Dimension::number(count as f64)))
}

/// 1-based; an index past the end leaves the call as written.
fn extract(args: &[Value]) -> Result {
    let items = arg(args, 0)?.list_items();
    let index = dimension(arg(args, 1)?)?.value;
    if index < 1.0 || index.fract() != 0.0 {
        return Err(FunctionError::Unsupported);
    }
    items
        .into_iter()
        .nth(index as usize - 1)
        .ok_or(FunctionError::Unsupported)
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`; the
/// items take the unit of `end`.
fn range(args: &[Value]) -> Result {
    let (start, end, step) = match args {
        [end] => (1.0, dimension(end)?, 1.0),
        [start, end] => (dimension(start)?.value, dimension(end)?, 1.0),
        [start, end, step, ..] => {
            (dimension(start)?.value, dimension(end)?, dimension(step)?.value)
        }
        [] => return Err(FunctionError::failed("expected at least one argument")),
    };
    if step <= 0.0 {
        return Err(FunctionError::failed("step must be positive"));
    }
    let mut items = Vec::new();
    let mut i = start;
    while i <= end.value {
        items.push(Value::Dimension(Dimension::with_unit(i, end.unit.clone())));
        i += step;
    }
    Ok(Value::Expression(items))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, num, px};
    use crate::ast::Value;
    use crate::functions::FunctionError;

    fn list() -> Value {
        Value::List(vec![px(1.0), px(2.0), px(3.0)])
    }

    #[test]
    fn test_length_and_extract() {
        assert_eq!(call("length", &[list()]).unwrap().to_string(), "3");
        assert_eq!(call("length", &[num(7.0)]).unwrap().to_string(), "1");
        assert_eq!(call("extract", &[list(), num(2.0)]).unwrap().to_string(), "2px");
        assert_eq!(call("extract", &[list(), num(4.0)]), Err(FunctionError::Unsupported));
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", &[px(3.0)]).unwrap().to_string(), "1px 2px 3px");
        assert_eq!(call("range", &[num(0.0), num(10.0), num(5.0)]).unwrap().to_string(), "0 5 10");
    }
}
