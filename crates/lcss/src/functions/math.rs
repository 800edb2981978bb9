//! Math functions.

use super::{arg, dimension, wrong_type, BuiltinFn, FunctionError};
use crate::ast::Value;
use crate::types::dimension::conversion;
use crate::types::{Dimension, Unit, UnitGroup};
use std::cmp::Ordering;
use std::collections::HashMap;

type Result = std::result::Result<Value, FunctionError>;

pub(crate) fn register(table: &mut HashMap<&'static str, BuiltinFn>) {
    table.insert("ceil", |a| keep_unit(a, f64::ceil));
    table.insert("floor", |a| keep_unit(a, f64::floor));
    table.insert("sqrt", |a| keep_unit(a, f64::sqrt));
    table.insert("abs", |a| keep_unit(a, f64::abs));
    table.insert("round", round);
    table.insert("sin", |a| trig(a, f64::sin));
    table.insert("cos", |a| trig(a, f64::cos));
    table.insert("tan", |a| trig(a, f64::tan));
    table.insert("asin", |a| inverse_trig(a, f64::asin));
    table.insert("acos", |a| inverse_trig(a, f64::acos));
    table.insert("atan", |a| inverse_trig(a, f64::atan));
    table.insert("pi", |_| Ok(Value::Dimension(Dimension::number(std::f64::consts::PI))));
    table.insert("pow", pow);
    table.insert("mod", modulo);
    table.insert("min", |a| min_max(a, Ordering::Less));
    table.insert("max", |a| min_max(a, Ordering::Greater));
    table.insert("percentage", percentage);
}

fn keep_unit(args: &[Value], f: fn(f64) -> f64) -> Result {
    let d = dimension(arg(args, 0)?)?;
    Ok(Value::Dimension(Dimension::with_unit(f(d.value), d.unit.clone())))
}

fn round(args: &[Value]) -> Result {
    let d = dimension(arg(args, 0)?)?;
    let places = match args.get(1) {
        Some(p) => dimension(p)?.value.max(0.0) as i32,
        None => 0,
    };
    let scale = 10f64.powi(places);
    Ok(Value::Dimension(Dimension::with_unit(
        (d.value * scale).round() / scale,
        d.unit.clone(),
    )))
}

/// The argument in radians; unitless numbers already are.
fn radians(d: &Dimension) -> std::result::Result<f64, FunctionError> {
    if d.unit.is_empty() {
        return Ok(d.value);
    }
    let unit = d.unit.numerator.first().map(String::as_str).unwrap_or_default();
    match (conversion(unit), conversion("rad")) {
        (Some((UnitGroup::Angle, from)), Some((_, rad))) if d.unit.is_singular() => {
            Ok(d.value * from / rad)
        }
        _ => Err(FunctionError::failed(format!("expected an angle, got `{}`", d))),
    }
}

fn trig(args: &[Value], f: fn(f64) -> f64) -> Result {
    let d = dimension(arg(args, 0)?)?;
    Ok(Value::Dimension(Dimension::number(f(radians(d)?))))
}

fn inverse_trig(args: &[Value], f: fn(f64) -> f64) -> Result {
    let d = dimension(arg(args, 0)?)?;
    Ok(Value::Dimension(Dimension::new(f(d.value), "rad")))
}

fn pow(args: &[Value]) -> Result {
    let base = dimension(arg(args, 0)?)?;
    let exponent = dimension(arg(args, 1)?)?;
    Ok(Value::Dimension(Dimension::with_unit(
        base.value.powf(exponent.value),
        base.unit.clone(),
    )))
}

fn modulo(args: &[Value]) -> Result {
    let a = dimension(arg(args, 0)?)?;
    let b = dimension(arg(args, 1)?)?;
    Ok(Value::Dimension(Dimension::with_unit(a.value % b.value, a.unit.clone())))
}

/// Picks the extreme argument. Arguments whose units cannot be compared
/// leave the call to the browser.
fn min_max(args: &[Value], wanted: Ordering) -> Result {
    let mut best: Option<&Dimension> = None;
    for value in args {
        let d = match value {
            Value::Dimension(d) => d,
            other => return Err(wrong_type(other, "a number")),
        };
        best = match best {
            None => Some(d),
            Some(current) => match d.compare(current) {
                Some(ordering) if ordering == wanted => Some(d),
                Some(_) => Some(current),
                None => return Err(FunctionError::Unsupported),
            },
        };
    }
    best.map(|d| Value::Dimension(d.clone()))
        .ok_or_else(|| FunctionError::failed("expected at least one argument"))
}

fn percentage(args: &[Value]) -> Result {
    let d = dimension(arg(args, 0)?)?;
    Ok(Value::Dimension(Dimension::with_unit(d.value * 100.0, Unit::simple("%"))))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, num, px};
    use crate::functions::{dim, FunctionError};

    fn css(name: &str, args: &[crate::ast::Value]) -> String {
        call(name, args).unwrap().to_string()
    }

    #[test]
    fn test_rounding_keeps_units() {
        assert_eq!(css("ceil", &[px(2.4)]), "3px");
        assert_eq!(css("floor", &[dim(2.6, "em")]), "2em");
        assert_eq!(css("round", &[num(1.67), num(1.0)]), "1.7");
        assert_eq!(css("percentage", &[num(0.5)]), "50%");
    }

    #[test]
    fn test_trigonometry() {
        assert_eq!(css("sin", &[dim(90.0, "deg")]), "1");
        assert_eq!(css("cos", &[num(0.0)]), "1");
        assert_eq!(css("pow", &[px(2.0), num(3.0)]), "8px");
        assert_eq!(css("mod", &[px(11.0), num(3.0)]), "2px");
    }

    #[test]
    fn test_min_max() {
        assert_eq!(css("min", &[px(5.0), px(2.0), px(8.0)]), "2px");
        assert_eq!(css("max", &[dim(1.0, "cm"), px(10.0)]), "1cm");
        assert_eq!(call("min", &[px(1.0), dim(5.0, "vw")]), Err(FunctionError::Unsupported));
    }
}
