//! Numbers with units.
//!
//! A [`Unit`] keeps separate numerator and denominator lists so that
//! multiplication and division compose units (`10px * 2px` is `20px*px`
//! internally, `10px / 2px` cancels to a bare number). Convertible units
//! (lengths, durations, angles) are rescaled before addition.

use phf::phf_map;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitGroup {
    Length,
    Duration,
    Angle,
}

/// Scale of each convertible unit relative to its group's base unit.
static CONVERSIONS: phf::Map<&'static str, (UnitGroup, f64)> = phf_map! {
    "m" => (UnitGroup::Length, 1.0),
    "cm" => (UnitGroup::Length, 0.01),
    "mm" => (UnitGroup::Length, 0.001),
    "in" => (UnitGroup::Length, 0.0254),
    "px" => (UnitGroup::Length, 0.0254 / 96.0),
    "pt" => (UnitGroup::Length, 0.0254 / 72.0),
    "pc" => (UnitGroup::Length, 0.0254 / 72.0 * 12.0),
    "q" => (UnitGroup::Length, 0.00025),
    "s" => (UnitGroup::Duration, 1.0),
    "ms" => (UnitGroup::Duration, 0.001),
    "rad" => (UnitGroup::Angle, 1.0 / (2.0 * std::f64::consts::PI)),
    "deg" => (UnitGroup::Angle, 1.0 / 360.0),
    "grad" => (UnitGroup::Angle, 1.0 / 400.0),
    "turn" => (UnitGroup::Angle, 1.0),
};

fn base_unit(group: UnitGroup) -> &'static str {
    match group {
        UnitGroup::Length => "m",
        UnitGroup::Duration => "s",
        UnitGroup::Angle => "turn",
    }
}

pub fn conversion(unit: &str) -> Option<(UnitGroup, f64)> {
    CONVERSIONS.get(unit.to_ascii_lowercase().as_str()).copied()
}

type Units = SmallVec<[String; 2]>;

#[derive(Clone, Debug, Default)]
pub struct Unit {
    pub numerator: Units,
    pub denominator: Units,
    /// Printed when cancellation leaves no unit behind.
    pub backup: Option<String>,
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.numerator == other.numerator && self.denominator == other.denominator
    }
}

impl Unit {
    pub fn new(numerator: &[&str], denominator: &[&str]) -> Self {
        let numerator: Units = numerator.iter().map(|s| s.to_string()).collect();
        let denominator: Units = denominator.iter().map(|s| s.to_string()).collect();
        let backup = numerator.first().cloned();
        let mut unit = Self {
            numerator,
            denominator,
            backup,
        };
        unit.sort();
        unit
    }

    /// A single unit, or none for an empty string.
    pub fn simple(unit: &str) -> Self {
        if unit.is_empty() {
            Self::default()
        } else {
            Self::new(&[unit], &[])
        }
    }

    pub fn is_empty(&self) -> bool {
        self.numerator.is_empty() && self.denominator.is_empty()
    }

    pub fn is_singular(&self) -> bool {
        self.numerator.len() <= 1 && self.denominator.is_empty()
    }

    pub fn is_length(&self) -> bool {
        self.is_singular()
            && self
                .numerator
                .first()
                .is_some_and(|u| {
                    matches!(conversion(u), Some((UnitGroup::Length, _))) || is_relative_length(u)
                })
    }

    pub fn is(&self, unit: &str) -> bool {
        self.is_singular()
            && self
                .numerator
                .first()
                .map_or(unit.is_empty(), |u| u.eq_ignore_ascii_case(unit))
    }

    fn sort(&mut self) {
        self.numerator.sort();
        self.denominator.sort();
    }

    /// Removes units that appear on both sides.
    pub fn cancel(&mut self) {
        let mut i = 0;
        while i < self.numerator.len() {
            if let Some(j) = self
                .denominator
                .iter()
                .position(|d| d == &self.numerator[i])
            {
                self.numerator.remove(i);
                self.denominator.remove(j);
            } else {
                i += 1;
            }
        }
        self.sort();
    }

    /// The unit used for each convertible group, first occurrence wins.
    pub fn used_units(&self) -> Vec<(UnitGroup, String)> {
        let mut used: Vec<(UnitGroup, String)> = Vec::new();
        for unit in self.numerator.iter().chain(self.denominator.iter()) {
            if let Some((group, _)) = conversion(unit) {
                if !used.iter().any(|(g, _)| *g == group) {
                    used.push((group, unit.clone()));
                }
            }
        }
        used
    }

    pub fn to_css(&self, strict: bool) -> String {
        if self.numerator.len() == 1 && self.denominator.is_empty() {
            return self.numerator[0].clone();
        }
        if !strict {
            if let Some(backup) = &self.backup {
                if self.is_empty() {
                    return backup.clone();
                }
            }
        }
        self.numerator
            .first()
            .or(self.denominator.first())
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.numerator.join("*"))?;
        for d in &self.denominator {
            write!(f, "/{}", d)?;
        }
        Ok(())
    }
}

fn is_relative_length(unit: &str) -> bool {
    matches!(
        unit.to_ascii_lowercase().as_str(),
        "em" | "ex" | "ch" | "rem" | "vw" | "vh" | "vmin" | "vmax" | "lh" | "rlh" | "cap" | "ic"
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
        }
    }
}

/// Raised by [`Dimension::operate`] in strict-units mode.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitMismatch {
    pub left: String,
    pub right: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    pub value: f64,
    pub unit: Unit,
}

impl Dimension {
    pub fn new(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: Unit::simple(unit),
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            value,
            unit: Unit::default(),
        }
    }

    pub fn with_unit(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Rescales every convertible unit to the unit of the same group in `target`.
    pub fn convert_to(&self, target: &[(UnitGroup, String)]) -> Dimension {
        let mut value = self.value;
        let mut unit = self.unit.clone();

        for list_is_numerator in [true, false] {
            let list = if list_is_numerator {
                &mut unit.numerator
            } else {
                &mut unit.denominator
            };
            for u in list.iter_mut() {
                let Some((group, from)) = conversion(u) else {
                    continue;
                };
                let Some((_, to_unit)) = target.iter().find(|(g, _)| *g == group) else {
                    continue;
                };
                let Some((_, to)) = conversion(to_unit) else {
                    continue;
                };
                if list_is_numerator {
                    value = value * from / to;
                } else {
                    value = value / from * to;
                }
                *u = to_unit.clone();
            }
        }

        unit.cancel();
        Dimension { value, unit }
    }

    /// Converts to base units (`m`, `s`, `turn`) for comparison.
    pub fn unify(&self) -> Dimension {
        let targets = [
            (UnitGroup::Length, base_unit(UnitGroup::Length).to_string()),
            (UnitGroup::Duration, base_unit(UnitGroup::Duration).to_string()),
            (UnitGroup::Angle, base_unit(UnitGroup::Angle).to_string()),
        ];
        self.convert_to(&targets)
    }

    /// Applies `op`.
    ///
    /// For `+` and `-`, a unitless side adopts the other side's unit and
    /// convertible units are rescaled to the left operand. Operands whose
    /// units stay incompatible raise [`UnitMismatch`] when `strict` is set;
    /// otherwise the left operand is returned unchanged.
    pub fn operate(
        &self,
        op: Op,
        other: &Dimension,
        strict: bool,
    ) -> Result<Dimension, UnitMismatch> {
        let mut unit = self.unit.clone();

        match op {
            Op::Add | Op::Sub => {
                if unit.is_empty() {
                    unit = other.unit.clone();
                    if self.unit.backup.is_some() {
                        unit.backup = self.unit.backup.clone();
                    }
                    return Ok(Dimension::with_unit(op.apply(self.value, other.value), unit));
                }
                if other.unit.is_empty() {
                    return Ok(Dimension::with_unit(op.apply(self.value, other.value), unit));
                }
                let converted = other.convert_to(&self.unit.used_units());
                if converted.unit != unit {
                    if strict {
                        return Err(UnitMismatch {
                            left: unit.to_string(),
                            right: converted.unit.to_string(),
                        });
                    }
                    log::debug!(
                        "incompatible units '{}' and '{}', keeping left operand",
                        unit,
                        converted.unit
                    );
                    return Ok(self.clone());
                }
                Ok(Dimension::with_unit(op.apply(self.value, converted.value), unit))
            }
            Op::Mul => {
                unit.numerator.extend(other.unit.numerator.iter().cloned());
                unit.denominator.extend(other.unit.denominator.iter().cloned());
                unit.cancel();
                Ok(Dimension::with_unit(self.value * other.value, unit))
            }
            Op::Div => {
                unit.numerator.extend(other.unit.denominator.iter().cloned());
                unit.denominator.extend(other.unit.numerator.iter().cloned());
                unit.cancel();
                Ok(Dimension::with_unit(self.value / other.value, unit))
            }
        }
    }

    /// Orders two dimensions, `None` when their units cannot be compared.
    pub fn compare(&self, other: &Dimension) -> Option<Ordering> {
        let (a, b) = if other.unit.is_empty() || self.unit.is_empty() {
            (self.clone(), other.clone())
        } else {
            let a = self.unify();
            let b = other.unify();
            if a.unit != b.unit {
                return None;
            }
            (a, b)
        };
        let tolerance = 1e-9 * a.value.abs().max(b.value.abs());
        if (a.value - b.value).abs() <= tolerance {
            return Some(Ordering::Equal);
        }
        a.value.partial_cmp(&b.value)
    }

    pub fn to_css(&self, compress: bool, strict: bool) -> String {
        let number = format_number(self.value, compress);
        if compress && self.value == 0.0 && self.unit.is_length() {
            return number;
        }
        format!("{}{}", number, self.unit.to_css(strict))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(false, false))
    }
}

/// Formats a number with at most eight fractional digits and no trailing zeros.
///
/// ```
/// use lcss::types::format_number;
///
/// assert_eq!(format_number(1.0, false), "1");
/// assert_eq!(format_number(0.1 + 0.2, false), "0.3");
/// assert_eq!(format_number(0.5, true), ".5");
/// ```
pub fn format_number(value: f64, compress: bool) -> String {
    let rounded = (value * 1e8).round() / 1e8;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let mut text = format!("{:.8}", rounded);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if compress && rounded > 0.0 && rounded < 1.0 {
        text.remove(0);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0, false), "10");
        assert_eq!(format_number(-2.5, false), "-2.5");
        assert_eq!(format_number(1.0 / 3.0, false), "0.33333333");
        assert_eq!(format_number(-0.0, false), "0");
        assert_eq!(format_number(0.25, true), ".25");
        assert_eq!(format_number(-0.25, true), "-0.25");
    }

    #[test]
    fn test_add_converts_compatible_units() {
        let a = Dimension::new(1.0, "cm");
        let b = Dimension::new(10.0, "mm");
        let sum = a.operate(Op::Add, &b, true).unwrap();
        assert_eq!(sum.to_string(), "2cm");
    }

    #[test]
    fn test_unitless_adopts_other_unit() {
        let a = Dimension::number(2.0);
        let b = Dimension::new(3.0, "px");
        assert_eq!(a.operate(Op::Add, &b, true).unwrap().to_string(), "5px");
        assert_eq!(b.operate(Op::Sub, &a, true).unwrap().to_string(), "1px");
    }

    #[test]
    fn test_incompatible_units() {
        let a = Dimension::new(1.0, "px");
        let b = Dimension::new(1.0, "em");
        assert_eq!(
            a.operate(Op::Add, &b, true),
            Err(UnitMismatch {
                left: "px".to_string(),
                right: "em".to_string()
            })
        );
        assert_eq!(a.operate(Op::Add, &b, false).unwrap().to_string(), "1px");
    }

    #[test]
    fn test_division_cancels_units() {
        let a = Dimension::new(10.0, "px");
        let b = Dimension::new(2.0, "px");
        let q = a.operate(Op::Div, &b, false).unwrap();
        assert!(q.unit.is_empty());
        assert_eq!(q.value, 5.0);
        assert_eq!(q.to_css(false, false), "5px");
        assert_eq!(q.to_css(false, true), "5");
    }

    #[test]
    fn test_multiplication_keeps_first_unit() {
        let a = Dimension::new(2.0, "px");
        let b = Dimension::number(3.0);
        assert_eq!(a.operate(Op::Mul, &b, true).unwrap().to_string(), "6px");
    }

    #[test]
    fn test_compare_across_units() {
        let a = Dimension::new(1.0, "in");
        let b = Dimension::new(96.0, "px");
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
        let c = Dimension::new(1.0, "s");
        assert_eq!(a.compare(&c), None);
        assert_eq!(
            Dimension::new(5.0, "px").compare(&Dimension::number(4.0)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_compressed_zero_length() {
        assert_eq!(Dimension::new(0.0, "px").to_css(true, false), "0");
        assert_eq!(Dimension::new(0.0, "s").to_css(true, false), "0s");
        assert_eq!(Dimension::new(0.5, "em").to_css(true, false), ".5em");
    }
}
