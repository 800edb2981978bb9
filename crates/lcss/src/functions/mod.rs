//! Built-in and host-registered functions.
//!
//! Every function receives fully evaluated arguments and returns one value.
//! Lookup order for a call `name(...)`:
//!
//! 1. functions registered on the [`FunctionRegistry`] by the host
//! 2. the built-in library (color, math, string, list and type functions)
//! 3. otherwise the call is kept as written, so plain CSS functions such as
//!    `var()` or `translate()` pass through
//!
//! A function that does not understand its arguments returns
//! [`FunctionError::Unsupported`] and the call is kept as written too.
//!
//! # Example
//!
//! ```rust
//! use lcss::ast::Value;
//! use lcss::functions::{FunctionError, FunctionRegistry};
//!
//! let mut registry = FunctionRegistry::new();
//! registry.register("twice", |args: &[Value]| match args {
//!     [value] => Ok(Value::Expression(vec![value.clone(), value.clone()])),
//!     _ => Err(FunctionError::failed("expected one argument")),
//! });
//! assert!(registry.custom("twice").is_some());
//! ```

pub mod color;
mod list;
mod math;
mod string;
mod types;

use crate::ast::Value;
use crate::types::{Color, Dimension};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Why a function call produced no value.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum FunctionError {
    /// The arguments are not ones this function handles; the call is
    /// written to the output unchanged.
    #[error("unsupported arguments")]
    Unsupported,

    #[error("{0}")]
    Failed(String),
}

impl FunctionError {
    pub fn failed(message: impl Into<String>) -> Self {
        FunctionError::Failed(message.into())
    }
}

/// A function callable from stylesheets.
pub trait Function {
    fn call(&self, args: &[Value]) -> Result<Value, FunctionError>;
}

impl<F> Function for F
where
    F: Fn(&[Value]) -> Result<Value, FunctionError>,
{
    fn call(&self, args: &[Value]) -> Result<Value, FunctionError> {
        self(args)
    }
}

pub type BuiltinFn = fn(&[Value]) -> Result<Value, FunctionError>;

static BUILTINS: Lazy<HashMap<&'static str, BuiltinFn>> = Lazy::new(|| {
    let mut table = HashMap::new();
    color::register(&mut table);
    math::register(&mut table);
    string::register(&mut table);
    list::register(&mut table);
    types::register(&mut table);
    table
});

/// Looks up a built-in function (case-insensitive).
pub fn builtin(name: &str) -> Option<BuiltinFn> {
    BUILTINS.get(name.to_ascii_lowercase().as_str()).copied()
}

/// Functions registered by the host for one compiler.
#[derive(Default)]
pub struct FunctionRegistry {
    custom: HashMap<String, Box<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`, shadowing any built-in of that name.
    pub fn register(&mut self, name: impl Into<String>, function: impl Function + 'static) {
        let name = name.into().to_ascii_lowercase();
        log::debug!("registering function {}", name);
        self.custom.insert(name, Box::new(function));
    }

    pub fn custom(&self, name: &str) -> Option<&dyn Function> {
        self.custom.get(&name.to_ascii_lowercase()).map(|f| f.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("custom", &names).finish()
    }
}

// Argument helpers shared by the function modules.

/// The error for an argument of the wrong kind. Values that are not
/// stylesheet-level types (unknown calls, raw text) make the whole call
/// pass through instead of failing.
pub(crate) fn wrong_type(value: &Value, expected: &str) -> FunctionError {
    match value {
        Value::Call(_) | Value::Anonymous(_) | Value::Operation(_) => FunctionError::Unsupported,
        other => FunctionError::failed(format!("expected {}, got `{}`", expected, other)),
    }
}

pub(crate) fn arg(args: &[Value], index: usize) -> Result<&Value, FunctionError> {
    args.get(index)
        .ok_or_else(|| FunctionError::failed(format!("expected at least {} arguments", index + 1)))
}

pub(crate) fn dimension(value: &Value) -> Result<&Dimension, FunctionError> {
    match value {
        Value::Dimension(d) => Ok(d),
        other => Err(wrong_type(other, "a number")),
    }
}

/// A plain number; percentages become fractions.
pub(crate) fn number(value: &Value) -> Result<f64, FunctionError> {
    let d = dimension(value)?;
    Ok(if d.unit.is("%") { d.value / 100.0 } else { d.value })
}

pub(crate) fn color(value: &Value) -> Result<&Color, FunctionError> {
    match value {
        Value::Color(c) => Ok(c),
        other => Err(wrong_type(other, "a color")),
    }
}

/// Text of a string or keyword argument.
pub(crate) fn text(value: &Value) -> Result<String, FunctionError> {
    match value {
        Value::Quoted(q) => Ok(q.content.clone()),
        Value::Keyword(k) | Value::Anonymous(k) => Ok(k.clone()),
        other => Err(wrong_type(other, "a string")),
    }
}

pub(crate) fn dim(value: f64, unit: &str) -> Value {
    Value::Dimension(Dimension::new(value, unit))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ast::{Call, Meta};

    pub(crate) fn call(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
        let f = builtin(name).unwrap_or_else(|| panic!("no builtin {}", name));
        f(args)
    }

    pub(crate) fn px(value: f64) -> Value {
        dim(value, "px")
    }

    pub(crate) fn num(value: f64) -> Value {
        dim(value, "")
    }

    pub(crate) fn hex(text: &str) -> Value {
        Value::Color(Color::parse(text).unwrap())
    }

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        assert!(builtin("lighten").is_some());
        assert!(builtin("RGBA").is_some());
        assert!(builtin("no-such-function").is_none());
    }

    #[test]
    fn test_registered_functions_shadow_by_name() {
        let mut registry = FunctionRegistry::new();
        registry.register("Lighten", |_: &[Value]| Ok(Value::keyword("custom")));
        let f = registry.custom("lighten").unwrap();
        assert_eq!(f.call(&[]).unwrap(), Value::keyword("custom"));
    }

    #[test]
    fn test_unknown_calls_pass_through() {
        let var = Value::Call(Call {
            name: "var".to_string(),
            args: vec![Value::keyword("--x")],
            meta: Meta::default(),
        });
        assert_eq!(number(&var), Err(FunctionError::Unsupported));
        assert!(matches!(number(&Value::keyword("a")), Err(FunctionError::Failed(_))));
    }
}
