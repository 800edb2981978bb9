//! Value expressions.
//!
//! Before evaluation a [`Value`] may contain variables, operations and calls;
//! after evaluation only literal variants remain (plus operations that the
//! math mode left unevaluated and calls to unknown functions).

use super::{Meta, Rule};
use crate::eval::frame::FrameChain;
use crate::types::{Color, Dimension, Op};
use std::fmt;
use std::rc::Rc;

/// Output switches that change how values are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub compress: bool,
    pub strict_units: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Quoted {
    pub content: String,
    /// `'` or `"`; `None` for escaped `~"..."` strings.
    pub quote: Option<char>,
}

impl Quoted {
    pub fn new(content: impl Into<String>, quote: Option<char>) -> Self {
        Self {
            content: content.into(),
            quote,
        }
    }

    pub fn escaped(&self) -> bool {
        self.quote.is_none()
    }
}

/// `@name`, or `@@name` for a variable variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableRef {
    pub name: String,
    pub meta: Meta,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub op: Op,
    pub lhs: Value,
    pub rhs: Value,
    /// Whitespace surrounded the operator in the source.
    pub spaced: bool,
    pub meta: Meta,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Value>,
    pub meta: Meta,
}

/// A rule block stored in a variable.
#[derive(Clone, Debug, PartialEq)]
pub struct DetachedRuleset {
    pub rules: Vec<Rule>,
    /// Frames active where the block was assigned; set on first evaluation.
    pub closure: Option<FrameChain>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Guard expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// `(a op b)`; a bare `(a)` is `(a = true)`.
    Compare {
        op: CompareOp,
        lhs: Value,
        rhs: Value,
        meta: Meta,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Dimension(Dimension),
    Color(Color),
    Quoted(Quoted),
    Keyword(String),
    /// Text passed through untouched.
    Anonymous(String),
    Url(Box<Value>),
    /// Space-separated values.
    Expression(Vec<Value>),
    /// Comma-separated values.
    List(Vec<Value>),
    Paren(Box<Value>),
    Negative(Box<Value>),
    Variable(VariableRef),
    /// `$prop`
    Property(VariableRef),
    Operation(Box<Operation>),
    Call(Call),
    DetachedRuleset(Rc<DetachedRuleset>),
    Condition(Box<Condition>),
    /// `(name: value)` inside a media or container query.
    MediaFeature {
        name: String,
        value: Option<Box<Value>>,
    },
    UnicodeRange(String),
    /// `name=value` inside legacy IE filter calls.
    Assignment {
        name: String,
        value: Box<Value>,
    },
}

impl Value {
    pub fn keyword(text: impl Into<String>) -> Self {
        Value::Keyword(text.into())
    }

    pub fn boolean(value: bool) -> Self {
        Value::Keyword(if value { "true" } else { "false" }.to_string())
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Keyword(k) if k == "true")
    }

    /// Collapses single-item expressions and lists.
    pub fn simplify(self) -> Self {
        match self {
            Value::Expression(mut items) | Value::List(mut items) if items.len() == 1 => {
                items.remove(0).simplify()
            }
            other => other,
        }
    }

    /// Items of a list-like value, as used by `...` expansion, `extract()` and `length()`.
    pub fn list_items(&self) -> Vec<Value> {
        match self {
            Value::List(items) | Value::Expression(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Text used for `@{name}` interpolation: strings lose their quotes.
    pub fn to_interp_string(&self) -> String {
        match self {
            Value::Quoted(q) => q.content.clone(),
            other => other.to_css(WriteOptions::default()),
        }
    }

    pub fn to_css(&self, options: WriteOptions) -> String {
        let mut out = String::new();
        self.write_css(&mut out, options);
        out
    }

    pub fn write_css(&self, out: &mut String, options: WriteOptions) {
        match self {
            Value::Dimension(d) => out.push_str(&d.to_css(options.compress, options.strict_units)),
            Value::Color(c) => out.push_str(&c.to_css(options.compress)),
            Value::Quoted(q) => match q.quote {
                Some(quote) => {
                    out.push(quote);
                    out.push_str(&q.content);
                    out.push(quote);
                }
                None => out.push_str(&q.content),
            },
            Value::Keyword(k) | Value::Anonymous(k) | Value::UnicodeRange(k) => out.push_str(k),
            Value::Url(inner) => {
                out.push_str("url(");
                inner.write_css(out, options);
                out.push(')');
            }
            Value::Expression(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 && !is_glued(item) && !is_glued(&items[i - 1]) {
                        out.push(' ');
                    }
                    item.write_css(out, options);
                }
            }
            Value::List(items) => {
                let sep = if options.compress { "," } else { ", " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(sep);
                    }
                    item.write_css(out, options);
                }
            }
            Value::Paren(inner) => {
                out.push('(');
                inner.write_css(out, options);
                out.push(')');
            }
            Value::Negative(inner) => {
                out.push('-');
                inner.write_css(out, options);
            }
            Value::Variable(v) | Value::Property(v) => out.push_str(&v.name),
            Value::Operation(op) => {
                op.lhs.write_css(out, options);
                if op.spaced {
                    out.push(' ');
                }
                out.push_str(op.op.symbol());
                if op.spaced {
                    out.push(' ');
                }
                op.rhs.write_css(out, options);
            }
            Value::Call(call) => {
                out.push_str(&call.name);
                out.push('(');
                let sep = if options.compress { "," } else { ", " };
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(sep);
                    }
                    arg.write_css(out, options);
                }
                out.push(')');
            }
            Value::DetachedRuleset(_) => {}
            Value::Condition(_) => out.push_str("true"),
            Value::MediaFeature { name, value } => {
                out.push('(');
                out.push_str(name);
                if let Some(value) = value {
                    out.push_str(if options.compress { ":" } else { ": " });
                    value.write_css(out, options);
                }
                out.push(')');
            }
            Value::Assignment { name, value } => {
                out.push_str(name);
                out.push('=');
                value.write_css(out, options);
            }
        }
    }
}

/// Separator tokens that attach to their neighbours (`a/b` in shorthand).
fn is_glued(value: &Value) -> bool {
    matches!(value, Value::Anonymous(a) if a == "/")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(WriteOptions::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_and_list_output() {
        let value = Value::List(vec![
            Value::Expression(vec![
                Value::Dimension(Dimension::new(1.0, "px")),
                Value::keyword("solid"),
            ]),
            Value::Color(Color::rgb(255.0, 0.0, 0.0)),
        ]);
        assert_eq!(value.to_string(), "1px solid, #ff0000");
        let compressed = value.to_css(WriteOptions {
            compress: true,
            strict_units: false,
        });
        assert_eq!(compressed, "1px solid,#f00");
    }

    #[test]
    fn test_unevaluated_operation_keeps_spacing() {
        let op = |spaced| {
            Value::Operation(Box::new(Operation {
                op: Op::Div,
                lhs: Value::Dimension(Dimension::new(12.0, "px")),
                rhs: Value::Dimension(Dimension::number(1.5)),
                spaced,
                meta: Meta::default(),
            }))
        };
        assert_eq!(op(false).to_string(), "12px/1.5");
        assert_eq!(op(true).to_string(), "12px / 1.5");
    }

    #[test]
    fn test_interpolation_strips_quotes() {
        let q = Value::Quoted(Quoted::new("a b", Some('"')));
        assert_eq!(q.to_string(), "\"a b\"");
        assert_eq!(q.to_interp_string(), "a b");
    }

    #[test]
    fn test_media_feature_output() {
        let feature = Value::MediaFeature {
            name: "min-width".to_string(),
            value: Some(Box::new(Value::Dimension(Dimension::new(1.0, "px")))),
        };
        assert_eq!(feature.to_string(), "(min-width: 1px)");
    }

    #[test]
    fn test_simplify() {
        let v = Value::List(vec![Value::Expression(vec![Value::keyword("a")])]);
        assert_eq!(v.simplify(), Value::keyword("a"));
    }
}
