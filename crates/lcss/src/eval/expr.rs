//! Values: variables, interpolation, operations, guards and function calls.

use super::Evaluator;
use crate::ast::{
    Call, CompareOp, Condition, Declaration, DetachedRuleset, Meta, Operation, Quoted, Value,
    VariableRef,
};
use crate::error::{EvalErrorKind, PluginError, Result};
use crate::eval::frame::FrameChain;
use crate::functions::{self, FunctionError};
use crate::import::normalize_path;
use crate::options::{MathMode, RewriteUrls};
use crate::types::{Color, Dimension, Op};
use std::cmp::Ordering;
use std::rc::Rc;

impl Evaluator<'_, '_> {
    pub(super) fn eval_value(&mut self, value: &Value, scope: &FrameChain) -> Result<Value> {
        Ok(match value {
            Value::Dimension(_)
            | Value::Color(_)
            | Value::Keyword(_)
            | Value::Anonymous(_)
            | Value::UnicodeRange(_) => value.clone(),
            Value::Quoted(q) if q.content.contains("@{") || q.content.contains("${") => {
                Value::Quoted(Quoted::new(self.interpolate(&q.content, scope)?, q.quote))
            }
            Value::Quoted(_) => value.clone(),
            Value::Url(inner) => {
                let inner = self.eval_value(inner, scope)?;
                Value::Url(Box::new(self.rewrite_url(inner)))
            }
            Value::Expression(items) => Value::Expression(self.eval_all(items, scope)?),
            Value::List(items) => Value::List(self.eval_all(items, scope)?),
            Value::Paren(inner) => {
                self.parens += 1;
                let inner = self.eval_value(inner, scope);
                self.parens -= 1;
                match inner? {
                    inner @ Value::Operation(_) => Value::Paren(Box::new(inner)),
                    inner if self.in_calc => Value::Paren(Box::new(inner)),
                    inner => inner,
                }
            }
            Value::Negative(inner) => match self.eval_value(inner, scope)? {
                Value::Dimension(d) => Value::Dimension(Dimension::with_unit(-d.value, d.unit)),
                other => Value::Negative(Box::new(other)),
            },
            Value::Variable(var) => self.variable(var, scope)?,
            Value::Property(var) => self.property(var, scope)?,
            Value::Operation(op) => self.eval_operation(op, scope)?,
            Value::Call(call) => self.eval_call(call, scope)?,
            Value::DetachedRuleset(detached) => Value::DetachedRuleset(capture(detached, scope)),
            Value::Condition(condition) => Value::boolean(self.eval_condition(condition, scope)?),
            Value::MediaFeature { name, value } => Value::MediaFeature {
                name: name.clone(),
                value: match value {
                    Some(value) => Some(Box::new(self.eval_value(value, scope)?)),
                    None => None,
                },
            },
            Value::Assignment { name, value } => Value::Assignment {
                name: name.clone(),
                value: Box::new(self.eval_value(value, scope)?),
            },
        })
    }

    fn eval_all(&mut self, values: &[Value], scope: &FrameChain) -> Result<Vec<Value>> {
        values.iter().map(|v| self.eval_value(v, scope)).collect()
    }

    fn variable(&mut self, var: &VariableRef, scope: &FrameChain) -> Result<Value> {
        let name = match var.name.strip_prefix("@@") {
            Some(inner) => {
                let target = self.lookup_variable(&format!("@{}", inner), &var.meta, scope)?;
                format!("@{}", target.to_interp_string())
            }
            None => var.name.clone(),
        };
        self.lookup_variable(&name, &var.meta, scope)
    }

    /// Finds the innermost declaration of `name` and evaluates its value
    /// in the current scope.
    pub(super) fn lookup_variable(
        &mut self,
        name: &str,
        meta: &Meta,
        scope: &FrameChain,
    ) -> Result<Value> {
        for (frame, at) in scope.scopes() {
            if let Some(declaration) = frame.variable(name) {
                return self.resolve(&declaration, name, at, scope);
            }
        }
        Err(self.fail(EvalErrorKind::UndefinedVariable(name.to_string()), meta))
    }

    fn property(&mut self, var: &VariableRef, scope: &FrameChain) -> Result<Value> {
        let name = var.name.trim_start_matches('$');
        for (frame, at) in scope.scopes() {
            if let Some(declaration) = frame.property(name) {
                return self.resolve(&declaration, &var.name, at, scope);
            }
        }
        Err(self.fail(EvalErrorKind::UndefinedProperty(name.to_string()), &var.meta))
    }

    /// `at` is the chain starting at the frame that holds `declaration`.
    fn resolve(
        &mut self,
        declaration: &Declaration,
        key: &str,
        at: &FrameChain,
        scope: &FrameChain,
    ) -> Result<Value> {
        if let Value::DetachedRuleset(detached) = &declaration.value {
            return Ok(Value::DetachedRuleset(capture(detached, at)));
        }
        let key = ((declaration.meta.file, declaration.meta.index), key.to_string());
        if self.evaluating.contains(&key) {
            return Err(self.fail(EvalErrorKind::RecursiveVariable(key.1), &declaration.meta));
        }
        // Variables used inside calc() still do their own arithmetic.
        let in_calc = std::mem::replace(&mut self.in_calc, false);
        self.evaluating.push(key);
        let value = self.eval_value(&declaration.value, scope);
        self.evaluating.pop();
        self.in_calc = in_calc;
        value
    }

    /// Replaces `@{name}` with variable values and `${name}` with property
    /// values. Strings are inserted without their quotes.
    pub(super) fn interpolate(&mut self, text: &str, scope: &FrameChain) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        loop {
            let start = match (rest.find("@{"), rest.find("${")) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => break,
            };
            let Some(len) = rest[start + 2..].find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            let name = &rest[start + 2..start + 2 + len];
            let meta = self.anchor;
            let value = if rest[start..].starts_with('@') {
                self.lookup_variable(&format!("@{}", name), &meta, scope)?
            } else {
                let var = VariableRef {
                    name: format!("${}", name),
                    meta,
                };
                self.property(&var, scope)?
            };
            out.push_str(&value.to_interp_string());
            rest = &rest[start + 3 + len..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Prefixes relative urls of imported files with the file's directory.
    fn rewrite_url(&self, value: Value) -> Value {
        let mode = self.ctx.options.effective_rewrite_urls();
        if mode == RewriteUrls::Off {
            return value;
        }
        let Some(dir) = self
            .ctx
            .files
            .get(self.current_file)
            .map(|f| f.relative_dir.as_str())
            .filter(|dir| !dir.is_empty())
        else {
            return value;
        };
        let text = match &value {
            Value::Quoted(q) => q.content.as_str(),
            Value::Anonymous(a) => a.as_str(),
            _ => return value,
        };
        let absolute = text.starts_with('/')
            || text.starts_with('#')
            || text.starts_with("data:")
            || text.contains("://");
        let local = text.starts_with("./") || text.starts_with("../");
        if absolute || (mode == RewriteUrls::Local && !local) {
            return value;
        }
        let rewritten = normalize_path(&format!("{}{}", dir, text));
        match value {
            Value::Quoted(q) => Value::Quoted(Quoted::new(rewritten, q.quote)),
            _ => Value::Anonymous(rewritten),
        }
    }

    fn math_enabled(&self, op: Op) -> bool {
        if self.in_calc {
            return false;
        }
        match self.ctx.options.math {
            MathMode::Always => true,
            MathMode::ParensDivision => op != Op::Div || self.parens > 0,
            MathMode::Parens => self.parens > 0,
        }
    }

    fn eval_operation(&mut self, operation: &Operation, scope: &FrameChain) -> Result<Value> {
        let lhs = self.eval_value(&operation.lhs, scope)?;
        let rhs = self.eval_value(&operation.rhs, scope)?;
        if !self.math_enabled(operation.op) {
            return Ok(unevaluated(operation, lhs, rhs));
        }
        let strict = self.ctx.options.strict_units;
        match (lhs, rhs) {
            (Value::Dimension(a), Value::Dimension(b)) => a
                .operate(operation.op, &b, strict)
                .map(Value::Dimension)
                .map_err(|e| {
                    self.fail(
                        EvalErrorKind::UnitMismatch {
                            left: e.left,
                            right: e.right,
                        },
                        &operation.meta,
                    )
                }),
            (Value::Color(a), Value::Color(b)) => {
                Ok(Value::Color(color_operate(operation.op, &a, &b)))
            }
            (Value::Color(a), Value::Dimension(b)) => {
                Ok(Value::Color(color_operate(operation.op, &a, &gray(b.value))))
            }
            (Value::Dimension(a), Value::Color(b)) if matches!(operation.op, Op::Add | Op::Mul) => {
                Ok(Value::Color(color_operate(operation.op, &b, &gray(a.value))))
            }
            (lhs @ Value::Operation(_), rhs) | (lhs, rhs @ Value::Operation(_)) => {
                Ok(unevaluated(operation, lhs, rhs))
            }
            _ => Err(self.fail(EvalErrorKind::InvalidOperation, &operation.meta)),
        }
    }

    pub(super) fn eval_condition(
        &mut self,
        condition: &Condition,
        scope: &FrameChain,
    ) -> Result<bool> {
        Ok(match condition {
            Condition::And(a, b) => {
                self.eval_condition(a, scope)? && self.eval_condition(b, scope)?
            }
            Condition::Or(a, b) => self.eval_condition(a, scope)? || self.eval_condition(b, scope)?,
            Condition::Not(inner) => !self.eval_condition(inner, scope)?,
            Condition::Compare { op, lhs, rhs, .. } => {
                self.parens += 1;
                let lhs = self.eval_value(lhs, scope);
                let rhs = self.eval_value(rhs, scope);
                self.parens -= 1;
                let ordering = compare(&lhs?, &rhs?);
                match op {
                    CompareOp::Eq => ordering == Some(Ordering::Equal),
                    CompareOp::Lt => ordering == Some(Ordering::Less),
                    CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    CompareOp::Gt => ordering == Some(Ordering::Greater),
                    CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                }
            }
        })
    }

    /// Host functions first, then built-ins; anything else is kept as written.
    fn eval_call(&mut self, call: &Call, scope: &FrameChain) -> Result<Value> {
        let lower = call.name.to_ascii_lowercase();
        if lower == "default" && call.args.is_empty() {
            if let Some(default) = self.default {
                return Ok(Value::boolean(default));
            }
        }
        let is_calc = lower == "calc" || lower.ends_with("-calc");
        let in_calc = std::mem::replace(&mut self.in_calc, is_calc);
        let args = self.eval_all(&call.args, scope);
        self.in_calc = in_calc;
        let args = args?;
        let literal = |args: Vec<Value>| {
            Value::Call(Call {
                name: call.name.clone(),
                args,
                meta: call.meta,
            })
        };
        if is_calc {
            return Ok(literal(args));
        }

        let registry = self.ctx.functions;
        if let Some(function) = registry.custom(&call.name) {
            return match function.call(&args) {
                Ok(value) => Ok(value),
                Err(FunctionError::Unsupported) => Ok(literal(args)),
                Err(FunctionError::Failed(message)) => Err(PluginError {
                    name: call.name.clone(),
                    message,
                    location: Some(self.ctx.location(&call.meta)),
                }
                .into()),
            };
        }
        if let Some(builtin) = functions::builtin(&call.name) {
            return match builtin(&args) {
                Ok(value) => Ok(value),
                Err(FunctionError::Unsupported) => Ok(literal(args)),
                Err(FunctionError::Failed(message)) => Err(self.fail(
                    EvalErrorKind::Function {
                        name: call.name.clone(),
                        message,
                    },
                    &call.meta,
                )),
            };
        }
        log::debug!("unknown function {}(), emitting as written", call.name);
        Ok(literal(args))
    }
}

/// Attaches the scope of first evaluation to a detached ruleset.
fn capture(detached: &Rc<DetachedRuleset>, scope: &FrameChain) -> Rc<DetachedRuleset> {
    if detached.closure.is_some() {
        return detached.clone();
    }
    Rc::new(DetachedRuleset {
        rules: detached.rules.clone(),
        closure: Some(scope.clone()),
    })
}

fn unevaluated(operation: &Operation, lhs: Value, rhs: Value) -> Value {
    Value::Operation(Box::new(Operation {
        op: operation.op,
        lhs,
        rhs,
        spaced: operation.spaced,
        meta: operation.meta,
    }))
}

fn gray(value: f64) -> Color {
    Color::rgb(value, value, value)
}

fn color_operate(op: Op, a: &Color, b: &Color) -> Color {
    Color::rgba(
        op.apply(a.r, b.r),
        op.apply(a.g, b.g),
        op.apply(a.b, b.b),
        a.alpha * (1.0 - b.alpha) + b.alpha,
    )
}

/// Orders two evaluated values. Numbers compare across convertible units,
/// strings lexically; everything else only compares equal by its CSS text.
fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Dimension(a), Value::Dimension(b)) => a.compare(b),
        (Value::Color(a), Value::Color(b)) => (a == b).then_some(Ordering::Equal),
        (Value::Quoted(a), Value::Quoted(b)) if !a.escaped() && !b.escaped() => {
            Some(a.content.cmp(&b.content))
        }
        (a, b) => (a.to_string() == b.to_string()).then_some(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{declarations, eval, eval_with};
    use crate::error::EvalErrorKind;
    use crate::import::MemoryImportResolver;
    use crate::options::{CompileOptions, MathMode, RewriteUrls};

    fn decls(source: &str) -> Vec<String> {
        declarations(&eval(source).unwrap().rules)
    }

    fn decls_with(source: &str, options: &CompileOptions) -> Vec<String> {
        declarations(&eval_with(source, options, &MemoryImportResolver::new()).unwrap().rules)
    }

    #[test]
    fn test_operations_and_units() {
        assert_eq!(
            decls(".a { w: 1px + 2px; h: 2 * 3em; m: 1cm + 10mm; c: #010203 * 2; }"),
            vec!["w: 3px", "h: 6em", "m: 2cm", "c: #020406"]
        );
    }

    #[test]
    fn test_division_follows_math_mode() {
        assert_eq!(
            decls(".a { font: 12px/1.5; w: (10px / 2); }"),
            vec!["font: 12px/1.5", "w: 5px"]
        );
        let always = CompileOptions::default().with_math(MathMode::Always);
        assert_eq!(decls_with(".a { w: 10px/2; }", &always), vec!["w: 5px"]);
        let parens = CompileOptions::default().with_math(MathMode::Parens);
        assert_eq!(
            decls_with(".a { w: 1px + 1px; h: (1px + 1px); }", &parens),
            vec!["w: 1px + 1px", "h: 2px"]
        );
    }

    #[test]
    fn test_strict_units() {
        assert_eq!(decls(".a { w: 1px + 1em; }"), vec!["w: 1px"]);
        let strict = CompileOptions::default().with_strict_units(true);
        let err =
            eval_with(".a { w: 1px + 1em; }", &strict, &MemoryImportResolver::new()).unwrap_err();
        assert!(matches!(err.eval_kind(), Some(EvalErrorKind::UnitMismatch { .. })));
    }

    #[test]
    fn test_calc_keeps_arithmetic() {
        assert_eq!(
            decls("@w: 10px + 5px; .a { width: calc(100% - @w); }"),
            vec!["width: calc(100% - 15px)"]
        );
    }

    #[test]
    fn test_interpolation_and_variable_variables() {
        assert_eq!(
            decls("@name: \"world\"; @which: name; .a { s: \"hello @{name}\"; t: @@which; @{which}-x: 1; }"),
            vec!["s: \"hello world\"", "t: \"world\"", "name-x: 1"]
        );
    }

    #[test]
    fn test_property_accessor() {
        assert_eq!(
            decls(".a { color: red; background: $color; }"),
            vec!["color: red", "background: red"]
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            decls(".a { c: darken(#ffffff, 10%); d: translate(1px, 2px); p: percentage(0.5); }"),
            vec!["c: #e6e6e6", "d: translate(1px, 2px)", "p: 50%"]
        );
    }

    #[test]
    fn test_function_failure_is_eval_error() {
        let err = eval(".a { x: replace(\"a\", \"(\", \"b\"); }").unwrap_err();
        assert!(matches!(
            err.eval_kind(),
            Some(EvalErrorKind::Function { name, .. }) if name == "replace"
        ));
    }

    #[test]
    fn test_invalid_operation() {
        let err = eval(".a { x: (red + \"a\"); }").unwrap_err();
        assert_eq!(err.eval_kind(), Some(&EvalErrorKind::InvalidOperation));
    }

    #[test]
    fn test_url_rewriting_in_imports() {
        let resolver = MemoryImportResolver::new().with_file(
            "lib/icons.less",
            ".i { a: url(\"img/x.png\"); b: url(/abs.png); }",
        );
        let options = CompileOptions::default().with_rewrite_urls(RewriteUrls::All);
        let root = eval_with("@import \"lib/icons\";", &options, &resolver).unwrap();
        assert_eq!(
            declarations(&root.rules),
            vec!["a: url(\"lib/img/x.png\")", "b: url(/abs.png)"]
        );
    }
}
