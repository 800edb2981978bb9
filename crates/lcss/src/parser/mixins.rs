//! Mixin definitions, mixin calls and guard conditions.

use super::{entities, PResult, Parser};
use crate::ast::{
    Arg, CompareOp, Condition, DetachedRuleset, MixinCall, MixinDefinition, Param, Rule, Value,
};
use std::rc::Rc;

/// An argument or parameter before it is known which of the two it is.
#[derive(Default)]
struct RawArg {
    name: Option<String>,
    value: Option<Value>,
    variadic: bool,
    expand: bool,
}

impl RawArg {
    fn into_param(self) -> Param {
        match (self.name, self.value) {
            (Some(name), value) => Param {
                name: Some(name),
                value,
                variadic: self.variadic,
            },
            (None, Some(Value::Variable(var))) if !var.name.starts_with("@@") => Param {
                name: Some(var.name),
                value: None,
                variadic: false,
            },
            (None, value) => Param {
                name: None,
                value,
                variadic: self.variadic,
            },
        }
    }

    fn into_arg(self) -> Option<Arg> {
        Some(Arg {
            name: self.name,
            value: self.value?,
            expand: self.expand,
        })
    }
}

/// With `;` separators each group is one argument whose value is the
/// comma list of its items.
fn merge_group(mut group: Vec<RawArg>) -> RawArg {
    if group.len() == 1 {
        return group.remove(0);
    }
    let name = group[0].name.take();
    let values = group.into_iter().filter_map(|a| a.value).collect();
    RawArg {
        name,
        value: Some(Value::List(values)),
        variadic: false,
        expand: false,
    }
}

impl<'s> Parser<'s> {
    /// `.name(params) when (guard) { ... }`
    pub(super) fn mixin_definition(&mut self) -> PResult<Option<Rule>> {
        if !matches!(self.cursor.peek_byte(), Some(b'.' | b'#')) {
            return Ok(None);
        }
        let start = self.cursor.pos();
        self.cursor.save();
        self.cursor.advance(1);
        if self.cursor.nom(entities::ident).is_none() {
            self.cursor.restore();
            return Ok(None);
        }
        let name = self.cursor.source()[start..self.cursor.pos()].to_string();
        self.cursor.skip_ws();
        if !self.cursor.char('(') {
            self.cursor.restore();
            return Ok(None);
        }
        let params = match self.raw_args(false)? {
            Some(args) if self.cursor.char(')') => {
                args.into_iter().map(RawArg::into_param).collect()
            }
            _ => {
                self.cursor.restore();
                return Ok(None);
            }
        };
        let guard = if self.cursor.keyword("when") {
            Some(self.conditions()?)
        } else {
            None
        };
        if self.cursor.peek_byte() != Some(b'{') {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        let rules = self.block()?;
        Ok(Some(Rule::MixinDefinition(Rc::new(MixinDefinition {
            name,
            params,
            guard,
            rules,
            closure: None,
            meta: self.meta(start),
        }))))
    }

    /// `.m(args) !important;`, `#ns > .m();`, `#ns.m;`
    pub(super) fn mixin_call(&mut self) -> PResult<Option<Rule>> {
        if !matches!(self.cursor.peek_byte(), Some(b'.' | b'#')) {
            return Ok(None);
        }
        let start = self.cursor.pos();
        self.cursor.save();
        let path = self.mixin_path();
        if path.is_empty() {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.skip_ws();
        let mut args = Vec::new();
        if self.cursor.char('(') {
            match self.raw_args(true)? {
                Some(raw) if self.cursor.char(')') => {
                    args = raw.into_iter().filter_map(RawArg::into_arg).collect();
                }
                _ => {
                    self.cursor.restore();
                    return Ok(None);
                }
            }
        }
        let important = self.important();
        if !self.at_statement_end() {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        self.end_statement();
        Ok(Some(Rule::MixinCall(MixinCall {
            path,
            args,
            important,
            meta: self.meta(start),
        })))
    }

    /// `.a`, `#ns > .b`, `#ns.b`; whitespace and `>` separate segments.
    fn mixin_path(&mut self) -> Vec<String> {
        let mut path = Vec::new();
        loop {
            let start = self.cursor.pos();
            if !matches!(self.cursor.peek_byte(), Some(b'.' | b'#')) {
                break;
            }
            self.cursor.advance(1);
            if self.cursor.nom(entities::ident).is_none() {
                self.cursor.seek(start);
                break;
            }
            path.push(self.cursor.source()[start..self.cursor.pos()].to_string());

            self.cursor.save();
            self.cursor.skip_ws();
            self.cursor.char('>');
            if matches!(self.cursor.peek_byte(), Some(b'.' | b'#')) {
                self.cursor.forget();
            } else {
                self.cursor.restore();
                break;
            }
        }
        path
    }

    /// Arguments up to (not including) the closing parenthesis.
    ///
    /// Arguments are separated by commas, unless a `;` appears, in which case
    /// semicolons separate arguments and commas build list values.
    fn raw_args(&mut self, is_call: bool) -> PResult<Option<Vec<RawArg>>> {
        let mut groups: Vec<Vec<RawArg>> = vec![Vec::new()];
        let mut semicolons = false;

        loop {
            self.cursor.skip_ws();
            if self.cursor.peek_byte() == Some(b')') {
                break;
            }
            let mut arg = RawArg::default();

            if !is_call && self.cursor.literal("...") {
                arg.variadic = true;
            } else {
                if self.cursor.peek_byte() == Some(b'@') {
                    self.cursor.save();
                    match self.cursor.token(entities::variable) {
                        Some(name)
                            if self.cursor.peek_byte() == Some(b':')
                                && !self.cursor.starts_with("::") =>
                        {
                            self.cursor.forget();
                            self.cursor.char(':');
                            arg.name = Some(name.to_string());
                        }
                        Some(name) if !is_call && self.cursor.literal("...") => {
                            self.cursor.forget();
                            arg.name = Some(name.to_string());
                            arg.variadic = true;
                        }
                        _ => self.cursor.restore(),
                    }
                }
                if !arg.variadic {
                    let value = if is_call && self.cursor.peek_byte() == Some(b'{') {
                        let rules = self.block()?;
                        Some(Value::DetachedRuleset(Rc::new(DetachedRuleset {
                            rules,
                            closure: None,
                        })))
                    } else {
                        self.expression()?
                    };
                    let Some(value) = value else {
                        return Ok(None);
                    };
                    arg.value = Some(value);
                    if is_call && self.cursor.literal("...") {
                        arg.expand = true;
                    }
                }
            }

            if let Some(group) = groups.last_mut() {
                group.push(arg);
            }
            if self.cursor.char(',') {
                continue;
            }
            if self.cursor.char(';') {
                semicolons = true;
                groups.push(Vec::new());
                continue;
            }
            break;
        }

        let args = if semicolons {
            groups
                .into_iter()
                .filter(|g| !g.is_empty())
                .map(merge_group)
                .collect()
        } else {
            groups.into_iter().flatten().collect()
        };
        Ok(Some(args))
    }

    /// `(a) and (b), not (c)`: commas and `or` bind loosest.
    pub(super) fn conditions(&mut self) -> PResult<Condition> {
        self.condition_list(true)
    }

    /// With `commas` off, a comma ends the condition instead of meaning `or`.
    fn condition_list(&mut self, commas: bool) -> PResult<Condition> {
        let start = self.cursor.pos();
        let mut condition = self
            .condition_and()?
            .ok_or_else(|| self.error(start, "expected condition"))?;
        loop {
            let at = self.cursor.pos();
            if !((commas && self.cursor.char(',')) || self.cursor.keyword("or")) {
                break;
            }
            let next = self
                .condition_and()?
                .ok_or_else(|| self.error(at, "expected condition"))?;
            condition = Condition::Or(Box::new(condition), Box::new(next));
        }
        Ok(condition)
    }

    fn condition_and(&mut self) -> PResult<Option<Condition>> {
        let Some(mut condition) = self.condition()? else {
            return Ok(None);
        };
        loop {
            let at = self.cursor.pos();
            if !self.cursor.keyword("and") {
                break;
            }
            let next = self
                .condition()?
                .ok_or_else(|| self.error(at, "expected condition"))?;
            condition = Condition::And(Box::new(condition), Box::new(next));
        }
        Ok(Some(condition))
    }

    /// `not`? `(` comparison or nested conditions `)`
    fn condition(&mut self) -> PResult<Option<Condition>> {
        let start = self.cursor.pos();
        let negate = self.cursor.keyword("not");
        if !self.cursor.char('(') {
            if negate {
                return Err(self.error(start, "expected `(` after `not`"));
            }
            return Ok(None);
        }
        let nested = if self.cursor.peek_byte() == Some(b'(') || self.cursor.starts_with("not") {
            self.cursor.save();
            match self.conditions() {
                Ok(inner) if self.cursor.peek_byte() == Some(b')') => {
                    self.cursor.forget();
                    Some(inner)
                }
                _ => {
                    self.cursor.restore();
                    None
                }
            }
        } else {
            None
        };
        let inner = match nested {
            Some(inner) => inner,
            None => self.comparison()?,
        };
        if !self.cursor.char(')') {
            return Err(self.error(start, "missing closing `)` in guard"));
        }
        Ok(Some(if negate {
            Condition::Not(Box::new(inner))
        } else {
            inner
        }))
    }

    fn comparison(&mut self) -> PResult<Condition> {
        let start = self.cursor.pos();
        let lhs = self
            .single_value()?
            .ok_or_else(|| self.error(start, "expected expression in guard"))?;
        let op = if self.cursor.literal(">=") || self.cursor.literal("=>") {
            Some(CompareOp::Ge)
        } else if self.cursor.literal("<=") || self.cursor.literal("=<") {
            Some(CompareOp::Le)
        } else if self.cursor.char('>') {
            Some(CompareOp::Gt)
        } else if self.cursor.char('<') {
            Some(CompareOp::Lt)
        } else if self.cursor.char('=') {
            Some(CompareOp::Eq)
        } else {
            None
        };
        let meta = self.meta(start);
        match op {
            Some(op) => {
                let at = self.cursor.pos();
                let rhs = self
                    .single_value()?
                    .ok_or_else(|| self.error(at, "expected expression in guard"))?;
                Ok(Condition::Compare { op, lhs, rhs, meta })
            }
            None => Ok(Condition::Compare {
                op: CompareOp::Eq,
                lhs,
                rhs: Value::keyword("true"),
                meta,
            }),
        }
    }

    /// The first argument of `if()` and `boolean()`: a condition whose outer
    /// parentheses are optional.
    pub(super) fn bare_condition(&mut self) -> PResult<Option<Condition>> {
        self.cursor.save();
        if let Ok(condition) = self.condition_list(false) {
            if matches!(self.cursor.peek_byte(), Some(b',' | b')')) {
                self.cursor.forget();
                return Ok(Some(condition));
            }
        }
        self.cursor.restore();
        if self.cursor.peek_byte() == Some(b')') {
            return Ok(None);
        }
        self.comparison().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Call, CompareOp, Condition, Rule, Value};
    use crate::parser::tests::parse_ok;

    #[test]
    fn test_definition_params() {
        let root = parse_ok(".m(@a; @b: 2px; dark; @rest...) when (@a > 1) { x: @a; }");
        let Rule::MixinDefinition(def) = &root.rules[0] else { panic!() };
        assert_eq!(def.name, ".m");
        assert_eq!(def.params.len(), 4);
        assert_eq!(def.params[0].name.as_deref(), Some("@a"));
        assert!(def.params[0].value.is_none());
        assert!(def.params[1].value.is_some());
        assert!(def.params[2].name.is_none());
        assert!(def.params[3].variadic);
        assert!(matches!(def.guard, Some(Condition::Compare { op: CompareOp::Gt, .. })));
    }

    #[test]
    fn test_call_forms() {
        let root = parse_ok(".a { .m; .m(); #ns > .m(1, 2); #ns.m(@x...) !important; }");
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        let calls: Vec<_> = rs
            .rules
            .iter()
            .map(|r| match r {
                Rule::MixinCall(c) => c.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(calls[0].path, vec![".m"]);
        assert_eq!(calls[2].path, vec!["#ns", ".m"]);
        assert_eq!(calls[2].args.len(), 2);
        assert_eq!(calls[3].path, vec!["#ns", ".m"]);
        assert!(calls[3].args[0].expand);
        assert!(calls[3].important);
    }

    #[test]
    fn test_semicolon_arguments() {
        let root = parse_ok(".m(1, 2; 3);");
        let Rule::MixinCall(call) = &root.rules[0] else { panic!() };
        assert_eq!(call.args.len(), 2);
        assert!(matches!(&call.args[0].value, Value::List(items) if items.len() == 2));
    }

    #[test]
    fn test_named_and_detached_arguments() {
        let root = parse_ok(".m(@color: red; @body: { a: b; });");
        let Rule::MixinCall(call) = &root.rules[0] else { panic!() };
        assert_eq!(call.args[0].name.as_deref(), Some("@color"));
        assert!(matches!(call.args[1].value, Value::DetachedRuleset(_)));
    }

    #[test]
    fn test_guard_logic() {
        let root = parse_ok(".m() when (iscolor(@c)) and not (@d), (default()) { }");
        let Rule::MixinDefinition(def) = &root.rules[0] else { panic!() };
        let Some(Condition::Or(lhs, _)) = &def.guard else { panic!() };
        assert!(matches!(**lhs, Condition::And(_, ref rhs) if matches!(**rhs, Condition::Not(_))));
    }

    fn first_call(value: &Value) -> Option<&Call> {
        match value {
            Value::Call(call) => Some(call),
            Value::Expression(items) | Value::List(items) => items.iter().find_map(first_call),
            _ => None,
        }
    }

    #[test]
    fn test_if_condition_stops_at_comma() {
        let root = parse_ok(".a { b: if((1 > 0) and (2 > 1), yes, no); c: if(not (1 > 2), yes); }");
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        let calls: Vec<&Call> = rs
            .rules
            .iter()
            .filter_map(|r| match r {
                Rule::Declaration(d) => first_call(&d.value),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args.len(), 3);
        assert!(matches!(
            &calls[0].args[0],
            Value::Condition(c) if matches!(**c, Condition::And(..))
        ));
        assert_eq!(calls[1].args.len(), 2);
        assert!(matches!(
            &calls[1].args[0],
            Value::Condition(c) if matches!(**c, Condition::Not(_))
        ));
    }

    #[test]
    fn test_call_is_not_definition() {
        let root = parse_ok(".m(1px);\n.m(@a) { b: @a }");
        assert!(matches!(root.rules[0], Rule::MixinCall(_)));
        assert!(matches!(root.rules[1], Rule::MixinDefinition(_)));
    }
}
