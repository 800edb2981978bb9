//! Value grammar: lists, expressions, arithmetic and entities.
//!
//! ```text
//! value_list     := expression ("," expression)*
//! expression     := (addition | entity) ("/" ...)*
//! addition       := multiplication (("+" | "-") multiplication)*
//! multiplication := operand (("*" | "/") operand)*
//! operand        := "-"? ( "(" expression ")" | dimension | color | variable
//!                        | property | call | string )
//! ```
//!
//! `+` and `-` are operators only when followed by whitespace or not
//! preceded by it, so `1px -1px` stays a two-item expression.

use super::{entities, PResult, Parser};
use crate::ast::{Call, Operation, Quoted, Value, VariableRef};
use crate::types::{Color, Dimension, Op};
use std::rc::Rc;

impl<'s> Parser<'s> {
    /// Comma-separated expressions.
    pub(super) fn value_list(&mut self) -> PResult<Option<Value>> {
        let mut items = Vec::new();
        loop {
            self.cursor.save();
            match self.expression()? {
                Some(value) => {
                    self.cursor.forget();
                    items.push(value);
                }
                None => {
                    self.cursor.restore();
                    break;
                }
            }
            if !self.cursor.char(',') {
                break;
            }
        }
        Ok(match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Value::List(items)),
        })
    }

    /// Space-separated values.
    pub(super) fn expression(&mut self) -> PResult<Option<Value>> {
        let mut items = Vec::new();
        loop {
            let item = match self.addition()? {
                Some(value) => value,
                None => match self.entity()? {
                    Some(value) => value,
                    None => break,
                },
            };
            items.push(item);
            if self.cursor.peek_byte() == Some(b'/')
                && !matches!(self.cursor.peek_at(1), Some(b'*' | b'/'))
            {
                self.cursor.advance(1);
                self.cursor.skip_ws();
                items.push(Value::Anonymous("/".to_string()));
            }
        }
        Ok(match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Value::Expression(items)),
        })
    }

    pub(super) fn addition(&mut self) -> PResult<Option<Value>> {
        let start = self.cursor.pos();
        let Some(mut lhs) = self.multiplication()? else {
            return Ok(None);
        };
        loop {
            let op = match self.cursor.peek_byte() {
                Some(b'+') => Op::Add,
                Some(b'-') => Op::Sub,
                _ => break,
            };
            let before = self.cursor.preceded_by_ws();
            let after = self.cursor.peek_at(1).is_some_and(|b| b.is_ascii_whitespace());
            if before && !after {
                break;
            }
            self.cursor.save();
            self.cursor.advance(1);
            self.cursor.skip_ws();
            let Some(rhs) = self.multiplication()? else {
                self.cursor.restore();
                break;
            };
            self.cursor.forget();
            lhs = Value::Operation(Box::new(Operation {
                op,
                lhs,
                rhs,
                spaced: before || after,
                meta: self.meta(start),
            }));
        }
        Ok(Some(lhs))
    }

    fn multiplication(&mut self) -> PResult<Option<Value>> {
        let start = self.cursor.pos();
        let Some(mut lhs) = self.operand()? else {
            return Ok(None);
        };
        loop {
            let op = match (self.cursor.peek_byte(), self.cursor.peek_at(1)) {
                (Some(b'*'), _) => Op::Mul,
                (Some(b'/'), next) if !matches!(next, Some(b'*' | b'/')) => Op::Div,
                _ => break,
            };
            let spaced = self.cursor.preceded_by_ws();
            self.cursor.save();
            self.cursor.advance(1);
            self.cursor.skip_ws();
            let Some(rhs) = self.operand()? else {
                self.cursor.restore();
                break;
            };
            self.cursor.forget();
            lhs = Value::Operation(Box::new(Operation {
                op,
                lhs,
                rhs,
                spaced,
                meta: self.meta(start),
            }));
        }
        Ok(Some(lhs))
    }

    fn operand(&mut self) -> PResult<Option<Value>> {
        if self.cursor.peek_byte() == Some(b'-')
            && matches!(self.cursor.peek_at(1), Some(b'@' | b'$' | b'('))
        {
            self.cursor.save();
            self.cursor.advance(1);
            if let Some(inner) = self.operand()? {
                self.cursor.forget();
                return Ok(Some(Value::Negative(Box::new(inner))));
            }
            self.cursor.restore();
            return Ok(None);
        }
        if self.cursor.peek_byte() == Some(b'(') {
            return self.sub_expression();
        }
        if let Some(value) = self.dimension() {
            return Ok(Some(value));
        }
        if let Some(value) = self.hex_color() {
            return Ok(Some(value));
        }
        if let Some(value) = self.variable() {
            return Ok(Some(value));
        }
        if let Some(value) = self.property() {
            return Ok(Some(value));
        }
        if let Some(value) = self.call()? {
            return Ok(Some(value));
        }
        if let Some(value) = self.quoted() {
            return Ok(Some(value));
        }
        Ok(self.color_keyword())
    }

    /// Values that never take part in arithmetic.
    pub(super) fn entity(&mut self) -> PResult<Option<Value>> {
        if let Some(value) = self.escaped() {
            return Ok(Some(value));
        }
        if let Some(value) = self.quoted() {
            return Ok(Some(value));
        }
        if let Some(range) = self.cursor.token(entities::unicode_range) {
            return Ok(Some(Value::UnicodeRange(range.to_string())));
        }
        if let Some(value) = self.url()? {
            return Ok(Some(value));
        }
        if self.cursor.peek_byte() == Some(b'[') {
            if let Some(inner) = self.cursor.balanced(b'[', b']') {
                self.cursor.skip_ws();
                return Ok(Some(Value::Keyword(format!("[{}]", inner))));
            }
        }
        Ok(self.keyword())
    }

    /// An operand or entity, as used by guard comparisons.
    pub(super) fn single_value(&mut self) -> PResult<Option<Value>> {
        match self.addition()? {
            Some(value) => Ok(Some(value)),
            None => self.entity(),
        }
    }

    fn sub_expression(&mut self) -> PResult<Option<Value>> {
        self.cursor.save();
        self.cursor.advance(1);
        self.cursor.skip_ws();
        match self.expression()? {
            Some(inner) if self.cursor.char(')') => {
                self.cursor.forget();
                Ok(Some(Value::Paren(Box::new(inner))))
            }
            _ => {
                self.cursor.restore();
                Ok(None)
            }
        }
    }

    fn dimension(&mut self) -> Option<Value> {
        let (value, unit) = self.cursor.token(entities::dimension)?;
        Some(Value::Dimension(Dimension::new(value, unit)))
    }

    fn hex_color(&mut self) -> Option<Value> {
        let text = self.cursor.token(entities::hex_color)?;
        Color::parse(text).ok().map(Value::Color)
    }

    /// A named color, when not used as a function name.
    fn color_keyword(&mut self) -> Option<Value> {
        self.cursor.save();
        match self.cursor.nom(entities::ident) {
            Some(name) if Color::is_keyword(name) && self.cursor.peek_byte() != Some(b'(') => {
                self.cursor.forget();
                self.cursor.skip_ws();
                Color::parse(name).ok().map(Value::Color)
            }
            _ => {
                self.cursor.restore();
                None
            }
        }
    }

    fn keyword(&mut self) -> Option<Value> {
        let word = self.cursor.token(entities::keyword)?;
        Some(match Color::parse(word) {
            Ok(color) if !word.starts_with('#') => Value::Color(color),
            _ => Value::Keyword(word.to_string()),
        })
    }

    pub(super) fn variable(&mut self) -> Option<Value> {
        if self.cursor.starts_with("@{") {
            return None;
        }
        let start = self.cursor.pos();
        let name = self.cursor.token(entities::variable)?;
        Some(Value::Variable(VariableRef {
            name: name.to_string(),
            meta: self.meta(start),
        }))
    }

    fn property(&mut self) -> Option<Value> {
        let start = self.cursor.pos();
        let name = self.cursor.token(entities::property_ref)?;
        Some(Value::Property(VariableRef {
            name: name.to_string(),
            meta: self.meta(start),
        }))
    }

    pub(super) fn quoted(&mut self) -> Option<Value> {
        let (quote, content) = self.cursor.quoted()?;
        self.cursor.skip_ws();
        Some(Value::Quoted(Quoted::new(content, Some(quote))))
    }

    /// `~"..."`: a string written without its quotes.
    pub(super) fn escaped(&mut self) -> Option<Value> {
        if !(self.cursor.starts_with("~\"") || self.cursor.starts_with("~'")) {
            return None;
        }
        self.cursor.save();
        self.cursor.advance(1);
        match self.cursor.quoted() {
            Some((_, content)) => {
                self.cursor.forget();
                self.cursor.skip_ws();
                Some(Value::Quoted(Quoted::new(content, None)))
            }
            None => {
                self.cursor.restore();
                None
            }
        }
    }

    pub(super) fn url(&mut self) -> PResult<Option<Value>> {
        let rest = self.cursor.rest();
        if !rest.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("url(")) {
            return Ok(None);
        }
        self.cursor.save();
        self.cursor.advance(4);
        let inner = match self.cursor.url_body() {
            Some(body) if entities::variable(body).is_ok_and(|(rest, _)| rest.is_empty()) => {
                Value::Variable(VariableRef {
                    name: body.to_string(),
                    meta: self.meta(self.cursor.pos()),
                })
            }
            Some(body) => Value::Anonymous(body.to_string()),
            None => {
                self.cursor.skip_ws();
                match self.quoted().or_else(|| self.variable()) {
                    Some(value) => value,
                    None => {
                        self.cursor.restore();
                        return Ok(None);
                    }
                }
            }
        };
        self.cursor.skip_ws();
        if !self.cursor.char(')') {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        Ok(Some(Value::Url(Box::new(inner))))
    }

    /// `name(args)`. Arguments the grammar cannot read are kept as raw text.
    fn call(&mut self) -> PResult<Option<Value>> {
        let start = self.cursor.pos();
        self.cursor.save();
        let Some(name) = self.cursor.nom(entities::function_name) else {
            self.cursor.restore();
            return Ok(None);
        };
        if name.eq_ignore_ascii_case("url") {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.advance(1);
        let open = self.cursor.pos();
        self.cursor.skip_ws();

        let conditional = matches!(name.to_ascii_lowercase().as_str(), "if" | "boolean");
        let args = match self.call_args(conditional)? {
            Some(args) => args,
            None => {
                self.cursor.seek(open);
                let raw = self.cursor.raw_until(b")");
                vec![Value::Anonymous(raw.trim().to_string())]
            }
        };
        if !self.cursor.char(')') {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        Ok(Some(Value::Call(Call {
            name: name.to_string(),
            args,
            meta: self.meta(start),
        })))
    }

    fn call_args(&mut self, conditional: bool) -> PResult<Option<Vec<Value>>> {
        let mut args = Vec::new();
        self.cursor.save();
        loop {
            if self.cursor.peek_byte() == Some(b')') {
                break;
            }
            let arg = if conditional && args.is_empty() {
                self.bare_condition()?.map(|c| Value::Condition(Box::new(c)))
            } else if let Some(assignment) = self.assignment()? {
                Some(assignment)
            } else if self.cursor.peek_byte() == Some(b'{') {
                let rules = self.block()?;
                Some(Value::DetachedRuleset(Rc::new(crate::ast::DetachedRuleset {
                    rules,
                    closure: None,
                })))
            } else {
                self.expression()?
            };
            match arg {
                Some(arg) => args.push(arg),
                None => {
                    self.cursor.restore();
                    return Ok(None);
                }
            }
            if !self.cursor.char(',') {
                break;
            }
        }
        if self.cursor.peek_byte() != Some(b')') {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        Ok(Some(args))
    }

    /// `name=value` inside legacy filter calls.
    fn assignment(&mut self) -> PResult<Option<Value>> {
        self.cursor.save();
        let name = match self.cursor.nom(entities::ident) {
            Some(name) if self.cursor.peek_byte() == Some(b'=') => name,
            _ => {
                self.cursor.restore();
                return Ok(None);
            }
        };
        self.cursor.advance(1);
        self.cursor.skip_ws();
        match self.expression()? {
            Some(value) => {
                self.cursor.forget();
                Ok(Some(Value::Assignment {
                    name: name.to_string(),
                    value: Box::new(value),
                }))
            }
            None => {
                self.cursor.restore();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Rule, Value};
    use crate::parser::tests::parse_ok;
    use crate::types::Op;

    fn value_of(source: &str) -> Value {
        let root = parse_ok(&format!(".a {{ x: {}; }}", source));
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        let Rule::Declaration(d) = &rs.rules[0] else { panic!() };
        d.value.clone()
    }

    #[test]
    fn test_operator_spacing_rule() {
        assert!(matches!(value_of("1px -1px"), Value::Expression(items) if items.len() == 2));
        assert!(matches!(
            value_of("1px - 1px"),
            Value::Operation(op) if op.op == Op::Sub && op.spaced
        ));
        assert!(matches!(value_of("1px-1px"), Value::Operation(op) if !op.spaced));
        assert!(matches!(
            value_of("@a -@b"),
            Value::Expression(items) if matches!(items[1], Value::Negative(_))
        ));
    }

    #[test]
    fn test_precedence() {
        let Value::Operation(op) = value_of("1 + 2 * 3") else { panic!() };
        assert_eq!(op.op, Op::Add);
        assert!(matches!(&op.rhs, Value::Operation(inner) if inner.op == Op::Mul));
    }

    #[test]
    fn test_shorthand_slash() {
        assert_eq!(value_of("12px/1.5 Arial").to_string(), "12px/1.5 Arial");
        assert_eq!(value_of("12px/normal").to_string(), "12px/normal");
    }

    #[test]
    fn test_lists_and_strings() {
        let v = value_of("\"Helvetica Neue\", Arial, sans-serif");
        assert!(matches!(&v, Value::List(items) if items.len() == 3));
        assert_eq!(v.to_string(), "\"Helvetica Neue\", Arial, sans-serif");
        assert_eq!(value_of("~\"raw @{x}\"").to_string(), "raw @{x}");
    }

    #[test]
    fn test_colors() {
        assert!(matches!(value_of("#fff"), Value::Color(_)));
        assert!(matches!(value_of("red"), Value::Color(_)));
        assert!(matches!(value_of("red(#fff)"), Value::Call(_)));
        assert_eq!(value_of("RED").to_string(), "RED");
    }

    #[test]
    fn test_urls() {
        assert_eq!(value_of("url(http://x.com/a.png)").to_string(), "url(http://x.com/a.png)");
        assert_eq!(value_of("url( \"a b.png\" )").to_string(), "url(\"a b.png\")");
        assert!(matches!(
            value_of("url(@img)"),
            Value::Url(inner) if matches!(*inner, Value::Variable(_))
        ));
    }

    #[test]
    fn test_calls() {
        let Value::Call(call) = value_of("rgba(0, 0, 0, .5)") else { panic!() };
        assert_eq!(call.args.len(), 4);
        let Value::Call(call) = value_of("alpha(opacity=50)") else { panic!() };
        assert!(matches!(call.args[0], Value::Assignment { .. }));
        let Value::Call(call) = value_of("if((@a > 1), b, c)") else { panic!() };
        assert!(matches!(call.args[0], Value::Condition(_)));
        assert_eq!(value_of("calc(100% - 10px)").to_string(), "calc(100% - 10px)");
    }

    #[test]
    fn test_sub_expression_and_negation() {
        assert!(matches!(value_of("(1 + 2)"), Value::Paren(_)));
        assert!(matches!(value_of("-(@a)"), Value::Negative(_)));
    }
}
