//! Recursive-descent parser for Less source.
//!
//! Parsing happens in two steps. The [`chunker`] scans the whole input once,
//! recording string and comment spans and rejecting unbalanced braces. The
//! [`Parser`] then walks the text with a transactional [`Cursor`], trying
//! productions in priority order and backtracking when one does not match.
//!
//! Productions return `Ok(None)` when they do not apply at the current
//! position and `Err` only for input that no production can accept.
//!
//! # Example
//!
//! ```rust
//! use lcss::ast::{FileId, Rule};
//! use lcss::parser::{parse, ParseOptions};
//!
//! let root = parse(".a { color: red; }", FileId(0), &ParseOptions::default()).unwrap();
//! assert!(matches!(root.rules[0], Rule::Ruleset(_)));
//! ```

mod at_rules;
pub mod chunker;
mod cursor;
pub mod entities;
mod mixins;
mod selectors;
mod values;

use crate::ast::{
    Comment, Declaration, DetachedCall, DetachedRuleset, FileId, Merge, Meta, Rule, Ruleset,
    Selector, Value,
};
use crate::context::SourceFile;
use crate::error::{Location, ParseError};
use cursor::Cursor;
use std::rc::Rc;

/// Settings that affect parsing only.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Name used in error messages.
    pub filename: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            filename: "input".to_string(),
        }
    }
}

type PResult<T> = Result<T, ParseError>;

/// Parses a complete stylesheet into its root ruleset.
pub fn parse(source: &str, file: FileId, options: &ParseOptions) -> Result<Ruleset, ParseError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let spans = chunker::scan(source)
        .map_err(|e| located(source, &options.filename, e.index, e.message))?;
    let mut parser = Parser {
        cursor: Cursor::new(source, spans),
        file,
        filename: &options.filename,
    };
    log::trace!("parsing {} ({} bytes)", options.filename, source.len());
    let rules = parser.primary()?;
    Ok(Ruleset::root(rules, Meta::new(0, file)))
}

/// Parses a selector list on its own, as produced by selector
/// interpolation. Every selector takes `meta`.
pub fn parse_selectors(source: &str, meta: Meta) -> Result<Vec<Selector>, ParseError> {
    let filename = "selector";
    let spans = chunker::scan(source).map_err(|e| located(source, filename, e.index, e.message))?;
    let mut parser = Parser {
        cursor: Cursor::new(source, spans),
        file: meta.file,
        filename,
    };
    parser.cursor.skip_ws();
    let selectors = parser.selector_list()?;
    let Some(mut selectors) = selectors.filter(|_| parser.cursor.at_end()) else {
        let message = format!("invalid selector `{}`", source.trim());
        return Err(parser.error(parser.cursor.pos(), message));
    };
    for selector in &mut selectors {
        selector.meta = meta;
        for extend in &mut selector.extends {
            extend.meta = meta;
        }
    }
    Ok(selectors)
}

fn located(source: &str, filename: &str, index: usize, message: impl Into<String>) -> ParseError {
    let file = SourceFile::new(filename.to_string(), Rc::from(source), String::new());
    let (line, column) = file.line_col(index);
    ParseError {
        message: message.into(),
        location: Location {
            filename: filename.to_string(),
            index,
            line,
            column,
        },
        snippet: file.snippet(index),
    }
}

pub(crate) struct Parser<'s> {
    cursor: Cursor<'s>,
    file: FileId,
    filename: &'s str,
}

impl<'s> Parser<'s> {
    fn meta(&self, index: usize) -> Meta {
        Meta::new(index, self.file)
    }

    fn error(&self, index: usize, message: impl Into<String>) -> ParseError {
        located(self.cursor.source(), self.filename, index, message)
    }

    /// Statements of the stylesheet root.
    fn primary(&mut self) -> PResult<Vec<Rule>> {
        let rules = self.rules()?;
        if !self.cursor.at_end() {
            return Err(self.error(self.cursor.pos(), "Unrecognised input"));
        }
        Ok(rules)
    }

    /// Statements up to the end of input or an unmatched `}`.
    fn rules(&mut self) -> PResult<Vec<Rule>> {
        let mut rules = Vec::new();
        loop {
            self.cursor.skip_blank();
            let start = self.cursor.pos();
            if let Some(text) = self.cursor.block_comment() {
                rules.push(Rule::Comment(Comment {
                    text: text.to_string(),
                    meta: self.meta(start),
                }));
                continue;
            }
            match self.cursor.peek_byte() {
                None | Some(b'}') => break,
                Some(b';') => {
                    self.cursor.advance(1);
                    continue;
                }
                _ => {}
            }
            if !self.statement(&mut rules)? {
                return Err(self.error(start, "Unrecognised input"));
            }
        }
        Ok(rules)
    }

    /// `{ rules }`, consuming the braces.
    fn block(&mut self) -> PResult<Vec<Rule>> {
        let open = self.cursor.pos();
        if self.cursor.peek_byte() != Some(b'{') {
            return Err(self.error(open, "expected `{`"));
        }
        self.cursor.advance(1);
        let rules = self.rules()?;
        if self.cursor.peek_byte() != Some(b'}') {
            return Err(self.error(open, "missing closing `}`"));
        }
        self.cursor.advance(1);
        self.cursor.skip_blank();
        Ok(rules)
    }

    /// Tries each statement production in priority order.
    fn statement(&mut self, out: &mut Vec<Rule>) -> PResult<bool> {
        if let Some(extends) = self.extend_rule()? {
            out.extend(extends);
            return Ok(true);
        }
        if let Some(def) = self.mixin_definition()? {
            out.push(def);
            return Ok(true);
        }
        if self.cursor.peek_byte() == Some(b'@') && !self.cursor.starts_with("@{") {
            if let Some(rule) = self.variable_declaration()? {
                out.push(rule);
                return Ok(true);
            }
            if let Some(rule) = self.detached_call()? {
                out.push(rule);
                return Ok(true);
            }
            if let Some(rule) = self.at_rule()? {
                out.push(rule);
                return Ok(true);
            }
            return Ok(false);
        }
        if let Some(call) = self.mixin_call()? {
            out.push(call);
            return Ok(true);
        }
        if let Some(ruleset) = self.ruleset()? {
            out.push(ruleset);
            return Ok(true);
        }
        if let Some(declaration) = self.declaration()? {
            out.push(declaration);
            return Ok(true);
        }
        Ok(false)
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.cursor.peek_byte(), None | Some(b';') | Some(b'}'))
    }

    /// Consumes an optional `;`, keeping any comment that follows.
    fn end_statement(&mut self) {
        if self.cursor.peek_byte() == Some(b';') {
            self.cursor.advance(1);
        }
        self.cursor.skip_blank();
    }

    fn ruleset(&mut self) -> PResult<Option<Rule>> {
        let start = self.cursor.pos();
        self.cursor.save();
        let Some(selectors) = self.selector_list()? else {
            self.cursor.restore();
            return Ok(None);
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
        Ok(Some(Rule::Ruleset(Ruleset {
            selectors,
            paths: Vec::new(),
            rules,
            guard,
            root: false,
            meta: self.meta(start),
        })))
    }

    /// `name: value;`, including `prop+: value` merges and `--custom: raw`.
    fn declaration(&mut self) -> PResult<Option<Rule>> {
        let start = self.cursor.pos();
        self.cursor.save();
        let Some(name) = self.property_name() else {
            self.cursor.restore();
            return Ok(None);
        };
        self.cursor.skip_ws();
        let merge = if self.cursor.literal("+_") {
            Merge::Space
        } else if self.cursor.char('+') {
            Merge::Comma
        } else {
            Merge::None
        };
        if !self.cursor.char(':') {
            self.cursor.restore();
            return Ok(None);
        }

        let (value, important) = if name.starts_with("--") {
            (self.raw_value(), false)
        } else {
            self.declaration_value()?
        };
        if matches!(&value, Value::Anonymous(raw) if raw.is_empty()) && !name.starts_with("--") {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        self.end_statement();

        Ok(Some(Rule::Declaration(Declaration {
            name,
            value,
            important,
            merge,
            variable: false,
            meta: self.meta(start),
        })))
    }

    /// Property names, with the legacy `*` and `_` hacks and interpolation.
    fn property_name(&mut self) -> Option<String> {
        let start = self.cursor.pos();
        if matches!(self.cursor.peek_byte(), Some(b'*' | b'_')) {
            self.cursor.advance(1);
        }
        self.cursor.nom(entities::interpolated_ident)?;
        let name = &self.cursor.source()[start..self.cursor.pos()];
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        Some(name.to_string())
    }

    /// A structured value followed by an optional `!important`, or the raw
    /// text up to the end of the statement when the value grammar does not
    /// cover it.
    fn declaration_value(&mut self) -> PResult<(Value, bool)> {
        self.cursor.save();
        if let Some(value) = self.value_list()? {
            let important = self.important();
            if self.at_statement_end() {
                self.cursor.forget();
                return Ok((value, important));
            }
        }
        self.cursor.restore();
        let raw = self.raw_value();
        match raw {
            Value::Anonymous(text) => match text.strip_suffix("!important") {
                Some(rest) => Ok((Value::Anonymous(rest.trim_end().to_string()), true)),
                None => Ok((Value::Anonymous(text), false)),
            },
            other => Ok((other, false)),
        }
    }

    fn raw_value(&mut self) -> Value {
        let raw = self.cursor.raw_until(b";}");
        Value::Anonymous(raw.trim().to_string())
    }

    fn important(&mut self) -> bool {
        self.cursor.token(entities::important).is_some()
    }

    /// `@name: value;` or `@name: { rules }`.
    fn variable_declaration(&mut self) -> PResult<Option<Rule>> {
        let start = self.cursor.pos();
        self.cursor.save();
        let Some(name) = self.cursor.nom(entities::variable) else {
            self.cursor.restore();
            return Ok(None);
        };
        self.cursor.skip_ws();
        if name.starts_with("@@") || !self.cursor.char(':') {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();

        let mut important = false;
        let value = if self.cursor.peek_byte() == Some(b'{') {
            let rules = self.block()?;
            Value::DetachedRuleset(Rc::new(DetachedRuleset {
                rules,
                closure: None,
            }))
        } else if self.at_statement_end() {
            Value::Anonymous(String::new())
        } else {
            let (value, imp) = self.declaration_value()?;
            important = imp;
            value
        };
        self.end_statement();

        let mut declaration = Declaration::variable(name, value, self.meta(start));
        declaration.important = important;
        Ok(Some(Rule::Declaration(declaration)))
    }

    /// `@detached();`
    fn detached_call(&mut self) -> PResult<Option<Rule>> {
        let start = self.cursor.pos();
        self.cursor.save();
        let Some(name) = self.cursor.token(entities::variable) else {
            self.cursor.restore();
            return Ok(None);
        };
        if !(self.cursor.char('(') && self.cursor.char(')')) || !self.at_statement_end() {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        self.end_statement();
        Ok(Some(Rule::DetachedCall(DetachedCall {
            variable: name.to_string(),
            meta: self.meta(start),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Combinator, ElementValue};

    pub(super) fn parse_ok(source: &str) -> Ruleset {
        parse(source, FileId(0), &ParseOptions::default()).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        parse(source, FileId(0), &ParseOptions::default()).unwrap_err()
    }

    #[test]
    fn test_ruleset_with_declarations() {
        let root = parse_ok(".a { color: red; margin: 1px 2px }");
        assert!(root.root);
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        assert_eq!(rs.selectors[0].to_css(false), ".a");
        assert_eq!(rs.rules.len(), 2);
        let Rule::Declaration(d) = &rs.rules[1] else { panic!() };
        assert_eq!(d.name, "margin");
        assert_eq!(d.value.to_string(), "1px 2px");
    }

    #[test]
    fn test_selector_versus_declaration() {
        let root = parse_ok(".a { a:hover { color: red } color: blue; }");
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        assert!(matches!(rs.rules[0], Rule::Ruleset(_)));
        assert!(matches!(rs.rules[1], Rule::Declaration(_)));
    }

    #[test]
    fn test_variables_and_detached_rulesets() {
        let root = parse_ok("@a: 1px;\n@dr: { color: red; }\n.x { @dr(); }");
        let Rule::Declaration(a) = &root.rules[0] else { panic!() };
        assert!(a.variable);
        assert_eq!(a.name, "@a");
        let Rule::Declaration(dr) = &root.rules[1] else { panic!() };
        assert!(matches!(dr.value, Value::DetachedRuleset(_)));
        let Rule::Ruleset(x) = &root.rules[2] else { panic!() };
        assert!(matches!(&x.rules[0], Rule::DetachedCall(c) if c.variable == "@dr"));
    }

    #[test]
    fn test_comments_are_kept_at_statement_level() {
        let root = parse_ok("/* top */\n// dropped\n.a { /* inner */ color: red; }");
        assert!(matches!(&root.rules[0], Rule::Comment(c) if c.text == "/* top */"));
        let Rule::Ruleset(rs) = &root.rules[1] else { panic!() };
        assert!(matches!(rs.rules[0], Rule::Comment(_)));
    }

    #[test]
    fn test_merge_and_important() {
        let root = parse_ok(".a { box-shadow+: 1px; transform+_: scale(2) !important; }");
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        let Rule::Declaration(a) = &rs.rules[0] else { panic!() };
        let Rule::Declaration(b) = &rs.rules[1] else { panic!() };
        assert_eq!(a.merge, Merge::Comma);
        assert_eq!(b.merge, Merge::Space);
        assert!(b.important);
    }

    #[test]
    fn test_raw_fallback_and_custom_properties() {
        let root =
            parse_ok(".a { filter: progid:DXImageTransform.Microsoft.gradient(a=1); --x: { a b }; }");
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        let Rule::Declaration(filter) = &rs.rules[0] else { panic!() };
        assert_eq!(filter.value.to_string(), "progid:DXImageTransform.Microsoft.gradient(a=1)");
        let Rule::Declaration(custom) = &rs.rules[1] else { panic!() };
        assert_eq!(custom.value.to_string(), "{ a b }");
    }

    #[test]
    fn test_interpolated_names() {
        let root = parse_ok(".@{name}-x { @{prop}-color: red; }");
        let Rule::Ruleset(rs) = &root.rules[0] else { panic!() };
        assert!(matches!(rs.selectors[0].elements[0].value, ElementValue::Interpolated(_)));
        assert_eq!(rs.selectors[0].elements[0].combinator, Combinator::None);
        let Rule::Declaration(d) = &rs.rules[0] else { panic!() };
        assert!(d.has_interpolated_name());
    }

    #[test]
    fn test_parse_errors_are_located() {
        let err = parse_err(".a {\n  color: red;\n");
        assert_eq!(err.message, "missing closing `}`");
        assert_eq!(err.location.line, 1);
        assert_eq!(err.location.column, 4);

        let err = parse_err(".a {\n  ??? \n}");
        assert_eq!(err.message, "Unrecognised input");
        assert_eq!(err.location.line, 2);
        assert!(err.snippet.contains("???"));
    }

    #[test]
    fn test_parse_selectors_standalone() {
        let meta = Meta::new(7, FileId(2));
        let selectors = parse_selectors(" .col-3 > a, .b ", meta).unwrap();
        assert_eq!(selectors.len(), 2);
        assert_eq!(selectors[0].to_css(false), ".col-3 > a");
        assert_eq!(selectors[1].meta, meta);
        assert!(parse_selectors(".a {", meta).is_err());
    }
}
