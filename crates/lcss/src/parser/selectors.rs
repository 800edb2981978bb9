//! Selector grammar and `:extend`.

use super::{entities, PResult, Parser};
use crate::ast::{Combinator, Element, ElementValue, Extend, Rule, Selector};

impl<'s> Parser<'s> {
    /// Comma-separated selectors. Stops before `{` and before a `when` guard.
    pub(super) fn selector_list(&mut self) -> PResult<Option<Vec<Selector>>> {
        let mut selectors = Vec::new();
        loop {
            let Some(selector) = self.selector()? else {
                return Ok(None);
            };
            selectors.push(selector);
            if !self.cursor.char(',') {
                break;
            }
        }
        Ok(Some(selectors))
    }

    pub(super) fn selector(&mut self) -> PResult<Option<Selector>> {
        let start = self.cursor.pos();
        let mut elements = Vec::new();
        let mut extends = Vec::new();
        let mut combinator = Combinator::None;
        let mut dangling = false;

        loop {
            let explicit = match self.cursor.peek_byte() {
                Some(b'>') => Some(Combinator::Child),
                Some(b'+') => Some(Combinator::AdjacentSibling),
                Some(b'~') => Some(Combinator::GeneralSibling),
                _ => None,
            };
            if let Some(explicit) = explicit {
                self.cursor.advance(1);
                self.cursor.skip_ws();
                combinator = explicit;
                dangling = true;
            }
            if self.cursor.starts_with(":extend(") {
                extends.extend(self.extend_args()?);
                combinator = if self.cursor.skip_ws() {
                    Combinator::Descendant
                } else {
                    Combinator::None
                };
                if combinator == Combinator::Descendant && self.at_guard() {
                    break;
                }
                continue;
            }
            let Some(value) = self.element_value() else {
                break;
            };
            elements.push(Element { combinator, value });
            dangling = false;

            combinator = if self.cursor.skip_ws() {
                Combinator::Descendant
            } else {
                Combinator::None
            };
            if combinator == Combinator::Descendant && self.at_guard() {
                break;
            }
        }

        if dangling || (elements.is_empty() && extends.is_empty()) {
            return Ok(None);
        }
        let mut selector = Selector::new(elements, self.meta(start));
        selector.extends = extends;
        Ok(Some(selector))
    }

    fn at_guard(&mut self) -> bool {
        self.cursor.save();
        let found = self.cursor.keyword("when");
        self.cursor.restore();
        found
    }

    /// One simple selector, without surrounding whitespace.
    fn element_value(&mut self) -> Option<ElementValue> {
        let start = self.cursor.pos();
        let matched = match self.cursor.peek_byte()? {
            b'&' => {
                self.cursor.advance(1);
                return Some(ElementValue::Parent);
            }
            b'.' | b'#' => {
                self.cursor.advance(1);
                self.cursor.nom(entities::interpolated_ident).is_some()
            }
            b':' => {
                self.cursor.advance(1);
                if self.cursor.peek_byte() == Some(b':') {
                    self.cursor.advance(1);
                }
                let named = self.cursor.nom(entities::interpolated_ident).is_some();
                if named && self.cursor.peek_byte() == Some(b'(') {
                    self.cursor.balanced(b'(', b')').is_some()
                } else {
                    named
                }
            }
            b'[' => self.cursor.balanced(b'[', b']').is_some(),
            b'*' => {
                self.cursor.advance(1);
                true
            }
            b'0'..=b'9' => self.cursor.nom(entities::dimension).is_some(),
            b'@' if self.cursor.starts_with("@{") => {
                self.cursor.nom(entities::interpolated_ident).is_some()
            }
            b'-' | b'_' | b'\\' => self.cursor.nom(entities::interpolated_ident).is_some(),
            b if b.is_ascii_alphabetic() || !b.is_ascii() => {
                self.cursor.nom(entities::interpolated_ident).is_some()
            }
            _ => false,
        };
        if !matched {
            self.cursor.seek(start);
            return None;
        }
        let text = &self.cursor.source()[start..self.cursor.pos()];
        Some(if text.contains("@{") {
            ElementValue::Interpolated(text.to_string())
        } else {
            ElementValue::Text(text.to_string())
        })
    }

    /// `:extend(target [all], ...)`, starting at the colon.
    fn extend_args(&mut self) -> PResult<Vec<Extend>> {
        let start = self.cursor.pos();
        self.cursor.advance(":extend(".len());
        self.cursor.skip_ws();
        let mut extends = Vec::new();
        loop {
            let target_start = self.cursor.pos();
            let Some(mut target) = self.selector()? else {
                return Err(self.error(target_start, "Missing target selector for :extend()"));
            };
            let all = match target.elements.last() {
                Some(last)
                    if target.elements.len() > 1
                        && last.combinator == Combinator::Descendant
                        && last.text() == "all" =>
                {
                    target.elements.pop();
                    true
                }
                _ => false,
            };
            extends.push(Extend::new(target, all, self.meta(start)));
            if !self.cursor.char(',') {
                break;
            }
        }
        if self.cursor.peek_byte() != Some(b')') {
            return Err(self.error(start, "missing closing `)` in :extend"));
        }
        self.cursor.advance(1);
        Ok(extends)
    }

    /// `&:extend(...);` as a statement of its own.
    pub(super) fn extend_rule(&mut self) -> PResult<Option<Vec<Rule>>> {
        if !self.cursor.starts_with("&:extend(") {
            return Ok(None);
        }
        self.cursor.save();
        self.cursor.advance(1);
        let extends = self.extend_args()?;
        self.cursor.skip_ws();
        if !self.at_statement_end() {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        self.end_statement();
        Ok(Some(extends.into_iter().map(Rule::Extend).collect()))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Combinator, ElementValue, Rule, Ruleset};
    use crate::parser::tests::parse_ok;

    fn first_ruleset(source: &str) -> Ruleset {
        match parse_ok(source).rules.into_iter().next() {
            Some(Rule::Ruleset(rs)) => rs,
            other => panic!("expected a ruleset, got {:?}", other),
        }
    }

    #[test]
    fn test_compound_and_combinators() {
        let rs = first_ruleset("div.a > .b + p ~ span:hover::before {}");
        assert_eq!(rs.selectors[0].to_css(false), "div.a > .b + p ~ span:hover::before");
        let combinators: Vec<Combinator> =
            rs.selectors[0].elements.iter().map(|e| e.combinator).collect();
        assert_eq!(
            combinators,
            vec![
                Combinator::None,
                Combinator::None,
                Combinator::Child,
                Combinator::AdjacentSibling,
                Combinator::GeneralSibling,
                Combinator::None,
                Combinator::None,
            ]
        );
    }

    #[test]
    fn test_attributes_and_pseudo_arguments() {
        let rs = first_ruleset("a[href^=\"http://\"]:not(.x, .y), li:nth-child(2n + 1) {}");
        assert_eq!(rs.selectors.len(), 2);
        assert_eq!(rs.selectors[0].to_css(false), "a[href^=\"http://\"]:not(.x, .y)");
        assert_eq!(rs.selectors[1].to_css(false), "li:nth-child(2n + 1)");
    }

    #[test]
    fn test_parent_references() {
        let rs = first_ruleset(".a { &-suffix, & + &, > .child {} }");
        let Rule::Ruleset(inner) = &rs.rules[0] else { panic!() };
        assert!(inner.selectors[0].elements[0].is_parent());
        assert_eq!(inner.selectors[0].elements[1].text(), "-suffix");
        assert_eq!(inner.selectors[1].elements.len(), 2);
        assert_eq!(inner.selectors[2].elements[0].combinator, Combinator::Child);
    }

    #[test]
    fn test_keyframe_selectors() {
        let root = parse_ok("@keyframes spin { from { a: b } 50% { a: c } }");
        let Rule::Directive(d) = &root.rules[0] else { panic!() };
        let rules = d.rules.as_ref().unwrap();
        let Rule::Ruleset(half) = &rules[1] else { panic!() };
        assert_eq!(half.selectors[0].to_css(false), "50%");
    }

    #[test]
    fn test_extend_on_selector() {
        let rs = first_ruleset(".a:extend(.b all, .c) { color: red }");
        let sel = &rs.selectors[0];
        assert_eq!(sel.to_css(false), ".a");
        assert_eq!(sel.extends.len(), 2);
        assert!(sel.extends[0].all);
        assert_eq!(sel.extends[0].target.to_css(false), ".b");
        assert!(!sel.extends[1].all);
    }

    #[test]
    fn test_extend_statement() {
        let rs = first_ruleset(".a { &:extend(.b .c all); color: red; }");
        let Rule::Extend(ext) = &rs.rules[0] else { panic!() };
        assert!(ext.all);
        assert_eq!(ext.target.to_css(false), ".b .c");
    }

    #[test]
    fn test_css_guard() {
        let rs = first_ruleset(".a when (@mode = dark) { color: red }");
        assert!(rs.guard.is_some());
        assert_eq!(rs.selectors[0].to_css(false), ".a");
    }

    #[test]
    fn test_interpolated_element() {
        let rs = first_ruleset(".col-@{i} {}");
        assert_eq!(
            rs.selectors[0].elements[0].value,
            ElementValue::Interpolated(".col-@{i}".to_string())
        );
    }
}
