//! `@import`, `@media`, `@container` and generic directives.

use super::{entities, PResult, Parser};
use crate::ast::{AtBlock, AtBlockKind, Directive, Import, ImportOptions, Quoted, Rule, Value};

/// Directives whose bodies never take the enclosing selector.
fn is_rooted(name: &str) -> bool {
    let name = name.trim_start_matches('@').to_ascii_lowercase();
    let bare = match name.strip_prefix('-') {
        Some(prefixed) => prefixed.split_once('-').map_or(prefixed, |(_, rest)| rest),
        None => name.as_str(),
    };
    matches!(
        bare,
        "font-face"
            | "keyframes"
            | "page"
            | "viewport"
            | "counter-style"
            | "font-feature-values"
            | "property"
    )
}

impl<'s> Parser<'s> {
    pub(super) fn at_rule(&mut self) -> PResult<Option<Rule>> {
        let start = self.cursor.pos();
        self.cursor.save();
        self.cursor.advance(1);
        if self.cursor.nom(entities::ident).is_none() {
            self.cursor.restore();
            return Ok(None);
        }
        self.cursor.forget();
        let name = self.cursor.source()[start..self.cursor.pos()].to_string();
        self.cursor.skip_ws();

        let rule = match name.to_ascii_lowercase().as_str() {
            "@import" => self.import(start)?,
            "@media" => self.at_block(AtBlockKind::Media, start)?,
            "@container" => self.at_block(AtBlockKind::Container, start)?,
            _ => self.directive(name, start)?,
        };
        Ok(Some(rule))
    }

    fn import(&mut self, start: usize) -> PResult<Rule> {
        let mut options = ImportOptions::empty();
        if self.cursor.peek_byte() == Some(b'(') {
            let Some(inner) = self.cursor.balanced(b'(', b')') else {
                return Err(self.error(start, "missing closing `)` in @import options"));
            };
            self.cursor.skip_ws();
            for word in inner.split(',').map(str::trim).filter(|w| !w.is_empty()) {
                match ImportOptions::from_keyword(word) {
                    Some(option) => options |= option,
                    None => {
                        let message = format!("unknown @import option `{}`", word);
                        return Err(self.error(start, message));
                    }
                }
            }
        }

        let path = match self.url()? {
            Some(url) => url,
            None => match self.quoted().or_else(|| self.variable()) {
                Some(path) => path,
                None => return Err(self.error(self.cursor.pos(), "expected a path after @import")),
            },
        };
        let features = if self.at_statement_end() {
            None
        } else {
            Some(self.media_queries()?)
        };
        if !self.at_statement_end() {
            return Err(self.error(start, "missing `;` after @import"));
        }
        self.end_statement();
        Ok(Rule::Import(Import {
            path,
            features,
            options,
            resolved: None,
            content: None,
            meta: self.meta(start),
        }))
    }

    fn at_block(&mut self, kind: AtBlockKind, start: usize) -> PResult<Rule> {
        let features = self.media_queries()?;
        if self.cursor.peek_byte() != Some(b'{') {
            return Err(self.error(start, format!("expected `{{` after {} query", kind.keyword())));
        }
        let rules = self.block()?;
        Ok(Rule::AtBlock(AtBlock {
            kind,
            features,
            rules,
            meta: self.meta(start),
        }))
    }

    /// Comma-separated media queries, each a space-separated run of
    /// keywords, variables and parenthesized features.
    fn media_queries(&mut self) -> PResult<Value> {
        let start = self.cursor.pos();
        let mut queries = Vec::new();
        loop {
            let mut parts = Vec::new();
            loop {
                let part = match self.cursor.peek_byte() {
                    Some(b'(') => Some(self.media_feature()?),
                    Some(b'@') => self.variable(),
                    Some(b'~') => self.escaped(),
                    _ => self
                        .cursor
                        .token(entities::keyword)
                        .map(|k| Value::Keyword(k.to_string())),
                };
                match part {
                    Some(part) => parts.push(part),
                    None => break,
                }
            }
            match parts.len() {
                0 => return Err(self.error(start, "expected media query")),
                1 => queries.extend(parts),
                _ => queries.push(Value::Expression(parts)),
            }
            if !self.cursor.char(',') {
                break;
            }
        }
        Ok(if queries.len() == 1 {
            queries.remove(0)
        } else {
            Value::List(queries)
        })
    }

    /// `(name: value)` or `(name)`; range syntax and nested conditions are
    /// kept as written.
    fn media_feature(&mut self) -> PResult<Value> {
        let start = self.cursor.pos();
        self.cursor.save();
        self.cursor.advance(1);
        self.cursor.skip_ws();
        if let Some(name) = self.cursor.token(entities::interpolated_ident) {
            if self.cursor.char(')') {
                self.cursor.forget();
                return Ok(Value::MediaFeature {
                    name: name.to_string(),
                    value: None,
                });
            }
            if self.cursor.char(':') {
                if let Some(value) = self.expression()? {
                    if self.cursor.char(')') {
                        self.cursor.forget();
                        return Ok(Value::MediaFeature {
                            name: name.to_string(),
                            value: Some(Box::new(value)),
                        });
                    }
                }
            }
        }
        self.cursor.restore();
        let Some(inner) = self.cursor.balanced(b'(', b')') else {
            return Err(self.error(start, "missing closing `)` in media feature"));
        };
        self.cursor.skip_ws();
        Ok(Value::Anonymous(format!("({})", inner.trim())))
    }

    fn directive(&mut self, name: String, start: usize) -> PResult<Rule> {
        let prelude = if matches!(self.cursor.peek_byte(), None | Some(b'{' | b';' | b'}')) {
            None
        } else {
            Some(self.directive_prelude()?)
        };
        let rooted = is_rooted(&name);
        let rules = if self.cursor.peek_byte() == Some(b'{') {
            Some(self.block()?)
        } else if self.at_statement_end() {
            self.end_statement();
            None
        } else {
            return Err(self.error(start, format!("expected `{{` or `;` after {}", name)));
        };
        Ok(Rule::Directive(Directive {
            name,
            prelude,
            rules,
            rooted,
            meta: self.meta(start),
        }))
    }

    /// A structured value when the value grammar reads all of it, otherwise
    /// the raw text as an escaped string so that `@{var}` still interpolates.
    fn directive_prelude(&mut self) -> PResult<Value> {
        self.cursor.save();
        if let Some(value) = self.value_list()? {
            if matches!(self.cursor.peek_byte(), None | Some(b'{' | b';' | b'}')) {
                self.cursor.forget();
                return Ok(value);
            }
        }
        self.cursor.restore();
        let raw = self.cursor.raw_until(b"{;}");
        Ok(Value::Quoted(Quoted::new(raw.trim(), None)))
    }
}

#[cfg(test)]
mod tests {
    use super::is_rooted;
    use crate::ast::{AtBlockKind, ImportOptions, Rule, Value};
    use crate::parser::tests::parse_ok;

    #[test]
    fn test_rooted_directives() {
        assert!(is_rooted("@font-face"));
        assert!(is_rooted("@-webkit-keyframes"));
        assert!(!is_rooted("@supports"));
        assert!(!is_rooted("@document"));
    }

    #[test]
    fn test_import_forms() {
        let root = parse_ok(
            "@import (reference, optional) \"lib\";\n@import url(a.css) screen and (orientation: landscape);",
        );
        let Rule::Import(lib) = &root.rules[0] else { panic!() };
        assert_eq!(lib.options, ImportOptions::REFERENCE | ImportOptions::OPTIONAL);
        assert!(!lib.is_css());
        let Rule::Import(css) = &root.rules[1] else { panic!() };
        assert!(css.is_css());
        assert_eq!(
            css.features.as_ref().unwrap().to_string(),
            "screen and (orientation: landscape)"
        );
    }

    #[test]
    fn test_media_queries() {
        let root = parse_ok("@media screen and (min-width: 768px), print { .a { b: c } }");
        let Rule::AtBlock(block) = &root.rules[0] else { panic!() };
        assert_eq!(block.kind, AtBlockKind::Media);
        assert_eq!(block.features.to_string(), "screen and (min-width: 768px), print");
    }

    #[test]
    fn test_range_feature_is_raw() {
        let root = parse_ok("@media (400px <= width <= 700px) { .a { b: c } }");
        let Rule::AtBlock(block) = &root.rules[0] else { panic!() };
        assert_eq!(block.features, Value::Anonymous("(400px <= width <= 700px)".to_string()));
    }

    #[test]
    fn test_container_and_directives() {
        let root = parse_ok(
            "@charset \"UTF-8\";\n@container card (min-width: 400px) { .a { b: c } }\n@supports (display: grid) { .a { b: c } }\n@font-face { font-family: X; }",
        );
        assert!(matches!(&root.rules[0], Rule::Directive(d) if d.rules.is_none()));
        assert!(matches!(&root.rules[1], Rule::AtBlock(b) if b.kind == AtBlockKind::Container));
        let Rule::Directive(supports) = &root.rules[2] else { panic!() };
        assert!(!supports.rooted);
        assert_eq!(supports.prelude.as_ref().unwrap().to_string(), "(display: grid)");
        assert!(matches!(&root.rules[3], Rule::Directive(d) if d.rooted));
    }
}
