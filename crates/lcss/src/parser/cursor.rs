//! A transactional position over the source text.
//!
//! Productions call [`Cursor::save`] before trying an alternative and either
//! [`Cursor::restore`] (the alternative did not match) or [`Cursor::forget`]
//! (it did). Token helpers follow one convention: they expect to start on a
//! significant character and skip the whitespace and comments after what
//! they consume.

use super::chunker::{Span, SpanKind};
use nom::IResult;

pub struct Cursor<'s> {
    src: &'s str,
    pos: usize,
    spans: Vec<Span>,
    saved: Vec<usize>,
}

impl<'s> Cursor<'s> {
    pub fn new(src: &'s str, spans: Vec<Span>) -> Self {
        Self {
            src,
            pos: 0,
            spans,
            saved: Vec::new(),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn source(&self) -> &'s str {
        self.src
    }

    pub fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub fn save(&mut self) {
        self.saved.push(self.pos);
    }

    pub fn restore(&mut self) {
        if let Some(pos) = self.saved.pop() {
            self.pos = pos;
        }
    }

    pub fn forget(&mut self) {
        self.saved.pop();
    }

    /// Moves forward by `n` bytes without skipping whitespace.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }

    /// The span starting exactly at `pos`, if any.
    pub fn span_at(&self, pos: usize) -> Option<&Span> {
        self.spans
            .binary_search_by_key(&pos, |s| s.start)
            .ok()
            .map(|i| &self.spans[i])
    }

    /// Skips whitespace and both kinds of comment. Returns whether anything
    /// was skipped.
    pub fn skip_ws(&mut self) -> bool {
        self.skip(true)
    }

    /// Skips whitespace and line comments, stopping at a block comment.
    pub fn skip_blank(&mut self) -> bool {
        self.skip(false)
    }

    fn skip(&mut self, block_comments: bool) -> bool {
        let start = self.pos;
        loop {
            let trimmed = self.rest().trim_start();
            self.pos = self.src.len() - trimmed.len();
            match self.span_at(self.pos) {
                Some(span) if span.kind == SpanKind::LineComment => self.pos = span.end,
                Some(span) if span.kind == SpanKind::BlockComment && block_comments => {
                    self.pos = span.end
                }
                _ => break,
            }
        }
        self.pos > start
    }

    /// A block comment starting at the current position.
    pub fn block_comment(&mut self) -> Option<&'s str> {
        let span = *self.span_at(self.pos)?;
        if span.kind != SpanKind::BlockComment {
            return None;
        }
        self.pos = span.end;
        Some(&self.src[span.start..span.end])
    }

    /// Whether the byte before the current position is whitespace or the end
    /// of a comment.
    pub fn preceded_by_ws(&self) -> bool {
        let before = &self.src[..self.pos];
        before.ends_with(|c: char| c.is_whitespace()) || before.ends_with("*/")
    }

    /// Consumes `c` and the whitespace after it.
    pub fn char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            self.skip_ws();
            true
        } else {
            false
        }
    }

    /// Consumes `text` and the whitespace after it.
    pub fn literal(&mut self, text: &str) -> bool {
        if self.starts_with(text) {
            self.pos += text.len();
            self.skip_ws();
            true
        } else {
            false
        }
    }

    /// Consumes `word` when it is not followed by more name characters.
    pub fn keyword(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if rest
            .get(..word.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(word))
            && !rest
                .as_bytes()
                .get(word.len())
                .is_some_and(|b| {
                    b.is_ascii_alphanumeric() || *b >= 0x80 || matches!(b, b'-' | b'_')
                })
        {
            self.pos += word.len();
            self.skip_ws();
            true
        } else {
            false
        }
    }

    /// Runs a nom parser on the remaining input, advancing past its match.
    /// Whitespace after the match is not skipped.
    pub fn nom<O>(&mut self, mut parser: impl FnMut(&'s str) -> IResult<&'s str, O>) -> Option<O> {
        let rest = self.rest();
        match parser(rest) {
            Ok((remaining, out)) => {
                self.pos += rest.len() - remaining.len();
                Some(out)
            }
            Err(_) => None,
        }
    }

    /// Like [`Cursor::nom`], then skips trailing whitespace.
    pub fn token<O>(&mut self, parser: impl FnMut(&'s str) -> IResult<&'s str, O>) -> Option<O> {
        let out = self.nom(parser)?;
        self.skip_ws();
        Some(out)
    }

    /// Consumes a string span starting here, returning its quote and contents.
    pub fn quoted(&mut self) -> Option<(char, &'s str)> {
        let span = *self.span_at(self.pos)?;
        if span.kind != SpanKind::Quoted {
            return None;
        }
        let quote = self.src[span.start..].chars().next()?;
        self.pos = span.end;
        Some((quote, &self.src[span.start + 1..span.end - 1]))
    }

    /// Consumes an unquoted url body starting here.
    pub fn url_body(&mut self) -> Option<&'s str> {
        let span = *self.span_at(self.pos)?;
        if span.kind != SpanKind::Url {
            return None;
        }
        self.pos = span.end;
        Some(self.src[span.start..span.end].trim())
    }

    /// Consumes text up to (not including) the first byte in `stops` found
    /// outside brackets, strings and comments. An unopened closing bracket
    /// also stops the scan.
    pub fn raw_until(&mut self, stops: &[u8]) -> &'s str {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < bytes.len() {
            if let Some(span) = self.span_at(i) {
                i = span.end;
                continue;
            }
            let b = bytes[i];
            if depth == 0 && stops.contains(&b) {
                break;
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                b'\\' => i += 1,
                _ => {}
            }
            i += 1;
        }
        self.pos = i.min(bytes.len());
        &self.src[start..self.pos]
    }

    /// Consumes a bracketed group starting at `open`, returning the text
    /// between the brackets.
    pub fn balanced(&mut self, open: u8, close: u8) -> Option<&'s str> {
        if self.peek_byte() != Some(open) {
            return None;
        }
        let bytes = self.src.as_bytes();
        let start = self.pos + 1;
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < bytes.len() {
            if let Some(span) = self.span_at(i) {
                i = span.end;
                continue;
            }
            match bytes[i] {
                b'\\' => i += 1,
                b if b == open => depth += 1,
                b if b == close => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = i + 1;
                        return Some(&self.src[start..i]);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::chunker::scan;
    use super::*;

    fn cursor(src: &str) -> Cursor<'_> {
        Cursor::new(src, scan(src).unwrap())
    }

    #[test]
    fn test_save_restore() {
        let mut c = cursor("abc def");
        c.save();
        c.advance(3);
        c.skip_ws();
        assert_eq!(c.rest(), "def");
        c.restore();
        assert_eq!(c.pos(), 0);
    }

    #[test]
    fn test_skip_ws_and_comments() {
        let mut c = cursor("  /* a */ // b\n  x");
        assert!(c.skip_ws());
        assert_eq!(c.rest(), "x");

        let mut c = cursor("  /* a */ x");
        c.skip_blank();
        assert_eq!(c.block_comment(), Some("/* a */"));
    }

    #[test]
    fn test_raw_until_skips_nested_and_strings() {
        let mut c = cursor("a(;) \";\" b; c");
        assert_eq!(c.raw_until(b";"), "a(;) \";\" b");
        assert_eq!(c.rest(), "; c");
    }

    #[test]
    fn test_balanced() {
        let mut c = cursor("(a (b) \")\") rest");
        assert_eq!(c.balanced(b'(', b')'), Some("a (b) \")\""));
        assert_eq!(c.rest(), " rest");
    }

    #[test]
    fn test_keyword_boundary() {
        let mut c = cursor("whenever");
        assert!(!c.keyword("when"));
        let mut c = cursor("when (x)");
        assert!(c.keyword("when"));
        assert_eq!(c.rest(), "(x)");
    }

    #[test]
    fn test_keyword_on_multibyte_text() {
        let mut c = cursor("\"→\"");
        assert!(!c.keyword("when"));
        let mut c = cursor("Müller");
        assert!(!c.keyword("when"));
        assert_eq!(c.pos(), 0);
        let mut c = cursor("wé");
        assert!(!c.keyword("when"));
        let mut c = cursor("whené");
        assert!(!c.keyword("when"));
    }

    #[test]
    fn test_preceded_by_ws() {
        let mut c = cursor("a -b");
        c.advance(2);
        assert!(c.preceded_by_ws());
        c.advance(1);
        assert!(!c.preceded_by_ws());
    }
}
