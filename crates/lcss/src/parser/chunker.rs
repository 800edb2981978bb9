//! Pre-scan of the source text.
//!
//! One linear pass records where every string, comment and unquoted `url()`
//! body starts and ends, and checks that braces and parentheses balance.
//! The parser backtracks freely; with the span table it can skip a string or
//! comment in one step instead of re-scanning its contents, and it never
//! mistakes a `//` inside `url(http://...)` for a comment.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Quoted,
    BlockComment,
    LineComment,
    /// Body of an unquoted `url(...)`, excluding the parentheses.
    Url,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

/// A balance failure found while scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanError {
    pub index: usize,
    pub message: String,
}

impl ScanError {
    fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// Scans `source`, returning its spans in order of their start offset.
pub fn scan(source: &str) -> Result<Vec<Span>, ScanError> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut stack: Vec<(u8, usize)> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                let end = quoted_end(bytes, i, quote)
                    .ok_or_else(|| ScanError::new(i, format!("unmatched `{}`", quote as char)))?;
                spans.push(Span {
                    kind: SpanKind::Quoted,
                    start: i,
                    end,
                });
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .ok_or_else(|| ScanError::new(i, "missing closing `*/`"))?;
                spans.push(Span {
                    kind: SpanKind::BlockComment,
                    start: i,
                    end,
                });
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = source[i..].find('\n').map_or(bytes.len(), |p| i + p);
                spans.push(Span {
                    kind: SpanKind::LineComment,
                    start: i,
                    end,
                });
                i = end;
            }
            b'(' => {
                stack.push((b'(', i));
                i += 1;
                if is_url_call(bytes, i) {
                    if let Some(span) = url_body(bytes, i) {
                        i = span.end;
                        spans.push(span);
                    }
                }
            }
            b'{' => {
                stack.push((b'{', i));
                i += 1;
            }
            close @ (b')' | b'}') => {
                let open = if close == b')' { b'(' } else { b'{' };
                match stack.pop() {
                    Some((o, _)) if o == open => {}
                    Some((o, at)) => {
                        return Err(ScanError::new(
                            at,
                            format!("missing closing `{}`", closing_of(o) as char),
                        ));
                    }
                    None => {
                        return Err(ScanError::new(
                            i,
                            format!("missing opening `{}`", open as char),
                        ));
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some((open, at)) = stack.pop() {
        return Err(ScanError::new(
            at,
            format!("missing closing `{}`", closing_of(open) as char),
        ));
    }
    Ok(spans)
}

fn closing_of(open: u8) -> u8 {
    if open == b'(' { b')' } else { b'}' }
}

/// Offset just past the closing quote.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i + 1),
            b'\n' | b'\r' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Whether the `(` just before `open` belongs to `url(`.
fn is_url_call(bytes: &[u8], open: usize) -> bool {
    open >= 4 && bytes[open - 4..open - 1].eq_ignore_ascii_case(b"url")
        && (open == 4 || !is_name_byte(bytes[open - 5]))
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// An unquoted url body runs to the first unescaped `)`.
fn url_body(bytes: &[u8], start: usize) -> Option<Span> {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if matches!(bytes.get(i), Some(b'"' | b'\'') | None) {
        return None;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b')' => {
                return Some(Span {
                    kind: SpanKind::Url,
                    start,
                    end: i,
                });
            }
            _ => i += 1,
        }
    }
    None
}
