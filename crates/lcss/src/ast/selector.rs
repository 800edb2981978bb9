//! Selectors as flat element lists.
//!
//! `div.a > .b:hover` is stored as five elements: `div`, `.a` (no
//! combinator), `.b` (child combinator), `:hover` (no combinator). Keeping
//! every simple selector as its own element lets extend matching work on
//! element subsequences.

use super::{Extend, Meta};
use std::fmt::Write as _;

/// The relationship between an element and the one before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Part of the same compound selector (`.a.b`).
    #[default]
    None,
    /// Whitespace.
    Descendant,
    /// `>`
    Child,
    /// `+`
    AdjacentSibling,
    /// `~`
    GeneralSibling,
    /// `|`
    Namespace,
}

impl Combinator {
    pub fn to_css(self, compress: bool) -> &'static str {
        match (self, compress) {
            (Combinator::None, _) => "",
            (Combinator::Descendant, _) => " ",
            (Combinator::Child, false) => " > ",
            (Combinator::Child, true) => ">",
            (Combinator::AdjacentSibling, false) => " + ",
            (Combinator::AdjacentSibling, true) => "+",
            (Combinator::GeneralSibling, false) => " ~ ",
            (Combinator::GeneralSibling, true) => "~",
            (Combinator::Namespace, _) => "|",
        }
    }

    /// `None` and `Descendant` are interchangeable at the start of a match.
    pub fn is_boundary_equivalent(self, other: Combinator) -> bool {
        self == other
            || matches!(
                (self, other),
                (Combinator::None, Combinator::Descendant)
                    | (Combinator::Descendant, Combinator::None)
            )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementValue {
    /// A simple selector: `.a`, `#b`, `div`, `*`, `:hover`, `[type=text]`, `50%`.
    Text(String),
    /// `&`
    Parent,
    /// Text still holding `@{...}`; replaced during evaluation.
    Interpolated(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Element {
    pub combinator: Combinator,
    pub value: ElementValue,
}

impl Element {
    pub fn new(combinator: Combinator, text: impl Into<String>) -> Self {
        Self {
            combinator,
            value: ElementValue::Text(text.into()),
        }
    }

    pub fn parent(combinator: Combinator) -> Self {
        Self {
            combinator,
            value: ElementValue::Parent,
        }
    }

    pub fn text(&self) -> &str {
        match &self.value {
            ElementValue::Text(t) | ElementValue::Interpolated(t) => t,
            ElementValue::Parent => "&",
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self.value, ElementValue::Parent)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    pub elements: Vec<Element>,
    /// `:extend(...)` attached to this selector.
    pub extends: Vec<Extend>,
    pub meta: Meta,
}

impl Selector {
    pub fn new(elements: Vec<Element>, meta: Meta) -> Self {
        Self {
            elements,
            extends: Vec::new(),
            meta,
        }
    }

    /// Builds a selector of simple class/id/type parts separated by spaces,
    /// for tests and synthesized nodes.
    pub fn from_text(text: &str) -> Self {
        let mut elements = Vec::new();
        for (i, word) in text.split_whitespace().enumerate() {
            let mut combinator = if i == 0 {
                Combinator::None
            } else {
                Combinator::Descendant
            };
            let mut start = 0;
            let bytes = word.as_bytes();
            for pos in 1..=bytes.len() {
                if pos == bytes.len() || matches!(bytes[pos], b'.' | b'#' | b':') {
                    if bytes.get(pos) == Some(&b':') && bytes[pos - 1] == b':' {
                        continue;
                    }
                    elements.push(Element::new(combinator, &word[start..pos]));
                    combinator = Combinator::None;
                    start = pos;
                }
            }
        }
        Self::new(elements, Meta::default())
    }

    pub fn has_parent_ref(&self) -> bool {
        self.elements.iter().any(Element::is_parent)
    }

    pub fn is_interpolated(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e.value, ElementValue::Interpolated(_)))
    }

    /// `.name` / `#name` selectors, optionally chained (`#ns > .m`), can be
    /// addressed by mixin calls.
    pub fn is_mixin_name(&self) -> bool {
        !self.elements.is_empty()
            && self.elements.iter().all(|e| match &e.value {
                ElementValue::Text(t) => {
                    (t.starts_with('.') || t.starts_with('#'))
                        && matches!(
                            e.combinator,
                            Combinator::None | Combinator::Descendant | Combinator::Child
                        )
                }
                _ => false,
            })
    }

    /// Element texts, as compared against a mixin call path.
    pub fn mixin_path(&self) -> Vec<&str> {
        self.elements.iter().map(Element::text).collect()
    }

    pub fn to_css(&self, compress: bool) -> String {
        let mut out = String::new();
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                out.push_str(element.combinator.to_css(compress));
            } else if !matches!(element.combinator, Combinator::None | Combinator::Descendant) {
                out.push_str(element.combinator.to_css(compress).trim_start());
            }
            let _ = write!(out, "{}", element.text());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_splits_compounds() {
        let sel = Selector::from_text(".a.b c::before");
        let texts: Vec<&str> = sel.elements.iter().map(Element::text).collect();
        assert_eq!(texts, vec![".a", ".b", "c", "::before"]);
        assert_eq!(sel.elements[2].combinator, Combinator::Descendant);
        assert_eq!(sel.elements[3].combinator, Combinator::None);
    }

    #[test]
    fn test_to_css_combinators() {
        let sel = Selector::new(
            vec![
                Element::new(Combinator::None, ".a"),
                Element::new(Combinator::Child, ".b"),
                Element::new(Combinator::AdjacentSibling, "p"),
                Element::new(Combinator::None, ":hover"),
            ],
            Meta::default(),
        );
        assert_eq!(sel.to_css(false), ".a > .b + p:hover");
        assert_eq!(sel.to_css(true), ".a>.b+p:hover");
    }

    #[test]
    fn test_leading_descendant_is_not_printed() {
        let sel = Selector::new(vec![Element::new(Combinator::Descendant, ".a")], Meta::default());
        assert_eq!(sel.to_css(false), ".a");
    }

    #[test]
    fn test_mixin_names() {
        assert!(Selector::from_text(".m").is_mixin_name());
        assert!(Selector::from_text("#ns .m").is_mixin_name());
        assert!(!Selector::from_text("div").is_mixin_name());
        assert!(!Selector::from_text(".a:hover").is_mixin_name());
    }
}
