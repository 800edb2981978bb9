//! The stylesheet tree.
//!
//! The parser produces a root [`Ruleset`] whose rules are a closed set of
//! [`Rule`] variants. Evaluation builds a new tree from it (the parse tree is
//! never mutated), and each visitor pass maps one tree to the next.
//!
//! Every node carries a [`Meta`]: byte offset, owning file, and the
//! visibility-block counter used by reference imports.

pub mod selector;
pub mod value;

pub use selector::{Combinator, Element, ElementValue, Selector};
pub use value::{
    Call, CompareOp, Condition, DetachedRuleset, Operation, Quoted, Value, VariableRef,
    WriteOptions,
};

use crate::eval::frame::FrameChain;
use bitflags::bitflags;
use std::rc::Rc;

/// Index into the per-compilation file table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Reference-import visibility of a node.
///
/// A node is hidden while `blocks > 0` unless something explicitly needed it
/// (an extend from visible content).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub blocks: u32,
    pub explicit: bool,
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        self.blocks == 0 || self.explicit
    }

    pub fn block(&mut self) {
        self.blocks += 1;
    }

    pub fn ensure_visible(&mut self) {
        self.explicit = true;
    }

    /// Adds the blocks inherited from an enclosing node.
    pub fn inherit(&mut self, blocks: u32) {
        self.blocks += blocks;
    }
}

/// Source position, owning file and visibility of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Meta {
    pub index: usize,
    pub file: FileId,
    pub visibility: Visibility,
}

impl Meta {
    pub fn new(index: usize, file: FileId) -> Self {
        Self {
            index,
            file,
            visibility: Visibility::default(),
        }
    }
}

/// A statement inside a ruleset body.
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    Ruleset(Ruleset),
    Declaration(Declaration),
    MixinDefinition(Rc<MixinDefinition>),
    MixinCall(MixinCall),
    DetachedCall(DetachedCall),
    AtBlock(AtBlock),
    Directive(Directive),
    Import(Import),
    Extend(Extend),
    Comment(Comment),
}

impl Rule {
    pub fn meta(&self) -> &Meta {
        match self {
            Rule::Ruleset(r) => &r.meta,
            Rule::Declaration(d) => &d.meta,
            Rule::MixinDefinition(m) => &m.meta,
            Rule::MixinCall(c) => &c.meta,
            Rule::DetachedCall(c) => &c.meta,
            Rule::AtBlock(b) => &b.meta,
            Rule::Directive(d) => &d.meta,
            Rule::Import(i) => &i.meta,
            Rule::Extend(e) => &e.meta,
            Rule::Comment(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            Rule::Ruleset(r) => &mut r.meta,
            Rule::Declaration(d) => &mut d.meta,
            Rule::MixinDefinition(m) => &mut Rc::make_mut(m).meta,
            Rule::MixinCall(c) => &mut c.meta,
            Rule::DetachedCall(c) => &mut c.meta,
            Rule::AtBlock(b) => &mut b.meta,
            Rule::Directive(d) => &mut d.meta,
            Rule::Import(i) => &mut i.meta,
            Rule::Extend(e) => &mut e.meta,
            Rule::Comment(c) => &mut c.meta,
        }
    }

    /// Nested rule list, for variants that have one.
    pub fn children(&self) -> Option<&[Rule]> {
        match self {
            Rule::Ruleset(r) => Some(&r.rules),
            Rule::AtBlock(b) => Some(&b.rules),
            Rule::Directive(d) => d.rules.as_deref(),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Rule>> {
        match self {
            Rule::Ruleset(r) => Some(&mut r.rules),
            Rule::AtBlock(b) => Some(&mut b.rules),
            Rule::Directive(d) => d.rules.as_mut(),
            _ => None,
        }
    }

    /// Marks this node and every descendant as hidden once more.
    pub fn block_visibility(&mut self) {
        self.meta_mut().visibility.block();
        if let Rule::Ruleset(r) = self {
            for s in r.selectors.iter_mut().chain(r.paths.iter_mut()) {
                s.meta.visibility.block();
            }
        }
        if let Some(children) = self.children_mut() {
            for child in children {
                child.block_visibility();
            }
        }
    }

    /// Gives this node and every descendant the visibility of a call site.
    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.meta_mut().visibility = visibility;
        if let Rule::Ruleset(r) = self {
            for s in r.selectors.iter_mut().chain(r.paths.iter_mut()) {
                s.meta.visibility = visibility;
            }
        }
        if let Some(children) = self.children_mut() {
            for child in children {
                child.set_visibility(visibility);
            }
        }
    }

    /// Sets `important` on every declaration at or below this node.
    pub fn make_important(&mut self) {
        match self {
            Rule::Declaration(d) if !d.variable => d.important = true,
            _ => {
                if let Some(children) = self.children_mut() {
                    for child in children {
                        child.make_important();
                    }
                }
            }
        }
    }
}

/// A selector list with a body; also the root of every stylesheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ruleset {
    pub selectors: Vec<Selector>,
    /// Fully joined selector paths, filled in by the selector-join pass.
    pub paths: Vec<Selector>,
    pub rules: Vec<Rule>,
    /// CSS guard (`.a when (@mode = dark) { ... }`).
    pub guard: Option<Condition>,
    /// True only for the stylesheet root and imported roots.
    pub root: bool,
    pub meta: Meta,
}

impl Ruleset {
    pub fn root(rules: Vec<Rule>, meta: Meta) -> Self {
        Self {
            rules,
            root: true,
            meta,
            ..Default::default()
        }
    }

    /// Whether a mixin call may address this ruleset by name.
    pub fn is_mixin_candidate(&self) -> bool {
        !self.root && self.selectors.iter().any(Selector::is_mixin_name)
    }
}

/// How repeated declarations of one property are combined on output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Merge {
    #[default]
    None,
    /// `prop+: value` joins with commas.
    Comma,
    /// `prop+_: value` joins with spaces.
    Space,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    /// Property name, `@name` for variables. May hold `@{...}` before evaluation.
    pub name: String,
    pub value: Value,
    pub important: bool,
    pub merge: Merge,
    pub variable: bool,
    pub meta: Meta,
}

impl Declaration {
    pub fn variable(name: impl Into<String>, value: Value, meta: Meta) -> Self {
        Self {
            name: name.into(),
            value,
            important: false,
            merge: Merge::None,
            variable: true,
            meta,
        }
    }

    pub fn has_interpolated_name(&self) -> bool {
        self.name.contains("@{") || self.name.contains("${")
    }
}

/// One formal parameter of a parametric mixin.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    /// `@name`, or `None` for a pattern parameter that must equal its value.
    pub name: Option<String>,
    /// Default value, or the pattern for unnamed parameters.
    pub value: Option<Value>,
    /// `@rest...` or a bare `...`.
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixinDefinition {
    /// `.name` or `#name`.
    pub name: String,
    pub params: Vec<Param>,
    pub guard: Option<Condition>,
    pub rules: Vec<Rule>,
    /// Frames visible where the definition was evaluated.
    pub closure: Option<FrameChain>,
    pub meta: Meta,
}

impl MixinDefinition {
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// Parameters that must be supplied by the caller.
    pub fn required(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.variadic && (p.name.is_none() || p.value.is_none()))
            .count()
    }

    /// Stable identity of the source definition.
    pub fn identity(&self) -> (FileId, usize) {
        (self.meta.file, self.meta.index)
    }
}

/// One argument at a mixin call site.
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Value,
    /// Call-site `...`: splice a list into positional arguments.
    pub expand: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MixinCall {
    /// Namespace path, e.g. `["#ns", ".m"]`.
    pub path: Vec<String>,
    pub args: Vec<Arg>,
    pub important: bool,
    pub meta: Meta,
}

impl MixinCall {
    pub fn display_name(&self) -> String {
        self.path.join(" > ")
    }
}

/// `@detached();`
#[derive(Clone, Debug, PartialEq)]
pub struct DetachedCall {
    pub variable: String,
    pub meta: Meta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtBlockKind {
    Media,
    Container,
}

impl AtBlockKind {
    pub fn keyword(self) -> &'static str {
        match self {
            AtBlockKind::Media => "@media",
            AtBlockKind::Container => "@container",
        }
    }
}

/// `@media` / `@container`: feature query plus a nested rule list.
#[derive(Clone, Debug, PartialEq)]
pub struct AtBlock {
    pub kind: AtBlockKind,
    pub features: Value,
    pub rules: Vec<Rule>,
    pub meta: Meta,
}

/// Any other at-rule, with or without a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// Including the `@`.
    pub name: String,
    pub prelude: Option<Value>,
    pub rules: Option<Vec<Rule>>,
    /// Rooted directives (`@font-face`, `@keyframes`) never take the
    /// enclosing selector when bubbled.
    pub rooted: bool,
    pub meta: Meta,
}

bitflags! {
    /// Options given in parentheses after `@import`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ImportOptions: u8 {
        const REFERENCE = 1 << 0;
        const INLINE = 1 << 1;
        const CSS = 1 << 2;
        const ONCE = 1 << 3;
        const MULTIPLE = 1 << 4;
        const OPTIONAL = 1 << 5;
        const LESS = 1 << 6;
    }
}

impl ImportOptions {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "reference" => Self::REFERENCE,
            "inline" => Self::INLINE,
            "css" => Self::CSS,
            "once" => Self::ONCE,
            "multiple" => Self::MULTIPLE,
            "optional" => Self::OPTIONAL,
            "less" => Self::LESS,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub path: Value,
    /// Media query after the path, kept on CSS imports.
    pub features: Option<Value>,
    pub options: ImportOptions,
    /// File the import resolved to, once the resolver has run.
    pub resolved: Option<FileId>,
    /// Verbatim text of an `(inline)` import.
    pub content: Option<String>,
    pub meta: Meta,
}

impl Import {
    /// Whether this import stays in the output as a plain CSS `@import`.
    pub fn is_css(&self) -> bool {
        if self.options.contains(ImportOptions::LESS) {
            return false;
        }
        if self.options.contains(ImportOptions::CSS) {
            return true;
        }
        match &self.path {
            Value::Url(_) => true,
            v => v.to_interp_string().ends_with(".css"),
        }
    }
}

/// `:extend(...)`, attached to a selector or written as `&:extend(...);`.
#[derive(Clone, Debug, PartialEq)]
pub struct Extend {
    pub target: Selector,
    /// Match anywhere inside a selector rather than the whole selector.
    pub all: bool,
    /// Per-compilation id, assigned during evaluation.
    pub id: usize,
    /// Ids of the extends this one was derived from while chaining.
    pub parent_ids: Vec<usize>,
    /// Paths that receive the target's rules, filled in by the selector-join pass.
    pub self_paths: Vec<Selector>,
    pub meta: Meta,
}

impl Extend {
    pub fn new(target: Selector, all: bool, meta: Meta) -> Self {
        Self {
            target,
            all,
            id: 0,
            parent_ids: Vec::new(),
            self_paths: Vec::new(),
            meta,
        }
    }
}

/// A preserved `/* ... */` comment.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub text: String,
    pub meta: Meta,
}

impl Comment {
    /// `/*! ... */` comments survive compression.
    pub fn is_important(&self) -> bool {
        self.text.starts_with("/*!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str) -> Rule {
        Rule::Declaration(Declaration {
            name: name.to_string(),
            value: Value::Keyword("red".to_string()),
            important: false,
            merge: Merge::None,
            variable: false,
            meta: Meta::default(),
        })
    }

    #[test]
    fn test_visibility_counter() {
        let mut v = Visibility::default();
        assert!(v.is_visible());
        v.block();
        assert!(!v.is_visible());
        v.ensure_visible();
        assert!(v.is_visible());
    }

    #[test]
    fn test_block_visibility_reaches_descendants() {
        let mut rule = Rule::Ruleset(Ruleset {
            selectors: vec![Selector::from_text(".a")],
            rules: vec![decl("color")],
            ..Default::default()
        });
        rule.block_visibility();
        let Rule::Ruleset(r) = &rule else { unreachable!() };
        assert_eq!(r.meta.visibility.blocks, 1);
        assert_eq!(r.selectors[0].meta.visibility.blocks, 1);
        assert_eq!(r.rules[0].meta().visibility.blocks, 1);
    }

    #[test]
    fn test_make_important_skips_variables() {
        let mut rule = Rule::Ruleset(Ruleset {
            rules: vec![
                decl("color"),
                Rule::Declaration(Declaration::variable(
                    "@x",
                    Value::Keyword("a".to_string()),
                    Meta::default(),
                )),
            ],
            ..Default::default()
        });
        rule.make_important();
        let Rule::Ruleset(r) = &rule else { unreachable!() };
        assert!(matches!(&r.rules[0], Rule::Declaration(d) if d.important));
        assert!(matches!(&r.rules[1], Rule::Declaration(d) if !d.important));
    }

    #[test]
    fn test_import_css_detection() {
        let import = |path: &str, options| Import {
            path: Value::Quoted(Quoted::new(path, Some('"'))),
            features: None,
            options,
            resolved: None,
            content: None,
            meta: Meta::default(),
        };
        assert!(import("a.css", ImportOptions::empty()).is_css());
        assert!(!import("a.less", ImportOptions::empty()).is_css());
        assert!(import("a", ImportOptions::CSS).is_css());
        assert!(!import("a.css", ImportOptions::LESS).is_css());
    }

    #[test]
    fn test_mixin_required_params() {
        let def = MixinDefinition {
            name: ".m".to_string(),
            params: vec![
                Param {
                    name: Some("@a".into()),
                    value: None,
                    variadic: false,
                },
                Param {
                    name: Some("@b".into()),
                    value: Some(Value::Keyword("x".into())),
                    variadic: false,
                },
                Param {
                    name: None,
                    value: None,
                    variadic: true,
                },
            ],
            guard: None,
            rules: Vec::new(),
            closure: None,
            meta: Meta::default(),
        };
        assert!(def.is_variadic());
        assert_eq!(def.required(), 1);
    }
}
