//! Lexical scopes.
//!
//! A [`Frame`] is one scope: the unevaluated rules written in it plus the
//! rules exported into it by mixin calls. A [`FrameChain`] is an immutable,
//! reference-counted linked list of frames, innermost first. Closures store a
//! chain and share every frame with the scope that created them.

use crate::ast::{Declaration, FileId, MixinDefinition, Rule, Ruleset};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Frame {
    /// Rules as written, before evaluation.
    pub rules: Vec<Rule>,
    /// Variables and mixins produced by mixin calls in this scope.
    pub exported: RefCell<Vec<Rule>>,
    /// The ruleset or mixin whose body this frame holds.
    pub origin: Option<(FileId, usize)>,
}

impl Frame {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    pub fn with_origin(mut self, origin: (FileId, usize)) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Last declaration of the variable `name` in this scope.
    pub fn variable(&self, name: &str) -> Option<Declaration> {
        find_declaration(&self.rules, name, true)
            .cloned()
            .or_else(|| find_declaration(&self.exported.borrow(), name, true).cloned())
    }

    /// Last declaration of the property `name` in this scope.
    pub fn property(&self, name: &str) -> Option<Declaration> {
        find_declaration(&self.rules, name, false)
            .cloned()
            .or_else(|| find_declaration(&self.exported.borrow(), name, false).cloned())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        find_declaration(&self.rules, name, true).is_some()
    }

    /// Adds rules produced by a mixin call. Variables already declared in
    /// this scope keep their local value.
    pub fn export(&self, rules: &[Rule]) {
        let mut exported = self.exported.borrow_mut();
        for rule in rules {
            match rule {
                Rule::Declaration(d) if d.variable && !self.has_variable(&d.name) => {
                    exported.push(rule.clone())
                }
                Rule::MixinDefinition(_) => exported.push(rule.clone()),
                Rule::Ruleset(r) if r.is_mixin_candidate() => exported.push(rule.clone()),
                _ => {}
            }
        }
    }

    /// Drops exported rules; breaks reference cycles through closures once a
    /// compilation is done.
    pub fn clear_exports(&self) {
        self.exported.borrow_mut().clear();
    }

    /// Visits the mixin definitions and mixin-addressable rulesets of this scope.
    pub fn for_each_mixin(&self, mut f: impl FnMut(MixinSource<'_>)) {
        for rule in &self.rules {
            visit_mixin(rule, false, &mut f);
        }
        for rule in self.exported.borrow().iter() {
            visit_mixin(rule, true, &mut f);
        }
    }
}

/// A rule that a mixin call may resolve to.
pub enum MixinSource<'r> {
    Definition {
        definition: &'r Rc<MixinDefinition>,
        /// Exported definitions already carry their closure.
        evaluated: bool,
    },
    Ruleset(&'r Ruleset),
}

fn visit_mixin(rule: &Rule, evaluated: bool, f: &mut impl FnMut(MixinSource<'_>)) {
    match rule {
        Rule::MixinDefinition(definition) => f(MixinSource::Definition { definition, evaluated }),
        Rule::Ruleset(ruleset) if ruleset.is_mixin_candidate() => f(MixinSource::Ruleset(ruleset)),
        _ => {}
    }
}

fn find_declaration<'r>(rules: &'r [Rule], name: &str, variable: bool) -> Option<&'r Declaration> {
    rules.iter().rev().find_map(|rule| match rule {
        Rule::Declaration(d) if d.variable == variable && d.name == name => Some(d),
        _ => None,
    })
}

struct Node {
    frame: Rc<Frame>,
    parent: FrameChain,
}

/// Innermost-first list of scopes.
#[derive(Clone, Default)]
pub struct FrameChain(Option<Rc<Node>>);

impl FrameChain {
    pub fn new() -> Self {
        Self(None)
    }

    /// A new chain with `frame` as the innermost scope.
    pub fn push(&self, frame: Rc<Frame>) -> Self {
        Self(Some(Rc::new(Node {
            frame,
            parent: self.clone(),
        })))
    }

    /// This chain's frames, innermost first, followed by `outer`.
    pub fn then(&self, outer: &FrameChain) -> Self {
        let frames: Vec<&Rc<Frame>> = self.iter().collect();
        frames
            .into_iter()
            .rev()
            .fold(outer.clone(), |chain, frame| chain.push(frame.clone()))
    }

    pub fn frame(&self) -> Option<&Rc<Frame>> {
        self.0.as_ref().map(|node| &node.frame)
    }

    pub fn parent(&self) -> Option<&FrameChain> {
        self.0.as_ref().map(|node| &node.parent)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// Each scope, paired with the chain that starts at it.
    pub fn scopes(&self) -> Scopes<'_> {
        Scopes { next: self }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Frame>> {
        self.scopes().map(|(frame, _)| frame)
    }
}

pub struct Scopes<'c> {
    next: &'c FrameChain,
}

impl<'c> Iterator for Scopes<'c> {
    type Item = (&'c Rc<Frame>, &'c FrameChain);

    fn next(&mut self) -> Option<Self::Item> {
        let chain = self.next;
        let node = chain.0.as_ref()?;
        self.next = &node.parent;
        Some((&node.frame, chain))
    }
}

impl PartialEq for FrameChain {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for FrameChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameChain(depth {})", self.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Meta, Value};

    fn var(name: &str, value: &str) -> Rule {
        Rule::Declaration(Declaration::variable(name, Value::keyword(value), Meta::default()))
    }

    #[test]
    fn test_last_declaration_wins() {
        let frame = Frame::new(vec![var("@a", "one"), var("@a", "two")]);
        assert_eq!(frame.variable("@a").unwrap().value, Value::keyword("two"));
        assert!(frame.variable("@b").is_none());
    }

    #[test]
    fn test_exports_do_not_shadow_locals() {
        let frame = Frame::new(vec![var("@a", "local")]);
        frame.export(&[var("@a", "mixin"), var("@b", "mixin")]);
        assert_eq!(frame.variable("@a").unwrap().value, Value::keyword("local"));
        assert_eq!(frame.variable("@b").unwrap().value, Value::keyword("mixin"));
    }

    #[test]
    fn test_chain_order_and_identity() {
        let outer = Rc::new(Frame::new(vec![var("@a", "outer")]));
        let inner = Rc::new(Frame::new(vec![var("@a", "inner")]));
        let root = FrameChain::new().push(outer);
        let chain = root.push(inner);
        let found: Vec<Value> =
            chain.iter().filter_map(|f| f.variable("@a")).map(|d| d.value).collect();
        assert_eq!(found, vec![Value::keyword("inner"), Value::keyword("outer")]);
        assert_eq!(chain.depth(), 2);
        assert_eq!(chain.parent(), Some(&root));
        assert_ne!(chain, root);
        assert_eq!(chain.clone(), chain);
    }

    #[test]
    fn test_then_falls_through_to_outer_chain() {
        let closure = FrameChain::new()
            .push(Rc::new(Frame::new(vec![var("@a", "closure")])))
            .push(Rc::new(Frame::new(vec![var("@b", "closure")])));
        let call_site = FrameChain::new().push(Rc::new(Frame::new(vec![
            var("@a", "caller"),
            var("@c", "caller"),
        ])));
        let chain = closure.then(&call_site);
        assert_eq!(chain.depth(), 3);
        let lookup = |name: &str| chain.iter().find_map(|f| f.variable(name)).map(|d| d.value);
        assert_eq!(lookup("@a"), Some(Value::keyword("closure")));
        assert_eq!(lookup("@b"), Some(Value::keyword("closure")));
        assert_eq!(lookup("@c"), Some(Value::keyword("caller")));
    }
}
