//! Flattening nested rules.
//!
//! After joining, nested rulesets already carry full paths, so they can be
//! lifted out of their parent and emitted after it. At-rules inside a
//! ruleset move the other way: they come out of the ruleset and take a copy
//! of it inside, so
//!
//! ```less
//! .b { color: red; @media print { color: black; } }
//! ```
//!
//! becomes `.b { color: red }` followed by `@media print { .b { color: black } }`.
//!
//! Media blocks nested in media blocks are combined into one block whose
//! query is the product of both (`a, b` inside `c` gives `c and a, c and b`),
//! placed after the outermost block. Rooted directives (`@font-face`,
//! `@keyframes`) never take the enclosing selector.
//!
//! The result only has rulesets, at-rules, imports, comments and root
//! declarations, with no ruleset nested inside another.

use crate::ast::{AtBlock, AtBlockKind, Rule, Ruleset, Value};
use std::mem;

/// The query of the enclosing media or container block.
#[derive(Clone, Copy)]
struct Enclosing<'q> {
    kind: AtBlockKind,
    features: &'q Value,
}

/// Flattens the whole stylesheet.
pub fn flatten_stylesheet(mut root: Ruleset) -> Ruleset {
    let rules = mem::take(&mut root.rules);
    let mut out = Vec::new();
    let mut hoisted = Vec::new();
    flatten_body(rules, None, None, &mut out, &mut hoisted);
    out.extend(hoisted);
    root.rules = out;
    root
}

/// Flattens the rules of a container with no enclosing ruleset.
fn flatten_body(
    rules: Vec<Rule>,
    parent: Option<&Ruleset>,
    enclosing: Option<Enclosing<'_>>,
    out: &mut Vec<Rule>,
    hoisted: &mut Vec<Rule>,
) {
    if let Some(parent) = parent {
        let wrapper = Ruleset {
            rules,
            ..shell(parent)
        };
        flatten_ruleset(wrapper, enclosing, out, hoisted);
        return;
    }
    for rule in rules {
        match rule {
            Rule::Ruleset(ruleset) => flatten_ruleset(ruleset, enclosing, out, hoisted),
            other => flatten_nested(other, None, enclosing, out, hoisted),
        }
    }
}

/// Emits `ruleset` with its own declarations, unless it has none, then
/// everything nested in it.
fn flatten_ruleset(
    mut ruleset: Ruleset,
    enclosing: Option<Enclosing<'_>>,
    out: &mut Vec<Rule>,
    hoisted: &mut Vec<Rule>,
) {
    let rules = mem::take(&mut ruleset.rules);
    let mut own = Vec::new();
    let mut nested = Vec::new();
    for rule in rules {
        match rule {
            Rule::Declaration(_) | Rule::Comment(_) => own.push(rule),
            Rule::Directive(directive) if directive.rules.is_none() => {
                own.push(Rule::Directive(directive))
            }
            Rule::Ruleset(child) => flatten_ruleset(child, enclosing, &mut nested, hoisted),
            other => flatten_nested(other, Some(&ruleset), enclosing, &mut nested, hoisted),
        }
    }
    if !own.is_empty() {
        ruleset.rules = own;
        out.push(Rule::Ruleset(ruleset));
    }
    out.extend(nested);
}

/// Places a non-ruleset rule found inside a container or ruleset.
fn flatten_nested(
    rule: Rule,
    parent: Option<&Ruleset>,
    enclosing: Option<Enclosing<'_>>,
    out: &mut Vec<Rule>,
    hoisted: &mut Vec<Rule>,
) {
    match rule {
        Rule::AtBlock(block) => flatten_at_block(block, parent, enclosing, out, hoisted),
        Rule::Directive(mut directive) => {
            if let Some(children) = directive.rules.take() {
                let parent = if directive.rooted { None } else { parent };
                directive.rules = Some(flatten_container(children, parent));
            }
            out.push(Rule::Directive(directive));
        }
        Rule::Declaration(_) | Rule::Comment(_) | Rule::Import(_) => out.push(rule),
        Rule::Ruleset(ruleset) => flatten_ruleset(ruleset, enclosing, out, hoisted),
        Rule::Extend(_)
        | Rule::MixinDefinition(_)
        | Rule::MixinCall(_)
        | Rule::DetachedCall(_) => {}
    }
}

fn flatten_at_block(
    mut block: AtBlock,
    parent: Option<&Ruleset>,
    enclosing: Option<Enclosing<'_>>,
    out: &mut Vec<Rule>,
    hoisted: &mut Vec<Rule>,
) {
    let enclosing = enclosing.filter(|e| e.kind == block.kind);
    if let Some(outer) = enclosing {
        block.features = combine_features(outer.features, &block.features);
    }

    let rules = mem::take(&mut block.rules);
    let mut content = Vec::new();
    let mut inner = Vec::new();
    let own = Enclosing {
        kind: block.kind,
        features: &block.features,
    };
    flatten_body(rules, parent, Some(own), &mut content, &mut inner);
    block.rules = content;

    let target = if enclosing.is_some() { hoisted } else { out };
    target.push(Rule::AtBlock(block));
    target.extend(inner);
}

/// Flattens the body of a directive, keeping nested media inside it.
fn flatten_container(rules: Vec<Rule>, parent: Option<&Ruleset>) -> Vec<Rule> {
    let mut out = Vec::new();
    let mut hoisted = Vec::new();
    flatten_body(rules, parent, None, &mut out, &mut hoisted);
    out.extend(hoisted);
    out
}

/// A copy of `ruleset` without its body.
fn shell(ruleset: &Ruleset) -> Ruleset {
    Ruleset {
        selectors: Vec::new(),
        paths: ruleset.paths.clone(),
        rules: Vec::new(),
        guard: None,
        root: false,
        meta: ruleset.meta,
    }
}

/// Every outer query joined with every inner query by `and`.
pub fn combine_features(outer: &Value, inner: &Value) -> Value {
    if queries(outer).len() == 1 && queries(inner).len() == 1 {
        return and(outer, inner);
    }
    let mut combined = Vec::new();
    for o in queries(outer) {
        for i in queries(inner) {
            combined.push(and(o, i));
        }
    }
    Value::List(combined)
}

fn queries(features: &Value) -> Vec<&Value> {
    match features {
        Value::List(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn and(outer: &Value, inner: &Value) -> Value {
    let mut parts = Vec::new();
    for side in [outer, inner] {
        if !parts.is_empty() {
            parts.push(Value::keyword("and"));
        }
        match side {
            Value::Expression(items) => parts.extend(items.iter().cloned()),
            other => parts.push(other.clone()),
        }
    }
    Value::Expression(parts)
}
