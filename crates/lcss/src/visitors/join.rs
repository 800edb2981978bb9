//! Selector joining.
//!
//! Combines each nested ruleset's selectors with the paths of its parent:
//!
//! ```less
//! .parent {
//!   .child { }      // -> .parent .child
//!   &:hover { }     // -> .parent:hover
//!   &-title { }     // -> .parent-title
//!   .x & { }        // -> .x .parent
//! }
//! ```
//!
//! With several parent paths every combination is produced, and a selector
//! with several `&` takes the product over each of them.

use crate::ast::{Combinator, Element, ElementValue, Meta, Rule, Ruleset, Selector};

/// Fills in `paths` on every ruleset and `self_paths` on every extend.
pub fn join_selectors(root: &mut Ruleset) {
    root.paths.clear();
    join_rules(&mut root.rules, &[]);
}

fn join_rules(rules: &mut [Rule], parents: &[Selector]) {
    for rule in rules {
        match rule {
            Rule::Ruleset(ruleset) => join_ruleset(ruleset, parents),
            Rule::AtBlock(block) => join_rules(&mut block.rules, parents),
            Rule::Directive(directive) => {
                let parents = if directive.rooted { &[][..] } else { parents };
                if let Some(children) = directive.rules.as_mut() {
                    join_rules(children, parents);
                }
            }
            Rule::Extend(extend) => extend.self_paths = parents.to_vec(),
            _ => {}
        }
    }
}

fn join_ruleset(ruleset: &mut Ruleset, parents: &[Selector]) {
    let meta = ruleset.meta;
    ruleset.root = false;

    let mut paths = Vec::new();
    if ruleset.selectors.is_empty() {
        paths.extend(parents.iter().cloned());
    }
    for selector in &mut ruleset.selectors {
        let joined = combine_selectors(parents, selector, meta);
        for extend in &mut selector.extends {
            extend.self_paths = joined.clone();
            extend.meta.visibility = meta.visibility;
        }
        paths.extend(joined);
    }
    ruleset.paths = paths;

    let parents = ruleset.paths.clone();
    join_rules(&mut ruleset.rules, &parents);
}

/// Joins one selector onto every parent path.
pub fn combine_selectors(parents: &[Selector], selector: &Selector, meta: Meta) -> Vec<Selector> {
    if parents.is_empty() {
        let mut elements = Vec::new();
        for element in &selector.elements {
            if !element.is_parent() {
                push_element(&mut elements, element.clone());
            }
        }
        return vec![finish(elements, meta)];
    }

    if !selector.has_parent_ref() {
        return parents
            .iter()
            .map(|parent| {
                let mut elements = parent.elements.clone();
                for (i, element) in selector.elements.iter().enumerate() {
                    let mut element = element.clone();
                    if i == 0 && element.combinator == Combinator::None {
                        element.combinator = Combinator::Descendant;
                    }
                    elements.push(element);
                }
                finish(elements, meta)
            })
            .collect();
    }

    let mut partial: Vec<Vec<Element>> = vec![Vec::new()];
    for element in &selector.elements {
        if element.is_parent() {
            partial = partial
                .iter()
                .flat_map(|prefix| {
                    parents.iter().map(move |parent| {
                        let mut elements = prefix.clone();
                        let mut substituted = parent.elements.clone();
                        if let Some(first) = substituted.first_mut() {
                            if !elements.is_empty() {
                                first.combinator = element.combinator;
                            }
                        }
                        elements.extend(substituted);
                        elements
                    })
                })
                .collect();
        } else {
            for elements in &mut partial {
                push_element(elements, element.clone());
            }
        }
    }
    partial.into_iter().map(|elements| finish(elements, meta)).collect()
}

/// Appends `element`, gluing a suffix such as the `-title` of `&-title`
/// onto the element before it.
fn push_element(elements: &mut Vec<Element>, element: Element) {
    if element.combinator == Combinator::None {
        if let (Some(ElementValue::Text(previous)), ElementValue::Text(text)) =
            (elements.last_mut().map(|e| &mut e.value), &element.value)
        {
            if is_suffix(text) {
                previous.push_str(text);
                return;
            }
        }
    }
    elements.push(element);
}

fn is_suffix(text: &str) -> bool {
    text.starts_with(|c: char| c == '-' || c == '_' || c.is_ascii_alphanumeric())
}

fn finish(mut elements: Vec<Element>, meta: Meta) -> Selector {
    if let Some(first) = elements.first_mut() {
        if first.combinator == Combinator::Descendant {
            first.combinator = Combinator::None;
        }
    }
    Selector::new(elements, meta)
}
