//! Reference-import filtering.
//!
//! Content from `@import (reference)` arrives with a raised visibility
//! counter. Paths keep the visibility of the ruleset they were joined for,
//! or of the extend that added them, so a hidden ruleset can still be
//! emitted under the paths a visible extend gave it.
//!
//! Inside a ruleset, leaves follow the ruleset: they are kept exactly when
//! one of its paths is visible. Elsewhere every leaf decides for itself.

use crate::ast::{Rule, Ruleset};
use std::mem;

/// Drops every node that nothing made visible.
pub fn remove_hidden(root: &mut Ruleset) {
    let rules = mem::take(&mut root.rules);
    root.rules = filter_rules(rules, None);
}

fn filter_rules(rules: Vec<Rule>, owner: Option<bool>) -> Vec<Rule> {
    rules
        .into_iter()
        .filter_map(|rule| filter_rule(rule, owner))
        .collect()
}

fn filter_rule(rule: Rule, owner: Option<bool>) -> Option<Rule> {
    match rule {
        Rule::Ruleset(mut ruleset) => {
            ruleset.paths.retain(|p| p.meta.visibility.is_visible());
            let visible = !ruleset.paths.is_empty();
            ruleset.rules = filter_rules(mem::take(&mut ruleset.rules), Some(visible));
            if !visible && ruleset.rules.is_empty() {
                log::trace!("dropping hidden ruleset at {}", ruleset.meta.index);
                return None;
            }
            Some(Rule::Ruleset(ruleset))
        }
        Rule::AtBlock(mut block) => {
            block.rules = filter_rules(mem::take(&mut block.rules), owner);
            (!block.rules.is_empty()).then_some(Rule::AtBlock(block))
        }
        Rule::Directive(mut directive) => match directive.rules.take() {
            Some(children) => {
                let owner = if directive.rooted { None } else { owner };
                let children = filter_rules(children, owner);
                if children.is_empty() {
                    return None;
                }
                directive.rules = Some(children);
                Some(Rule::Directive(directive))
            }
            None => directive
                .meta
                .visibility
                .is_visible()
                .then_some(Rule::Directive(directive)),
        },
        leaf => {
            let keep = owner.unwrap_or_else(|| leaf.meta().visibility.is_visible());
            keep.then_some(leaf)
        }
    }
}
