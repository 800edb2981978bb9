//! Extend resolution.
//!
//! `.a:extend(.b)` adds the path `.a` to every ruleset whose path is `.b`;
//! `.a:extend(.b all)` replaces `.b` wherever it occurs inside a path, so
//! `.x .b:hover` also gains `.x .a:hover`.
//!
//! Extends are chained before they are applied: an extend whose own path is
//! the target of another extend gives rise to a derived extend, recorded
//! with the ids of every extend it came from. An extend never derives from
//! an id already in its chain, and derivation stops after
//! [`MAX_EXTEND_CHAIN`] rounds.
//!
//! An extend written inside `@media` only applies to rulesets in that same
//! block.

use crate::ast::{Element, Extend, Rule, Ruleset, Selector};
use crate::context::Context;

/// Rounds of extend chaining before giving up.
pub const MAX_EXTEND_CHAIN: usize = 100;

/// An extend together with the at-blocks it was written in.
#[derive(Clone, Debug)]
struct Scoped {
    extend: Extend,
    blocks: Vec<usize>,
}

impl Scoped {
    fn applies_in(&self, blocks: &[usize]) -> bool {
        blocks.starts_with(&self.blocks)
    }
}

/// Adds extended paths to every matching ruleset.
pub fn apply_extends(ctx: &mut Context<'_>, root: &mut Ruleset) {
    let mut found = Vec::new();
    collect_rules(&root.rules, &mut Vec::new(), &mut 0, &mut found);
    if found.is_empty() {
        return;
    }
    let extends = chain(ctx, found);
    log::trace!("{} extends after chaining", extends.len());
    apply_rules(&mut root.rules, &mut Vec::new(), &mut 0, &extends);
}

fn collect_rules(
    rules: &[Rule],
    blocks: &mut Vec<usize>,
    counter: &mut usize,
    out: &mut Vec<Scoped>,
) {
    for rule in rules {
        match rule {
            Rule::Ruleset(ruleset) => {
                for extend in ruleset.selectors.iter().flat_map(|s| &s.extends) {
                    out.push(Scoped {
                        extend: extend.clone(),
                        blocks: blocks.clone(),
                    });
                }
                collect_rules(&ruleset.rules, blocks, counter, out);
            }
            Rule::Extend(extend) => out.push(Scoped {
                extend: extend.clone(),
                blocks: blocks.clone(),
            }),
            Rule::AtBlock(block) => {
                *counter += 1;
                blocks.push(*counter);
                collect_rules(&block.rules, blocks, counter, out);
                blocks.pop();
            }
            Rule::Directive(directive) => {
                if let Some(children) = &directive.rules {
                    collect_rules(children, blocks, counter, out);
                }
            }
            _ => {}
        }
    }
}

/// Derives the extends implied by extends of extends.
fn chain(ctx: &mut Context<'_>, found: Vec<Scoped>) -> Vec<Scoped> {
    let mut all: Vec<Scoped> = found
        .into_iter()
        .map(|mut scoped| {
            scoped.extend.parent_ids = vec![scoped.extend.id];
            scoped
        })
        .collect();
    let originals = all.clone();
    let mut frontier = all.clone();

    for round in 0.. {
        if frontier.is_empty() {
            break;
        }
        if round >= MAX_EXTEND_CHAIN {
            log::warn!("extend chaining stopped after {} rounds", MAX_EXTEND_CHAIN);
            break;
        }
        let mut derived = Vec::new();
        for source in &frontier {
            for target in &originals {
                if source.extend.parent_ids.contains(&target.extend.id) {
                    continue;
                }
                let self_paths: Vec<Selector> = source
                    .extend
                    .self_paths
                    .iter()
                    .flat_map(|path| extended_paths(&target.extend, path))
                    .collect();
                if self_paths.is_empty() {
                    continue;
                }
                let mut parent_ids = source.extend.parent_ids.clone();
                parent_ids.push(target.extend.id);
                derived.push(Scoped {
                    extend: Extend {
                        target: source.extend.target.clone(),
                        all: source.extend.all,
                        id: ctx.next_id(),
                        parent_ids,
                        self_paths,
                        meta: target.extend.meta,
                    },
                    blocks: source.blocks.clone(),
                });
            }
        }
        all.extend(derived.iter().cloned());
        frontier = derived;
    }
    all
}

fn apply_rules(
    rules: &mut [Rule],
    blocks: &mut Vec<usize>,
    counter: &mut usize,
    extends: &[Scoped],
) {
    for rule in rules {
        match rule {
            Rule::Ruleset(ruleset) => {
                extend_ruleset(ruleset, blocks, extends);
                apply_rules(&mut ruleset.rules, blocks, counter, extends);
            }
            Rule::AtBlock(block) => {
                *counter += 1;
                blocks.push(*counter);
                apply_rules(&mut block.rules, blocks, counter, extends);
                blocks.pop();
            }
            Rule::Directive(directive) => {
                if let Some(children) = directive.rules.as_mut() {
                    apply_rules(children, blocks, counter, extends);
                }
            }
            _ => {}
        }
    }
}

fn extend_ruleset(ruleset: &mut Ruleset, blocks: &[usize], extends: &[Scoped]) {
    let mut added: Vec<Selector> = Vec::new();
    for path in &ruleset.paths {
        for scoped in extends.iter().filter(|s| s.applies_in(blocks)) {
            for mut new_path in extended_paths(&scoped.extend, path) {
                let css = new_path.to_css(false);
                let exists = ruleset
                    .paths
                    .iter()
                    .chain(&added)
                    .any(|p| p.to_css(false) == css);
                if !exists {
                    new_path.meta = path.meta;
                    new_path.meta.visibility = scoped.extend.meta.visibility;
                    added.push(new_path);
                }
            }
        }
    }
    ruleset.paths.extend(added);
}

/// Paths `path` gains from `extend`, one per self path of the extend.
fn extended_paths(extend: &Extend, path: &Selector) -> Vec<Selector> {
    let target = &extend.target.elements;
    if target.is_empty() {
        return Vec::new();
    }
    if !extend.all {
        let whole = path.elements.len() == target.len()
            && matches_at(&path.elements, 0, target)
            && path.elements[0].combinator.is_boundary_equivalent(target[0].combinator);
        if !whole {
            return Vec::new();
        }
        return extend
            .self_paths
            .iter()
            .map(|own| {
                let mut replaced = Selector::new(own.elements.clone(), path.meta);
                if let (Some(first), Some(original)) =
                    (replaced.elements.first_mut(), path.elements.first())
                {
                    first.combinator = original.combinator;
                }
                replaced
            })
            .collect();
    }

    let mut starts = Vec::new();
    let mut i = 0;
    while i + target.len() <= path.elements.len() {
        if matches_at(&path.elements, i, target) {
            starts.push(i);
            i += target.len();
        } else {
            i += 1;
        }
    }
    if starts.is_empty() {
        return Vec::new();
    }
    extend
        .self_paths
        .iter()
        .map(|own| {
            let mut elements = Vec::new();
            let mut last = 0;
            for &start in &starts {
                elements.extend_from_slice(&path.elements[last..start]);
                let mut replacement = own.elements.clone();
                if let Some(first) = replacement.first_mut() {
                    first.combinator = path.elements[start].combinator;
                }
                elements.extend(replacement);
                last = start + target.len();
            }
            elements.extend_from_slice(&path.elements[last..]);
            Selector::new(elements, path.meta)
        })
        .collect()
}

/// Whether `needle` occurs at `start` in `haystack`. The combinator in
/// front of the first element is not compared.
fn matches_at(haystack: &[Element], start: usize, needle: &[Element]) -> bool {
    needle.iter().enumerate().all(|(offset, wanted)| {
        haystack.get(start + offset).is_some_and(|actual| {
            actual.value == wanted.value && (offset == 0 || actual.combinator == wanted.combinator)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitors::join::join_selectors;
    use crate::visitors::tests::{path_lists, with_evaluated};

    fn extended(source: &str) -> Vec<String> {
        with_evaluated(source, |ctx, mut root| {
            join_selectors(&mut root);
            apply_extends(ctx, &mut root);
            path_lists(&root.rules)
        })
    }

    #[test]
    fn test_exact_extend() {
        assert_eq!(
            extended(".b { x: y } .a:extend(.b) {}"),
            vec![".b, .a", ".a"]
        );
    }

    #[test]
    fn test_exact_extend_needs_whole_path() {
        assert_eq!(
            extended(".x .b { x: y } .b:hover { x: y } .a:extend(.b) {}"),
            vec![".x .b", ".b:hover", ".a"]
        );
    }

    #[test]
    fn test_extend_all_replaces_inside_paths() {
        assert_eq!(
            extended(".x .b:hover { x: y } .a:extend(.b all) {}"),
            vec![".x .b:hover, .x .a:hover", ".a"]
        );
    }

    #[test]
    fn test_body_extend_uses_enclosing_paths() {
        assert_eq!(
            extended(".b { x: y } .p { .c { &:extend(.b); } }"),
            vec![".b, .p .c", ".p", ".p .c"]
        );
    }

    #[test]
    fn test_chained_extends() {
        assert_eq!(
            extended(".b { x: y } .a:extend(.b) {} .c:extend(.a) {}"),
            vec![".b, .a, .c", ".a, .c", ".c"]
        );
    }

    #[test]
    fn test_cyclic_extends_terminate() {
        assert_eq!(
            extended(".a:extend(.b) { x: y } .b:extend(.a) { z: w }"),
            vec![".a, .b", ".b, .a"]
        );
    }

    #[test]
    fn test_extend_in_media_stays_in_block() {
        assert_eq!(
            extended(".b { x: y } @media print { .b { x: z } .a:extend(.b) {} }"),
            vec![".b", ".b, .a", ".a"]
        );
    }

    #[test]
    fn test_derived_extends_record_their_chain() {
        with_evaluated(".a:extend(.b) {} .c:extend(.a) {}", |ctx, mut root| {
            join_selectors(&mut root);
            let mut found = Vec::new();
            collect_rules(&root.rules, &mut Vec::new(), &mut 0, &mut found);
            let first = found[0].extend.id;
            let second = found[1].extend.id;
            let chained = chain(ctx, found);
            assert_eq!(chained.len(), 3);
            assert_eq!(chained[2].extend.parent_ids, vec![first, second]);
            assert_eq!(chained[2].extend.self_paths[0].to_css(false), ".c");
            assert_eq!(chained[2].extend.target.to_css(false), ".b");
        });
    }
}
