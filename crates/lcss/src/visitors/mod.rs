//! Tree passes between evaluation and emission.
//!
//! Each pass takes the evaluated tree and rewrites it in place, in this
//! order:
//!
//! 1. [`join`] resolves every nested ruleset to full selector paths
//! 2. [`extend`] adds the paths produced by `:extend`
//! 3. [`visibility`] drops what reference imports hid
//! 4. [`bubble`] lifts nested rulesets and at-rules to their container
//!
//! Joining runs before extending because extends match against complete
//! paths.

pub mod bubble;
pub mod extend;
pub mod join;
pub mod visibility;

use crate::ast::Ruleset;
use crate::context::Context;

/// Runs every pass over an evaluated stylesheet.
pub fn run(ctx: &mut Context<'_>, mut root: Ruleset) -> Ruleset {
    log::debug!("joining selectors");
    join::join_selectors(&mut root);
    log::debug!("resolving extends");
    extend::apply_extends(ctx, &mut root);
    log::debug!("filtering hidden nodes");
    visibility::remove_hidden(&mut root);
    log::debug!("bubbling nested rules");
    bubble::flatten_stylesheet(root)
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::ast::{Rule, Ruleset};
    use crate::context::Context;
    use crate::eval::evaluate;
    use crate::functions::FunctionRegistry;
    use crate::import::MemoryImportResolver;
    use crate::options::CompileOptions;
    use crate::parser::{parse, ParseOptions};

    pub(crate) fn with_evaluated_files<R>(
        source: &str,
        options: &CompileOptions,
        resolver: MemoryImportResolver,
        f: impl FnOnce(&mut Context<'_>, Ruleset) -> R,
    ) -> R {
        let functions = FunctionRegistry::new();
        let mut ctx = Context::new(options, &resolver, &functions);
        let file = ctx.files.add(&options.filename, source, "");
        let parsed = parse(source, file, &ParseOptions::default()).expect("parses");
        let root = evaluate(&mut ctx, &parsed).expect("evaluates");
        f(&mut ctx, root)
    }

    pub(crate) fn with_evaluated<R>(
        source: &str,
        f: impl FnOnce(&mut Context<'_>, Ruleset) -> R,
    ) -> R {
        with_evaluated_files(source, &CompileOptions::default(), MemoryImportResolver::new(), f)
    }

    pub(crate) fn evaluated(source: &str) -> Ruleset {
        with_evaluated(source, |_, root| root)
    }

    /// The paths of every ruleset, depth first, one comma-joined entry per ruleset.
    pub(crate) fn path_lists(rules: &[Rule]) -> Vec<String> {
        let mut out = Vec::new();
        for rule in rules {
            if let Rule::Ruleset(ruleset) = rule {
                let paths: Vec<String> = ruleset.paths.iter().map(|p| p.to_css(false)).collect();
                out.push(paths.join(", "));
            }
            if let Some(children) = rule.children() {
                out.extend(path_lists(children));
            }
        }
        out
    }
}
