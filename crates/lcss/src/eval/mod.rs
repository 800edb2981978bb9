//! Evaluation: from the parse tree to a tree of plain CSS nodes.
//!
//! The [`Evaluator`] walks the parse tree once and builds a new tree in
//! which variables, operations, function calls, mixin calls, guards and Less
//! imports have been resolved. The parse tree is only read.
//!
//! Scoping works on [`FrameChain`]s. Each ruleset, mixin or at-rule body
//! gets a [`Frame`] holding its unevaluated rules; variables are looked up
//! lazily through the chain and evaluated at the point of use, so the last
//! declaration in a scope wins even when it comes after the use.
//!
//! A body is evaluated in two phases: mixin and detached-ruleset calls run
//! first and export the variables and mixins they produce into the frame,
//! then every other rule is evaluated in order with the call output spliced
//! in at the call's position.

mod expr;
pub mod frame;
mod mixin;

use crate::ast::{
    AtBlock, Declaration, Directive, Extend, FileId, Import, ImportOptions, Meta, MixinDefinition,
    Rule, Ruleset, Selector, Value,
};
use crate::context::Context;
use crate::error::{EvalError, EvalErrorKind, LessError, PluginError, Result};
use crate::import;
use crate::parser::{self, ParseOptions};
use frame::{Frame, FrameChain};
use indexmap::IndexMap;
use std::rc::Rc;

/// Nested mixin calls deeper than this abort the compilation.
pub const MAX_CALL_DEPTH: usize = 256;

/// Source position of a mixin or ruleset, used as its identity.
type Identity = (FileId, usize);

/// Evaluates a parsed stylesheet.
pub(crate) fn evaluate(ctx: &mut Context<'_>, root: &Ruleset) -> Result<Ruleset> {
    let mut evaluator = Evaluator::new(ctx);
    let result = evaluator.root(root);
    evaluator.release();
    result
}

pub(crate) struct Evaluator<'c, 'a> {
    ctx: &'c mut Context<'a>,
    /// Mixin invocations in progress, with their argument signature.
    calls: Vec<(Identity, String)>,
    /// Variable and property declarations whose value is being evaluated.
    evaluating: Vec<(Identity, String)>,
    /// Value of `default()` while mixin guards are checked.
    default: Option<bool>,
    /// Open parentheses around the value being evaluated.
    parens: u32,
    /// Inside `calc()`, where arithmetic is left to the browser.
    in_calc: bool,
    /// File of the declaration being evaluated, for url rewriting.
    current_file: FileId,
    /// Statement used to locate errors raised by values without a position.
    anchor: Meta,
    /// Frames that received exports.
    exporting: Vec<Rc<Frame>>,
}

impl<'c, 'a> Evaluator<'c, 'a> {
    fn new(ctx: &'c mut Context<'a>) -> Self {
        Self {
            ctx,
            calls: Vec::new(),
            evaluating: Vec::new(),
            default: None,
            parens: 0,
            in_calc: false,
            current_file: FileId(0),
            anchor: Meta::default(),
            exporting: Vec::new(),
        }
    }

    fn root(&mut self, root: &Ruleset) -> Result<Ruleset> {
        log::debug!("evaluating {} root rules", root.rules.len());
        let options = self.ctx.options;
        let globals = self.option_variables("globalVars", &options.global_vars)?;
        let chain = if globals.is_empty() {
            FrameChain::new()
        } else {
            FrameChain::new().push(Rc::new(Frame::new(globals)))
        };

        let mut rules = root.rules.clone();
        rules.extend(self.option_variables("modifyVars", &options.modify_vars)?);

        let rules = self.eval_body(&rules, &chain, None)?;
        Ok(Ruleset::root(rules, root.meta))
    }

    /// Parses `@name: value;` declarations supplied through the options.
    fn option_variables(
        &mut self,
        name: &str,
        vars: &IndexMap<String, String>,
    ) -> Result<Vec<Rule>> {
        if vars.is_empty() {
            return Ok(Vec::new());
        }
        let source: String = vars
            .iter()
            .map(|(var, value)| format!("{}: {};\n", var, value))
            .collect();
        let file = self.ctx.files.add(name, &source, "");
        let parsed = parser::parse(
            &source,
            file,
            &ParseOptions {
                filename: name.to_string(),
            },
        )?;
        Ok(parsed.rules)
    }

    /// Breaks the reference cycles between frames and the closures exported into them.
    fn release(&mut self) {
        for frame in self.exporting.drain(..) {
            frame.clear_exports();
        }
    }

    fn fail(&self, kind: EvalErrorKind, meta: &Meta) -> LessError {
        EvalError {
            kind,
            location: self.ctx.location(meta),
        }
        .into()
    }

    /// Evaluates one body in a new scope pushed onto `chain`.
    fn eval_body(
        &mut self,
        rules: &[Rule],
        chain: &FrameChain,
        origin: Option<Identity>,
    ) -> Result<Vec<Rule>> {
        let rules = self.splice_imports(rules, chain)?;
        let mut frame = Frame::new(rules);
        if let Some(origin) = origin {
            frame = frame.with_origin(origin);
        }
        let frame = Rc::new(frame);
        let scope = chain.push(frame.clone());

        let mut produced: Vec<Option<Vec<Rule>>> = vec![None; frame.rules.len()];
        for (i, rule) in frame.rules.iter().enumerate() {
            let output = match rule {
                Rule::MixinCall(call) => self.eval_mixin_call(call, &scope)?,
                Rule::DetachedCall(call) => self.eval_detached_call(call, &scope)?,
                _ => continue,
            };
            if !output.is_empty() {
                if frame.exported.borrow().is_empty() {
                    self.exporting.push(frame.clone());
                }
                frame.export(&output);
            }
            produced[i] = Some(output);
        }

        let mut out = Vec::with_capacity(frame.rules.len());
        for (i, rule) in frame.rules.iter().enumerate() {
            match produced[i].take() {
                Some(output) => out.extend(output),
                None => self.eval_rule(rule, &scope, &mut out)?,
            }
        }
        Ok(out)
    }

    fn eval_rule(&mut self, rule: &Rule, scope: &FrameChain, out: &mut Vec<Rule>) -> Result<()> {
        self.anchor = *rule.meta();
        match rule {
            Rule::Declaration(declaration) => {
                out.push(Rule::Declaration(self.eval_declaration(declaration, scope)?));
            }
            Rule::Ruleset(ruleset) => {
                if let Some(ruleset) = self.eval_ruleset(ruleset, scope)? {
                    out.push(Rule::Ruleset(ruleset));
                }
            }
            Rule::MixinDefinition(definition) => {
                let mut definition = MixinDefinition::clone(definition);
                definition.closure = Some(scope.clone());
                out.push(Rule::MixinDefinition(Rc::new(definition)));
            }
            Rule::AtBlock(block) => {
                let features = self.eval_value(&block.features, scope)?;
                let rules = self.eval_body(&block.rules, scope, None)?;
                out.push(Rule::AtBlock(AtBlock {
                    kind: block.kind,
                    features,
                    rules,
                    meta: block.meta,
                }));
            }
            Rule::Directive(directive) => {
                out.push(Rule::Directive(self.eval_directive(directive, scope)?))
            }
            Rule::Import(import) => {
                let path = self.eval_value(&import.path, scope)?;
                let features = match &import.features {
                    Some(features) => Some(self.eval_value(features, scope)?),
                    None => None,
                };
                out.push(Rule::Import(Import {
                    path,
                    features,
                    ..import.clone()
                }));
            }
            Rule::Extend(extend) => out.push(Rule::Extend(self.eval_extend(extend, scope)?)),
            Rule::Comment(_) => out.push(rule.clone()),
            // Calls ran in the first phase.
            Rule::MixinCall(_) | Rule::DetachedCall(_) => {}
        }
        Ok(())
    }

    fn eval_declaration(
        &mut self,
        declaration: &Declaration,
        scope: &FrameChain,
    ) -> Result<Declaration> {
        self.current_file = declaration.meta.file;
        let name = if declaration.has_interpolated_name() {
            self.interpolate(&declaration.name, scope)?
        } else {
            declaration.name.clone()
        };
        let key = if declaration.variable {
            name.clone()
        } else {
            format!("${}", name)
        };
        self.evaluating
            .push(((declaration.meta.file, declaration.meta.index), key));
        let value = self.eval_value(&declaration.value, scope);
        self.evaluating.pop();
        Ok(Declaration {
            name,
            value: value?,
            ..declaration.clone()
        })
    }

    fn eval_ruleset(&mut self, ruleset: &Ruleset, scope: &FrameChain) -> Result<Option<Ruleset>> {
        if let Some(guard) = &ruleset.guard {
            if !self.eval_condition(guard, scope)? {
                log::trace!("ruleset guard failed at offset {}", ruleset.meta.index);
                return Ok(None);
            }
        }

        let mut selectors = Vec::with_capacity(ruleset.selectors.len());
        for selector in &ruleset.selectors {
            selectors.extend(self.eval_selector(selector, scope)?);
        }
        for selector in &mut selectors {
            for extend in &mut selector.extends {
                *extend = self.eval_extend(extend, scope)?;
            }
        }

        let identity = (ruleset.meta.file, ruleset.meta.index);
        let rules = self.eval_body(&ruleset.rules, scope, Some(identity))?;
        Ok(Some(Ruleset {
            selectors,
            paths: Vec::new(),
            rules,
            guard: None,
            root: false,
            meta: ruleset.meta,
        }))
    }

    /// Replaces `@{name}` in a selector and parses the result again; one
    /// interpolated selector may expand to a list.
    fn eval_selector(&mut self, selector: &Selector, scope: &FrameChain) -> Result<Vec<Selector>> {
        if !selector.is_interpolated() {
            return Ok(vec![selector.clone()]);
        }
        let text = self.interpolate(&selector.to_css(false), scope)?;
        let mut parsed = parser::parse_selectors(&text, selector.meta)?;
        if let Some(last) = parsed.last_mut() {
            last.extends.extend(selector.extends.iter().cloned());
        }
        Ok(parsed)
    }

    fn eval_extend(&mut self, extend: &Extend, scope: &FrameChain) -> Result<Extend> {
        let target = match self.eval_selector(&extend.target, scope)?.into_iter().next() {
            Some(target) => target,
            None => extend.target.clone(),
        };
        Ok(Extend {
            target,
            id: self.ctx.next_id(),
            ..extend.clone()
        })
    }

    fn eval_directive(&mut self, directive: &Directive, scope: &FrameChain) -> Result<Directive> {
        if directive.name.eq_ignore_ascii_case("@plugin") {
            return Err(PluginError {
                name: "@plugin".to_string(),
                message: "script plugins are not supported; \
                          register native functions on the compiler"
                    .to_string(),
                location: Some(self.ctx.location(&directive.meta)),
            }
            .into());
        }
        let prelude = match &directive.prelude {
            Some(prelude) => Some(self.eval_value(prelude, scope)?),
            None => None,
        };
        let rules = match &directive.rules {
            Some(rules) => Some(self.eval_body(rules, scope, None)?),
            None => None,
        };
        Ok(Directive {
            name: directive.name.clone(),
            prelude,
            rules,
            rooted: directive.rooted,
            meta: directive.meta,
        })
    }

    /// Replaces Less `@import`s with the rules of the imported files.
    /// CSS imports stay in place.
    fn splice_imports(&mut self, rules: &[Rule], chain: &FrameChain) -> Result<Vec<Rule>> {
        if !rules.iter().any(|r| matches!(r, Rule::Import(_))) {
            return Ok(rules.to_vec());
        }
        // Import paths may use variables of the importing scope.
        let scope = chain.push(Rc::new(Frame::new(rules.to_vec())));
        let mut out = Vec::with_capacity(rules.len());
        for rule in rules {
            match rule {
                Rule::Import(import) => self.splice_import(import, &scope, &mut out)?,
                other => out.push(other.clone()),
            }
        }
        Ok(out)
    }

    fn splice_import(
        &mut self,
        import: &Import,
        scope: &FrameChain,
        out: &mut Vec<Rule>,
    ) -> Result<()> {
        self.anchor = import.meta;
        let import = Import {
            path: self.eval_value(&import.path, scope)?,
            ..import.clone()
        };
        let inline = import.options.contains(ImportOptions::INLINE);
        if import.is_css() && !inline {
            out.push(Rule::Import(import));
            return Ok(());
        }

        let target = match &import.path {
            Value::Url(inner) => inner.to_interp_string(),
            other => other.to_interp_string(),
        };
        let current = self.ctx.files.name(import.meta.file).to_string();
        let resolved = match self.ctx.resolver.resolve(&target, &current, &self.ctx.options.paths) {
            Ok(resolved) => resolved,
            Err(_) if import.options.contains(ImportOptions::OPTIONAL) => {
                log::debug!("optional import '{}' not found, skipping", target);
                return Ok(());
            }
            Err(err) => return Err(err.at(self.ctx.location(&import.meta)).into()),
        };

        let first_time = self.ctx.imported.insert(resolved.filename.clone());
        if !first_time && !import.options.contains(ImportOptions::MULTIPLE) {
            log::debug!("'{}' already imported, skipping", resolved.filename);
            return Ok(());
        }

        let relative_dir = self.relative_dir(&resolved.filename);
        let file = self
            .ctx
            .files
            .add(&resolved.filename, &resolved.contents, &relative_dir);
        if inline {
            out.push(Rule::Import(Import {
                resolved: Some(file),
                content: Some(resolved.contents),
                ..import
            }));
            return Ok(());
        }

        log::debug!("importing {}", resolved.filename);
        let parsed = parser::parse(
            &resolved.contents,
            file,
            &ParseOptions {
                filename: resolved.filename.clone(),
            },
        )?;
        let mut rules = self.splice_imports(&parsed.rules, scope)?;
        if import.options.contains(ImportOptions::REFERENCE) {
            rules.iter_mut().for_each(Rule::block_visibility);
        }
        out.extend(rules);
        Ok(())
    }

    /// Directory of `filename` relative to the entry file's directory.
    fn relative_dir(&self, filename: &str) -> String {
        let entry = import::dirname(self.ctx.files.name(FileId(0)));
        let dir = import::dirname(filename);
        dir.strip_prefix(entry).unwrap_or(dir).to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;
    use crate::import::MemoryImportResolver;
    use crate::options::CompileOptions;

    pub(super) fn eval_with(
        source: &str,
        options: &CompileOptions,
        resolver: &MemoryImportResolver,
    ) -> Result<Ruleset> {
        let functions = FunctionRegistry::new();
        let mut ctx = Context::new(options, resolver, &functions);
        let file = ctx.files.add(&options.filename, source, "");
        let root = parser::parse(source, file, &ParseOptions::default())?;
        evaluate(&mut ctx, &root)
    }

    pub(super) fn eval(source: &str) -> Result<Ruleset> {
        eval_with(source, &CompileOptions::default(), &MemoryImportResolver::new())
    }

    /// `name: value` of every declaration that is not a variable, depth first.
    pub(crate) fn declarations(rules: &[Rule]) -> Vec<String> {
        let mut out = Vec::new();
        for rule in rules {
            match rule {
                Rule::Declaration(d) if !d.variable => {
                    let important = if d.important { " !important" } else { "" };
                    out.push(format!("{}: {}{}", d.name, d.value, important));
                }
                other => {
                    if let Some(children) = other.children() {
                        out.extend(declarations(children));
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_lazy_variables_last_wins() {
        let root = eval(".a { width: @w; @w: 1px; @w: 2px; }").unwrap();
        assert_eq!(declarations(&root.rules), vec!["width: 2px"]);
    }

    #[test]
    fn test_inner_scope_shadows() {
        let root = eval("@c: red; .a { @c: blue; color: @c; } .b { color: @c; }").unwrap();
        assert_eq!(declarations(&root.rules), vec!["color: blue", "color: red"]);
    }

    #[test]
    fn test_undefined_variable_is_located() {
        let err = eval(".a {\n  color: @nope;\n}").unwrap_err();
        assert_eq!(
            err.eval_kind(),
            Some(&EvalErrorKind::UndefinedVariable("@nope".to_string()))
        );
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_recursive_variable() {
        let err = eval("@a: @b; @b: @a; .x { y: @a; }").unwrap_err();
        assert!(matches!(err.eval_kind(), Some(EvalErrorKind::RecursiveVariable(_))));
    }

    #[test]
    fn test_css_guard_drops_ruleset() {
        let root =
            eval("@mode: dark; .a when (@mode = dark) { x: 1; } .b when (@mode = light) { x: 2; }")
                .unwrap();
        assert_eq!(root.rules.iter().filter(|r| matches!(r, Rule::Ruleset(_))).count(), 1);
    }

    #[test]
    fn test_selector_interpolation() {
        let root = eval("@name: banner; .@{name}, .x { a: b; }").unwrap();
        let found = root.rules.iter().find(|r| matches!(r, Rule::Ruleset(_)));
        let Some(Rule::Ruleset(rs)) = found else {
            unreachable!()
        };
        let texts: Vec<String> = rs.selectors.iter().map(|s| s.to_css(false)).collect();
        assert_eq!(texts, vec![".banner", ".x"]);
    }

    #[test]
    fn test_imports_are_spliced_once() {
        let resolver = MemoryImportResolver::new().with_file("lib.less", "@c: red; .lib { a: b; }");
        let root = eval_with(
            "@import \"lib\";\n@import \"lib.less\";\n.a { color: @c; }",
            &CompileOptions::default(),
            &resolver,
        )
        .unwrap();
        assert_eq!(declarations(&root.rules), vec!["a: b", "color: red"]);
    }

    #[test]
    fn test_reference_import_is_hidden() {
        let resolver = MemoryImportResolver::new().with_file("lib.less", ".lib { a: b; }");
        let options = CompileOptions::default();
        let root = eval_with("@import (reference) \"lib\";", &options, &resolver).unwrap();
        assert!(!root.rules[0].meta().visibility.is_visible());
    }

    #[test]
    fn test_missing_import() {
        let options = CompileOptions::default();
        let resolver = MemoryImportResolver::new();
        let err = eval_with("@import \"nope\";", &options, &resolver).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Import);
        assert_eq!(err.line(), Some(1));
        assert!(eval_with("@import (optional) \"nope\";", &options, &resolver).is_ok());
    }

    #[test]
    fn test_css_import_stays() {
        let root = eval("@import url(\"a.css\") screen;").unwrap();
        assert!(matches!(&root.rules[0], Rule::Import(i) if i.features.is_some()));
    }

    #[test]
    fn test_global_and_modify_vars() {
        let options = CompileOptions::default()
            .with_global_var("base", "1px")
            .with_modify_var("size", "3px");
        let root = eval_with(
            "@size: 2px; .a { w: @size; b: @base; }",
            &options,
            &MemoryImportResolver::new(),
        )
        .unwrap();
        assert_eq!(declarations(&root.rules), vec!["w: 3px", "b: 1px"]);
    }

    #[test]
    fn test_plugin_is_rejected() {
        let err = eval("@plugin \"my-plugin\";").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Plugin);
    }
}
