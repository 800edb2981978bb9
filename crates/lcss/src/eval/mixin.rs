//! Mixin calls.
//!
//! A call `#ns > .m(args)` is resolved scope by scope, innermost first. In
//! the first scope that holds any candidate with that path, every candidate
//! whose parameters accept the arguments and whose guards pass contributes
//! its body, in source order. If no candidate in that scope accepts the
//! arguments the search continues outward.
//!
//! `default()` in a guard is true only when no guard without `default()`
//! matched. Each guarded candidate is checked twice, once with `default()`
//! false and once with it true, and sorted into a [`DefaultGroup`].
//!
//! Recursion is bounded: re-entering a mixin with the same arguments
//! silently produces nothing, and the call stack is capped at
//! [`MAX_CALL_DEPTH`](super::MAX_CALL_DEPTH).

use super::{Evaluator, Identity, MAX_CALL_DEPTH};
use crate::ast::{
    Arg, Condition, Declaration, DetachedCall, MixinCall, MixinDefinition, Rule, Ruleset, Value,
};
use crate::error::{EvalErrorKind, Result};
use crate::eval::frame::{Frame, FrameChain, MixinSource};
use std::rc::Rc;

enum Body {
    Definition(Rc<MixinDefinition>),
    Ruleset(Ruleset),
}

struct Candidate {
    body: Body,
    /// Scope the body is evaluated in.
    closure: FrameChain,
    /// Guards of the namespaces on the path, with the scope each is checked in.
    namespace_guards: Vec<(Condition, FrameChain)>,
}

impl Candidate {
    fn identity(&self) -> Identity {
        match &self.body {
            Body::Definition(definition) => definition.identity(),
            Body::Ruleset(ruleset) => (ruleset.meta.file, ruleset.meta.index),
        }
    }

    fn guard(&self) -> Option<&Condition> {
        match &self.body {
            Body::Definition(definition) => definition.guard.as_ref(),
            Body::Ruleset(ruleset) => ruleset.guard.as_ref(),
        }
    }

    fn rules(&self) -> &[Rule] {
        match &self.body {
            Body::Definition(definition) => &definition.rules,
            Body::Ruleset(ruleset) => &ruleset.rules,
        }
    }
}

/// How a candidate's guards depend on `default()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DefaultGroup {
    /// Passes either way.
    Always,
    /// Passes only when `default()` is true.
    WhenDefault,
    /// Passes only when `default()` is false.
    WhenNotDefault,
    Never,
}

struct Matched {
    candidate: Candidate,
    arguments: Rc<Frame>,
    group: DefaultGroup,
}

impl Evaluator<'_, '_> {
    pub(super) fn eval_mixin_call(
        &mut self,
        call: &MixinCall,
        scope: &FrameChain,
    ) -> Result<Vec<Rule>> {
        self.anchor = call.meta;
        let args = self.eval_args(&call.args, scope)?;
        let mut defined = false;

        for (frame, at) in scope.scopes() {
            let mut candidates = Vec::new();
            collect_candidates(frame, at, &call.path, &mut candidates);
            // A ruleset never mixes itself in while its own body is evaluated.
            candidates.retain(|c| {
                !matches!(c.body, Body::Ruleset(_))
                    || !scope.iter().any(|f| f.origin == Some(c.identity()))
            });
            if candidates.is_empty() {
                continue;
            }
            defined = true;

            let mut matched = Vec::new();
            for candidate in candidates {
                if !self.accepts(&candidate, &args)? {
                    continue;
                }
                let arguments = self.bind(&candidate, &args, call, scope)?;
                let group = self.default_group(&candidate, &arguments, scope)?;
                matched.push(Matched {
                    candidate,
                    arguments,
                    group,
                });
            }
            if matched.is_empty() {
                continue;
            }
            log::trace!("{} matched {} candidate(s)", call.display_name(), matched.len());
            return self.run_matched(call, &args, matched, scope);
        }

        let kind = if defined {
            EvalErrorKind::ArityMismatch(signature_text(call, &args))
        } else {
            EvalErrorKind::UndefinedMixin(call.display_name())
        };
        Err(self.fail(kind, &call.meta))
    }

    /// Evaluates call arguments, splicing `list...` into positional arguments.
    fn eval_args(&mut self, args: &[Arg], scope: &FrameChain) -> Result<Vec<Arg>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.eval_value(&arg.value, scope)?;
            if arg.expand {
                out.extend(value.list_items().into_iter().map(|value| Arg {
                    name: None,
                    value,
                    expand: false,
                }));
            } else {
                out.push(Arg {
                    name: arg.name.clone(),
                    value,
                    expand: false,
                });
            }
        }
        Ok(out)
    }

    /// Arity and pattern check.
    fn accepts(&mut self, candidate: &Candidate, args: &[Arg]) -> Result<bool> {
        let definition = match &candidate.body {
            Body::Ruleset(_) => return Ok(args.is_empty()),
            Body::Definition(definition) => definition,
        };
        let optional: Vec<&str> = definition
            .params
            .iter()
            .filter(|p| p.value.is_some())
            .filter_map(|p| p.name.as_deref())
            .collect();
        let required_args = args
            .iter()
            .filter(|a| a.name.as_deref().is_none_or(|n| !optional.contains(&n)))
            .count();
        if required_args < definition.required() {
            return Ok(false);
        }
        if !definition.is_variadic() && args.len() > definition.params.len() {
            return Ok(false);
        }

        let checked = required_args.min(definition.params.len());
        for (i, param) in definition.params.iter().take(checked).enumerate() {
            let (None, Some(pattern), false) = (&param.name, &param.value, param.variadic) else {
                continue;
            };
            let Some(arg) = args.get(i) else {
                return Ok(false);
            };
            let pattern = self.eval_value(pattern, &candidate.closure)?;
            if pattern.to_string() != arg.value.to_string() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Builds the frame holding the bound parameters and `@arguments`.
    fn bind(
        &mut self,
        candidate: &Candidate,
        args: &[Arg],
        call: &MixinCall,
        scope: &FrameChain,
    ) -> Result<Rc<Frame>> {
        let definition = match &candidate.body {
            Body::Ruleset(_) => return Ok(Rc::new(Frame::default())),
            Body::Definition(definition) => definition,
        };
        let params = &definition.params;
        let mut named: Vec<Option<Value>> = vec![None; params.len()];
        for arg in args {
            let Some(name) = &arg.name else { continue };
            let Some(i) = params.iter().position(|p| p.name.as_ref() == Some(name)) else {
                return Err(self.fail(
                    EvalErrorKind::UnknownNamedArgument {
                        mixin: call.display_name(),
                        name: name.clone(),
                    },
                    &call.meta,
                ));
            };
            named[i] = Some(arg.value.clone());
        }

        let mut positional = args.iter().filter(|a| a.name.is_none()).map(|a| a.value.clone());
        let mut bound = Vec::with_capacity(params.len() + 1);
        let mut all = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            if param.variadic {
                let rest: Vec<Value> = positional.by_ref().collect();
                if let Some(name) = &param.name {
                    bound.push(parameter(name, Value::Expression(rest.clone()), call));
                }
                all.extend(rest);
                break;
            }
            let value = match named[i].take().or_else(|| positional.next()) {
                Some(value) => value,
                None => match (&param.name, &param.value) {
                    // Defaults see the parameters bound before them.
                    (Some(_), Some(default)) => {
                        let earlier = Rc::new(Frame::new(bound.clone()));
                        self.eval_value(default, &candidate.closure.then(scope).push(earlier))?
                    }
                    _ => {
                        let kind = EvalErrorKind::ArityMismatch(signature_text(call, args));
                        return Err(self.fail(kind, &call.meta));
                    }
                },
            };
            if let Some(name) = &param.name {
                bound.push(parameter(name, value.clone(), call));
            }
            all.push(value);
        }
        if !params.iter().any(|p| p.name.as_deref() == Some("@arguments")) {
            bound.push(parameter("@arguments", Value::Expression(all), call));
        }
        Ok(Rc::new(Frame::new(bound)))
    }

    fn default_group(
        &mut self,
        candidate: &Candidate,
        arguments: &Rc<Frame>,
        scope: &FrameChain,
    ) -> Result<DefaultGroup> {
        if candidate.guard().is_none() && candidate.namespace_guards.is_empty() {
            return Ok(DefaultGroup::Always);
        }
        let chain = candidate.closure.then(scope).push(arguments.clone());
        let when_false = self.guards_pass(candidate, &chain, false)?;
        let when_true = self.guards_pass(candidate, &chain, true)?;
        Ok(match (when_false, when_true) {
            (true, true) => DefaultGroup::Always,
            (false, true) => DefaultGroup::WhenDefault,
            (true, false) => DefaultGroup::WhenNotDefault,
            (false, false) => DefaultGroup::Never,
        })
    }

    fn guards_pass(
        &mut self,
        candidate: &Candidate,
        chain: &FrameChain,
        default: bool,
    ) -> Result<bool> {
        let saved = self.default.replace(default);
        let result = self.check_guards(candidate, chain);
        self.default = saved;
        result
    }

    fn check_guards(&mut self, candidate: &Candidate, chain: &FrameChain) -> Result<bool> {
        for (guard, scope) in &candidate.namespace_guards {
            if !self.eval_condition(guard, scope)? {
                return Ok(false);
            }
        }
        match candidate.guard() {
            Some(guard) => self.eval_condition(guard, chain),
            None => Ok(true),
        }
    }

    fn run_matched(
        &mut self,
        call: &MixinCall,
        args: &[Arg],
        matched: Vec<Matched>,
        scope: &FrameChain,
    ) -> Result<Vec<Rule>> {
        let count = |group| matched.iter().filter(|m| m.group == group).count();
        let chosen = if count(DefaultGroup::Always) > 0 {
            DefaultGroup::WhenNotDefault
        } else if count(DefaultGroup::WhenDefault) + count(DefaultGroup::WhenNotDefault) > 1 {
            let kind = EvalErrorKind::AmbiguousDefault(signature_text(call, args));
            return Err(self.fail(kind, &call.meta));
        } else {
            DefaultGroup::WhenDefault
        };

        let mut rules = Vec::new();
        let mut ran = false;
        for m in matched {
            if m.group != DefaultGroup::Always && m.group != chosen {
                continue;
            }
            ran = true;
            rules.extend(self.invoke(&m.candidate, m.arguments, args, call, scope)?);
        }
        // Guards that end a recursion are expected to fail inside a mixin.
        if !ran && self.calls.is_empty() {
            let kind = EvalErrorKind::GuardsExhausted(signature_text(call, args));
            return Err(self.fail(kind, &call.meta));
        }

        for rule in &mut rules {
            if call.important {
                rule.make_important();
            }
            rule.set_visibility(call.meta.visibility);
        }
        Ok(rules)
    }

    fn invoke(
        &mut self,
        candidate: &Candidate,
        arguments: Rc<Frame>,
        args: &[Arg],
        call: &MixinCall,
        scope: &FrameChain,
    ) -> Result<Vec<Rule>> {
        let identity = candidate.identity();
        let signature = args
            .iter()
            .map(|a| format!("{}={}", a.name.as_deref().unwrap_or_default(), a.value))
            .collect::<Vec<_>>()
            .join(";");
        if self.calls.iter().any(|(id, sig)| *id == identity && *sig == signature) {
            log::debug!("{} re-entered with the same arguments, skipping", call.display_name());
            return Ok(Vec::new());
        }
        if self.calls.len() >= MAX_CALL_DEPTH {
            return Err(self.fail(EvalErrorKind::CallDepth(MAX_CALL_DEPTH), &call.meta));
        }

        self.calls.push((identity, signature));
        // Arguments, then the definition's scopes, then the caller's.
        let chain = candidate.closure.then(scope).push(arguments);
        let result = self.eval_body(candidate.rules(), &chain, Some(identity));
        self.calls.pop();
        result
    }

    pub(super) fn eval_detached_call(
        &mut self,
        call: &DetachedCall,
        scope: &FrameChain,
    ) -> Result<Vec<Rule>> {
        self.anchor = call.meta;
        let value = self.lookup_variable(&call.variable, &call.meta, scope)?;
        let Value::DetachedRuleset(detached) = value else {
            return Err(self.fail(EvalErrorKind::NotCallable(call.variable.clone()), &call.meta));
        };
        let identity = (call.meta.file, call.meta.index);
        if self.calls.iter().any(|(id, _)| *id == identity) {
            log::debug!("{}() re-entered, skipping", call.variable);
            return Ok(Vec::new());
        }
        if self.calls.len() >= MAX_CALL_DEPTH {
            return Err(self.fail(EvalErrorKind::CallDepth(MAX_CALL_DEPTH), &call.meta));
        }

        let outer = match &detached.closure {
            Some(closure) => closure.then(scope),
            None => scope.clone(),
        };
        let chain = outer.push(Rc::new(Frame::default()));
        self.calls.push((identity, String::new()));
        let result = self.eval_body(&detached.rules, &chain, None);
        self.calls.pop();
        let mut rules = result?;
        for rule in &mut rules {
            rule.set_visibility(call.meta.visibility);
        }
        Ok(rules)
    }
}

fn parameter(name: &str, value: Value, call: &MixinCall) -> Rule {
    Rule::Declaration(Declaration::variable(name, value, call.meta))
}

/// `.m(1px, red)` as shown in error messages.
fn signature_text(call: &MixinCall, args: &[Arg]) -> String {
    let args: Vec<String> = args
        .iter()
        .map(|a| match &a.name {
            Some(name) => format!("{}: {}", name, a.value),
            None => a.value.to_string(),
        })
        .collect();
    format!("{}({})", call.display_name(), args.join(", "))
}

/// Candidates for `path` among the mixins of one scope. `at` is the chain
/// starting at `frame`.
fn collect_candidates(frame: &Frame, at: &FrameChain, path: &[String], out: &mut Vec<Candidate>) {
    frame.for_each_mixin(|source| match source {
        MixinSource::Definition { definition, evaluated } => {
            if let [name] = path {
                if definition.name == *name {
                    let closure = match (&definition.closure, evaluated) {
                        (Some(closure), true) => closure.clone(),
                        _ => at.clone(),
                    };
                    out.push(Candidate {
                        body: Body::Definition(definition.clone()),
                        closure,
                        namespace_guards: Vec::new(),
                    });
                }
            }
        }
        MixinSource::Ruleset(ruleset) => match_ruleset(ruleset, at, path, &[], out),
    });
}

/// Matches `path` against a mixin-addressable ruleset. A ruleset matching a
/// prefix of the path is a namespace searched for the rest.
fn match_ruleset(
    ruleset: &Ruleset,
    at: &FrameChain,
    path: &[String],
    guards: &[(Condition, FrameChain)],
    out: &mut Vec<Candidate>,
) {
    let Some(names) = ruleset
        .selectors
        .iter()
        .filter(|s| s.is_mixin_name())
        .map(|s| s.mixin_path())
        .find(|names| {
            names.len() <= path.len() && names.iter().zip(path).all(|(a, b)| *a == b.as_str())
        })
    else {
        return;
    };

    if names.len() == path.len() {
        out.push(Candidate {
            body: Body::Ruleset(ruleset.clone()),
            closure: at.clone(),
            namespace_guards: guards.to_vec(),
        });
        return;
    }

    let mut guards = guards.to_vec();
    if let Some(guard) = &ruleset.guard {
        guards.push((guard.clone(), at.clone()));
    }
    let identity = (ruleset.meta.file, ruleset.meta.index);
    let inner = at.push(Rc::new(Frame::new(ruleset.rules.clone()).with_origin(identity)));
    let rest = &path[names.len()..];
    for rule in &ruleset.rules {
        match rule {
            Rule::MixinDefinition(definition) if rest.len() == 1 && definition.name == rest[0] => {
                out.push(Candidate {
                    body: Body::Definition(definition.clone()),
                    closure: match &definition.closure {
                        Some(closure) => closure.clone(),
                        None => inner.clone(),
                    },
                    namespace_guards: guards.clone(),
                });
            }
            Rule::Ruleset(nested) if nested.is_mixin_candidate() => {
                match_ruleset(nested, &inner, rest, &guards, out)
            }
            _ => {}
        }
    }
}
