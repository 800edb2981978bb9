use insta::assert_snapshot;
use lcss::{compile, CompileOptions, EvalErrorKind, LessError};

fn css(source: &str) -> String {
    compile(source, &CompileOptions::default())
        .expect("compiles")
        .css
}

fn eval_error(source: &str) -> EvalErrorKind {
    match compile(source, &CompileOptions::default()) {
        Err(LessError::Eval(e)) => e.kind,
        other => panic!("expected an evaluation error, got {:?}", other),
    }
}

#[test]
fn test_guard_terminated_recursion() {
    assert_snapshot!(css(r#"
.loop(@i) when (@i > 0) {
  .w-@{i} { width: (@i * 10px); }
  .loop(@i - 1);
}
.loop(3);
"#), @r"
    .w-3 {
      width: 30px;
    }
    .w-2 {
      width: 20px;
    }
    .w-1 {
      width: 10px;
    }
    ");
}

#[test]
fn test_namespaces_and_important() {
    assert_eq!(
        css("#ns { .m() { c: d; } }\n.a { #ns > .m() !important; }\n.b { #ns.m(); }"),
        ".a {\n  c: d !important;\n}\n.b {\n  c: d;\n}\n"
    );
}

#[test]
fn test_mixin_with_nested_selectors() {
    assert_eq!(
        css(".hover(@c) { &:hover { color: @c; } }\n.btn { .hover(red); }"),
        ".btn:hover {\n  color: red;\n}\n"
    );
}

#[test]
fn test_default_guard() {
    assert_eq!(
        css(".m(@x) when (@x = a) { v: a; }\n.m(@x) when (default()) { v: other; }\n.p { .m(a); }\n.q { .m(b); }"),
        ".p {\n  v: a;\n}\n.q {\n  v: other;\n}\n"
    );
}

#[test]
fn test_detached_ruleset_call() {
    assert_eq!(
        css("@dr: { color: blue; };\n.a { @dr(); }"),
        ".a {\n  color: blue;\n}\n"
    );
}

#[test]
fn test_mixin_errors() {
    assert_eq!(
        eval_error(".a { .missing(); }"),
        EvalErrorKind::UndefinedMixin(".missing".to_string())
    );
    assert!(matches!(
        eval_error(".m(@a) { x: @a; }\n.a { .m(1, 2); }"),
        EvalErrorKind::ArityMismatch(_)
    ));
    assert!(matches!(
        eval_error(".m(@a) when (@a > 5) { x: @a; }\n.a { .m(1); }"),
        EvalErrorKind::GuardsExhausted(_)
    ));
}

#[test]
fn test_css_guard_on_ruleset() {
    assert_eq!(
        css("@mode: dark;\n.a when (@mode = dark) { b: c; }\n.d when (@mode = light) { e: f; }"),
        ".a {\n  b: c;\n}\n"
    );
}

#[test]
fn test_bodies_fall_back_to_the_call_site() {
    assert_eq!(
        css(".m() { x: @v; }\n.s { @v: caller; .m(); }"),
        ".s {\n  x: caller;\n}\n"
    );
    assert_eq!(
        css("@dr: { .x { a: @v; } };\n.s { @v: 1; @dr(); }"),
        ".s .x {\n  a: 1;\n}\n"
    );
    assert_eq!(
        css("@c: outer;\n.m() { v: @c; }\n.s { @c: caller; .m(); }"),
        ".s {\n  v: outer;\n}\n"
    );
}
