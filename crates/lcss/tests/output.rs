use insta::assert_snapshot;
use lcss::{compile, CompileOptions, MathMode};

fn css_with(source: &str, options: &CompileOptions) -> String {
    compile(source, options).expect("compiles").css
}

fn css(source: &str) -> String {
    css_with(source, &CompileOptions::default())
}

#[test]
fn test_nesting_and_parent_selectors() {
    assert_snapshot!(css(r#"
.nav {
  margin: 0;
  > li { display: inline; }
  &-item { padding: 2px; }
  a { &:hover { color: red; } }
}
"#), @r"
    .nav {
      margin: 0;
    }
    .nav > li {
      display: inline;
    }
    .nav-item {
      padding: 2px;
    }
    .nav a:hover {
      color: red;
    }
    ");
}

#[test]
fn test_lazy_variables_and_interpolation() {
    assert_eq!(
        css(".@{name}-box { @{prop}-color: @c; }\n@name: alert;\n@prop: border;\n@c: @d;\n@d: #fff;"),
        ".alert-box {\n  border-color: #fff;\n}\n"
    );
}

#[test]
fn test_division_follows_math_mode() {
    let source = ".a { font: 12px/1.5 serif; w: (10px / 2); }";
    assert_eq!(css(source), ".a {\n  font: 12px/1.5 serif;\n  w: 5px;\n}\n");
    let always = CompileOptions::default().with_math(MathMode::Always);
    assert_eq!(css_with(".a { w: 10px / 2; }", &always), ".a {\n  w: 5px;\n}\n");
}

#[test]
fn test_unknown_functions_pass_through() {
    assert_eq!(
        css(".a { transform: translate(10px, 20px); width: calc(100% - 15px); }"),
        ".a {\n  transform: translate(10px, 20px);\n  width: calc(100% - 15px);\n}\n"
    );
}

#[test]
fn test_compressed_output() {
    let options = CompileOptions::default().with_compress(true);
    assert_eq!(
        css_with("/* note */\n.a, .b > .c { margin: 0px 0.5em; color: red; }\n.d { e: f; }", &options),
        ".a,.b>.c{margin:0 .5em;color:red}.d{e:f}"
    );
}

#[test]
fn test_global_and_modify_vars() {
    let options = CompileOptions::default()
        .with_global_var("base", "4px")
        .with_modify_var("accent", "blue");
    assert_eq!(
        css_with("@accent: red;\n.a { padding: @base; color: @accent; }", &options),
        ".a {\n  padding: 4px;\n  color: blue;\n}\n"
    );
}

#[test]
fn test_if_condition_forms() {
    assert_eq!(
        css(".a {\n  b: if((1 > 0), yes, no);\n  c: if((1 > 0) and (2 > 1), yes, no);\n  d: if(not (1 > 2), yes, no);\n  e: if((1 > 2) or (2 > 1), yes, no);\n}"),
        ".a {\n  b: yes;\n  c: yes;\n  d: yes;\n  e: yes;\n}\n"
    );
    assert_eq!(
        css("@x: -1;\n.a { b: if(@x > 0, pos, neg); c: if(not (@x > 0), neg, pos); }"),
        ".a {\n  b: neg;\n  c: neg;\n}\n"
    );
}
