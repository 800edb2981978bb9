use lcss::{CompileOptions, Compiler, ErrorKind, MemoryImportResolver, RewriteUrls};

fn compiler(options: CompileOptions, resolver: MemoryImportResolver) -> Compiler {
    Compiler::new(options).with_resolver(Box::new(resolver))
}

fn library() -> MemoryImportResolver {
    MemoryImportResolver::new()
        .with_file("vars.less", "@c: red;\n.shared { s: 1; }")
        .with_file("theme/icons.less", ".icon { background: url(\"img/i.png\"); }")
        .with_file("plain.css", ".raw { r: 1; }")
        .with_file("lib/base.less", ".btn { color: blue; }\n.mixin() { m: 1; }")
}

#[test]
fn test_import_once_by_default() {
    let output = compiler(CompileOptions::default(), library())
        .compile("@import \"vars\";\n@import \"vars.less\";\n.a { color: @c; }")
        .unwrap();
    assert_eq!(output.css, ".shared {\n  s: 1;\n}\n.a {\n  color: red;\n}\n");
    assert_eq!(output.imports, vec!["vars.less".to_string()]);
}

#[test]
fn test_import_multiple() {
    let output = compiler(CompileOptions::default(), library())
        .compile("@import \"vars\";\n@import (multiple) \"vars\";")
        .unwrap();
    assert_eq!(output.css, ".shared {\n  s: 1;\n}\n.shared {\n  s: 1;\n}\n");
}

#[test]
fn test_css_imports_are_hoisted() {
    let output = compiler(CompileOptions::default(), library())
        .compile(".a { b: c; }\n@import url(\"print.css\") print;")
        .unwrap();
    assert_eq!(output.css, "@import url(\"print.css\") print;\n.a {\n  b: c;\n}\n");
}

#[test]
fn test_inline_import() {
    let output = compiler(CompileOptions::default(), library())
        .compile("@import (inline) \"plain.css\";\n.a { b: c; }")
        .unwrap();
    assert_eq!(output.css, ".raw { r: 1; }\n.a {\n  b: c;\n}\n");
}

#[test]
fn test_reference_import_with_extend() {
    let output = compiler(CompileOptions::default(), library())
        .compile("@import (reference) \"lib/base\";\n.primary:extend(.btn) { weight: bold; }")
        .unwrap();
    assert_eq!(
        output.css,
        ".primary {\n  color: blue;\n}\n.primary {\n  weight: bold;\n}\n"
    );
}

#[test]
fn test_rewrite_urls() {
    let source = "@import \"theme/icons\";";
    let plain = compiler(CompileOptions::default(), library()).compile(source).unwrap();
    assert_eq!(plain.css, ".icon {\n  background: url(\"img/i.png\");\n}\n");

    let rewritten = compiler(
        CompileOptions::default().with_rewrite_urls(RewriteUrls::All),
        library(),
    )
    .compile(source)
    .unwrap();
    assert_eq!(rewritten.css, ".icon {\n  background: url(\"theme/img/i.png\");\n}\n");
}

#[test]
fn test_missing_and_optional_imports() {
    let err = compiler(CompileOptions::default(), library())
        .compile("\n@import \"nowhere\";")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Import);
    assert_eq!(err.line(), Some(2));

    let output = compiler(CompileOptions::default(), library())
        .compile("@import (optional) \"nowhere\";\n.a { b: c; }")
        .unwrap();
    assert_eq!(output.css, ".a {\n  b: c;\n}\n");
}

#[test]
fn test_search_paths() {
    let output = compiler(CompileOptions::default().with_path("lib"), library())
        .compile("@import \"base\";")
        .unwrap();
    assert_eq!(output.css, ".btn {\n  color: blue;\n}\n");
}
