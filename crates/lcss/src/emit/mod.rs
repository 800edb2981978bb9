//! CSS text output.
//!
//! Works on the flattened tree produced by [`crate::visitors`]: rulesets
//! hold only declarations and comments, and at-rules hold rulesets.
//!
//! Within one ruleset, `prop+:` and `prop+_:` declarations merge into the
//! first of them, and a declaration repeated verbatim keeps only its last
//! occurrence. Variables never reach the output. `@charset` and plain CSS
//! `@import`s are moved to the top.

use crate::ast::{
    AtBlock, Comment, Declaration, Directive, Import, Merge, Meta, Rule, Ruleset, Selector,
    WriteOptions,
};
use crate::context::FileTable;
use crate::options::CompileOptions;

/// One position in the output tied to the source that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMapping {
    /// Byte offset into the generated CSS.
    pub offset: usize,
    pub file: String,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub column: usize,
}

/// Generated CSS and, when requested, its mappings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Emitted {
    pub css: String,
    pub mappings: Vec<SourceMapping>,
}

/// Writes a flattened stylesheet as CSS.
pub fn emit_css(root: &Ruleset, options: &CompileOptions, files: &FileTable) -> Emitted {
    let mut emitter = Emitter {
        out: String::new(),
        write: WriteOptions {
            compress: options.compress,
            strict_units: options.strict_units,
        },
        files,
        mappings: options.source_map.then(Vec::new),
    };

    let mut charset = None;
    let mut imports = Vec::new();
    let mut body = Vec::new();
    for rule in &root.rules {
        match rule {
            Rule::Directive(d) if d.name.eq_ignore_ascii_case("@charset") => {
                if charset.is_none() {
                    charset = Some(d);
                }
            }
            Rule::Import(i) if i.content.is_none() => imports.push(i),
            other => body.push(other),
        }
    }
    if let Some(charset) = charset {
        emitter.emit_directive(charset, 0);
    }
    for import in imports {
        emitter.emit_import(import, 0);
    }
    emitter.emit_rules(body.into_iter(), 0);

    Emitted {
        css: emitter.out,
        mappings: emitter.mappings.unwrap_or_default(),
    }
}

struct Emitter<'f> {
    out: String,
    write: WriteOptions,
    files: &'f FileTable,
    mappings: Option<Vec<SourceMapping>>,
}

/// One line of a declaration block after merging.
enum Line<'r> {
    Declaration {
        name: &'r str,
        value: String,
        important: bool,
        meta: Meta,
    },
    Comment(&'r Comment),
    Statement(&'r Directive),
}

impl<'f> Emitter<'f> {
    fn compress(&self) -> bool {
        self.write.compress
    }

    fn indent(&mut self, depth: usize) {
        if !self.compress() {
            for _ in 0..depth {
                self.out.push_str("  ");
            }
        }
    }

    fn newline(&mut self) {
        if !self.compress() {
            self.out.push('\n');
        }
    }

    fn map(&mut self, meta: &Meta) {
        if let Some(mappings) = self.mappings.as_mut() {
            let location = self.files.location(meta.file, meta.index);
            mappings.push(SourceMapping {
                offset: self.out.len(),
                file: location.filename,
                line: location.line,
                column: location.column,
            });
        }
    }

    /// Emits a run of container-level rules; consecutive declarations are
    /// written as one block without braces.
    fn emit_rules<'r>(&mut self, rules: impl Iterator<Item = &'r Rule>, depth: usize) {
        let mut pending: Vec<&'r Rule> = Vec::new();
        for rule in rules {
            if matches!(rule, Rule::Declaration(_)) {
                pending.push(rule);
                continue;
            }
            self.flush_declarations(&mut pending, depth);
            match rule {
                Rule::Ruleset(ruleset) => self.emit_ruleset(ruleset, depth),
                Rule::AtBlock(block) => self.emit_at_block(block, depth),
                Rule::Directive(directive) => self.emit_directive(directive, depth),
                Rule::Import(import) => self.emit_import(import, depth),
                Rule::Comment(comment) => self.emit_comment(comment, depth),
                _ => {}
            }
        }
        self.flush_declarations(&mut pending, depth);
    }

    fn flush_declarations(&mut self, pending: &mut Vec<&Rule>, depth: usize) {
        if pending.is_empty() {
            return;
        }
        let lines = self.block_lines(pending);
        pending.clear();
        self.write_lines(&lines, depth);
    }

    fn emit_ruleset(&mut self, ruleset: &Ruleset, depth: usize) {
        let lines = self.block_lines(&ruleset.rules.iter().collect::<Vec<_>>());
        if ruleset.paths.is_empty() || !lines.iter().any(|l| !matches!(l, Line::Comment(_))) {
            return;
        }

        debug_assert!(
            !ruleset.paths.iter().any(Selector::has_parent_ref),
            "unjoined selector reached the emitter"
        );
        let mut paths: Vec<String> = Vec::new();
        for path in &ruleset.paths {
            let css = path.to_css(self.compress());
            if !paths.contains(&css) {
                paths.push(css);
            }
        }

        self.indent(depth);
        self.map(&ruleset.meta);
        if self.compress() {
            self.out.push_str(&paths.join(","));
            self.out.push('{');
        } else {
            let separator = format!(",\n{}", "  ".repeat(depth));
            self.out.push_str(&paths.join(&separator));
            self.out.push_str(" {\n");
        }
        self.write_lines(&lines, depth + 1);
        self.indent(depth);
        self.out.push('}');
        self.newline();
    }

    fn emit_at_block(&mut self, block: &AtBlock, depth: usize) {
        let body = self.nested(|emitter| emitter.emit_rules(block.rules.iter(), depth + 1));
        let Some((body, mappings)) = body else {
            return;
        };
        self.indent(depth);
        self.map(&block.meta);
        self.out.push_str(block.kind.keyword());
        self.out.push(' ');
        self.out.push_str(&block.features.to_css(self.write));
        self.open_block();
        self.append(body, mappings);
        self.indent(depth);
        self.out.push('}');
        self.newline();
    }

    fn emit_directive(&mut self, directive: &Directive, depth: usize) {
        let Some(rules) = &directive.rules else {
            self.indent(depth);
            self.map(&directive.meta);
            self.write_statement(directive);
            self.out.push(';');
            self.newline();
            return;
        };
        let body = self.nested(|emitter| emitter.emit_rules(rules.iter(), depth + 1));
        let Some((body, mappings)) = body else {
            return;
        };
        self.indent(depth);
        self.map(&directive.meta);
        self.write_statement(directive);
        self.open_block();
        self.append(body, mappings);
        self.indent(depth);
        self.out.push('}');
        self.newline();
    }

    fn emit_import(&mut self, import: &Import, depth: usize) {
        if let Some(content) = &import.content {
            self.out.push_str(content.trim_end());
            self.newline();
            return;
        }
        self.indent(depth);
        self.map(&import.meta);
        self.out.push_str("@import ");
        self.out.push_str(&import.path.to_css(self.write));
        if let Some(features) = &import.features {
            self.out.push(' ');
            self.out.push_str(&features.to_css(self.write));
        }
        self.out.push(';');
        self.newline();
    }

    fn emit_comment(&mut self, comment: &Comment, depth: usize) {
        if self.compress() && !comment.is_important() {
            return;
        }
        self.indent(depth);
        self.out.push_str(&comment.text);
        self.newline();
    }

    /// Runs `emit` into a scratch buffer. Returns `None` when it wrote
    /// nothing, so empty blocks can be skipped.
    fn nested(&mut self, emit: impl FnOnce(&mut Self)) -> Option<(String, Vec<SourceMapping>)> {
        let saved_out = std::mem::take(&mut self.out);
        let saved_mappings = self.mappings.as_mut().map(std::mem::take);
        emit(self);
        let body = std::mem::replace(&mut self.out, saved_out);
        let mappings = match (self.mappings.as_mut(), saved_mappings) {
            (Some(current), Some(saved)) => std::mem::replace(current, saved),
            _ => Vec::new(),
        };
        (!body.is_empty()).then_some((body, mappings))
    }

    /// Appends a scratch buffer, shifting its mappings to their final offset.
    fn append(&mut self, body: String, mappings: Vec<SourceMapping>) {
        let base = self.out.len();
        if let Some(current) = self.mappings.as_mut() {
            current.extend(mappings.into_iter().map(|mut m| {
                m.offset += base;
                m
            }));
        }
        self.out.push_str(&body);
    }

    fn open_block(&mut self) {
        self.out.push_str(if self.compress() { "{" } else { " {\n" });
    }

    fn write_statement(&mut self, directive: &Directive) {
        self.out.push_str(&directive.name);
        if let Some(prelude) = &directive.prelude {
            self.out.push(' ');
            self.out.push_str(&prelude.to_css(self.write));
        }
    }

    /// Declarations, comments and statements of one block, merged and
    /// deduplicated.
    fn block_lines<'r>(&self, rules: &[&'r Rule]) -> Vec<Line<'r>> {
        let mut lines: Vec<Line<'r>> = Vec::new();
        let mut merged: Vec<(usize, Merge)> = Vec::new();
        for &rule in rules {
            match rule {
                Rule::Declaration(d) if d.variable => {}
                Rule::Declaration(d) => {
                    let value = d.value.to_css(self.write);
                    if d.merge != Merge::None {
                        let existing = merged.iter().find(|(i, _)| {
                            matches!(
                                &lines[*i],
                                Line::Declaration { name, important, .. }
                                    if *name == d.name && *important == d.important
                            )
                        });
                        if let Some(&(index, merge)) = existing {
                            if let Line::Declaration { value: joined, .. } = &mut lines[index] {
                                joined.push_str(self.merge_separator(merge));
                                joined.push_str(&value);
                            }
                            continue;
                        }
                        merged.push((lines.len(), d.merge));
                    }
                    lines.push(declaration_line(d, value));
                }
                Rule::Comment(c) if !self.compress() || c.is_important() => {
                    lines.push(Line::Comment(c))
                }
                Rule::Directive(d) if d.rules.is_none() => lines.push(Line::Statement(d)),
                _ => {}
            }
        }

        let mut keep = vec![true; lines.len()];
        for (i, line) in lines.iter().enumerate() {
            if let Line::Declaration { name, value, important, .. } = line {
                keep[i] = !lines[i + 1..].iter().any(|later| {
                    matches!(later, Line::Declaration { name: n, value: v, important: imp, .. }
                        if n == name && v == value && imp == important)
                });
            }
        }
        lines
            .into_iter()
            .zip(keep)
            .filter_map(|(line, keep)| keep.then_some(line))
            .collect()
    }

    fn merge_separator(&self, merge: Merge) -> &'static str {
        match (merge, self.compress()) {
            (Merge::Space, _) => " ",
            (_, true) => ",",
            _ => ", ",
        }
    }

    fn write_lines(&mut self, lines: &[Line<'_>], depth: usize) {
        let last_declaration = lines.iter().rposition(|l| !matches!(l, Line::Comment(_)));
        for (i, line) in lines.iter().enumerate() {
            match line {
                Line::Declaration {
                    name,
                    value,
                    important,
                    meta,
                } => {
                    self.indent(depth);
                    self.map(meta);
                    self.emit_declaration(name, value, *important);
                }
                Line::Statement(directive) => {
                    self.indent(depth);
                    self.map(&directive.meta);
                    self.write_statement(directive);
                }
                Line::Comment(comment) => {
                    self.indent(depth);
                    self.out.push_str(&comment.text);
                    self.newline();
                    continue;
                }
            }
            if !self.compress() || Some(i) != last_declaration {
                self.out.push(';');
            }
            self.newline();
        }
    }

    fn emit_declaration(&mut self, name: &str, value: &str, important: bool) {
        self.out.push_str(name);
        self.out.push(':');
        if !self.compress() {
            self.out.push(' ');
        }
        self.out.push_str(value);
        if important {
            self.out.push_str(if self.compress() { "!important" } else { " !important" });
        }
    }
}

fn declaration_line<'r>(declaration: &'r Declaration, value: String) -> Line<'r> {
    Line::Declaration {
        name: &declaration.name,
        value,
        important: declaration.important,
        meta: declaration.meta,
    }
}
