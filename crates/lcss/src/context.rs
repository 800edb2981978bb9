//! Per-compilation state.
//!
//! Everything that would otherwise be global (the file table, the extend id
//! counter, the set of files already imported) lives in a [`Context`] that
//! is created for one compilation and threaded through every stage, so
//! independent compilations never share mutable state.

use crate::ast::{FileId, Meta};
use crate::error::Location;
use crate::functions::FunctionRegistry;
use crate::import::ImportResolver;
use crate::options::CompileOptions;
use indexmap::IndexSet;
use std::rc::Rc;

/// One source text registered with the compilation.
#[derive(Debug)]
pub struct SourceFile {
    pub name: String,
    pub contents: Rc<str>,
    /// Directory of this file relative to the entry file, `""` or ending in `/`.
    pub relative_dir: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub(crate) fn new(name: String, contents: Rc<str>, relative_dir: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(contents.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name,
            contents,
            relative_dir,
            line_starts,
        }
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, index: usize) -> (usize, usize) {
        let index = index.min(self.contents.len());
        let line = match self.line_starts.binary_search(&index) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = self.contents[start..index].chars().count() + 1;
        (line + 1, column)
    }

    /// The line containing `index`, followed by a caret line.
    pub fn snippet(&self, index: usize) -> String {
        let (line, column) = self.line_col(index);
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map(|e| e - 1)
            .unwrap_or(self.contents.len());
        let text = self.contents[start..end].trim_end_matches('\r');
        format!("{:>4} | {}\n     | {}^", line, text, " ".repeat(column - 1))
    }
}

/// All files taking part in one compilation, addressed by [`FileId`].
#[derive(Debug, Default)]
pub struct FileTable {
    files: Vec<SourceFile>,
}

impl FileTable {
    pub fn add(&mut self, name: &str, contents: &str, relative_dir: &str) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(
            name.to_string(),
            Rc::from(contents),
            relative_dir.to_string(),
        ));
        id
    }

    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn name(&self, id: FileId) -> &str {
        self.get(id).map_or("input", |f| f.name.as_str())
    }

    pub fn location(&self, file: FileId, index: usize) -> Location {
        match self.get(file) {
            Some(source) => {
                let (line, column) = source.line_col(index);
                Location {
                    filename: source.name.clone(),
                    index,
                    line,
                    column,
                }
            }
            None => Location {
                filename: "input".to_string(),
                index,
                line: 1,
                column: 1,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// State owned by one compilation.
pub struct Context<'a> {
    pub options: &'a CompileOptions,
    pub files: FileTable,
    pub resolver: &'a dyn ImportResolver,
    pub functions: &'a FunctionRegistry,
    /// Canonical names of every file imported so far, in import order.
    pub imported: IndexSet<String>,
    next_id: usize,
}

impl<'a> Context<'a> {
    pub fn new(
        options: &'a CompileOptions,
        resolver: &'a dyn ImportResolver,
        functions: &'a FunctionRegistry,
    ) -> Self {
        Self {
            options,
            files: FileTable::default(),
            resolver,
            functions,
            imported: IndexSet::new(),
            next_id: 0,
        }
    }

    /// Next monotonic object id, used to identify extends.
    pub fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    pub fn location(&self, meta: &Meta) -> Location {
        self.files.location(meta.file, meta.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let mut files = FileTable::default();
        let id = files.add("a.less", ".a {\n  color: red;\n}\n", "");
        let file = files.get(id).unwrap();
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(7), (2, 3));
        assert_eq!(file.line_col(5), (2, 1));
    }

    #[test]
    fn test_snippet_points_at_column() {
        let mut files = FileTable::default();
        let id = files.add("a.less", "one\ntwo three\n", "");
        let snippet = files.get(id).unwrap().snippet(8);
        assert_eq!(snippet, "   2 | two three\n     |     ^");
    }

    #[test]
    fn test_location_of_unknown_file() {
        let files = FileTable::default();
        let location = files.location(FileId(3), 10);
        assert_eq!(location.line, 1);
    }
}
