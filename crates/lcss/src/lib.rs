//! # lcss - Less Compiler
//!
//! A compiler for the Less stylesheet language: variables, nesting, mixins
//! with guards and pattern matching, operations, `:extend`, imports and
//! media bubbling, compiled to plain CSS.
//!
//! ## Quick Start
//!
//! ```rust
//! use lcss::{compile, CompileOptions};
//!
//! let source = r#"
//!     @accent: #336699;
//!     .bordered(@width: 2px) { border: @width solid @accent; }
//!
//!     .card {
//!         .bordered(1px);
//!         &:hover { color: fade(@accent, 50%); }
//!     }
//! "#;
//!
//! let output = compile(source, &CompileOptions::default()).expect("valid Less");
//! assert_eq!(
//!     output.css,
//!     ".card {\n  border: 1px solid #336699;\n}\n.card:hover {\n  color: rgba(51, 102, 153, 0.5);\n}\n"
//! );
//! ```
//!
//! ## Pipeline
//!
//! 1. [`parser`]: source text to a [`Ruleset`](ast::Ruleset) tree
//! 2. [`eval`]: variables, operations, functions, mixins, guards and imports
//! 3. [`visitors`]: selector joining, extends, reference visibility, bubbling
//! 4. [`emit`]: CSS text and optional source mappings
//!
//! All state lives in a per-compilation [`Context`]; a [`Compiler`] can be
//! shared and used for any number of independent compilations.
//!
//! ## Not Supported
//!
//! - `@plugin` (register native functions with [`Compiler::register_function`])
//! - JavaScript evaluation in backticks
//!
//! ## Modules
//!
//! - [`ast`]: the stylesheet tree
//! - [`types`]: colors and dimensions
//! - [`functions`]: the built-in function library and host functions
//! - [`import`]: the import resolver collaborator
//! - [`error`]: error types

pub mod ast;
pub mod context;
pub mod emit;
pub mod error;
pub mod eval;
pub mod functions;
pub mod import;
pub mod options;
pub mod parser;
pub mod types;
pub mod visitors;

pub use context::Context;
pub use emit::SourceMapping;
pub use error::{
    ErrorKind, EvalError, EvalErrorKind, ImportError, LessError, Location, ParseError, PluginError,
};
pub use functions::{Function, FunctionError, FunctionRegistry};
pub use import::{ImportResolver, MemoryImportResolver, NoImports, ResolvedImport};
pub use options::{CompileOptions, MathMode, RewriteUrls};

use parser::ParseOptions;

/// Result of one compilation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompileOutput {
    pub css: String,
    /// Empty unless [`CompileOptions::source_map`] is set.
    pub source_map: Vec<SourceMapping>,
    /// Canonical names of the imported Less files, in import order.
    pub imports: Vec<String>,
}

/// Compiles Less source with options, an import resolver and host functions.
///
/// ```rust
/// use lcss::ast::Value;
/// use lcss::{CompileOptions, Compiler, FunctionError};
///
/// let compiler = Compiler::new(CompileOptions::default()).register_function(
///     "double",
///     |args: &[Value]| match args {
///         [value] => Ok(Value::Expression(vec![value.clone(), value.clone()])),
///         _ => Err(FunctionError::failed("expected one argument")),
///     },
/// );
/// let output = compiler.compile(".a { margin: double(1px); }").unwrap();
/// assert_eq!(output.css, ".a {\n  margin: 1px 1px;\n}\n");
/// ```
pub struct Compiler {
    options: CompileOptions,
    resolver: Box<dyn ImportResolver>,
    functions: FunctionRegistry,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            resolver: Box::new(NoImports),
            functions: FunctionRegistry::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn ImportResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Makes `function` callable as `name(...)`, ahead of any built-in.
    pub fn register_function(
        mut self,
        name: impl Into<String>,
        function: impl Function + 'static,
    ) -> Self {
        self.functions.register(name, function);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile(&self, source: &str) -> Result<CompileOutput, LessError> {
        let options = &self.options;
        let mut ctx = Context::new(options, self.resolver.as_ref(), &self.functions);
        let file = ctx.files.add(&options.filename, source, "");

        log::debug!("parsing {}", options.filename);
        let parse_options = ParseOptions {
            filename: options.filename.clone(),
        };
        let parsed = parser::parse(source, file, &parse_options)?;

        log::debug!("evaluating {}", options.filename);
        let evaluated = eval::evaluate(&mut ctx, &parsed)?;
        let flattened = visitors::run(&mut ctx, evaluated);

        log::debug!("emitting {}", options.filename);
        let emitted = emit::emit_css(&flattened, options, &ctx.files);
        Ok(CompileOutput {
            css: emitted.css,
            source_map: emitted.mappings,
            imports: ctx.imported.into_iter().collect(),
        })
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// Compiles `source` without import support beyond plain CSS imports.
pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileOutput, LessError> {
    Compiler::new(options.clone()).compile(source)
}
