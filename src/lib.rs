//! # less-rs
//!
//! Compiles Less stylesheets to CSS. The compiler itself lives in [`lcss`]
//! and never touches the filesystem; this crate adds file-based entry points
//! and a file logger on top of it.
//!
//! ```rust,no_run
//! use less_rs::{compile_file, CompileOptions};
//!
//! let output = compile_file("styles/site.less", &CompileOptions::default().with_path("vendor"))?;
//! println!("{}", output.css);
//! # Ok::<(), less_rs::Error>(())
//! ```

pub mod error;
mod log_init;
mod resolver;

pub use error::{Error, Result};
pub use lcss::{
    compile, CompileOptions, CompileOutput, Compiler, ErrorKind, LessError, MathMode, RewriteUrls,
};
pub use log_init::init_logger;
pub use resolver::FileImportResolver;

use std::path::Path;

/// A [`Compiler`] whose imports are read from disk.
pub fn file_compiler(options: CompileOptions) -> Compiler {
    Compiler::new(options).with_resolver(Box::new(FileImportResolver::new()))
}

/// Reads and compiles the Less file at `path`.
///
/// The file's own name becomes [`CompileOptions::filename`], so relative
/// imports resolve next to it and errors point into it.
pub fn compile_file(path: impl AsRef<Path>, options: &CompileOptions) -> Result<CompileOutput> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let filename = path.to_string_lossy().into_owned();
    log::info!("compiling {}", filename);
    let output = file_compiler(options.clone().with_filename(filename)).compile(&source)?;
    Ok(output)
}
