//! Error types for Less compilation.
//!
//! Every stage aborts on its first failure and reports one structured
//! error. The four families mirror the stage that raised them:
//!
//! - [`ParseError`]: malformed syntax, raised by the parser and chunker
//! - [`EvalError`]: undefined symbols, arity/guard failures, unit mismatches
//! - [`ImportError`]: failures surfaced from an [`ImportResolver`](crate::ImportResolver)
//! - [`PluginError`]: failures raised by host-registered functions
//!
//! [`LessError`] wraps all of them and is what the public entry points return.

use thiserror::Error;

/// Location of a failure inside one source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// Name the file was registered under.
    pub filename: String,
    /// Byte offset into the file.
    pub index: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

/// Malformed source text.
///
/// # Examples
///
/// ```rust
/// use lcss::{compile, CompileOptions, LessError};
///
/// let err = compile(".a { color: red;", &CompileOptions::default()).unwrap_err();
/// assert!(matches!(err, LessError::Parse(_)));
/// assert_eq!(err.line(), Some(1));
/// ```
#[derive(Error, Clone, Debug, PartialEq)]
#[error(
    "{message} in {} on line {}, column {}:\n{snippet}",
    .location.filename,
    .location.line,
    .location.column
)]
pub struct ParseError {
    pub message: String,
    pub location: Location,
    /// The offending source line with a caret under the failing column.
    pub snippet: String,
}

/// The specific reason evaluation failed.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum EvalErrorKind {
    #[error("variable {0} is undefined")]
    UndefinedVariable(String),

    #[error("property '{0}' is undefined")]
    UndefinedProperty(String),

    #[error("{0} is undefined")]
    UndefinedMixin(String),

    /// No candidate accepted the number or shape of the arguments.
    #[error("No matching definition was found for `{0}` (wrong number of arguments)")]
    ArityMismatch(String),

    /// Candidates accepted the arguments but every guard rejected them.
    #[error("No matching definition was found for `{0}` (all guards failed)")]
    GuardsExhausted(String),

    #[error("Ambiguous use of `default()` found when matching for `{0}`")]
    AmbiguousDefault(String),

    #[error("Named argument for {mixin} {name} not found")]
    UnknownNamedArgument { mixin: String, name: String },

    #[error("Incompatible units. Change the units or use the unit function. Bad units: '{left}' and '{right}'.")]
    UnitMismatch { left: String, right: String },

    #[error("Operation on an invalid type")]
    InvalidOperation,

    #[error("Recursive variable definition for {0}")]
    RecursiveVariable(String),

    #[error("Could not evaluate variable call {0}")]
    NotCallable(String),

    #[error("error evaluating function `{name}`: {message}")]
    Function { name: String, message: String },

    #[error("maximum mixin call depth of {0} exceeded")]
    CallDepth(usize),

    #[error("{0}")]
    Other(String),
}

/// A terminal evaluation failure tagged with the node that raised it.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("{kind} in {} on line {}, column {}", .location.filename, .location.line, .location.column)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub location: Location,
}

/// An `@import` that could not be resolved.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("'{path}' wasn't found: {reason}")]
pub struct ImportError {
    pub path: String,
    pub reason: String,
    /// Filled in by the evaluator with the position of the `@import`.
    pub location: Option<Location>,
}

impl ImportError {
    pub fn not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            reason: "no such file in the search paths".to_string(),
            path,
            location: None,
        }
    }

    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            location: None,
        }
    }

    pub(crate) fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// A failure raised by a host-registered function, or by a construct that
/// needs the (unsupported) scripting bridge.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("plugin error in `{name}`: {message}")]
pub struct PluginError {
    pub name: String,
    pub message: String,
    pub location: Option<Location>,
}

/// Coarse classification returned by [`LessError::kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Eval,
    Import,
    Plugin,
}

/// Any error that aborts a compilation.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum LessError {
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),

    #[error("EvalError: {0}")]
    Eval(#[from] EvalError),

    #[error("ImportError: {0}")]
    Import(#[from] ImportError),

    #[error("PluginError: {0}")]
    Plugin(#[from] PluginError),
}

impl LessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LessError::Parse(_) => ErrorKind::Parse,
            LessError::Eval(_) => ErrorKind::Eval,
            LessError::Import(_) => ErrorKind::Import,
            LessError::Plugin(_) => ErrorKind::Plugin,
        }
    }

    /// The message without the location suffix.
    pub fn message(&self) -> String {
        match self {
            LessError::Parse(e) => e.message.clone(),
            LessError::Eval(e) => e.kind.to_string(),
            LessError::Import(e) => format!("'{}' wasn't found: {}", e.path, e.reason),
            LessError::Plugin(e) => e.message.clone(),
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            LessError::Parse(e) => Some(&e.location),
            LessError::Eval(e) => Some(&e.location),
            LessError::Import(e) => e.location.as_ref(),
            LessError::Plugin(e) => e.location.as_ref(),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.location().map(|l| l.filename.as_str())
    }

    pub fn line(&self) -> Option<usize> {
        self.location().map(|l| l.line)
    }

    pub fn column(&self) -> Option<usize> {
        self.location().map(|l| l.column)
    }

    /// Returns the evaluation error kind, if this is an evaluation failure.
    pub fn eval_kind(&self) -> Option<&EvalErrorKind> {
        match self {
            LessError::Eval(e) => Some(&e.kind),
            _ => None,
        }
    }
}

/// Internal result alias for the evaluator and passes.
pub type Result<T> = std::result::Result<T, LessError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Location {
        Location {
            filename: "main.less".to_string(),
            index: 4,
            line: 2,
            column: 3,
        }
    }

    #[test]
    fn test_eval_error_display_includes_position() {
        let err = LessError::from(EvalError {
            kind: EvalErrorKind::UndefinedVariable("@x".to_string()),
            location: location(),
        });
        assert_eq!(
            err.to_string(),
            "EvalError: variable @x is undefined in main.less on line 2, column 3"
        );
        assert_eq!(err.kind(), ErrorKind::Eval);
        assert_eq!(err.message(), "variable @x is undefined");
    }

    #[test]
    fn test_import_error_location_is_optional() {
        let err = LessError::from(ImportError::not_found("missing.less"));
        assert_eq!(err.line(), None);
        let located = LessError::from(ImportError::not_found("missing.less").at(location()));
        assert_eq!(located.line(), Some(2));
        assert_eq!(located.filename(), Some("main.less"));
    }

    #[test]
    fn test_unit_mismatch_message() {
        let kind = EvalErrorKind::UnitMismatch {
            left: "px".to_string(),
            right: "em".to_string(),
        };
        assert!(kind.to_string().contains("'px' and 'em'"));
    }
}
