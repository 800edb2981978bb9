//! Compile options.
//!
//! [`CompileOptions`] is plain data: hosts build it with `Default` plus the
//! `with_*` methods, or fill in the public fields directly.

use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// When bare arithmetic is evaluated instead of emitted verbatim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MathMode {
    /// Every operator is evaluated wherever it appears.
    Always,
    /// `+`, `-` and `*` are evaluated anywhere; `/` only inside parentheses.
    #[default]
    ParensDivision,
    /// Operators are evaluated only inside parentheses.
    Parens,
}

impl FromStr for MathMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" | "0" => Ok(MathMode::Always),
            "parens-division" | "1" => Ok(MathMode::ParensDivision),
            "parens" | "strict" | "2" => Ok(MathMode::Parens),
            other => Err(format!("unknown math mode '{}'", other)),
        }
    }
}

impl fmt::Display for MathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MathMode::Always => "always",
            MathMode::ParensDivision => "parens-division",
            MathMode::Parens => "parens",
        })
    }
}

/// Which `url()` values inside imported files are rebased onto the entry file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RewriteUrls {
    #[default]
    Off,
    /// Only urls starting with `./` or `../`.
    Local,
    /// Every relative url.
    All,
}

impl FromStr for RewriteUrls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(RewriteUrls::Off),
            "local" => Ok(RewriteUrls::Local),
            "all" => Ok(RewriteUrls::All),
            other => Err(format!("unknown rewrite-urls mode '{}'", other)),
        }
    }
}

/// Options for one compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileOptions {
    pub math: MathMode,
    /// Reject `+`/`-` between incompatible units instead of keeping the left operand.
    pub strict_units: bool,
    pub compress: bool,
    /// Legacy switch equivalent to `rewrite_urls = All`.
    pub relative_urls: bool,
    pub rewrite_urls: RewriteUrls,
    /// Variables visible from an outermost frame, below everything in the source.
    pub global_vars: IndexMap<String, String>,
    /// Variables that override the entry file's root declarations.
    pub modify_vars: IndexMap<String, String>,
    /// Search directories for `@import`, in order.
    pub paths: Vec<String>,
    /// Record `(offset, file, line, column)` tuples while emitting.
    pub source_map: bool,
    /// Name the entry source is registered under in errors and mappings.
    pub filename: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            math: MathMode::default(),
            strict_units: false,
            compress: false,
            relative_urls: false,
            rewrite_urls: RewriteUrls::default(),
            global_vars: IndexMap::new(),
            modify_vars: IndexMap::new(),
            paths: Vec::new(),
            source_map: false,
            filename: "input".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_math(mut self, math: MathMode) -> Self {
        self.math = math;
        self
    }

    pub fn with_strict_units(mut self, strict: bool) -> Self {
        self.strict_units = strict;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_rewrite_urls(mut self, mode: RewriteUrls) -> Self {
        self.rewrite_urls = mode;
        self
    }

    pub fn with_relative_urls(mut self, relative: bool) -> Self {
        self.relative_urls = relative;
        self
    }

    pub fn with_global_var(mut self, name: &str, value: &str) -> Self {
        self.global_vars.insert(normalize_var(name), value.to_string());
        self
    }

    pub fn with_modify_var(mut self, name: &str, value: &str) -> Self {
        self.modify_vars.insert(normalize_var(name), value.to_string());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// The url rewriting mode after folding in `relative_urls`.
    pub fn effective_rewrite_urls(&self) -> RewriteUrls {
        if self.relative_urls {
            RewriteUrls::All
        } else {
            self.rewrite_urls
        }
    }
}

/// Accepts `name`, `@name` and `name;` spellings.
fn normalize_var(name: &str) -> String {
    let name = name.trim().trim_end_matches(';');
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_mode_spellings() {
        assert_eq!("always".parse::<MathMode>(), Ok(MathMode::Always));
        assert_eq!("strict".parse::<MathMode>(), Ok(MathMode::Parens));
        assert_eq!(
            "parens-division".parse::<MathMode>(),
            Ok(MathMode::ParensDivision)
        );
        assert!("sometimes".parse::<MathMode>().is_err());
    }

    #[test]
    fn test_relative_urls_implies_rewrite_all() {
        let options = CompileOptions::default().with_relative_urls(true);
        assert_eq!(options.effective_rewrite_urls(), RewriteUrls::All);
        assert_eq!(
            CompileOptions::default().effective_rewrite_urls(),
            RewriteUrls::Off
        );
    }

    #[test]
    fn test_var_names_are_normalized() {
        let options = CompileOptions::default()
            .with_global_var("color", "red")
            .with_modify_var("@size;", "1px");
        assert!(options.global_vars.contains_key("@color"));
        assert!(options.modify_vars.contains_key("@size"));
    }
}
