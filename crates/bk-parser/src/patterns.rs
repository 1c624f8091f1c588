//! Pre-compiled regular expressions.
//!
//! Each pattern is compiled once on first use and cached for the life of
//! the process. The getters are thread-safe.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;

/// Matches one `#include "X.h"` or `#include <X.h>` directive per line and
/// captures `X`.
///
/// Mismatched delimiters (`"X.h>`) are accepted, as in the upstream
/// toolchain's own scanner.
pub const INCLUDE_PATTERN: &str = r#"(?m)^\s*#include\s+["<]([^>"]+)\.h[">]"#;

/// Matches the first `N.N.N` triple in a version file.
pub const VERSION_PATTERN: &str = r"(\d+)\.(\d+)\.(\d+)";

static INCLUDE_REGEX: OnceLock<Regex> = OnceLock::new();
static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

/// Returns the compiled include-directive pattern.
///
/// # Errors
///
/// Returns [`ParseError::PatternCompile`] if the pattern fails to compile.
pub fn include_regex() -> Result<&'static Regex, ParseError> {
    cached(&INCLUDE_REGEX, "include", INCLUDE_PATTERN)
}

/// Returns the compiled version-triple pattern.
///
/// # Errors
///
/// Returns [`ParseError::PatternCompile`] if the pattern fails to compile.
pub fn version_regex() -> Result<&'static Regex, ParseError> {
    cached(&VERSION_REGEX, "version", VERSION_PATTERN)
}

fn cached(
    cell: &'static OnceLock<Regex>,
    name: &'static str,
    pattern: &str,
) -> Result<&'static Regex, ParseError> {
    if let Some(regex) = cell.get() {
        return Ok(regex);
    }

    let regex = Regex::new(pattern).map_err(|e| ParseError::pattern(name, e))?;
    Ok(cell.get_or_init(|| regex))
}
