//! Error types for the bk-parser crate.
//!
//! Config parsing itself never fails: malformed lines are absorbed. The
//! errors here cover pattern compilation and version text that matches the
//! version shape but cannot be represented.

/// Errors that can occur while parsing toolchain text files.
///
/// # Examples
///
/// ```
/// use bk_parser::ParseError;
///
/// fn handle_error(err: ParseError) {
///     match err {
///         ParseError::PatternCompile { name, .. } => {
///             eprintln!("built-in pattern {name} failed to compile");
///         }
///         ParseError::InvalidVersion { text, .. } => {
///             eprintln!("cannot read version from {text:?}");
///         }
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A built-in regular expression failed to compile.
    #[error("failed to compile {name} pattern: {source}")]
    PatternCompile {
        /// Which pattern failed.
        name: &'static str,
        /// The underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },

    /// A version triple was found but a component does not fit in a `u64`.
    #[error("invalid runtime version {text:?}: {source}")]
    InvalidVersion {
        /// The matched version text.
        text: String,
        /// The integer parse failure.
        #[source]
        source: std::num::ParseIntError,
    },
}

impl ParseError {
    /// Creates a [`ParseError::PatternCompile`].
    #[must_use]
    pub fn pattern(name: &'static str, source: regex::Error) -> Self {
        Self::PatternCompile {
            name,
            source: Box::new(source),
        }
    }

    /// Returns `true` if this error is caused by the input rather than by a
    /// broken build.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidVersion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_compile_display() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ParseError::pattern("include", source);
        assert!(err.to_string().starts_with("failed to compile include pattern"));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_invalid_version_display() {
        let source = "99999999999999999999".parse::<u64>().unwrap_err();
        let err = ParseError::InvalidVersion {
            text: "99999999999999999999.0.0".to_owned(),
            source,
        };
        assert!(err.to_string().contains("99999999999999999999.0.0"));
        assert!(err.is_input_error());
    }
}
