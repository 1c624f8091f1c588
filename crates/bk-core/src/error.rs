//! Error types for the bk-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration loading
//! and validation failures.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use bk_core::ConfigError;
///
/// let error = ConfigError::invalid_option("max_open_files", "must be at least 1");
/// assert!(error.to_string().contains("max_open_files"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ConfigError::InvalidPath`] error.
    #[inline]
    pub fn invalid_path(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::invalid_path("/etc/boardkit", "is a directory");
        let msg = error.to_string();
        assert!(msg.contains("/etc/boardkit"));
        assert!(msg.contains("is a directory"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("max_open_files", "must be at least 1");
        let msg = error.to_string();
        assert!(msg.contains("max_open_files"));
        assert!(msg.contains("must be at least 1"));
    }

    #[test]
    fn test_parse_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ConfigError::from(serde_err);
        assert!(error.to_string().starts_with("failed to parse configuration"));
    }
}
