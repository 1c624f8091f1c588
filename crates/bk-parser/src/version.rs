//! Runtime version probing.
//!
//! A toolchain install carries `lib/version.txt`. Its content varies by
//! distribution (`1.8.19`, `1:1.0.5+dfsg2-2`), so only the first `N.N.N`
//! triple is used.

use std::fmt;

use semver::Version;

use crate::error::ParseError;
use crate::patterns::version_regex;

/// First runtime version with the `hardware/<vendor>/<arch>` layout.
pub const MODERN_RUNTIME: Version = Version::new(1, 5, 0);

/// A runtime version read from a version file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVersion {
    /// The matched `N.N.N` text, as written.
    pub raw: String,
    /// The parsed version.
    pub version: Version,
}

impl RuntimeVersion {
    /// Returns `true` for runtimes at or above 1.5.0.
    #[must_use]
    pub fn is_modern(&self) -> bool {
        self.version >= MODERN_RUNTIME
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Extracts the first version triple from a version file body.
///
/// Returns `Ok(None)` if the text contains no triple.
///
/// # Errors
///
/// Returns [`ParseError::InvalidVersion`] if a component overflows `u64`.
///
/// # Examples
///
/// ```
/// use bk_parser::parse_runtime_version;
///
/// let v = parse_runtime_version("1:1.0.5+dfsg2-2\n")?.unwrap();
/// assert_eq!(v.raw, "1.0.5");
/// assert!(!v.is_modern());
///
/// let v = parse_runtime_version("1.8.19")?.unwrap();
/// assert!(v.is_modern());
/// # Ok::<(), bk_parser::ParseError>(())
/// ```
pub fn parse_runtime_version(text: &str) -> Result<Option<RuntimeVersion>, ParseError> {
    let Some(caps) = version_regex()?.captures(text) else {
        return Ok(None);
    };

    let raw = caps.get(0).map_or("", |m| m.as_str()).to_owned();
    let component = |index: usize| -> Result<u64, ParseError> {
        let digits = caps.get(index).map_or("", |m| m.as_str());
        digits.parse().map_err(|source| ParseError::InvalidVersion {
            text: raw.clone(),
            source,
        })
    };

    let version = Version::new(component(1)?, component(2)?, component(3)?);
    Ok(Some(RuntimeVersion { raw, version }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_version() {
        let v = parse_runtime_version("1.8.19\n").unwrap().unwrap();
        assert_eq!(v.version, Version::new(1, 8, 19));
        assert_eq!(v.to_string(), "1.8.19");
        assert!(v.is_modern());
    }

    #[test]
    fn test_distro_version_string() {
        let v = parse_runtime_version("1:1.0.5+dfsg2-2").unwrap().unwrap();
        assert_eq!(v.version, Version::new(1, 0, 5));
        assert!(!v.is_modern());
    }

    #[test]
    fn test_modern_boundary() {
        assert!(parse_runtime_version("1.5.0").unwrap().unwrap().is_modern());
        assert!(parse_runtime_version("1.5.8").unwrap().unwrap().is_modern());
        assert!(!parse_runtime_version("1.4.99").unwrap().unwrap().is_modern());
        assert!(parse_runtime_version("2.0.0").unwrap().unwrap().is_modern());
    }

    #[test]
    fn test_leading_zeros_accepted() {
        let v = parse_runtime_version("01.06.007").unwrap().unwrap();
        assert_eq!(v.raw, "01.06.007");
        assert_eq!(v.version, Version::new(1, 6, 7));
    }

    #[test]
    fn test_no_version() {
        assert!(parse_runtime_version("nightly").unwrap().is_none());
        assert!(parse_runtime_version("1.5").unwrap().is_none());
        assert!(parse_runtime_version("").unwrap().is_none());
    }

    #[test]
    fn test_overflow_is_error() {
        let err = parse_runtime_version("99999999999999999999.0.0").unwrap_err();
        assert!(matches!(err, ParseError::InvalidVersion { .. }));
    }
}
