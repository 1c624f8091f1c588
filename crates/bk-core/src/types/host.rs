//! Host platform identity.
//!
//! Config files may suffix a key with a platform alias
//! (`tools.avrdude.cmd.windows=avrdude.exe`). [`HostPlatform`] names the
//! three families the toolchain distinguishes and maps them to those aliases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A host operating-system family.
///
/// # Examples
///
/// ```
/// use bk_core::HostPlatform;
///
/// assert_eq!(HostPlatform::Windows.alias(), "windows");
/// assert_eq!(HostPlatform::from_alias("macos"), Some(HostPlatform::MacOs));
/// assert_eq!(HostPlatform::from_alias("freebsd"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPlatform {
    /// macOS (`macos`).
    #[serde(rename = "macos")]
    MacOs,
    /// Windows (`windows`).
    Windows,
    /// Linux and other Unix-likes (`linux`).
    Linux,
}

impl HostPlatform {
    /// Every known platform, in alias order.
    pub const ALL: [Self; 3] = [Self::MacOs, Self::Windows, Self::Linux];

    /// Returns the config-file alias for this platform.
    #[inline]
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Linux => "linux",
        }
    }

    /// Parses a config-file alias.
    #[must_use]
    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.alias() == alias)
    }

    /// Returns `true` if `segment` is the alias of any known platform.
    #[inline]
    #[must_use]
    pub fn is_known_alias(segment: &str) -> bool {
        Self::from_alias(segment).is_some()
    }

    /// Detects the family of the running host.
    ///
    /// Unix-likes other than macOS are treated as Linux.
    #[must_use]
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Linux,
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}
