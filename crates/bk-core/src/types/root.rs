//! Scan roots and per-root discovery status.

use std::collections::BTreeSet;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use super::platform::PlatformId;

/// What a scan root is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    /// A toolchain installation (IDE runtime).
    Runtime,
    /// A user sketchbook folder with user-installed hardware and libraries.
    User,
}

impl RootKind {
    /// Returns a lowercase label for display and logging.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::User => "user",
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A resolved location to scan.
///
/// `rank` is the position in the resolved order (runtime roots first, then
/// user roots). When two roots contribute the same key, the higher rank wins.
///
/// # Examples
///
/// ```
/// use bk_core::{RootKind, ScanRoot};
///
/// let root = ScanRoot::new("/usr/share/arduino", RootKind::Runtime, 0);
/// assert_eq!(root.hardware_dir().as_str(), "/usr/share/arduino/hardware");
/// assert_eq!(root.libraries_dir().as_str(), "/usr/share/arduino/libraries");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRoot {
    /// The root directory.
    pub path: Utf8PathBuf,
    /// Runtime or user.
    pub kind: RootKind,
    /// Merge precedence; higher wins.
    pub rank: usize,
}

impl ScanRoot {
    /// Creates a new scan root.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: RootKind, rank: usize) -> Self {
        Self {
            path: path.into(),
            kind,
            rank,
        }
    }

    /// `<root>/hardware`.
    #[must_use]
    pub fn hardware_dir(&self) -> Utf8PathBuf {
        self.path.join("hardware")
    }

    /// `<root>/libraries`.
    #[must_use]
    pub fn libraries_dir(&self) -> Utf8PathBuf {
        self.path.join("libraries")
    }

    /// `<root>/lib/version.txt`.
    #[must_use]
    pub fn version_file(&self) -> Utf8PathBuf {
        self.path.join("lib").join("version.txt")
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Outcome of probing one folder under a scan root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FolderState {
    /// Not detected yet, or detection was cancelled.
    #[default]
    Unknown,
    /// The folder exists and was scanned.
    Present,
    /// The folder could not be opened.
    Error {
        /// The I/O error kind, e.g. `NotFound`.
        error: String,
    },
}

impl FolderState {
    /// Creates an error marker from an I/O error.
    #[must_use]
    pub fn from_io(error: &std::io::Error) -> Self {
        Self::Error {
            error: format!("{:?}", error.kind()),
        }
    }

    /// Returns `true` if this is an error marker.
    #[inline]
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// What discovery found under one scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootStatus {
    /// Runtime or user.
    pub kind: RootKind,
    /// Version string read from `lib/version.txt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    /// Whether the runtime uses the 1.5+ hardware layout.
    #[serde(default)]
    pub modern: bool,
    /// State of `<root>/hardware`.
    #[serde(default)]
    pub hardware: FolderState,
    /// State of `<root>/libraries`.
    #[serde(default)]
    pub libraries: FolderState,
    /// Platforms whose `boards.txt` came from this root.
    #[serde(default)]
    pub boards: BTreeSet<PlatformId>,
    /// Platforms whose `platform.txt` came from this root.
    #[serde(default)]
    pub platform: BTreeSet<PlatformId>,
}

impl RootStatus {
    /// Creates an empty status for a root of the given kind.
    #[must_use]
    pub fn new(kind: RootKind) -> Self {
        Self {
            kind,
            runtime_version: None,
            modern: false,
            hardware: FolderState::Unknown,
            libraries: FolderState::Unknown,
            boards: BTreeSet::new(),
            platform: BTreeSet::new(),
        }
    }

    /// Returns `true` if this root is a runtime with a modern version.
    #[must_use]
    pub fn is_acceptable_runtime(&self) -> bool {
        self.kind == RootKind::Runtime && self.runtime_version.is_some() && self.modern
    }
}
