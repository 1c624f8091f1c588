//! Error types for the bk-scanner crate.
//!
//! This module provides [`ScanError`] for failures during discovery and
//! [`SnapshotError`] for the persistence interface.

use bk_core::{IssueKind, ScanIssue};
use camino::{Utf8Path, Utf8PathBuf};

/// Errors that can occur during discovery.
///
/// # Error Recovery Strategy
///
/// - **Missing paths** ([`ScanError::Missing`]): recorded on the root's
///   folder state, scan continues
/// - **Read errors** ([`ScanError::Read`]): file contribution dropped,
///   siblings continue
/// - **Layout errors** ([`ScanError::UnexpectedLayout`]): entry skipped
/// - **Cancellation** ([`ScanError::Cancelled`]): no new work is issued,
///   partial results are reported
///
/// # Examples
///
/// ```
/// use bk_scanner::ScanError;
///
/// fn handle_error(err: &ScanError) {
///     if err.is_recoverable() {
///         eprintln!("skipping: {err}");
///     } else {
///         eprintln!("aborting: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The directory walker failed.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// Failed to read a file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A root or folder that discovery expected does not exist.
    #[error("path not found: {path}")]
    Missing {
        /// The missing path.
        path: Utf8PathBuf,
    },

    /// A hardware match is nested deeper than `vendor/arch/leaf`.
    #[error("unexpected layout at {path}: {depth} segments below the hardware root")]
    UnexpectedLayout {
        /// The offending path.
        path: Utf8PathBuf,
        /// Number of path segments below the hardware root.
        depth: usize,
    },

    /// Failed to parse a file's text.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The file being parsed.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: bk_parser::ParseError,
    },

    /// The run was cancelled; no new operations are accepted.
    #[error("discovery was cancelled")]
    Cancelled,

    /// The barrier was already sealed and no live handle was used.
    #[error("completion barrier is sealed; register work through a live handle")]
    Sealed,

    /// Invalid scanner configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// Creates a new [`ScanError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Missing`] error.
    #[inline]
    pub fn missing(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    /// Creates a new [`ScanError::Parse`] error.
    #[inline]
    pub fn parse(path: impl Into<Utf8PathBuf>, source: bk_parser::ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Maps an I/O error on `path` to [`ScanError::Missing`] or
    /// [`ScanError::Read`].
    pub fn from_io(path: &Utf8Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::missing(path)
        } else {
            Self::read(path, source)
        }
    }

    /// Returns `true` if this error is recoverable (discovery can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Walk(_)
                | Self::Read { .. }
                | Self::Missing { .. }
                | Self::UnexpectedLayout { .. }
                | Self::Parse { .. }
                | Self::NonUtf8Path(_)
        )
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Read { path, .. }
            | Self::Missing { path }
            | Self::UnexpectedLayout { path, .. }
            | Self::Parse { path, .. } => Some(path),
            Self::Walk(_)
            | Self::Cancelled
            | Self::Sealed
            | Self::Config(_)
            | Self::NonUtf8Path(_)
            | Self::Task(_) => None,
        }
    }

    /// Returns the model issue category for this error.
    #[must_use]
    pub const fn issue_kind(&self) -> IssueKind {
        match self {
            Self::Missing { .. } => IssueKind::MissingPath,
            Self::Read { .. } | Self::NonUtf8Path(_) => IssueKind::Read,
            Self::UnexpectedLayout { .. } => IssueKind::UnexpectedLayout,
            Self::Walk(_) => IssueKind::Walk,
            Self::Parse { .. }
            | Self::Cancelled
            | Self::Sealed
            | Self::Config(_)
            | Self::Task(_) => IssueKind::Other,
        }
    }

    /// Converts the error into a model issue, using `fallback` when the
    /// error carries no path of its own.
    #[must_use]
    pub fn to_issue(&self, fallback: &Utf8Path) -> ScanIssue {
        let path = match self {
            Self::NonUtf8Path(raw) => Utf8PathBuf::from(raw.to_string_lossy().into_owned()),
            _ => self.path().unwrap_or(fallback).to_owned(),
        };
        ScanIssue::new(self.issue_kind(), path, self.to_string())
    }
}

/// Errors from the snapshot persistence interface.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// No snapshot has been stored at this location.
    #[error("no snapshot found at {path}")]
    NotFound {
        /// The expected snapshot file.
        path: Utf8PathBuf,
    },

    /// The snapshot file could not be read or written.
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        /// The snapshot file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file is not valid JSON for the expected shape.
    #[error("malformed snapshot {path}: {source}")]
    Decode {
        /// The snapshot file.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// The registry has no snapshot store configured.
    #[error("no snapshot store configured")]
    NoStore,

    /// The blocking load or store task panicked or was aborted.
    #[error("snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SnapshotError {
    /// Maps an I/O error on `path`, distinguishing a missing snapshot.
    pub fn from_io(path: &Utf8Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_owned(),
            }
        } else {
            Self::Io {
                path: path.to_owned(),
                source,
            }
        }
    }

    /// Returns `true` if the snapshot exists but is malformed.
    #[inline]
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
