//! Core types, errors, and configuration for boardkit.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ConfigNode`] trees and flat key maps produced from `boards.txt` /
//!   `platform.txt` files
//! - [`PlatformEntry`] and [`LibraryEntry`], the two keyed records of the
//!   discovery model, plus the aggregated [`DiscoveryModel`]
//! - [`ScanRoot`] and [`RootStatus`] for the locations a scan visits
//! - [`HostPlatform`] aliases used for platform-specific config overrides
//! - Configuration structures and [`ConfigError`]
//! - Type aliases for `FxHashMap`/`FxHashSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{Config, DiscoveryConfig, SnapshotConfig};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::{
    ConfigKind, ConfigNode, ConfigValue, DiscoveryModel, FlatKeyMap, FolderState, HostPlatform,
    IssueKind, LibraryEntry, LibraryLayout, LibraryMap, PlatformEntry, PlatformFolders,
    PlatformId, PlatformMap, RootKind, RootStatus, ScanIssue, ScanRoot,
};
