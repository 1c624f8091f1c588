//! Domain types for the discovery model.
//!
//! # Module Organization
//!
//! - [`host`] - Host platform identity and config-override aliases
//! - [`node`] - Dotted-path configuration trees and flat key maps
//! - [`root`] - Scan roots and per-root discovery status
//! - [`platform`] - Hardware platform records keyed by `vendor:arch`
//! - [`library`] - Library records keyed by library name
//! - [`model`] - The aggregated discovery model and scan issues
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use bk_core::{ConfigNode, LibraryEntry, PlatformId};
//! ```

pub mod host;
pub mod library;
pub mod model;
pub mod node;
pub mod platform;
pub mod root;

pub use host::HostPlatform;
pub use library::{LibraryEntry, LibraryLayout, LibraryMap};
pub use model::{DiscoveryModel, IssueKind, ScanIssue};
pub use node::{ConfigNode, ConfigValue, FlatKeyMap};
pub use platform::{ConfigKind, PlatformEntry, PlatformFolders, PlatformId, PlatformMap};
pub use root::{FolderState, RootKind, RootStatus, ScanRoot};
