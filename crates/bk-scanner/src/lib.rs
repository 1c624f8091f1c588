//! Filesystem discovery of toolchain installs, boards and libraries.
//!
//! This crate is the discovery engine for boardkit. It resolves where to
//! look, walks toolchain and sketchbook folders, parses the config and
//! source files it finds with `bk-parser`, and aggregates everything into a
//! [`DiscoveryModel`](bk_core::DiscoveryModel).
//!
//! # Overview
//!
//! The main entry point is [`BoardRegistry`], which combines:
//!
//! - [`LocationResolver`]: default and overridden search roots per host
//! - [`ScanCoordinator`]: a completion barrier over work that registers
//!   more work while it runs
//! - [`HardwareIngester`]: `hardware/<vendor>/<arch>` trees into platform
//!   entries
//! - [`LibraryScanner`]: library trees into library entries with their
//!   include requirements
//! - [`SnapshotStore`]: persistence of the discovered maps
//!
//! # Example
//!
//! ```no_run
//! use bk_core::Config;
//! use bk_scanner::BoardRegistry;
//!
//! # async fn run() {
//! let registry = BoardRegistry::from_config(&Config::default());
//! let model = registry.model().await;
//!
//! for id in model.sorted_platform_ids() {
//!     println!("{id}");
//! }
//! for issue in &model.issues {
//!     eprintln!("{}: {}", issue.path, issue.message);
//! }
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! BoardRegistry (one run per refresh)
//!     │
//!     ├── ScanCoordinator "discovery"
//!     │       │
//!     │       └── per root: version detection, hardware, libraries
//!     │
//!     ├── HardwareIngester (nested barrier per hardware folder)
//!     │       │
//!     │       ├── ConfigParser (boards.txt, platform.txt)
//!     │       └── LibraryScanner (bundled libraries)
//!     │
//!     ├── LibraryScanner (nested barrier, bounded open files)
//!     │       │
//!     │       └── FileWalker (ignore crate, blocking pool)
//!     │
//!     └── SnapshotStore (JSON files)
//! ```
//!
//! # Concurrency
//!
//! - Directory walks run on the blocking pool; file reads use `tokio::fs`
//! - Each root and each file read is a spawned task tracked on a barrier
//! - Results are staged behind mutexes and merged by one owner after the
//!   barrier resolves
//! - Cancellation stops new work; in-flight reads drain and the model is
//!   marked cancelled

#![deny(clippy::all)]
#![warn(missing_docs)]

mod coordinator;
mod error;
mod hardware;
mod library;
mod locations;
mod registry;
mod snapshot;
mod stats;
mod walker;

pub use coordinator::{BarrierOutcome, CompletionHandle, ScanCoordinator};
pub use error::{ScanError, SnapshotError};
pub use hardware::{HardwareIngester, HardwareScan, synthesize_platform_paths};
pub use library::{BarrierScope, LibraryScan, LibraryScanner};
pub use locations::LocationResolver;
pub use registry::BoardRegistry;
pub use snapshot::{BOARDS_FILE, JsonFileStore, LIBRARIES_FILE, Snapshot, SnapshotStore};
pub use stats::{ScanStats, StatsSnapshot};
pub use walker::{FileWalker, SOURCE_EXTENSIONS, WalkEntry, WalkOutput, is_source_file};
