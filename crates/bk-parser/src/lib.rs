//! Text parsers for toolchain config, library sources, and version files.
//!
//! This crate turns the text files found during discovery into structured
//! data:
//!
//! - [`ConfigParser`] parses `boards.txt` / `platform.txt` into a
//!   platform-resolved [`ConfigNode`](bk_core::ConfigNode) tree plus a flat
//!   key map
//! - [`extract_include_names`] collects the header stems a C/C++ source file
//!   includes
//! - [`parse_runtime_version`] reads a runtime's `lib/version.txt`
//!
//! # Config Overrides
//!
//! A key may end in a host alias. The value for the current host replaces
//! the generic key; values for other hosts are kept out of the tree:
//!
//! ```
//! use bk_core::HostPlatform;
//! use bk_parser::parse_config;
//!
//! let raw = "tools.avrdude.cmd.windows=avrdude.exe\n";
//!
//! let on_windows = parse_config(raw, HostPlatform::Windows);
//! assert_eq!(on_windows.tree.get_str("tools.avrdude.cmd"), Some("avrdude.exe"));
//!
//! let on_linux = parse_config(raw, HostPlatform::Linux);
//! assert!(on_linux.tree.lookup("tools.avrdude.cmd").is_none());
//! assert_eq!(on_linux.flat.len(), 1);
//! ```
//!
//! # Thread Safety
//!
//! Every parser here is stateless or `Copy`. Regular expressions are
//! compiled once and shared globally.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
mod includes;
pub mod patterns;
mod version;

pub use config::{ConfigParser, ParsedConfig, parse_config};
pub use error::ParseError;
pub use includes::{extend_include_names, extract_include_names};
pub use version::{MODERN_RUNTIME, RuntimeVersion, parse_runtime_version};
