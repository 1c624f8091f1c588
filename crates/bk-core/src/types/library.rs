//! Library records.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::hash::FxHashMap;

/// Version recorded for libraries using the `src/` layout.
pub const MODERN_LAYOUT_VERSION: &str = "1.5";

/// Folder layout of a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryLayout {
    /// `<name>/<name>.h`; headers included from the library root.
    Legacy,
    /// `<name>/src/<name>.h`; headers included from `src`.
    Modern,
    /// No main header was found.
    Unknown,
}

/// A discovered library.
///
/// `files` holds every header and source path relative to `root`, with `/`
/// separators. `requirements` holds the header stems the library includes;
/// `dependencies` is the subset that resolves to another known library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// The library's folder name.
    pub name: String,
    /// `<libraries>/<name>`.
    pub root: Utf8PathBuf,
    /// Directory to add to the include path, once the layout is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Utf8PathBuf>,
    /// Layout version; only set for the modern layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Relative paths of all matched files.
    #[serde(default)]
    pub files: BTreeSet<String>,
    /// Header stems included by the library's files.
    #[serde(default)]
    pub requirements: BTreeSet<String>,
    /// Requirements that name another known library.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

impl LibraryEntry {
    /// Creates an empty record for the library rooted at `root`.
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            include: None,
            version: None,
            files: BTreeSet::new(),
            requirements: BTreeSet::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Marks the library as legacy layout: include from the root.
    pub fn mark_legacy(&mut self) {
        self.include = Some(self.root.clone());
    }

    /// Marks the library as modern layout: include from `src`.
    pub fn mark_modern(&mut self) {
        self.include = Some(self.root.join("src"));
        self.version = Some(MODERN_LAYOUT_VERSION.to_owned());
    }

    /// Infers the layout from the include directory.
    #[must_use]
    pub fn layout(&self) -> LibraryLayout {
        match &self.include {
            None => LibraryLayout::Unknown,
            Some(include) if include == &self.root => LibraryLayout::Legacy,
            Some(_) => LibraryLayout::Modern,
        }
    }

    /// Returns the include directory, if known.
    #[must_use]
    pub fn include_dir(&self) -> Option<&Utf8Path> {
        self.include.as_deref()
    }
}

/// Libraries keyed by name.
pub type LibraryMap = FxHashMap<String, LibraryEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_unknown() {
        let entry = LibraryEntry::new("Servo", "/libs/Servo");
        assert_eq!(entry.layout(), LibraryLayout::Unknown);
        assert!(entry.include_dir().is_none());
        assert!(entry.version.is_none());
    }

    #[test]
    fn test_mark_legacy() {
        let mut entry = LibraryEntry::new("Servo", "/libs/Servo");
        entry.mark_legacy();
        assert_eq!(entry.layout(), LibraryLayout::Legacy);
        assert_eq!(entry.include_dir(), Some(Utf8Path::new("/libs/Servo")));
        assert!(entry.version.is_none());
    }

    #[test]
    fn test_mark_modern() {
        let mut entry = LibraryEntry::new("Servo", "/libs/Servo");
        entry.mark_modern();
        assert_eq!(entry.layout(), LibraryLayout::Modern);
        assert_eq!(entry.include_dir(), Some(Utf8Path::new("/libs/Servo/src")));
        assert_eq!(entry.version.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_serialization_skips_unknown_include() {
        let entry = LibraryEntry::new("Wire", "/libs/Wire");
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("include").is_none());
        assert_eq!(json["name"], "Wire");
    }
}
