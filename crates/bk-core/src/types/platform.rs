//! Hardware platform records.
//!
//! A platform is identified by `vendor:arch` and lives at
//! `<root>/hardware/<vendor>/<arch>`. Each platform carries the parsed
//! `boards.txt` and `platform.txt` trees, their raw key/value maps, and the
//! libraries bundled with it.

use std::collections::BTreeMap;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use super::library::LibraryMap;
use super::node::{ConfigNode, FlatKeyMap};
use crate::hash::FxHashMap;

/// A platform identifier of the form `vendor:arch`.
///
/// # Examples
///
/// ```
/// use bk_core::PlatformId;
///
/// let id = PlatformId::new("arduino", "avr");
/// assert_eq!(id.as_str(), "arduino:avr");
/// assert_eq!(id.vendor(), "arduino");
/// assert_eq!(id.arch(), "avr");
/// assert_eq!(PlatformId::parse("arduino:avr"), Some(id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(String);

impl PlatformId {
    /// Builds an id from its two halves.
    #[must_use]
    pub fn new(vendor: &str, arch: &str) -> Self {
        Self(format!("{vendor}:{arch}"))
    }

    /// Parses `vendor:arch`. Both halves must be non-empty.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (vendor, arch) = raw.split_once(':')?;
        if vendor.is_empty() || arch.is_empty() || arch.contains(':') {
            return None;
        }
        Some(Self(raw.to_owned()))
    }

    /// Returns the `vendor:arch` string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the vendor half.
    #[must_use]
    pub fn vendor(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(v, _)| v)
    }

    /// Returns the architecture half.
    #[must_use]
    pub fn arch(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, a)| a)
    }

    /// Returns the relative path `vendor/arch`.
    #[must_use]
    pub fn as_relative_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(self.vendor()).join(self.arch())
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Where a platform lives and the names it was found under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFolders {
    /// `<root>/hardware/<vendor>/<arch>`.
    pub root: Utf8PathBuf,
    /// The vendor folder name.
    pub vendor: String,
    /// The architecture folder name.
    pub arch: String,
}

impl PlatformFolders {
    /// Derives the folders from a hardware directory and the id halves.
    #[must_use]
    pub fn new(hardware_dir: &Utf8Path, vendor: &str, arch: &str) -> Self {
        Self {
            root: hardware_dir.join(vendor).join(arch),
            vendor: vendor.to_owned(),
            arch: arch.to_owned(),
        }
    }

    /// `<root>/hardware/<vendor>`.
    #[must_use]
    pub fn vendor_dir(&self) -> &Utf8Path {
        self.root.parent().unwrap_or(self.root.as_path())
    }

    /// The platform id these folders belong to.
    #[must_use]
    pub fn platform_id(&self) -> PlatformId {
        PlatformId::new(&self.vendor, &self.arch)
    }
}

/// Which per-platform config file a tree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKind {
    /// `boards.txt`.
    Boards,
    /// `platform.txt`.
    Platform,
}

impl ConfigKind {
    /// Matches a file name case-insensitively.
    ///
    /// ```
    /// use bk_core::ConfigKind;
    ///
    /// assert_eq!(ConfigKind::from_file_name("Boards.TXT"), Some(ConfigKind::Boards));
    /// assert_eq!(ConfigKind::from_file_name("programmers.txt"), None);
    /// ```
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("boards.txt") {
            Some(Self::Boards)
        } else if name.eq_ignore_ascii_case("platform.txt") {
            Some(Self::Platform)
        } else {
            None
        }
    }

    /// The canonical file name.
    #[inline]
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Boards => "boards.txt",
            Self::Platform => "platform.txt",
        }
    }

    /// The key used in model output (`boards` / `platform`).
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boards => "boards",
            Self::Platform => "platform",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one hardware platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    /// Folder locations.
    pub folders: PlatformFolders,
    /// Parsed `boards.txt`, keyed by board id at the top level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boards: Option<ConfigNode>,
    /// Parsed `platform.txt`, including the synthesized runtime keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<ConfigNode>,
    /// Raw key/value maps per config file.
    #[serde(default)]
    pub key_values: BTreeMap<ConfigKind, FlatKeyMap>,
    /// Libraries bundled under `<arch>/libraries`.
    #[serde(default)]
    pub library_data: LibraryMap,
}

impl PlatformEntry {
    /// Creates an entry with no config loaded yet.
    #[must_use]
    pub fn new(folders: PlatformFolders) -> Self {
        Self {
            folders,
            boards: None,
            platform: None,
            key_values: BTreeMap::new(),
            library_data: LibraryMap::default(),
        }
    }

    /// Stores a parsed config file under its kind.
    pub fn set_config(&mut self, kind: ConfigKind, tree: ConfigNode, flat: FlatKeyMap) {
        match kind {
            ConfigKind::Boards => self.boards = Some(tree),
            ConfigKind::Platform => self.platform = Some(tree),
        }
        self.key_values.insert(kind, flat);
    }

    /// Returns the tree for `kind`, if loaded.
    #[must_use]
    pub fn config(&self, kind: ConfigKind) -> Option<&ConfigNode> {
        match kind {
            ConfigKind::Boards => self.boards.as_ref(),
            ConfigKind::Platform => self.platform.as_ref(),
        }
    }

    /// Board ids declared in `boards.txt`.
    pub fn board_ids(&self) -> impl Iterator<Item = &str> {
        self.boards
            .iter()
            .flat_map(|tree| tree.iter())
            .filter(|(_, value)| value.as_node().is_some())
            .map(|(id, _)| id)
    }
}

/// All discovered platforms keyed by id.
pub type PlatformMap = FxHashMap<PlatformId, PlatformEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_id_parse() {
        assert!(PlatformId::parse("arduino:avr").is_some());
        assert!(PlatformId::parse("arduino").is_none());
        assert!(PlatformId::parse(":avr").is_none());
        assert!(PlatformId::parse("arduino:").is_none());
        assert!(PlatformId::parse("a:b:c").is_none());
    }

    #[test]
    fn test_platform_id_relative_path() {
        let id = PlatformId::new("arduino", "avr");
        assert_eq!(id.as_relative_path(), Utf8PathBuf::from("arduino/avr"));
    }

    #[test]
    fn test_platform_id_ordering() {
        let mut ids = vec![
            PlatformId::new("esp", "esp32"),
            PlatformId::new("arduino", "sam"),
            PlatformId::new("arduino", "avr"),
        ];
        ids.sort();
        let names: Vec<_> = ids.iter().map(PlatformId::as_str).collect();
        assert_eq!(names, ["arduino:avr", "arduino:sam", "esp:esp32"]);
    }

    #[test]
    fn test_folders() {
        let folders = PlatformFolders::new(Utf8Path::new("/r/hardware"), "arduino", "avr");
        assert_eq!(folders.root, Utf8PathBuf::from("/r/hardware/arduino/avr"));
        assert_eq!(folders.vendor_dir(), Utf8Path::new("/r/hardware/arduino"));
        assert_eq!(folders.vendor, "arduino");
        assert_eq!(folders.arch, "avr");
        assert_eq!(folders.platform_id(), PlatformId::new("arduino", "avr"));
    }

    #[test]
    fn test_set_config_and_board_ids() {
        let folders = PlatformFolders::new(Utf8Path::new("/r/hardware"), "arduino", "avr");
        let mut entry = PlatformEntry::new(folders);

        let mut tree = ConfigNode::new();
        tree.set_path("uno.name", "Arduino Uno");
        tree.set_path("mega.name", "Arduino Mega");
        let mut flat = FlatKeyMap::new();
        flat.insert("uno.name".to_owned(), "Arduino Uno".to_owned());
        entry.set_config(ConfigKind::Boards, tree, flat);

        let ids: Vec<_> = entry.board_ids().collect();
        assert_eq!(ids, ["mega", "uno"]);
        assert!(entry.config(ConfigKind::Platform).is_none());
        assert_eq!(entry.key_values[&ConfigKind::Boards].len(), 1);
    }

    #[test]
    fn test_config_kind_serializes_as_map_key() {
        let mut entry = PlatformEntry::new(PlatformFolders::new(
            Utf8Path::new("/h"),
            "v",
            "a",
        ));
        entry
            .key_values
            .insert(ConfigKind::Platform, FlatKeyMap::new());
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["key_values"].get("platform").is_some());
    }
}
