//! The aggregated discovery model.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use super::library::{LibraryEntry, LibraryMap};
use super::platform::{PlatformId, PlatformMap};
use super::root::RootStatus;

/// Category of a recoverable problem met during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A root or folder does not exist.
    MissingPath,
    /// A file or directory could not be read.
    Read,
    /// A file sits somewhere the layout does not allow.
    UnexpectedLayout,
    /// The directory walker reported an error.
    Walk,
    /// Anything else.
    Other,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingPath => "missing path",
            Self::Read => "read error",
            Self::UnexpectedLayout => "unexpected layout",
            Self::Walk => "walk error",
            Self::Other => "other",
        })
    }
}

/// A recoverable problem recorded instead of aborting the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    /// Category.
    pub kind: IssueKind,
    /// Path the problem concerns.
    pub path: Utf8PathBuf,
    /// Human-readable detail.
    pub message: String,
}

impl ScanIssue {
    /// Creates an issue.
    #[must_use]
    pub fn new(kind: IssueKind, path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The result of a discovery run.
///
/// # Examples
///
/// ```
/// use bk_core::{DiscoveryModel, LibraryEntry, PlatformId};
///
/// let mut model = DiscoveryModel::default();
/// model
///     .libraries
///     .insert("Wire".to_owned(), LibraryEntry::new("Wire", "/libs/Wire"));
///
/// let avr = PlatformId::new("arduino", "avr");
/// assert!(model.find_library(&avr, "Wire").is_some());
/// assert!(model.find_library(&avr, "Servo").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryModel {
    /// Platforms keyed by `vendor:arch`.
    #[serde(default)]
    pub platforms: PlatformMap,
    /// Global libraries keyed by name.
    #[serde(default)]
    pub libraries: LibraryMap,
    /// Per-root status keyed by root path.
    #[serde(default)]
    pub roots: BTreeMap<Utf8PathBuf, RootStatus>,
    /// Recoverable problems, in the order they were met.
    #[serde(default)]
    pub issues: Vec<ScanIssue>,
    /// Whether the run was cancelled before completing.
    #[serde(default)]
    pub cancelled: bool,
}

impl DiscoveryModel {
    /// Looks up a library for a platform.
    ///
    /// The global map is checked first, then the platform's bundled
    /// libraries. An unknown platform only sees the global map.
    #[must_use]
    pub fn find_library(&self, platform: &PlatformId, name: &str) -> Option<&LibraryEntry> {
        self.libraries.get(name).or_else(|| {
            self.platforms
                .get(platform)
                .and_then(|entry| entry.library_data.get(name))
        })
    }

    /// Filters `names` down to the ones that resolve for `platform`.
    #[must_use]
    pub fn resolvable_dependencies<'a, I>(&self, platform: &PlatformId, names: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| self.find_library(platform, name).is_some())
            .map(str::to_owned)
            .collect()
    }

    /// Returns the requirements of `library` that resolve for `platform`,
    /// excluding the library itself.
    #[must_use]
    pub fn library_dependencies(&self, platform: &PlatformId, library: &str) -> BTreeSet<String> {
        let Some(entry) = self.find_library(platform, library) else {
            return BTreeSet::new();
        };
        self.resolvable_dependencies(
            platform,
            entry
                .requirements
                .iter()
                .map(String::as_str)
                .filter(|req| *req != library),
        )
    }

    /// Runtime roots whose version uses the modern layout.
    #[must_use]
    pub fn acceptable_runtimes(&self) -> Vec<&Utf8Path> {
        self.roots
            .iter()
            .filter(|(_, status)| status.is_acceptable_runtime())
            .map(|(path, _)| path.as_path())
            .collect()
    }

    /// Platform ids in sorted order.
    #[must_use]
    pub fn sorted_platform_ids(&self) -> Vec<&PlatformId> {
        let mut ids: Vec<_> = self.platforms.keys().collect();
        ids.sort();
        ids
    }

    /// Library names in sorted order.
    #[must_use]
    pub fn sorted_library_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.libraries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns `true` if nothing at all was discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty() && self.libraries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlatformEntry, PlatformFolders, RootKind};

    fn model_with_bundled() -> (DiscoveryModel, PlatformId) {
        let avr = PlatformId::new("arduino", "avr");
        let mut entry = PlatformEntry::new(PlatformFolders::new(
            Utf8Path::new("/rt/hardware"),
            "arduino",
            "avr",
        ));
        let mut bundled = LibraryEntry::new("SPI", "/rt/hardware/arduino/avr/libraries/SPI");
        bundled.requirements.insert("Arduino".to_owned());
        entry.library_data.insert("SPI".to_owned(), bundled);

        let mut model = DiscoveryModel::default();
        model.platforms.insert(avr.clone(), entry);

        let mut global_spi = LibraryEntry::new("SPI", "/user/libraries/SPI");
        global_spi.mark_legacy();
        model.libraries.insert("SPI".to_owned(), global_spi);

        let mut sd = LibraryEntry::new("SD", "/user/libraries/SD");
        sd.requirements.insert("SPI".to_owned());
        sd.requirements.insert("SD".to_owned());
        sd.requirements.insert("Missing".to_owned());
        model.libraries.insert("SD".to_owned(), sd);

        (model, avr)
    }

    #[test]
    fn test_find_library_prefers_global() {
        let (model, avr) = model_with_bundled();
        let spi = model.find_library(&avr, "SPI").unwrap();
        assert!(spi.root.as_str().starts_with("/user/"));
    }

    #[test]
    fn test_find_library_falls_back_to_bundled() {
        let (mut model, avr) = model_with_bundled();
        model.libraries.remove("SPI");
        let spi = model.find_library(&avr, "SPI").unwrap();
        assert!(spi.root.as_str().starts_with("/rt/"));

        let other = PlatformId::new("esp", "esp32");
        assert!(model.find_library(&other, "SPI").is_none());
        assert!(model.find_library(&other, "Nope").is_none());
    }

    #[test]
    fn test_resolvable_dependencies() {
        let (model, avr) = model_with_bundled();
        let found = model.resolvable_dependencies(&avr, ["SPI", "Missing", "SD"]);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), ["SD", "SPI"]);
    }

    #[test]
    fn test_library_dependencies() {
        let (model, avr) = model_with_bundled();
        let deps: Vec<_> = model.library_dependencies(&avr, "SD").into_iter().collect();
        assert_eq!(deps, ["SPI"]);
        assert!(model.library_dependencies(&avr, "Unknown").is_empty());
    }

    #[test]
    fn test_acceptable_runtimes() {
        let mut model = DiscoveryModel::default();
        let mut modern = RootStatus::new(RootKind::Runtime);
        modern.runtime_version = Some("1.8.19".to_owned());
        modern.modern = true;
        let mut old = RootStatus::new(RootKind::Runtime);
        old.runtime_version = Some("1.0.6".to_owned());
        model.roots.insert(Utf8PathBuf::from("/new"), modern);
        model.roots.insert(Utf8PathBuf::from("/old"), old);
        model
            .roots
            .insert(Utf8PathBuf::from("/user"), RootStatus::new(RootKind::User));

        assert_eq!(model.acceptable_runtimes(), [Utf8Path::new("/new")]);
    }

    #[test]
    fn test_model_json_round_trip() {
        let (mut model, _) = model_with_bundled();
        model.issues.push(ScanIssue::new(
            IssueKind::UnexpectedLayout,
            "/rt/hardware/a/b/c/boards.txt",
            "too deep",
        ));
        let json = serde_json::to_string(&model).unwrap();
        let parsed: DiscoveryModel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, model);
    }
}
