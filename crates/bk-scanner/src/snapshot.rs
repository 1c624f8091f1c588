//! Persistence of discovery results.
//!
//! A [`Snapshot`] holds the two keyed maps of a [`DiscoveryModel`]. Stores
//! implement [`SnapshotStore`]; [`JsonFileStore`] keeps them as
//! `boards.json` and `libraries.json` in one directory.

use std::fmt;
use std::fs;

use bk_core::{DiscoveryModel, LibraryMap, PlatformMap};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::SnapshotError;

/// File holding the platform map.
pub const BOARDS_FILE: &str = "boards.json";

/// File holding the library map.
pub const LIBRARIES_FILE: &str = "libraries.json";

/// The persisted part of a discovery model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Platforms keyed by `vendor:arch`.
    pub boards: PlatformMap,
    /// Global libraries keyed by name.
    pub libraries: LibraryMap,
}

impl Snapshot {
    /// Copies the keyed maps out of `model`.
    #[must_use]
    pub fn from_model(model: &DiscoveryModel) -> Self {
        Self {
            boards: model.platforms.clone(),
            libraries: model.libraries.clone(),
        }
    }

    /// Builds a model from the snapshot. Root status and issues are not
    /// persisted, so they start empty.
    #[must_use]
    pub fn into_model(self) -> DiscoveryModel {
        DiscoveryModel {
            platforms: self.boards,
            libraries: self.libraries,
            ..DiscoveryModel::default()
        }
    }
}

/// Load/store interface for snapshots.
///
/// Calls are blocking; async callers run them on the blocking pool.
pub trait SnapshotStore: fmt::Debug + Send + Sync {
    /// Persists `snapshot`, replacing any previous one.
    fn store(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// Loads the last stored snapshot.
    fn load(&self) -> Result<Snapshot, SnapshotError>;
}

/// Stores snapshots as two JSON files in a directory.
///
/// # Examples
///
/// ```no_run
/// use bk_scanner::{JsonFileStore, SnapshotStore};
///
/// let store = JsonFileStore::new("/home/ada/.cache/boardkit");
/// match store.load() {
///     Ok(snapshot) => println!("{} platforms", snapshot.boards.len()),
///     Err(e) if e.is_decode() => eprintln!("snapshot corrupt: {e}"),
///     Err(e) => eprintln!("no snapshot: {e}"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileStore {
    dir: Utf8PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `dir`. Nothing is touched until the first
    /// call.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The snapshot directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Default directory under the user's cache folder, if one exists.
    #[must_use]
    pub fn default_dir() -> Option<Utf8PathBuf> {
        let cache = dirs::cache_dir()?;
        Utf8PathBuf::from_path_buf(cache.join("boardkit")).ok()
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), SnapshotError> {
        let path = self.dir.join(name);
        let json = serde_json::to_vec_pretty(value).map_err(SnapshotError::Encode)?;
        fs::write(&path, json).map_err(|e| SnapshotError::from_io(&path, e))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, SnapshotError> {
        let path = self.dir.join(name);
        let bytes = fs::read(&path).map_err(|e| SnapshotError::from_io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Decode { path, source })
    }
}

impl SnapshotStore for JsonFileStore {
    fn store(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|e| SnapshotError::from_io(&self.dir, e))?;
        self.write_json(BOARDS_FILE, &snapshot.boards)?;
        self.write_json(LIBRARIES_FILE, &snapshot.libraries)?;
        debug!(
            dir = %self.dir,
            platforms = snapshot.boards.len(),
            libraries = snapshot.libraries.len(),
            "Stored snapshot"
        );
        Ok(())
    }

    fn load(&self) -> Result<Snapshot, SnapshotError> {
        let boards = self.read_json(BOARDS_FILE)?;
        let libraries = self.read_json(LIBRARIES_FILE)?;
        Ok(Snapshot { boards, libraries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::{
        ConfigKind, ConfigNode, FlatKeyMap, LibraryEntry, PlatformEntry, PlatformFolders,
        PlatformId,
    };
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> JsonFileStore {
        JsonFileStore::new(Utf8PathBuf::from_path_buf(temp.path().join("snap")).unwrap())
    }

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::default();

        let folders = PlatformFolders::new(Utf8Path::new("/rt/hardware"), "arduino", "avr");
        let mut entry = PlatformEntry::new(folders);
        let mut tree = ConfigNode::new();
        tree.set_path("uno.name", "Arduino Uno");
        let mut flat = FlatKeyMap::new();
        flat.insert("uno.name".to_owned(), "Arduino Uno".to_owned());
        entry.set_config(ConfigKind::Boards, tree, flat);
        snapshot
            .boards
            .insert(PlatformId::new("arduino", "avr"), entry);

        let mut wire = LibraryEntry::new("Wire", "/rt/libraries/Wire");
        wire.mark_modern();
        wire.requirements.insert("Arduino".to_owned());
        snapshot.libraries.insert("Wire".to_owned(), wire);

        snapshot
    }

    #[test]
    fn test_store_then_load() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        let snapshot = sample();

        store.store(&snapshot).unwrap();
        assert!(store.dir().join(BOARDS_FILE).exists());
        assert!(store.dir().join(LIBRARIES_FILE).exists());
        assert_eq!(store.load().unwrap(), snapshot);
    }

    #[test]
    fn test_boards_json_shape() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.store(&sample()).unwrap();

        let raw = fs::read_to_string(store.dir().join(BOARDS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["arduino:avr"]["boards"]["uno"]["name"], "Arduino Uno");
        assert_eq!(json["arduino:avr"]["folders"]["vendor"], "arduino");
        assert_eq!(json["arduino:avr"]["key_values"]["boards"]["uno.name"], "Arduino Uno");
    }

    #[test]
    fn test_load_missing() {
        let temp = TempDir::new().unwrap();
        let err = store_in(&temp).load().unwrap_err();
        assert!(matches!(err, SnapshotError::NotFound { .. }));
    }

    #[test]
    fn test_load_malformed_is_decode_error() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.store(&sample()).unwrap();
        fs::write(store.dir().join(LIBRARIES_FILE), "{ \"Wire\": [").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains(LIBRARIES_FILE));
    }

    #[test]
    fn test_into_model() {
        let model = sample().into_model();
        assert_eq!(model.platforms.len(), 1);
        assert!(model.libraries.contains_key("Wire"));
        assert!(model.roots.is_empty());
        assert!(!model.cancelled);
        assert_eq!(Snapshot::from_model(&model), sample());
    }
}
