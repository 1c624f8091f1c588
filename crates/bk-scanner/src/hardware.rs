//! Hardware tree ingestion.
//!
//! A hardware folder is laid out as `<vendor>/<arch>/<leaf>`. The leaves
//! that matter are `boards.txt`, `platform.txt` and a bundled `libraries`
//! folder; `tools` is recognised and ignored.

use std::collections::BTreeSet;
use std::sync::Arc;

use bk_core::{
    ConfigKind, ConfigNode, FolderState, PlatformEntry, PlatformFolders, PlatformId, PlatformMap,
    ScanIssue,
};
use bk_parser::ConfigParser;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::coordinator::CompletionHandle;
use crate::error::ScanError;
use crate::library::{BarrierScope, LibraryScanner};
use crate::walker::{FileWalker, WalkEntry};

/// `vendor/arch/leaf`.
const LEAF_DEPTH: usize = 3;

const TOOLS: &str = "tools";
const LIBRARIES: &str = "libraries";

/// A recognised leaf below `<vendor>/<arch>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Tools,
    Libraries,
    Config(ConfigKind),
}

impl Leaf {
    fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case(TOOLS) {
            Some(Self::Tools)
        } else if name.eq_ignore_ascii_case(LIBRARIES) {
            Some(Self::Libraries)
        } else {
            ConfigKind::from_file_name(name).map(Self::Config)
        }
    }
}

/// Outcome of ingesting one hardware folder.
#[derive(Debug, Clone, Default)]
pub struct HardwareScan {
    /// Platforms found, keyed by `vendor:arch`.
    pub platforms: PlatformMap,
    /// Platforms whose `boards.txt` was parsed.
    pub boards: BTreeSet<PlatformId>,
    /// Platforms whose `platform.txt` was parsed.
    pub platform: BTreeSet<PlatformId>,
    /// Recoverable problems met during ingestion.
    pub issues: Vec<ScanIssue>,
    /// Whether the hardware folder was present.
    pub state: FolderState,
    /// Whether ingestion stopped early because of cancellation.
    pub cancelled: bool,
}

impl HardwareScan {
    /// Writes every platform into `map`. An entry already present under the
    /// same id is replaced whole, so folders, trees and bundled libraries
    /// always come from one hardware folder.
    pub fn merge_into(self, map: &mut PlatformMap) {
        for (id, entry) in self.platforms {
            if let Some(previous) = map.insert(id, entry) {
                debug!(root = %previous.folders.root, "Platform shadowed by a later root");
            }
        }
    }
}

#[derive(Debug, Default)]
struct Staging {
    platforms: PlatformMap,
    boards: BTreeSet<PlatformId>,
    platform: BTreeSet<PlatformId>,
    issues: Vec<ScanIssue>,
}

/// Ingests hardware folders into platform entries.
#[derive(Debug, Clone)]
pub struct HardwareIngester {
    parser: ConfigParser,
    libraries: LibraryScanner,
}

impl HardwareIngester {
    /// Creates an ingester that parses config with `parser` and scans
    /// bundled libraries with `libraries`.
    #[must_use]
    pub const fn new(parser: ConfigParser, libraries: LibraryScanner) -> Self {
        Self { parser, libraries }
    }

    /// Ingests the hardware folder at `hardware_root`.
    ///
    /// Every config read and bundled-library scan is tracked on a barrier
    /// nested in `scope`. Returns once all of them have finished.
    pub async fn ingest(&self, hardware_root: &Utf8Path, scope: &impl BarrierScope) -> HardwareScan {
        let barrier = scope.child_barrier(format!("hardware {hardware_root}"));
        let mut scan = HardwareScan::default();

        if let Err(e) = tokio::fs::metadata(hardware_root).await {
            debug!(root = %hardware_root, error = %e, "Hardware folder unavailable");
            scan.state = FolderState::from_io(&e);
            scan.issues
                .push(ScanError::from_io(hardware_root, e).to_issue(hardware_root));
            return scan;
        }

        let Ok(walk_slot) = barrier.track(format!("walk {hardware_root}")) else {
            scan.cancelled = true;
            return scan;
        };

        let staging = Arc::new(Mutex::new(Staging::default()));
        let entries = match walk(hardware_root).await {
            Ok((entries, errors)) => {
                staging
                    .lock()
                    .issues
                    .extend(errors.iter().map(|e| e.to_issue(hardware_root)));
                entries
            }
            Err(e) => {
                warn!(root = %hardware_root, error = %e, "Hardware walk failed");
                staging.lock().issues.push(e.to_issue(hardware_root));
                Vec::new()
            }
        };

        for entry in entries {
            let Some(leaf) = Leaf::from_name(entry.file_name()) else {
                continue;
            };

            if entry.depth() > LEAF_DEPTH {
                if !inside_skipped_leaf(&entry) {
                    warn!(
                        path = %entry.path,
                        depth = entry.depth(),
                        "Hardware entry nested deeper than vendor/arch/leaf"
                    );
                    let err = ScanError::UnexpectedLayout {
                        path: entry.path.clone(),
                        depth: entry.depth(),
                    };
                    staging.lock().issues.push(err.to_issue(hardware_root));
                }
                continue;
            }

            if leaf == Leaf::Tools || entry.depth() < LEAF_DEPTH {
                continue;
            }

            let folders = PlatformFolders::new(hardware_root, &entry.segments[0], &entry.segments[1]);
            let id = folders.platform_id();
            staging
                .lock()
                .platforms
                .entry(id.clone())
                .or_insert_with(|| PlatformEntry::new(folders.clone()));

            let Ok(slot) = walk_slot.track(entry.relative.clone()) else {
                break;
            };

            match leaf {
                Leaf::Libraries if !entry.is_file => {
                    tokio::spawn(scan_bundled_libraries(
                        self.libraries.clone(),
                        Arc::clone(&staging),
                        slot,
                        id,
                        entry.path,
                    ));
                }
                Leaf::Config(kind) if entry.is_file => {
                    tokio::spawn(read_config(
                        self.parser,
                        Arc::clone(&staging),
                        slot,
                        kind,
                        folders,
                        entry.path,
                    ));
                }
                _ => {
                    debug!(path = %entry.path, "Ignoring hardware entry of unexpected type");
                }
            }
        }

        walk_slot.complete();
        let outcome = barrier.wait().await;

        let staged = std::mem::take(&mut *staging.lock());
        info!(
            root = %hardware_root,
            platforms = staged.platforms.len(),
            issues = staged.issues.len(),
            cancelled = outcome.cancelled,
            "Ingested hardware"
        );

        scan.platforms = staged.platforms;
        scan.boards = staged.boards;
        scan.platform = staged.platform;
        scan.issues.extend(staged.issues);
        scan.state = FolderState::Present;
        scan.cancelled = outcome.cancelled;
        scan
    }
}

/// Adds the path variables derived from where a platform lives.
pub fn synthesize_platform_paths(tree: &mut ConfigNode, folders: &PlatformFolders) {
    let root = &folders.root;
    tree.set_path("build.system.path", root.join("system").as_str());
    tree.set_path("build.core.path", root.join("cores").as_str());
    tree.set_path("build.variant.path", root.join("variants").as_str());
    tree.set_path("runtime.platform.path", root.as_str());
    tree.set_path("runtime.hardware.path", folders.vendor_dir().as_str());
}

async fn walk(root: &Utf8Path) -> Result<(Vec<WalkEntry>, Vec<ScanError>), ScanError> {
    let walker = FileWalker::new(root)?.with_max_depth(LEAF_DEPTH + 1);

    let output = tokio::task::spawn_blocking(move || {
        walker.collect(|entry| Leaf::from_name(entry.file_name()).is_some())
    })
    .await?;

    Ok((output.entries, output.errors))
}

/// Whether `entry` sits inside a `<vendor>/<arch>/libraries` or `tools`
/// folder, where leaf names carry no meaning.
fn inside_skipped_leaf(entry: &WalkEntry) -> bool {
    entry.segments.get(2).is_some_and(|segment| {
        matches!(Leaf::from_name(segment), Some(Leaf::Tools | Leaf::Libraries))
    })
}

async fn scan_bundled_libraries(
    scanner: LibraryScanner,
    staging: Arc<Mutex<Staging>>,
    slot: CompletionHandle,
    id: PlatformId,
    path: Utf8PathBuf,
) {
    let scan = scanner.scan(&path, &slot).await;
    debug!(platform = %id, libraries = scan.libraries.len(), "Scanned bundled libraries");

    let mut staging = staging.lock();
    staging.issues.extend(scan.issues);
    if let Some(entry) = staging.platforms.get_mut(&id) {
        entry.library_data.extend(scan.libraries);
    }
}

async fn read_config(
    parser: ConfigParser,
    staging: Arc<Mutex<Staging>>,
    slot: CompletionHandle,
    kind: ConfigKind,
    folders: PlatformFolders,
    path: Utf8PathBuf,
) {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to read platform config");
            staging
                .lock()
                .issues
                .push(ScanError::read(&path, e).to_issue(&path));
            slot.fail();
            return;
        }
    };

    let parsed = parser.parse_bytes(&bytes);
    let mut tree = parsed.tree;
    if kind == ConfigKind::Platform {
        synthesize_platform_paths(&mut tree, &folders);
    }

    let id = folders.platform_id();
    debug!(platform = %id, kind = %kind, keys = parsed.flat.len(), "Parsed platform config");

    let mut staging = staging.lock();
    if let Some(entry) = staging.platforms.get_mut(&id) {
        entry.set_config(kind, tree, parsed.flat);
    }
    match kind {
        ConfigKind::Boards => staging.boards.insert(id),
        ConfigKind::Platform => staging.platform.insert(id),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::ScanCoordinator;
    use bk_core::{HostPlatform, IssueKind};
    use std::fs;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    fn write(root: &Utf8Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn ingester(host: HostPlatform) -> HardwareIngester {
        HardwareIngester::new(ConfigParser::new(host), LibraryScanner::new(8))
    }

    async fn ingest(root: &Utf8Path) -> HardwareScan {
        let barrier = ScanCoordinator::begin("test", CancellationToken::new());
        let scan = ingester(HostPlatform::Linux).ingest(root, &barrier).await;
        barrier.wait().await;
        scan
    }

    fn avr() -> PlatformId {
        PlatformId::new("arduino", "avr")
    }

    #[test]
    fn test_leaf_from_name() {
        assert_eq!(Leaf::from_name("TOOLS"), Some(Leaf::Tools));
        assert_eq!(Leaf::from_name("Libraries"), Some(Leaf::Libraries));
        assert_eq!(
            Leaf::from_name("Boards.TXT"),
            Some(Leaf::Config(ConfigKind::Boards))
        );
        assert_eq!(Leaf::from_name("programmers.txt"), None);
    }

    #[test]
    fn test_synthesize_platform_paths() {
        let folders = PlatformFolders::new(Utf8Path::new("/rt/hardware"), "arduino", "avr");
        let mut tree = ConfigNode::new();
        synthesize_platform_paths(&mut tree, &folders);

        assert_eq!(
            tree.get_str("build.system.path"),
            Some("/rt/hardware/arduino/avr/system")
        );
        assert_eq!(
            tree.get_str("build.core.path"),
            Some("/rt/hardware/arduino/avr/cores")
        );
        assert_eq!(
            tree.get_str("build.variant.path"),
            Some("/rt/hardware/arduino/avr/variants")
        );
        assert_eq!(
            tree.get_str("runtime.platform.path"),
            Some("/rt/hardware/arduino/avr")
        );
        assert_eq!(
            tree.get_str("runtime.hardware.path"),
            Some("/rt/hardware/arduino")
        );
    }

    #[tokio::test]
    async fn test_ingest_boards_and_platform() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        write(
            &root,
            "arduino/avr/boards.txt",
            "uno.name=Arduino Uno\nuno.build.mcu=atmega328p\nmenu.cpu=Processor\n",
        );
        write(
            &root,
            "arduino/avr/platform.txt",
            "name=Arduino AVR Boards\ncompiler.path={runtime.tools.avr-gcc.path}/bin/\n",
        );

        let scan = ingest(&root).await;
        assert_eq!(scan.state, FolderState::Present);
        assert!(scan.issues.is_empty());
        assert!(scan.boards.contains(&avr()));
        assert!(scan.platform.contains(&avr()));

        let entry = &scan.platforms[&avr()];
        assert_eq!(entry.folders.root, root.join("arduino/avr"));
        assert_eq!(entry.folders.vendor, "arduino");
        assert_eq!(entry.folders.arch, "avr");

        let boards = entry.config(ConfigKind::Boards).unwrap();
        assert_eq!(boards.get_str("uno.build.mcu"), Some("atmega328p"));
        assert!(boards.get("menu").is_none());
        assert_eq!(entry.key_values[&ConfigKind::Boards].len(), 3);

        let platform = entry.config(ConfigKind::Platform).unwrap();
        assert_eq!(platform.get_str("name"), Some("Arduino AVR Boards"));
        let runtime_platform = root.join("arduino/avr");
        assert_eq!(
            platform.get_str("runtime.platform.path"),
            Some(runtime_platform.as_str())
        );
        assert_eq!(entry.key_values[&ConfigKind::Platform].len(), 2);
    }

    #[tokio::test]
    async fn test_bundled_libraries_stay_on_platform() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        write(&root, "arduino/avr/boards.txt", "uno.name=Uno\n");
        write(&root, "arduino/avr/libraries/EEPROM/EEPROM.h", "#include <inttypes.h>\n");
        write(&root, "arduino/avr/libraries/SPI/src/SPI.h", "#include <Arduino.h>\n");

        let scan = ingest(&root).await;
        let entry = &scan.platforms[&avr()];
        assert_eq!(entry.library_data.len(), 2);
        assert_eq!(
            entry.library_data["EEPROM"].include,
            Some(root.join("arduino/avr/libraries/EEPROM"))
        );
        assert!(entry.library_data["SPI"].requirements.contains("Arduino"));
    }

    #[tokio::test]
    async fn test_missing_libraries_folder_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        write(&root, "arduino/sam/boards.txt", "due.name=Due\n");

        let scan = ingest(&root).await;
        let entry = &scan.platforms[&PlatformId::new("arduino", "sam")];
        assert!(entry.library_data.is_empty());
        assert!(scan.issues.is_empty());
    }

    #[tokio::test]
    async fn test_layout_rules() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        write(&root, "boards.txt", "stray=1\n");
        write(&root, "arduino/boards.txt", "stray=1\n");
        write(&root, "arduino/avr/extras/boards.txt", "deep=1\n");
        write(&root, "arduino/avr/tools/boards.txt", "tool=1\n");
        write(&root, "arduino/avr/libraries/platform.txt", "lib=1\n");
        write(&root, "tools/avr/platform.txt", "tool=1\n");
        fs::create_dir_all(root.join("arduino/avr/tools")).unwrap();

        let scan = ingest(&root).await;
        assert_eq!(scan.platforms.len(), 2);
        assert!(scan.boards.is_empty());
        assert!(scan.platform.contains(&PlatformId::new("tools", "avr")));

        assert_eq!(scan.issues.len(), 1);
        assert_eq!(scan.issues[0].kind, IssueKind::UnexpectedLayout);
        assert_eq!(scan.issues[0].path, root.join("arduino/avr/extras/boards.txt"));
    }

    #[tokio::test]
    async fn test_missing_hardware_root() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp).join("hardware");

        let scan = ingest(&root).await;
        assert!(scan.state.is_error());
        assert!(scan.platforms.is_empty());
        assert_eq!(scan.issues[0].kind, IssueKind::MissingPath);
    }

    #[tokio::test]
    async fn test_host_overrides_applied() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        write(
            &root,
            "arduino/avr/platform.txt",
            "tools.avrdude.cmd=avrdude\ntools.avrdude.cmd.windows=avrdude.exe\n",
        );

        let barrier = ScanCoordinator::begin("test", CancellationToken::new());
        let scan = ingester(HostPlatform::Windows).ingest(&root, &barrier).await;
        let platform = scan.platforms[&avr()].config(ConfigKind::Platform).unwrap();
        assert_eq!(platform.get_str("tools.avrdude.cmd"), Some("avrdude.exe"));
    }

    #[tokio::test]
    async fn test_reingest_overwrites_same_platform() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        write(&root, "arduino/avr/boards.txt", "uno.name=Uno\n");

        let mut map = PlatformMap::default();
        ingest(&root).await.merge_into(&mut map);

        write(&root, "arduino/avr/boards.txt", "uno.name=Uno R3\n");
        ingest(&root).await.merge_into(&mut map);

        assert_eq!(map.len(), 1);
        let boards = map[&avr()].config(ConfigKind::Boards).unwrap();
        assert_eq!(boards.get_str("uno.name"), Some("Uno R3"));
    }

    #[tokio::test]
    async fn test_merge_replaces_whole_entry() {
        let temp = TempDir::new().unwrap();
        let base = utf8_root(&temp);
        let first = base.join("first");
        let second = base.join("second");
        write(&first, "arduino/avr/platform.txt", "name=First\n");
        write(&second, "arduino/avr/platform.txt", "name=Second\n");
        write(&second, "arduino/avr/boards.txt", "uno.name=Uno\n");

        let mut map = PlatformMap::default();
        ingest(&second).await.merge_into(&mut map);
        ingest(&first).await.merge_into(&mut map);

        let entry = &map[&avr()];
        let platform = entry.config(ConfigKind::Platform).unwrap();
        assert_eq!(entry.folders.root, first.join("arduino/avr"));
        assert_eq!(platform.get_str("name"), Some("First"));
        assert_eq!(
            platform.get_str("runtime.platform.path"),
            Some(entry.folders.root.as_str())
        );
        assert!(entry.boards.is_none());
    }
}
