//! Library tree scanning.
//!
//! A libraries folder holds one directory per library. [`LibraryScanner`]
//! walks it, classifies each library's layout, records its source files,
//! and reads every file to collect the headers it includes.
//!
//! ```text
//! libraries/
//! ├── Servo/
//! │   ├── Servo.h          legacy layout: include = Servo/
//! │   └── examples/        never descended into
//! └── Wire/
//!     └── src/Wire.h       modern layout: include = Wire/src, version 1.5
//! ```

use std::sync::Arc;

use bk_core::{FolderState, LibraryEntry, LibraryLayout, LibraryMap, ScanIssue};
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::coordinator::{CompletionHandle, ScanCoordinator};
use crate::error::ScanError;
use crate::walker::{FileWalker, WalkEntry, is_source_file};

/// Directory names never descended into inside a library tree.
const SKIP_DIRS: &[&str] = &["examples"];

/// Something a nested barrier can be opened from.
///
/// Implemented by [`ScanCoordinator`] for top-level scans and by
/// [`CompletionHandle`] for scans started from inside a tracked operation.
pub trait BarrierScope {
    /// Opens a nested barrier.
    fn child_barrier(&self, label: String) -> ScanCoordinator;
}

impl BarrierScope for ScanCoordinator {
    fn child_barrier(&self, label: String) -> ScanCoordinator {
        self.child(label)
    }
}

impl BarrierScope for CompletionHandle {
    fn child_barrier(&self, label: String) -> ScanCoordinator {
        self.child(label)
    }
}

/// Outcome of scanning one libraries folder.
#[derive(Debug, Clone, Default)]
pub struct LibraryScan {
    /// Libraries keyed by folder name.
    pub libraries: LibraryMap,
    /// Recoverable problems met during the scan.
    pub issues: Vec<ScanIssue>,
    /// Whether the folder was present.
    pub state: FolderState,
    /// Whether the scan stopped early because of cancellation.
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct Staging {
    libraries: LibraryMap,
    issues: Vec<ScanIssue>,
}

/// Scans library trees with a bound on concurrently open files.
///
/// Cloning is cheap; clones share the open-file limit.
///
/// # Examples
///
/// ```no_run
/// use bk_scanner::{LibraryScanner, ScanCoordinator};
/// use camino::Utf8Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() {
/// let scanner = LibraryScanner::new(64);
/// let barrier = ScanCoordinator::begin("libraries", CancellationToken::new());
/// let scan = scanner
///     .scan(Utf8Path::new("/home/ada/Documents/Arduino/libraries"), &barrier)
///     .await;
///
/// for (name, library) in &scan.libraries {
///     println!("{name}: {:?}", library.requirements);
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LibraryScanner {
    open_files: Arc<Semaphore>,
}

impl LibraryScanner {
    /// Creates a scanner that keeps at most `max_open_files` files open.
    #[must_use]
    pub fn new(max_open_files: usize) -> Self {
        Self {
            open_files: Arc::new(Semaphore::new(max_open_files.max(1))),
        }
    }

    /// Scans the libraries folder at `root`.
    ///
    /// All file reads are tracked on a barrier nested in `scope`; the scan
    /// returns only once every read has finished. Missing folders and
    /// unreadable files are reported in the result, never as an error.
    pub async fn scan(&self, root: &Utf8Path, scope: &impl BarrierScope) -> LibraryScan {
        let barrier = scope.child_barrier(format!("libraries {root}"));
        let mut scan = LibraryScan::default();

        if let Err(e) = tokio::fs::metadata(root).await {
            debug!(root = %root, error = %e, "Libraries folder unavailable");
            scan.state = FolderState::from_io(&e);
            scan.issues.push(ScanError::from_io(root, e).to_issue(root));
            return scan;
        }

        let walk_slot = match barrier.track(format!("walk {root}")) {
            Ok(slot) => slot,
            Err(_) => {
                scan.cancelled = true;
                return scan;
            }
        };

        let staging = Arc::new(Mutex::new(Staging::default()));
        let entries = match walk(root).await {
            Ok((entries, errors)) => {
                staging
                    .lock()
                    .issues
                    .extend(errors.iter().map(|e| e.to_issue(root)));
                entries
            }
            Err(e) => {
                warn!(root = %root, error = %e, "Library walk failed");
                staging.lock().issues.push(e.to_issue(root));
                Vec::new()
            }
        };

        for entry in entries {
            let Some(name) = entry.segments.first().cloned() else {
                continue;
            };

            let read_slot = match walk_slot.track(entry.relative.clone()) {
                Ok(slot) => slot,
                Err(_) => break,
            };

            stage_file(&staging, root, &name, &entry);
            tokio::spawn(read_requirements(
                Arc::clone(&self.open_files),
                Arc::clone(&staging),
                read_slot,
                name,
                entry.path,
            ));
        }

        walk_slot.complete();
        let outcome = barrier.wait().await;

        let staged = std::mem::take(&mut *staging.lock());
        info!(
            root = %root,
            libraries = staged.libraries.len(),
            issues = staged.issues.len(),
            cancelled = outcome.cancelled,
            "Scanned libraries"
        );

        scan.libraries = staged.libraries;
        scan.issues.extend(staged.issues);
        scan.state = FolderState::Present;
        scan.cancelled = outcome.cancelled;
        scan
    }
}

async fn walk(root: &Utf8Path) -> Result<(Vec<WalkEntry>, Vec<ScanError>), ScanError> {
    let walker = FileWalker::new(root)?
        .with_min_depth(2)
        .with_skip_dirs(SKIP_DIRS);

    let output = tokio::task::spawn_blocking(move || {
        walker.collect(|entry| entry.is_file && is_source_file(&entry.relative))
    })
    .await?;

    Ok((output.entries, output.errors))
}

/// Records a file and applies layout detection to its library.
fn stage_file(staging: &Mutex<Staging>, root: &Utf8Path, name: &str, entry: &WalkEntry) {
    let mut staging = staging.lock();
    let library = staging
        .libraries
        .entry(name.to_owned())
        .or_insert_with(|| LibraryEntry::new(name, root.join(name)));

    let in_library = entry.segments[1..].join("/");
    match classify(name, &entry.relative) {
        Some(LibraryLayout::Modern) => library.mark_modern(),
        Some(LibraryLayout::Legacy) if library.layout() != LibraryLayout::Modern => {
            library.mark_legacy();
        }
        _ => {}
    }
    library.files.insert(in_library);
}

/// Detects the main header of a library from a path relative to the
/// libraries folder. Matching ignores case.
fn classify(name: &str, relative: &str) -> Option<LibraryLayout> {
    let relative = relative.to_ascii_lowercase();
    let name = name.to_ascii_lowercase();

    if relative == format!("{name}/{name}.h") {
        Some(LibraryLayout::Legacy)
    } else if relative == format!("{name}/src/{name}.h") {
        Some(LibraryLayout::Modern)
    } else {
        None
    }
}

async fn read_requirements(
    open_files: Arc<Semaphore>,
    staging: Arc<Mutex<Staging>>,
    slot: CompletionHandle,
    library: String,
    path: Utf8PathBuf,
) {
    let permit = tokio::select! {
        biased;
        () = slot.cancellation_token().cancelled() => return,
        permit = open_files.acquire_owned() => permit,
    };
    let Ok(_permit) = permit else {
        return;
    };

    let source = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to read library file");
            staging
                .lock()
                .issues
                .push(ScanError::read(&path, e).to_issue(&path));
            slot.fail();
            return;
        }
    };

    let text = String::from_utf8_lossy(&source);
    match bk_parser::extract_include_names(&text) {
        Ok(names) => {
            let mut staging = staging.lock();
            if let Some(entry) = staging.libraries.get_mut(&library) {
                entry.requirements.extend(names);
            }
        }
        Err(e) => {
            staging
                .lock()
                .issues
                .push(ScanError::parse(&path, e).to_issue(&path));
            slot.fail();
        }
    }
}
