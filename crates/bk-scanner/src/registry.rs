//! The board and library registry.
//!
//! [`BoardRegistry`] runs discovery over a set of [`ScanRoot`]s and owns the
//! resulting [`DiscoveryModel`]. Each root gets three tracked operations:
//!
//! - read `<root>/lib/version.txt`
//! - ingest `<root>/hardware`
//! - scan `<root>/libraries`
//!
//! Results are staged per root while the scan runs and merged in precedence
//! order (runtime roots before user roots, then by rank) once the completion
//! barrier resolves. Callers never observe a partially merged model.
//!
//! # Usage
//!
//! ```no_run
//! use bk_core::{HostPlatform, PlatformId, RootKind, ScanRoot};
//! use bk_scanner::BoardRegistry;
//!
//! # async fn run() {
//! let roots = vec![
//!     ScanRoot::new("/usr/share/arduino", RootKind::Runtime, 0),
//!     ScanRoot::new("/home/ada/Arduino", RootKind::User, 1),
//! ];
//! let registry = BoardRegistry::new(roots, HostPlatform::Linux);
//!
//! let boards = registry.board_metadata().await;
//! println!("{} platforms", boards.len());
//!
//! // Served from the cached run.
//! let avr = PlatformId::new("arduino", "avr");
//! if let Some(wire) = registry.find_library(&avr, "Wire").await {
//!     println!("Wire lives in {}", wire.root);
//! }
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use bk_core::{
    Config, DiscoveryModel, HostPlatform, LibraryEntry, LibraryMap, PlatformId,
    PlatformMap, RootStatus, ScanIssue, ScanRoot,
};
use bk_parser::ConfigParser;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::{CompletionHandle, ScanCoordinator};
use crate::error::{ScanError, SnapshotError};
use crate::hardware::{HardwareIngester, HardwareScan};
use crate::library::{LibraryScan, LibraryScanner};
use crate::locations::LocationResolver;
use crate::snapshot::{JsonFileStore, Snapshot, SnapshotStore};
use crate::stats::StatsSnapshot;

/// Everything one root contributed, staged until the barrier resolves.
#[derive(Debug)]
struct RootScan {
    root: ScanRoot,
    status: RootStatus,
    hardware: Option<HardwareScan>,
    libraries: Option<LibraryScan>,
    issues: Vec<ScanIssue>,
}

impl RootScan {
    fn new(root: ScanRoot) -> Self {
        let status = RootStatus::new(root.kind);
        Self {
            root,
            status,
            hardware: None,
            libraries: None,
            issues: Vec::new(),
        }
    }

    /// Applies a version detection result. Refusals after cancellation are not issues.
    fn record_version(
        &mut self,
        version: Result<Option<bk_parser::RuntimeVersion>, ScanError>,
    ) {
        match version {
            Ok(Some(version)) => {
                self.status.modern = version.is_modern();
                self.status.runtime_version = Some(version.raw);
            }
            Ok(None) => {}
            Err(e) if e.is_recoverable() => self.issues.push(e.to_issue(&self.root.path)),
            Err(e) => debug!(root = %self.root.path, error = %e, "Version detection skipped"),
        }
    }
}

/// Discovery entry point and owner of the discovered model.
///
/// # Caching
///
/// [`model`](Self::model), [`board_metadata`](Self::board_metadata) and
/// [`library_metadata`](Self::library_metadata) share one cached run: the
/// first caller scans, concurrent callers wait for that same scan, and
/// later callers get the cached result until [`refresh`](Self::refresh) or
/// [`seed`](Self::seed) replaces it.
///
/// # Cloning
///
/// `BoardRegistry` is cheaply cloneable. Clones share the cached model,
/// the cancellation token and the open-file limit.
#[derive(Debug, Clone)]
pub struct BoardRegistry {
    /// Roots in resolved order.
    roots: Vec<ScanRoot>,
    /// Host-resolving config parser.
    parser: ConfigParser,
    /// Library scanner shared by global and bundled library folders.
    libraries: LibraryScanner,
    /// Parent token for every run.
    cancel: CancellationToken,
    /// Snapshot persistence, if any.
    store: Option<Arc<dyn SnapshotStore>>,
    /// Whether a completed scan is written to `store`.
    store_after_scan: bool,
    /// The cached model; held across a scan so callers share one run.
    model: Arc<tokio::sync::Mutex<Option<Arc<DiscoveryModel>>>>,
    /// Barrier counters of the last completed scan.
    last_stats: Arc<Mutex<Option<StatsSnapshot>>>,
}

impl BoardRegistry {
    /// Creates a registry over explicit roots.
    #[must_use]
    pub fn new(roots: Vec<ScanRoot>, host: HostPlatform) -> Self {
        Self {
            roots,
            parser: ConfigParser::new(host),
            libraries: LibraryScanner::new(bk_core::config::DEFAULT_MAX_OPEN_FILES),
            cancel: CancellationToken::new(),
            store: None,
            store_after_scan: true,
            model: Arc::new(tokio::sync::Mutex::new(None)),
            last_stats: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a registry from configuration, resolving roots with
    /// [`LocationResolver`] and opening a [`JsonFileStore`] when a snapshot
    /// directory is set.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let resolver = LocationResolver::from_config(&config.discovery);
        let roots = resolver.resolve_all(&config.discovery);

        let mut registry = Self::new(roots, resolver.host())
            .with_max_open_files(config.discovery.max_open_files)
            .with_store_after_scan(config.snapshot.store_after_scan);
        if let Some(dir) = &config.snapshot.dir {
            registry = registry.with_store(Arc::new(JsonFileStore::new(dir.clone())));
        }
        registry
    }

    /// Creates a registry with no roots, seeded from `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the snapshot cannot be loaded.
    pub async fn from_snapshot(
        store: Arc<dyn SnapshotStore>,
        host: HostPlatform,
    ) -> Result<Self, SnapshotError> {
        let registry = Self::new(Vec::new(), host).with_store(store);
        registry.seed().await?;
        Ok(registry)
    }

    /// Sets the bound on concurrently open library files.
    #[must_use]
    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.libraries = LibraryScanner::new(max_open_files);
        self
    }

    /// Attaches a snapshot store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Configures whether completed scans are written to the store.
    #[must_use]
    pub const fn with_store_after_scan(mut self, store_after_scan: bool) -> Self {
        self.store_after_scan = store_after_scan;
        self
    }

    /// Uses `token` as the parent of every run's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The roots this registry scans, in resolved order.
    #[must_use]
    pub fn roots(&self) -> &[ScanRoot] {
        &self.roots
    }

    /// Cancels the current and all future runs. In-flight reads drain and
    /// the model is marked cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The parent cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Barrier counters from the last completed scan.
    #[must_use]
    pub fn last_stats(&self) -> Option<StatsSnapshot> {
        *self.last_stats.lock()
    }

    /// Runs a fresh discovery over the configured roots.
    ///
    /// Does not touch the cached model. Per-entity failures are recorded in
    /// [`DiscoveryModel::issues`]; the run itself cannot fail.
    pub async fn discover(&self) -> DiscoveryModel {
        info!(roots = self.roots.len(), "Starting discovery");

        let barrier = ScanCoordinator::begin("discovery", self.cancel.child_token());
        let ingester = HardwareIngester::new(self.parser, self.libraries.clone());
        let staged: Arc<Mutex<Vec<RootScan>>> = Arc::new(Mutex::new(Vec::new()));

        for root in &self.roots {
            let Ok(slot) = barrier.track(format!("root {}", root.path)) else {
                break;
            };
            tokio::spawn(scan_root(
                root.clone(),
                ingester.clone(),
                self.libraries.clone(),
                slot,
                Arc::clone(&staged),
            ));
        }

        let outcome = barrier.wait().await;
        *self.last_stats.lock() = Some(outcome.stats);

        let mut scans = std::mem::take(&mut *staged.lock());
        let mut model = merge(&mut scans);
        model.cancelled = outcome.cancelled;

        info!(
            platforms = model.platforms.len(),
            libraries = model.libraries.len(),
            issues = model.issues.len(),
            operations = outcome.stats.issued,
            success_rate = outcome.stats.success_rate(),
            cancelled = model.cancelled,
            "Discovery complete"
        );
        model
    }

    /// Returns the cached model, scanning first if there is none.
    pub async fn model(&self) -> Arc<DiscoveryModel> {
        let mut cached = self.model.lock().await;
        if let Some(model) = cached.as_ref() {
            debug!("Serving cached discovery model");
            return Arc::clone(model);
        }

        let model = Arc::new(self.discover().await);
        *cached = Some(Arc::clone(&model));
        drop(cached);

        self.persist_in_background(&model);
        model
    }

    /// Drops the cached model and scans again.
    pub async fn refresh(&self) -> Arc<DiscoveryModel> {
        let mut cached = self.model.lock().await;
        cached.take();

        let model = Arc::new(self.discover().await);
        *cached = Some(Arc::clone(&model));
        drop(cached);

        self.persist_in_background(&model);
        model
    }

    /// Platform metadata keyed by `vendor:arch`.
    pub async fn board_metadata(&self) -> PlatformMap {
        self.model().await.platforms.clone()
    }

    /// Global library metadata keyed by library name.
    pub async fn library_metadata(&self) -> LibraryMap {
        self.model().await.libraries.clone()
    }

    /// Looks up `name` for `platform`: global libraries first, then the
    /// platform's bundled ones.
    pub async fn find_library(&self, platform: &PlatformId, name: &str) -> Option<LibraryEntry> {
        self.model().await.find_library(platform, name).cloned()
    }

    /// Filters `names` down to the libraries that resolve for `platform`.
    pub async fn resolvable_dependencies(
        &self,
        platform: &PlatformId,
        names: &[&str],
    ) -> BTreeSet<String> {
        self.model()
            .await
            .resolvable_dependencies(platform, names.iter().copied())
    }

    /// Replaces the cached model with the store's snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NoStore`] without a store, or the store's
    /// error. On error the cached model is left as it was.
    pub async fn seed(&self) -> Result<Arc<DiscoveryModel>, SnapshotError> {
        let store = self.store.clone().ok_or(SnapshotError::NoStore)?;
        let snapshot = tokio::task::spawn_blocking(move || store.load()).await??;

        let model = Arc::new(snapshot.into_model());
        info!(
            platforms = model.platforms.len(),
            libraries = model.libraries.len(),
            "Seeded registry from snapshot"
        );
        *self.model.lock().await = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Writes the cached model to the store, waiting for completion.
    ///
    /// Does nothing if no model is cached yet.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::NoStore`] without a store, or the store's
    /// error.
    pub async fn store_snapshot(&self) -> Result<(), SnapshotError> {
        let store = self.store.clone().ok_or(SnapshotError::NoStore)?;
        let Some(model) = self.model.lock().await.clone() else {
            return Ok(());
        };

        let snapshot = Snapshot::from_model(&model);
        tokio::task::spawn_blocking(move || store.store(&snapshot)).await?
    }

    fn persist_in_background(&self, model: &DiscoveryModel) {
        let Some(store) = self.store.clone() else {
            return;
        };
        if !self.store_after_scan || model.cancelled {
            return;
        }

        let snapshot = Snapshot::from_model(model);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.store(&snapshot) {
                warn!(error = %e, "Failed to store snapshot");
            }
        });
    }
}

async fn scan_root(
    root: ScanRoot,
    ingester: HardwareIngester,
    libraries: LibraryScanner,
    slot: CompletionHandle,
    staged: Arc<Mutex<Vec<RootScan>>>,
) {
    debug!(root = %root.path, kind = %root.kind, "Scanning root");
    let mut scan = RootScan::new(root);

    let (version, hardware, library) = tokio::join!(
        detect_version(&scan.root, &slot),
        ingest_hardware(&scan.root, &ingester, &slot),
        scan_libraries(&scan.root, &libraries, &slot),
    );

    scan.record_version(version);

    if let Some(hardware) = &hardware {
        scan.status.hardware = hardware.state.clone();
        scan.status.boards.extend(hardware.boards.iter().cloned());
        scan.status.platform.extend(hardware.platform.iter().cloned());
    }
    if let Some(library) = &library {
        scan.status.libraries = library.state.clone();
    }
    scan.hardware = hardware;
    scan.libraries = library;

    staged.lock().push(scan);
}

/// Reads the runtime version. A root without a version file is not an error.
async fn detect_version(
    root: &ScanRoot,
    parent: &CompletionHandle,
) -> Result<Option<bk_parser::RuntimeVersion>, ScanError> {
    let _op = parent.track("version")?;
    let path = root.version_file();

    let text = match tokio::fs::read(&path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(root = %root.path, "No runtime version file");
            return Ok(None);
        }
        Err(e) => return Err(ScanError::read(path, e)),
    };

    let version = bk_parser::parse_runtime_version(&text).map_err(|e| ScanError::parse(&path, e))?;
    if let Some(version) = &version {
        debug!(root = %root.path, version = %version, modern = version.is_modern(), "Read runtime version");
    }
    Ok(version)
}

async fn ingest_hardware(
    root: &ScanRoot,
    ingester: &HardwareIngester,
    parent: &CompletionHandle,
) -> Option<HardwareScan> {
    let op = parent.track("hardware").ok()?;
    Some(ingester.ingest(&root.hardware_dir(), &op).await)
}

async fn scan_libraries(
    root: &ScanRoot,
    scanner: &LibraryScanner,
    parent: &CompletionHandle,
) -> Option<LibraryScan> {
    let op = parent.track("libraries").ok()?;
    Some(scanner.scan(&root.libraries_dir(), &op).await)
}

/// Folds staged root scans into one model.
///
/// Runtime roots merge before user roots and lower ranks before higher
/// ones, so later contributions win on key collisions.
fn merge(scans: &mut [RootScan]) -> DiscoveryModel {
    scans.sort_by_key(|scan| (scan.root.kind, scan.root.rank));

    let mut model = DiscoveryModel::default();
    for scan in scans.iter_mut() {
        model.issues.append(&mut scan.issues);

        if let Some(mut hardware) = scan.hardware.take() {
            model.issues.append(&mut hardware.issues);
            hardware.merge_into(&mut model.platforms);
        }

        if let Some(library) = scan.libraries.take() {
            model.issues.extend(library.issues);
            for (name, entry) in library.libraries {
                if model.libraries.contains_key(&name) {
                    debug!(library = %name, root = %scan.root.path, "Library shadows earlier root");
                }
                model.libraries.insert(name, entry);
            }
        }

        model
            .roots
            .insert(scan.root.path.clone(), scan.status.clone());
    }

    link_dependencies(&mut model);
    model
}

/// Fills each library's `dependencies` with the requirements that name
/// another library visible to it.
fn link_dependencies(model: &mut DiscoveryModel) {
    let global: BTreeSet<String> = model.libraries.keys().cloned().collect();

    for (name, entry) in &mut model.libraries {
        entry.dependencies = entry
            .requirements
            .iter()
            .filter(|req| *req != name && global.contains(*req))
            .cloned()
            .collect();
    }

    for platform in model.platforms.values_mut() {
        let bundled: BTreeSet<String> = platform.library_data.keys().cloned().collect();
        for (name, entry) in &mut platform.library_data {
            entry.dependencies = entry
                .requirements
                .iter()
                .filter(|req| *req != name && (global.contains(*req) || bundled.contains(*req)))
                .cloned()
                .collect();
        }
    }
}
