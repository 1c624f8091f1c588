//! Directory traversal for toolchain and library trees.
//!
//! [`FileWalker`] wraps the `ignore` crate's walker with the filters
//! discovery needs: a depth window, directory names never descended into,
//! and a name predicate. Walk errors below the root are collected rather
//! than aborting the walk.
//!
//! # Examples
//!
//! ```no_run
//! use bk_scanner::FileWalker;
//! use camino::Utf8Path;
//!
//! let walker = FileWalker::new(Utf8Path::new("/usr/share/arduino/libraries"))?
//!     .with_min_depth(2)
//!     .with_skip_dirs(&["examples"]);
//! let walk = walker.collect(|entry| entry.is_file);
//!
//! for entry in &walk.entries {
//!     println!("{}", entry.relative);
//! }
//! # Ok::<(), bk_scanner::ScanError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use smallvec::SmallVec;

use crate::error::ScanError;

/// C/C++-family extensions scanned in library trees.
pub const SOURCE_EXTENSIONS: &[&str] = &["h", "c", "cp", "cpp"];

/// Path segments of a walked entry relative to the walk root.
pub type Segments = SmallVec<[String; 4]>;

/// One entry produced by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute path.
    pub path: Utf8PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
    /// Relative path split into segments.
    pub segments: Segments,
    /// Whether the entry is a regular file.
    pub is_file: bool,
}

impl WalkEntry {
    /// The final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Number of segments below the walk root.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

/// Entries and non-fatal errors from one walk.
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Matched entries in walk order.
    pub entries: Vec<WalkEntry>,
    /// Errors met below the root.
    pub errors: Vec<ScanError>,
}

/// A filtered directory walker.
#[derive(Debug, Clone)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Directory names never descended into, matched case-insensitively.
    skip_dirs: Vec<String>,
    /// Entries shallower than this are not reported.
    min_depth: usize,
    /// Entries deeper than this are not visited.
    max_depth: Option<usize>,
}

impl FileWalker {
    /// Creates a walker for an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Missing`] if `root` does not exist and
    /// [`ScanError::Config`] if it is not a directory.
    pub fn new(root: &Utf8Path) -> Result<Self, ScanError> {
        if !root.exists() {
            return Err(ScanError::missing(root));
        }
        if !root.is_dir() {
            return Err(ScanError::config(format!(
                "root path is not a directory: {root}"
            )));
        }

        Ok(Self {
            root: root.to_owned(),
            skip_dirs: Vec::new(),
            min_depth: 1,
            max_depth: None,
        })
    }

    /// Adds directory names that are never descended into.
    #[must_use]
    pub fn with_skip_dirs(mut self, dirs: &[&str]) -> Self {
        self.skip_dirs.extend(dirs.iter().map(ToString::to_string));
        self
    }

    /// Reports only entries at least `depth` segments below the root.
    #[must_use]
    pub const fn with_min_depth(mut self, depth: usize) -> Self {
        self.min_depth = depth;
        self
    }

    /// Visits entries at most `depth` segments below the root.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Walks the tree and returns entries accepted by `accept`.
    ///
    /// This is blocking; call it from `spawn_blocking` in async code.
    pub fn collect<F>(&self, mut accept: F) -> WalkOutput
    where
        F: FnMut(&WalkEntry) -> bool,
    {
        let mut output = WalkOutput::default();

        for result in self.build_walker() {
            let dent = match result {
                Ok(dent) => dent,
                Err(e) => {
                    output.errors.push(ScanError::Walk(e));
                    continue;
                }
            };

            if dent.depth() < self.min_depth {
                continue;
            }

            let Some(path) = Utf8Path::from_path(dent.path()) else {
                output
                    .errors
                    .push(ScanError::NonUtf8Path(dent.path().to_owned()));
                continue;
            };

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };

            let segments: Segments = relative
                .components()
                .map(|c| c.as_str().to_owned())
                .collect();
            let entry = WalkEntry {
                path: path.to_owned(),
                relative: segments.join("/"),
                segments,
                is_file: dent.file_type().is_some_and(|ft| ft.is_file()),
            };

            if accept(&entry) {
                output.entries.push(entry);
            }
        }

        output
    }

    /// Builds the ignore walker with configured settings.
    fn build_walker(&self) -> ignore::Walk {
        let skip_dirs = self.skip_dirs.clone();
        WalkBuilder::new(&self.root)
            // Toolchain trees are not git checkouts; only hidden entries are skipped.
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .max_depth(self.max_depth)
            .filter_entry(move |dent| {
                let is_dir = dent.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && dent.depth() > 0
                    && dent.file_name().to_str().is_some_and(|name| {
                        skip_dirs.iter().any(|skip| skip.eq_ignore_ascii_case(name))
                    }))
            })
            .build()
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

/// Returns `true` if `path` has a C/C++-family extension, ignoring case.
#[must_use]
pub fn is_source_file(path: &str) -> bool {
    Utf8Path::new(path).extension().is_some_and(|ext| {
        SOURCE_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext))
    })
}
