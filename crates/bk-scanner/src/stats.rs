//! Barrier statistics with atomic counters.
//!
//! [`ScanStats`] counts the operations a completion barrier issues and
//! releases. [`StatsSnapshot`] is a copyable point-in-time view.
//!
//! All counters use relaxed ordering. They are informational and never
//! drive the barrier's own completion decision.
//!
//! # Examples
//!
//! ```
//! use bk_scanner::ScanStats;
//!
//! let stats = ScanStats::new();
//! stats.increment_issued();
//! stats.increment_completed();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.outstanding(), 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic operation counters.
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Operations registered.
    issued: AtomicU64,
    /// Operations released (including failed ones).
    completed: AtomicU64,
    /// Operations released with a failure marker.
    failed: AtomicU64,
    /// Registrations refused after cancellation.
    refused: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the issued counter.
    #[inline]
    pub fn increment_issued(&self) {
        self.issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the completed counter.
    #[inline]
    pub fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the failed counter.
    #[inline]
    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the refused counter.
    #[inline]
    pub fn increment_refused(&self) {
        self.refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    ///
    /// ```
    /// use bk_scanner::ScanStats;
    ///
    /// let stats = ScanStats::new();
    /// stats.increment_issued();
    /// stats.increment_issued();
    /// stats.increment_completed();
    ///
    /// let snap = stats.snapshot();
    /// assert_eq!(snap.issued, 2);
    /// assert_eq!(snap.outstanding(), 1);
    /// ```
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            issued: self.issued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of barrier statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Operations registered.
    pub issued: u64,
    /// Operations released.
    pub completed: u64,
    /// Operations released with a failure marker.
    pub failed: u64,
    /// Registrations refused after cancellation.
    pub refused: u64,
}

impl StatsSnapshot {
    /// Operations issued but not yet released.
    #[inline]
    #[must_use]
    pub const fn outstanding(&self) -> u64 {
        self.issued.saturating_sub(self.completed)
    }

    /// Returns the success rate as a percentage of completed operations.
    ///
    /// Returns 100.0 if nothing has completed.
    ///
    /// ```
    /// use bk_scanner::StatsSnapshot;
    ///
    /// let snap = StatsSnapshot { issued: 20, completed: 20, failed: 1, refused: 0 };
    /// assert!((snap.success_rate() - 95.0).abs() < 0.1);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for statistics display
    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            return 100.0;
        }

        ((self.completed - self.failed.min(self.completed)) as f64 / self.completed as f64) * 100.0
    }
}
