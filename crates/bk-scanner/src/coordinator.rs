//! Dynamic completion barrier for fan-out filesystem work.
//!
//! Discovery cannot know up front how many operations a scan will need:
//! finding a `libraries` folder under a hardware root spawns a library scan,
//! which spawns one read per source file. [`ScanCoordinator`] counts
//! outstanding operations and resolves [`ScanCoordinator::wait`] once the
//! count reaches zero after the waiter has sealed the barrier.
//!
//! # Registration discipline
//!
//! Work is registered either from the top of the run, before
//! [`wait`](ScanCoordinator::wait) seals the barrier, or through a live
//! [`CompletionHandle`] with [`CompletionHandle::track`]. A producer always
//! holds its own slot while it registers downstream work, so the count can
//! only reach zero when no subtree can add more.
//!
//! Handles release their slot on drop, including during a panic unwind.
//!
//! # Examples
//!
//! ```
//! use bk_scanner::ScanCoordinator;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bk_scanner::ScanError> {
//! let barrier = ScanCoordinator::begin("example", CancellationToken::new());
//!
//! let parent = barrier.track("walk")?;
//! tokio::spawn(async move {
//!     if let Ok(child) = parent.track("read") {
//!         drop(parent);
//!         tokio::spawn(async move { child.complete() });
//!     }
//! });
//!
//! let outcome = barrier.wait().await;
//! assert_eq!(outcome.stats.issued, 2);
//! assert!(!outcome.cancelled);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ScanError;
use crate::stats::{ScanStats, StatsSnapshot};

/// Result of waiting on a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierOutcome {
    /// Counters at the moment the barrier resolved.
    pub stats: StatsSnapshot,
    /// Whether the run was cancelled before it resolved.
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct BarrierState {
    outstanding: usize,
    sealed: bool,
    fired: bool,
}

struct Barrier {
    label: String,
    state: Mutex<BarrierState>,
    done: watch::Sender<bool>,
    cancel: CancellationToken,
    stats: Arc<ScanStats>,
}

impl Barrier {
    fn new(label: String, cancel: CancellationToken, stats: Arc<ScanStats>) -> Arc<Self> {
        let (done, _) = watch::channel(false);
        Arc::new(Self {
            label,
            state: Mutex::new(BarrierState::default()),
            done,
            cancel,
            stats,
        })
    }

    fn register(
        self: &Arc<Self>,
        tag: String,
        via_handle: bool,
    ) -> Result<CompletionHandle, ScanError> {
        if self.cancel.is_cancelled() {
            self.stats.increment_refused();
            trace!(barrier = %self.label, tag = %tag, "Refused operation after cancellation");
            return Err(ScanError::Cancelled);
        }

        let outstanding = {
            let mut state = self.state.lock();
            if state.sealed && !via_handle {
                return Err(ScanError::Sealed);
            }
            state.outstanding += 1;
            state.outstanding
        };

        self.stats.increment_issued();
        trace!(barrier = %self.label, tag = %tag, outstanding, "Tracked operation");

        Ok(CompletionHandle {
            barrier: Arc::clone(self),
            tag,
            failed: false,
        })
    }

    fn release(&self, tag: &str, failed: bool) {
        self.stats.increment_completed();
        if failed {
            self.stats.increment_failed();
        }

        let fire = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            trace!(barrier = %self.label, tag, outstanding = state.outstanding, "Released operation");
            Self::should_fire(&mut state)
        };

        if fire {
            self.fire();
        }
    }

    fn seal(&self) {
        let fire = {
            let mut state = self.state.lock();
            state.sealed = true;
            Self::should_fire(&mut state)
        };

        if fire {
            self.fire();
        }
    }

    fn should_fire(state: &mut BarrierState) -> bool {
        if state.sealed && state.outstanding == 0 && !state.fired {
            state.fired = true;
            return true;
        }
        false
    }

    fn fire(&self) {
        debug!(barrier = %self.label, "Barrier reached quiescence");
        self.done.send_replace(true);
    }
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Barrier")
            .field("label", &self.label)
            .field("outstanding", &state.outstanding)
            .field("sealed", &state.sealed)
            .field("fired", &state.fired)
            .finish_non_exhaustive()
    }
}

/// A counted join over dynamically registered operations.
#[derive(Debug, Clone)]
pub struct ScanCoordinator {
    barrier: Arc<Barrier>,
}

impl ScanCoordinator {
    /// Opens a barrier with zero outstanding operations.
    #[must_use]
    pub fn begin(label: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            barrier: Barrier::new(label.into(), cancel, Arc::new(ScanStats::new())),
        }
    }

    /// Opens a nested barrier that shares this one's statistics and is
    /// cancelled together with it.
    #[must_use]
    pub fn child(&self, label: impl Into<String>) -> Self {
        child_of(&self.barrier, label.into())
    }

    /// Registers an operation from the top of the run.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Cancelled`] after cancellation, or
    /// [`ScanError::Sealed`] once [`wait`](Self::wait) has been called.
    pub fn track(&self, tag: impl Into<String>) -> Result<CompletionHandle, ScanError> {
        self.barrier.register(tag.into(), false)
    }

    /// Seals the barrier and waits until every operation has completed.
    ///
    /// Resolves immediately if nothing was ever tracked. Calling it again
    /// after it resolved returns at once.
    pub async fn wait(&self) -> BarrierOutcome {
        let mut done = self.barrier.done.subscribe();
        self.barrier.seal();

        if done.wait_for(|fired| *fired).await.is_err() {
            warn!(barrier = %self.barrier.label, "Barrier signal closed before completion");
        }

        BarrierOutcome {
            stats: self.stats(),
            cancelled: self.is_cancelled(),
        }
    }

    /// Stops issuing new operations. In-flight ones drain normally.
    pub fn cancel(&self) {
        self.barrier.cancel.cancel();
    }

    /// Returns `true` once the run has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.barrier.cancel.is_cancelled()
    }

    /// The token observed by this barrier.
    #[inline]
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.barrier.cancel
    }

    /// Returns the number of operations not yet released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.barrier.state.lock().outstanding
    }

    /// Returns a snapshot of the shared counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.barrier.stats.snapshot()
    }
}

fn child_of(parent: &Barrier, label: String) -> ScanCoordinator {
    ScanCoordinator {
        barrier: Barrier::new(
            label,
            parent.cancel.child_token(),
            Arc::clone(&parent.stats),
        ),
    }
}

/// A slot in a barrier. Releases on drop.
pub struct CompletionHandle {
    barrier: Arc<Barrier>,
    tag: String,
    failed: bool,
}

impl CompletionHandle {
    /// Registers downstream work while this operation still holds its slot.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Cancelled`] after cancellation.
    pub fn track(&self, tag: impl Into<String>) -> Result<Self, ScanError> {
        self.barrier.register(tag.into(), true)
    }

    /// Opens a nested barrier tied to this operation's run.
    #[must_use]
    pub fn child(&self, label: impl Into<String>) -> ScanCoordinator {
        child_of(&self.barrier, label.into())
    }

    /// The tag this operation was registered with.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns `true` once the run has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.barrier.cancel.is_cancelled()
    }

    /// The token observed by this operation's barrier.
    #[inline]
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.barrier.cancel
    }

    /// Releases the slot.
    pub fn complete(self) {
        drop(self);
    }

    /// Releases the slot and counts the operation as failed.
    pub fn fail(mut self) {
        self.failed = true;
        drop(self);
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        self.barrier.release(&self.tag, self.failed);
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("barrier", &self.barrier.label)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}
