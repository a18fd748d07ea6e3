//! Batch progress reporting.
//!
//! This module provides [`ProgressCallback`] for monitoring a
//! [`WorkerPool`](crate::WorkerPool) batch and [`ProgressInfo`] for the
//! snapshots it receives. Progress is reported once per finished item,
//! whether the item succeeded or failed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use frameset::{DatasetError, ProgressCallback, ProgressInfo, WorkerPool};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(percentage) = info.percentage {
//!             println!("[{}] {percentage:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let pool = WorkerPool::with_default_size()?.with_progress(Arc::new(PrintProgress));
//! # Ok::<(), DatasetError>(())
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    sync::Arc,
    time::{Duration, Instant},
};

/// The kind of batch currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OperationType {
    /// Fetching remote resources to disk.
    Download,
    /// Expanding downloaded archives.
    Unarchive,
    /// Writing video frames as images.
    FrameExtraction,
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            OperationType::Download => "download",
            OperationType::Unarchive => "unarchive",
            OperationType::FrameExtraction => "frame extraction",
        };
        f.write_str(name)
    }
}

/// A snapshot of batch progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of batch is running.
    pub operation: OperationType,
    /// Items finished so far (successful or not).
    pub current: u64,
    /// Items in the batch.
    pub total: u64,
    /// Items that finished with an error so far.
    pub failed: u64,
    /// Completion percentage (0.0 – 100.0). `None` for an empty batch.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the batch started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Label of the item that just finished.
    pub current_item: Option<String>,
}

/// Trait for receiving progress updates from a batch.
///
/// Callbacks are invoked from worker threads, so implementations must be
/// [`Send`] and [`Sync`]. They observe the batch but cannot stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called each time an item of the batch finishes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Default for a new pool.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for one batch and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: u64,
    current: u64,
    failed: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, operation: OperationType, total: u64) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            failed: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one finished item and fire the callback.
    pub(crate) fn advance(&mut self, item: String, succeeded: bool) {
        self.current += 1;
        if !succeeded {
            self.failed += 1;
        }
        self.report(Some(item));
    }

    fn report(&self, item: Option<String>) {
        let elapsed = self.start_time.elapsed();

        let percentage = (self.total > 0).then(|| (self.current as f32 / self.total as f32) * 100.0);

        let estimated_remaining = (self.current > 0).then(|| {
            let remaining = self.total.saturating_sub(self.current);
            let per_item = elapsed / self.current as u32;
            per_item * remaining as u32
        });

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            failed: self.failed,
            percentage,
            elapsed,
            estimated_remaining,
            current_item: item,
        };

        self.callback.on_progress(&info);
    }
}
