//! Concurrent batch execution with per-item failure isolation.
//!
//! [`WorkerPool`] runs one operation over every item of a batch on a fixed
//! number of worker threads. Each item is moved into the batch by value and
//! its operation runs in isolation: an error or a panic is recorded against
//! that item alone while the remaining items keep running. The caller gets
//! a [`BatchReport`] once every item has been attempted.
//!
//! `catch_unwind` only contains unwinding panics. Work that can abort the
//! whole process (a crash in native code, `panic = "abort"`) should run in
//! a child process through [`run_isolated`], with the pool thread only
//! supervising it; a crashed child then fails its own item and nothing
//! else.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use frameset::{DatasetError, OperationType, WorkerPool};
//!
//! let pool = WorkerPool::new(4)?;
//! let archives = vec![PathBuf::from("data/train/annotations/game_1.zip")];
//! let report = pool.run_over(OperationType::Unarchive, archives, |path| frameset::expand(path));
//! for (archive, error) in report.failures() {
//!     eprintln!("{}: {error}", archive.display());
//! }
//! # Ok::<(), DatasetError>(())
//! ```

use std::{
    any::Any,
    fmt::{Debug, Formatter, Result as FmtResult},
    panic::{self, AssertUnwindSafe},
    process::{Command, Stdio},
    sync::{Arc, Mutex},
};

use rayon::{
    ThreadPool, ThreadPoolBuilder,
    iter::{IntoParallelIterator, ParallelIterator},
};

use crate::{
    error::DatasetError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// A fixed-size pool of worker threads.
///
/// The pool is an ordinary value owned by the caller; dropping it shuts the
/// threads down. Items of one batch run in no particular order.
pub struct WorkerPool {
    pool: ThreadPool,
    size: usize,
    progress: Arc<dyn ProgressCallback>,
}

impl Debug for WorkerPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a pool with `size` workers. A size of zero means one worker
    /// per logical CPU.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::WorkerPool`] if the threads cannot be
    /// spawned.
    pub fn new(size: usize) -> Result<Self, DatasetError> {
        let size = if size == 0 { num_cpus::get() } else { size };
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|index| format!("frameset-worker-{index}"))
            .build()
            .map_err(|error| DatasetError::WorkerPool(error.to_string()))?;

        log::debug!("Started worker pool with {size} threads");

        Ok(Self {
            pool,
            size,
            progress: Arc::new(NoOpProgress),
        })
    }

    /// Create a pool with one worker per logical CPU.
    pub fn with_default_size() -> Result<Self, DatasetError> {
        Self::new(num_cpus::get())
    }

    /// Attach a progress callback, invoked once per finished item.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `operation` once for every item and collect every outcome.
    ///
    /// Never stops early: a failing or panicking item is recorded in the
    /// report and the rest of the batch carries on. Returns when every item
    /// has been attempted.
    pub fn run_over<T, R, F>(&self, kind: OperationType, items: Vec<T>, operation: F) -> BatchReport<T, R>
    where
        T: Debug + Send,
        R: Send,
        F: Fn(&T) -> Result<R, DatasetError> + Send + Sync,
    {
        let total = items.len();
        log::info!("Starting {kind} batch of {total} items on {} workers", self.size);

        let tracker = Mutex::new(ProgressTracker::new(
            Arc::clone(&self.progress),
            kind,
            total as u64,
        ));

        let outcomes: Vec<ItemOutcome<T, R>> = self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| operation(&item)))
                        .unwrap_or_else(|payload| {
                            Err(DatasetError::WorkerPanicked {
                                message: panic_message(payload.as_ref()),
                            })
                        });

                    if let Err(error) = &result {
                        log::warn!("{kind} failed for {item:?}: {error}");
                    }
                    if let Ok(mut tracker) = tracker.lock() {
                        tracker.advance(format!("{item:?}"), result.is_ok());
                    }

                    ItemOutcome { item, result }
                })
                .collect()
        });

        let report = BatchReport { kind, outcomes };
        log::info!(
            "Finished {kind} batch: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `command` to completion and return its stdout.
///
/// The child gets a null stdin; stdout and stderr are captured. Whatever
/// happens to the child, including a segfault or an abort, only this call
/// sees it.
///
/// # Errors
///
/// Returns [`DatasetError::ChildFailed`] if the child cannot be spawned,
/// exits with a non-zero status, or is killed by a signal. The reason
/// carries the exit status and the last non-empty line of stderr.
pub fn run_isolated(command: &mut Command) -> Result<Vec<u8>, DatasetError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let child_error = |reason: String| DatasetError::ChildFailed {
        command: program.clone(),
        reason,
    };

    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|error| child_error(format!("failed to spawn: {error}")))?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let last_line = stderr
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty());
    Err(child_error(match last_line {
        Some(line) => format!("{}: {line}", output.status),
        None => output.status.to_string(),
    }))
}

/// The outcome of one batch item.
#[derive(Debug)]
pub struct ItemOutcome<T, R> {
    /// The item as submitted.
    pub item: T,
    /// What its operation returned.
    pub result: Result<R, DatasetError>,
}

/// Every per-item outcome of one [`WorkerPool::run_over`] call, in
/// submission order.
#[derive(Debug)]
pub struct BatchReport<T, R> {
    kind: OperationType,
    outcomes: Vec<ItemOutcome<T, R>>,
}

impl<T, R> BatchReport<T, R> {
    /// The kind of batch this report describes.
    pub fn kind(&self) -> OperationType {
        self.kind
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Returns `true` if every item succeeded. An empty batch succeeds.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn outcomes(&self) -> &[ItemOutcome<T, R>] {
        &self.outcomes
    }

    /// Items that succeeded, with their results.
    pub fn successes(&self) -> impl Iterator<Item = (&T, &R)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().map(|value| (&outcome.item, value)))
    }

    /// Items that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&T, &DatasetError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err().map(|error| (&outcome.item, error)))
    }

    pub fn into_outcomes(self) -> Vec<ItemOutcome<T, R>> {
        self.outcomes
    }

    /// Collapse the report into the successful results.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::BatchFailed`] if any item failed. Inspect the
    /// report first when the individual errors matter.
    pub fn into_result(self) -> Result<Vec<(T, R)>, DatasetError> {
        let failed = self.failed();
        if failed > 0 {
            return Err(DatasetError::BatchFailed {
                operation: self.kind,
                failed,
                total: self.total(),
            });
        }
        Ok(self
            .outcomes
            .into_iter()
            .filter_map(|outcome| outcome.result.ok().map(|value| (outcome.item, value)))
            .collect())
    }
}
