//! The end-to-end dataset pipeline.
//!
//! [`Dataset`] sequences the per-item operations of the crate into the two
//! user-facing jobs:
//!
//! - [`Dataset::download`]: create the layout, fetch every planned
//!   resource, expand the downloaded archives, and optionally delete them;
//! - [`Dataset::extract`]: reserve an image directory per video and write
//!   the selected frames of every video.
//!
//! [`Dataset::extract_isolated`] does the same job with every video decoded
//! in its own child process, so a crash inside the native decoder fails
//! only that video.
//!
//! Failed items never roll back finished work. Re-running `download` on a
//! partial dataset is safe for the layout and plan steps.
//!
//! # Example
//!
//! ```no_run
//! use frameset::{Dataset, DatasetError, ExtractOptions, Strategy, WorkerPool};
//!
//! let pool = WorkerPool::with_default_size()?;
//! let dataset = Dataset::new("data")?;
//!
//! let report = dataset.download("https://example.com/dataset", &pool, true)?;
//! if !report.is_success() {
//!     eprintln!("{} downloads failed", report.downloads.failed());
//! }
//!
//! let options = ExtractOptions::new().with_strategy(Strategy::Smooth);
//! let extraction = dataset.extract(&pool, &options)?;
//! println!("extracted {} videos", extraction.succeeded());
//! # Ok::<(), DatasetError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    archive::{clean, expand, has_archive_extension},
    config::{DatasetConfig, ExtractOptions},
    dispatch::{BatchReport, WorkerPool, run_isolated},
    error::DatasetError,
    extract::{ExtractionSummary, extract},
    fetch::Fetcher,
    layout::{DatasetLayout, ResourceMap},
    progress::OperationType,
};

/// Subcommand an extraction child process is started with.
pub const EXTRACT_VIDEO_COMMAND: &str = "extract-video";

/// A dataset rooted at one directory.
#[derive(Debug, Clone)]
pub struct Dataset {
    layout: DatasetLayout,
    config: DatasetConfig,
    fetcher: Fetcher,
}

/// Outcome of [`Dataset::download`].
#[derive(Debug)]
pub struct DownloadReport {
    /// The resources that were planned.
    pub resources: ResourceMap,
    /// One outcome per `(url, destination)`: bytes written.
    pub downloads: BatchReport<(String, PathBuf), u64>,
    /// One outcome per downloaded archive: the unpacked directory.
    pub unpacks: BatchReport<PathBuf, PathBuf>,
    /// Outcome of archive cleanup: the number of archives deleted.
    /// `None` when cleanup was not requested.
    pub cleanup: Option<Result<usize, DatasetError>>,
}

impl DownloadReport {
    /// Returns `true` if every download, every expansion and the cleanup
    /// succeeded.
    pub fn is_success(&self) -> bool {
        self.downloads.is_success()
            && self.unpacks.is_success()
            && !matches!(self.cleanup, Some(Err(_)))
    }

    /// Archives deleted by cleanup; zero if it was skipped or failed.
    pub fn archives_removed(&self) -> usize {
        match self.cleanup {
            Some(Ok(removed)) => removed,
            _ => 0,
        }
    }

    /// Delete every archive that expanded successfully and record the
    /// outcome in [`cleanup`](DownloadReport::cleanup).
    ///
    /// Archives already gone count as cleaned, so this may be called again
    /// after a failure.
    pub fn clean_archives(&mut self) -> Result<usize, &DatasetError> {
        let outcome = clean(self.unpacks.successes().map(|(archive, _)| archive));
        if let Err(error) = &outcome {
            log::warn!("Archive cleanup failed: {error}");
        }
        self.cleanup.insert(outcome).as_ref().copied()
    }
}

impl Dataset {
    /// Open a dataset at `root` with the canonical configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Transfer`] if the HTTP client cannot be
    /// created.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, DatasetError> {
        Ok(Self {
            layout: DatasetLayout::new(root),
            config: DatasetConfig::default(),
            fetcher: Fetcher::new()?,
        })
    }

    /// Replace the resource range configuration.
    #[must_use]
    pub fn with_config(mut self, config: DatasetConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the fetcher used for downloads.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// The resources [`download`](Dataset::download) would fetch.
    pub fn plan(&self, base_url: &str) -> ResourceMap {
        self.layout.plan_downloads(base_url, &self.config)
    }

    /// Download and unpack the whole dataset.
    ///
    /// Archives whose download failed are not expanded. With `cleanup`,
    /// archives that expanded successfully are deleted afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory layout cannot be created.
    /// Per-item failures and a failed cleanup are reported in the
    /// [`DownloadReport`].
    pub fn download(&self, base_url: &str, pool: &WorkerPool, cleanup: bool) -> Result<DownloadReport, DatasetError> {
        self.layout.ensure()?;
        let resources = self.plan(base_url);

        let fetcher = &self.fetcher;
        let downloads = pool.run_over(
            OperationType::Download,
            resources.clone().into_entries(),
            |(url, destination)| fetcher.fetch(url, destination),
        );

        let archives: Vec<PathBuf> = downloads
            .successes()
            .map(|((_, destination), _)| destination)
            .filter(|destination| has_archive_extension(destination))
            .cloned()
            .collect();
        let unpacks = pool.run_over(OperationType::Unarchive, archives, |archive| expand(archive));

        let mut report = DownloadReport {
            resources,
            downloads,
            unpacks,
            cleanup: None,
        };
        if cleanup {
            let _ = report.clean_archives();
        }
        Ok(report)
    }

    /// Extract frames from every video of both splits.
    ///
    /// # Errors
    ///
    /// Returns the precondition errors of
    /// [`plan_extraction`](crate::plan_extraction); per-video failures are
    /// reported in the returned [`BatchReport`].
    pub fn extract(
        &self,
        pool: &WorkerPool,
        options: &ExtractOptions,
    ) -> Result<BatchReport<PathBuf, ExtractionSummary>, DatasetError> {
        let videos = self.layout.plan_extraction()?;
        Ok(pool.run_over(OperationType::FrameExtraction, videos, |video| extract(video, options)))
    }

    /// Extract frames from every video, each video in a child process.
    ///
    /// `program` is run once per video as
    /// `program extract-video <VIDEO> --scope <STRATEGY> --frame-cutoff <N>`
    /// and must print the video's [`ExtractionSummary::to_json`] on stdout.
    /// The `frameset` binary implements this command. Pool threads only
    /// wait on their child, so a child that crashes or aborts fails its own
    /// video and the batch carries on.
    ///
    /// # Errors
    ///
    /// Returns the precondition errors of
    /// [`plan_extraction`](crate::plan_extraction); per-video failures,
    /// including [`DatasetError::ChildFailed`], are reported in the returned
    /// [`BatchReport`].
    pub fn extract_isolated(
        &self,
        pool: &WorkerPool,
        options: &ExtractOptions,
        program: &Path,
    ) -> Result<BatchReport<PathBuf, ExtractionSummary>, DatasetError> {
        let videos = self.layout.plan_extraction()?;
        let cutoff = options.cutoff().to_string();

        Ok(pool.run_over(OperationType::FrameExtraction, videos, |video| {
            let stdout = run_isolated(
                Command::new(program)
                    .arg(EXTRACT_VIDEO_COMMAND)
                    .arg(video)
                    .args(["--scope", options.strategy().name(), "--frame-cutoff", cutoff.as_str()]),
            )?;
            ExtractionSummary::from_json(&stdout).map_err(|reason| DatasetError::ChildFailed {
                command: program.display().to_string(),
                reason: format!("unreadable summary: {reason}"),
            })
        }))
    }
}
