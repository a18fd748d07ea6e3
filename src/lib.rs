//! # frameset
//!
//! Download an event-annotated video dataset and turn it into training
//! images.
//!
//! The dataset has a `train` and a `test` split. Each split's videos come
//! with a zip archive of per-video event annotations
//! (`events_markup.json`: frame index → event label). `frameset` fetches
//! and unpacks everything into a fixed directory tree, then decodes every
//! video once and writes the frames chosen by a [`Strategy`] as JPEG images.
//!
//! ## Quick Start
//!
//! ### Download the dataset
//!
//! ```no_run
//! use frameset::{Dataset, WorkerPool};
//!
//! let pool = WorkerPool::with_default_size().unwrap();
//! let dataset = Dataset::new("data").unwrap();
//! let report = dataset.download("https://example.com/dataset", &pool, false).unwrap();
//! assert!(report.is_success());
//! ```
//!
//! ### Extract frames around annotated events
//!
//! ```no_run
//! use frameset::{Dataset, ExtractOptions, Strategy, WorkerPool};
//!
//! let pool = WorkerPool::with_default_size().unwrap();
//! let dataset = Dataset::new("data").unwrap();
//! let options = ExtractOptions::new().with_strategy(Strategy::Selected).with_cutoff(9);
//! let report = dataset.extract(&pool, &options).unwrap();
//! for (video, error) in report.failures() {
//!     eprintln!("{}: {error}", video.display());
//! }
//! ```
//!
//! ### Use the building blocks directly
//!
//! ```no_run
//! use frameset::{OperationType, WorkerPool};
//!
//! frameset::ensure_layout("data").unwrap();
//! let resources = frameset::plan_downloads("data", "https://example.com/dataset");
//! let archives = resources.archive_paths();
//!
//! let pool = WorkerPool::new(8).unwrap();
//! pool.run_over(OperationType::Download, resources.into_entries(), |(url, path)| {
//!     frameset::fetch(url, path)
//! })
//! .into_result()
//! .unwrap();
//! pool.run_over(OperationType::Unarchive, archives.clone(), |archive| frameset::expand(archive))
//!     .into_result()
//!     .unwrap();
//! frameset::clean(&archives).unwrap();
//! ```
//!
//! ## Frame selection
//!
//! | Strategy   | Frames written                                                  |
//! |------------|-----------------------------------------------------------------|
//! | `all`      | every frame                                                     |
//! | `selected` | `cutoff` frames either side of every annotated event            |
//! | `smooth`   | like `selected`, twice as wide for events other than `empty_event` |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed for video decoding.

pub mod annotation;
pub mod archive;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod layout;
pub mod pipeline;
pub mod progress;
pub mod selection;
pub mod video;

pub use annotation::{EMPTY_EVENT, EVENTS_FILE_NAME, EventAnnotations, load_events};
pub use archive::{ARCHIVE_EXTENSION, ArchiveFormat, clean, expand, unpack_destination};
pub use config::{DEFAULT_CUTOFF, DatasetConfig, ExtractOptions, MAX_CUTOFF};
pub use dispatch::{BatchReport, ItemOutcome, WorkerPool, run_isolated};
pub use error::DatasetError;
pub use extract::{ExtractionSummary, extract, frame_file_name, write_frames};
pub use fetch::{Fetcher, fetch};
pub use layout::{
    DatasetLayout, ResourceMap, Split, annotation_path, ensure_layout, image_output_directory,
    plan_downloads, plan_downloads_with_config, plan_extraction,
};
pub use pipeline::{Dataset, DownloadReport, EXTRACT_VIDEO_COMMAND};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use selection::{FrameSelection, SelectedIndexSet, Strategy, WindowStrategy, select_indices};
pub use video::VideoFrames;
