//! Error types for the `frameset` crate.
//!
//! This module defines [`DatasetError`], the unified error type returned by
//! every fallible operation in the crate. Variants carry the path, URL, or
//! frame number involved so a failed batch item can be reported without
//! extra logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::progress::OperationType;

/// The unified error type for all `frameset` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// A directory that must exist before this step is missing.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The missing directory.
        path: PathBuf,
    },

    /// A directory that must not exist yet is already present.
    ///
    /// Raised by [`plan_extraction`](crate::plan_extraction) when a video
    /// already has an image output directory.
    #[error("Directory already exists: {path}")]
    DirectoryAlreadyExists {
        /// The directory that was found.
        path: PathBuf,
    },

    /// A remote resource could not be transferred to disk.
    #[error("Failed to transfer {url}: {reason}")]
    Transfer {
        /// The URL being fetched.
        url: String,
        /// Network, status, or local write failure.
        reason: String,
    },

    /// An archive could not be unpacked.
    #[error("Failed to unpack archive {path}: {reason}")]
    Unpack {
        /// The archive path.
        path: PathBuf,
        /// Why unpacking failed.
        reason: String,
    },

    /// The event annotation file for a video does not exist.
    #[error("Annotation file not found: {path}")]
    AnnotationNotFound {
        /// Expected location of `events_markup.json`.
        path: PathBuf,
    },

    /// The event annotation file is not a JSON object of frame → label strings.
    #[error("Failed to parse annotation file {path}: {reason}")]
    AnnotationParse {
        /// The annotation file.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The video file could not be opened for decoding.
    #[error("Failed to open video at {path}: {reason}")]
    VideoOpen {
        /// The video path.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// The file that was opened.
        path: PathBuf,
    },

    /// Decoding stopped on an unrecoverable error.
    #[error("Failed to decode {path} at frame {frame_number}: {reason}")]
    Decode {
        /// The video path.
        path: PathBuf,
        /// Number of frames decoded before the failure.
        frame_number: u64,
        /// Decoder message.
        reason: String,
    },

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    /// A batch item panicked inside its worker.
    #[error("Worker panicked: {message}")]
    WorkerPanicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// A batch item run in a child process did not finish cleanly.
    ///
    /// Covers spawn failures, non-zero exits, termination by a signal, and
    /// output the parent could not read.
    #[error("Child process {command} failed: {reason}")]
    ChildFailed {
        /// The program that was run.
        command: String,
        /// Exit status and the last line of its stderr, or why it could not
        /// run.
        reason: String,
    },

    /// At least one item of a batch failed.
    #[error("{operation} batch failed for {failed} of {total} items")]
    BatchFailed {
        /// The kind of batch.
        operation: OperationType,
        /// Number of failed items.
        failed: usize,
        /// Number of items attempted.
        total: usize,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl From<FfmpegError> for DatasetError {
    fn from(error: FfmpegError) -> Self {
        DatasetError::Ffmpeg(error.to_string())
    }
}
