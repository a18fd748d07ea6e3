//! Writing selected video frames as images.
//!
//! [`extract`] is the per-video task of an extraction batch: it builds the
//! video's [`FrameSelection`] once, decodes the video in a single forward
//! pass and writes every selected frame to
//! `<split>/images/<video stem>/img_<index>.jpg`, with the index zero-padded
//! to six digits so file names sort in frame order.
//!
//! # Example
//!
//! ```no_run
//! use frameset::{DatasetError, ExtractOptions, Strategy};
//!
//! let options = ExtractOptions::new().with_strategy(Strategy::Selected).with_cutoff(9);
//! let summary = frameset::extract("data/train/videos/game_1.mp4".as_ref(), &options)?;
//! println!("wrote {} of {} frames", summary.frames_written, summary.frames_decoded);
//! # Ok::<(), DatasetError>(())
//! ```

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use serde_json::{Value, json};

use crate::{
    config::ExtractOptions,
    error::DatasetError,
    layout::{annotation_path, image_output_directory},
    selection::FrameSelection,
    video::VideoFrames,
};

/// Digits of the zero-padded frame index in image file names.
pub const FRAME_INDEX_WIDTH: usize = 6;

/// What one video's extraction produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Directory the images were written to.
    pub output_directory: PathBuf,
    /// Frames decoded from the video.
    pub frames_decoded: u64,
    /// Frames written as images.
    pub frames_written: u64,
}

impl ExtractionSummary {
    /// One-line JSON form, printed by an extraction child process.
    pub fn to_json(&self) -> String {
        json!({
            "output_directory": self.output_directory.to_string_lossy(),
            "frames_decoded": self.frames_decoded,
            "frames_written": self.frames_written,
        })
        .to_string()
    }

    /// Parse the output of [`to_json`](ExtractionSummary::to_json).
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let value: Value = serde_json::from_slice(bytes).map_err(|error| error.to_string())?;
        let count = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_u64)
                .ok_or_else(|| format!("missing or invalid {field:?}"))
        };

        Ok(Self {
            output_directory: value
                .get("output_directory")
                .and_then(Value::as_str)
                .map(PathBuf::from)
                .ok_or_else(|| "missing or invalid \"output_directory\"".to_string())?,
            frames_decoded: count("frames_decoded")?,
            frames_written: count("frames_written")?,
        })
    }
}

/// File name of the image for frame `index`, e.g. `img_000042.jpg`.
pub fn frame_file_name(index: u64) -> String {
    format!("img_{index:0width$}.jpg", width = FRAME_INDEX_WIDTH)
}

/// Extract the selected frames of one video.
///
/// The frame selection is computed before the video is opened, so a
/// missing or malformed annotation file fails fast. The image output
/// directory must already exist (see
/// [`plan_extraction`](crate::plan_extraction)).
///
/// # Errors
///
/// - [`DatasetError::AnnotationNotFound`] / [`DatasetError::AnnotationParse`]
///   for the `selected` and `smooth` strategies.
/// - [`DatasetError::VideoOpen`] / [`DatasetError::NoVideoStream`] if the
///   video cannot be opened.
/// - [`DatasetError::Decode`] if decoding stops on an error; frames written
///   before that point are kept.
/// - [`DatasetError::Image`] / [`DatasetError::Io`] if an image cannot be
///   written.
pub fn extract(video_path: &Path, options: &ExtractOptions) -> Result<ExtractionSummary, DatasetError> {
    let selection = options
        .strategy()
        .frame_selection(&annotation_path(video_path), options.cutoff())?;

    let output_directory = image_output_directory(video_path);
    log::debug!(
        "Extracting {} ({} strategy) into {}",
        video_path.display(),
        options.strategy(),
        output_directory.display()
    );

    let frames = VideoFrames::open(video_path)?;
    write_frames(frames, &selection, &output_directory)
}

/// Write the selected frames of a decoded frame sequence.
///
/// Frames are numbered from zero in the order they arrive. The first error
/// from `frames` stops the loop and is returned.
pub fn write_frames<I>(
    frames: I,
    selection: &FrameSelection,
    output_directory: &Path,
) -> Result<ExtractionSummary, DatasetError>
where
    I: IntoIterator<Item = Result<DynamicImage, DatasetError>>,
{
    let mut counter: i64 = -1;
    let mut frames_written = 0_u64;

    for frame in frames {
        counter += 1;
        let image = frame?;

        if !selection.contains(counter) {
            continue;
        }

        let image_path = output_directory.join(frame_file_name(counter as u64));
        image.save_with_format(&image_path, ImageFormat::Jpeg)?;
        frames_written += 1;
    }

    let summary = ExtractionSummary {
        output_directory: output_directory.to_path_buf(),
        frames_decoded: (counter + 1) as u64,
        frames_written,
    };
    log::debug!(
        "Wrote {} of {} frames to {}",
        summary.frames_written,
        summary.frames_decoded,
        output_directory.display()
    );
    Ok(summary)
}
