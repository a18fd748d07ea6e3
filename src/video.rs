//! Sequential video decoding.
//!
//! [`VideoFrames`] opens a video with FFmpeg and yields its frames as RGB
//! [`DynamicImage`]s in decode order. It reads the file strictly forward in
//! a single pass and never seeks, so every frame is visited exactly once.
//! The demuxer, decoder and scaler are released when the value is dropped.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::error::EAGAIN,
};
use image::{DynamicImage, RgbImage};

use crate::error::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Reading,
    Draining,
    Finished,
}

/// Forward-only iterator over the decoded frames of a video.
///
/// # Example
///
/// ```no_run
/// use frameset::{DatasetError, VideoFrames};
///
/// let mut count = 0;
/// for frame in VideoFrames::open("data/train/videos/game_1.mp4".as_ref())? {
///     let _image = frame?;
///     count += 1;
/// }
/// println!("decoded {count} frames");
/// # Ok::<(), DatasetError>(())
/// ```
pub struct VideoFrames {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    video_stream_index: usize,
    width: u32,
    height: u32,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    frames_decoded: u64,
    state: DecodeState,
    file_path: PathBuf,
}

impl Debug for VideoFrames {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFrames")
            .field("file_path", &self.file_path)
            .field("video_stream_index", &self.video_stream_index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames_decoded", &self.frames_decoded)
            .finish_non_exhaustive()
    }
}

impl VideoFrames {
    /// Open the best video stream of `path` for decoding.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::VideoOpen`] if FFmpeg cannot open the file or build
    ///   a decoder for its video stream.
    /// - [`DatasetError::NoVideoStream`] if the file has no video stream.
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        let file_path = path.to_path_buf();
        let open_error = |reason: String| DatasetError::VideoOpen {
            path: file_path.clone(),
            reason,
        };

        log::debug!("Opening video file: {}", file_path.display());

        // Safe to call more than once.
        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| DatasetError::NoVideoStream {
                path: file_path.clone(),
            })?;
        let video_stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| open_error(format!("Failed to create RGB converter: {error}")))?;

        Ok(Self {
            input_context,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            frames_decoded: 0,
            state: DecodeState::Reading,
            file_path,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of frames yielded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn decode_error(&mut self, reason: impl ToString) -> DatasetError {
        self.state = DecodeState::Finished;
        DatasetError::Decode {
            path: self.file_path.clone(),
            frame_number: self.frames_decoded,
            reason: reason.to_string(),
        }
    }

    /// Try to pull one frame out of the decoder.
    ///
    /// `Ok(false)` means the decoder needs more input, or is fully drained.
    fn receive_frame(&mut self) -> Result<bool, FfmpegError> {
        match self.decoder.receive_frame(&mut self.decoded_frame) {
            Ok(()) => Ok(true),
            Err(FfmpegError::Eof) => Ok(false),
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => Ok(false),
            Err(error) => Err(error),
        }
    }

    fn convert_current_frame(&mut self) -> Result<DynamicImage, DatasetError> {
        self.scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;
        let buffer = frame_to_rgb_buffer(&self.rgb_frame, self.width, self.height);
        let rgb_image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            DatasetError::Ffmpeg("Failed to construct RGB image from decoded frame data".to_string())
        })?;
        Ok(DynamicImage::ImageRgb8(rgb_image))
    }
}

impl Iterator for VideoFrames {
    type Item = Result<DynamicImage, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.state == DecodeState::Finished {
                return None;
            }

            match self.receive_frame() {
                Ok(true) => {
                    let image = match self.convert_current_frame() {
                        Ok(image) => image,
                        Err(error) => return Some(Err(self.decode_error(error))),
                    };
                    self.frames_decoded += 1;
                    return Some(Ok(image));
                }
                Ok(false) => {}
                Err(error) => return Some(Err(self.decode_error(error))),
            }

            if self.state == DecodeState::Draining {
                log::debug!(
                    "Decoded {} frames from {}",
                    self.frames_decoded,
                    self.file_path.display()
                );
                self.state = DecodeState::Finished;
                return None;
            }

            let next_packet = self
                .input_context
                .packets()
                .next()
                .map(|(stream, packet)| (stream.index(), packet));

            match next_packet {
                Some((index, packet)) if index == self.video_stream_index => {
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        return Some(Err(self.decode_error(error)));
                    }
                }
                Some(_) => {}
                None => {
                    if let Err(error) = self.decoder.send_eof() {
                        return Some(Err(self.decode_error(error)));
                    }
                    self.state = DecodeState::Draining;
                }
            }
        }
    }
}

/// Copy pixel data from an RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg rows are often padded (stride > width × 3); the padding is
/// dropped so the buffer can go straight to [`RgbImage::from_raw`].
fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        (0..height as usize)
            .flat_map(|row| &data[row * stride..row * stride + row_length])
            .copied()
            .collect()
    }
}
