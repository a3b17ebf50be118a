//! Media metadata types.
//!
//! This module defines the metadata returned by
//! [`MediaSource::metadata`](crate::MediaSource::metadata) and
//! [`MediaSource::probe`](crate::MediaSource::probe). Metadata is extracted
//! once when the container is opened.

use std::time::Duration;

use ffmpeg_next::Rational;

use crate::frame::{PixelFormat, VideoFormat};

/// Container-level metadata plus the selected video stream.
///
/// # Example
///
/// ```no_run
/// use unspool::MediaSource;
///
/// let metadata = MediaSource::probe("input.mp4")?;
/// println!("{} {:?}", metadata.format, metadata.duration);
/// println!("{}", metadata.video.video_format());
/// # Ok::<(), unspool::UnspoolError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
    /// Total duration of the container, or zero if unknown.
    pub duration: Duration,
    /// Number of streams of any kind in the container.
    pub stream_count: usize,
    /// The video stream playback decodes.
    pub video: VideoStreamInfo,
}

/// Metadata for the selected video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoStreamInfo {
    /// Container index of the stream.
    pub stream_index: usize,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Decoder output format, mapped onto the presentable set.
    pub pixel_format: PixelFormat,
    /// FFmpeg's name for the decoder output format (e.g. `"YUV420P"`).
    pub pixel_format_name: String,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Average frame rate. Zero when the container does not say.
    pub frames_per_second: f64,
    /// Estimated number of frames, from the stream's frame count or from
    /// duration and frame rate.
    pub frame_count: u64,
    /// Stream time base.
    pub time_base: Rational,
}

impl VideoStreamInfo {
    /// The format a surface should be allocated for.
    pub fn video_format(&self) -> VideoFormat {
        VideoFormat::new(self.width, self.height, self.pixel_format)
    }
}
