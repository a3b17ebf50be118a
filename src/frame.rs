//! Decoded pictures and their negotiated format.
//!
//! [`PictureFrame`] is the view of a decoded picture the pipeline needs:
//! its [`VideoFormat`], timing, and per-plane pixel data with strides.
//! [`Frame`] implements it on top of an FFmpeg video frame.
//!
//! A [`VideoFormat`] is also the contract a display surface is allocated
//! for. Every frame is checked against it before upload, so a decoder that
//! changes resolution mid-stream produces a clean mismatch instead of a
//! truncated or overflowing copy.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use ffmpeg_next::{Rational, format::Pixel, frame::Video as VideoFrame};

use crate::utilities::pts_to_duration;

/// FFmpeg never fills more than this many data pointers per frame.
const MAX_PLANES: usize = 8;

/// Pixel layouts the presentation path understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar Y, U, V with 2x2 chroma subsampling, limited (video) range.
    Yuv420p,
    /// Same layout as [`PixelFormat::Yuv420p`], full (JPEG) range.
    Yuvj420p,
    /// Full-resolution Y plane plus one interleaved, subsampled UV plane.
    Nv12,
    /// Packed 8-bit RGB.
    Rgb24,
    /// Packed 8-bit RGBA.
    Rgba,
    /// Single 8-bit luma plane.
    Gray8,
    /// Anything else, including hardware surfaces. Never presentable.
    Unknown,
}

impl PixelFormat {
    /// Short lowercase name, matching FFmpeg's naming where one exists.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Yuv420p => "yuv420p",
            PixelFormat::Yuvj420p => "yuvj420p",
            PixelFormat::Nv12 => "nv12",
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Rgba => "rgba",
            PixelFormat::Gray8 => "gray8",
            PixelFormat::Unknown => "unknown",
        }
    }

    /// Number of data planes a frame in this format carries.
    pub fn plane_count(self) -> usize {
        match self {
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p => 3,
            PixelFormat::Nv12 => 2,
            PixelFormat::Rgb24 | PixelFormat::Rgba | PixelFormat::Gray8 => 1,
            PixelFormat::Unknown => 0,
        }
    }

    /// Map an FFmpeg pixel format onto the presentable set.
    ///
    /// `YUVJ420P` keeps its own variant so the full colour range survives
    /// into presentation.
    pub fn from_ffmpeg(pixel: Pixel) -> Self {
        match pixel {
            Pixel::YUV420P => PixelFormat::Yuv420p,
            Pixel::YUVJ420P => PixelFormat::Yuvj420p,
            Pixel::NV12 => PixelFormat::Nv12,
            Pixel::RGB24 => PixelFormat::Rgb24,
            Pixel::RGBA => PixelFormat::Rgba,
            Pixel::GRAY8 => PixelFormat::Gray8,
            _ => PixelFormat::Unknown,
        }
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// Byte geometry of one plane: how many bytes of each row carry pixels,
/// and how many rows there are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Meaningful bytes per row (excluding stride padding).
    pub row_bytes: usize,
    /// Number of rows.
    pub rows: usize,
}

impl PlaneLayout {
    /// Smallest buffer that holds every row of this plane at `stride`.
    ///
    /// The last row only needs `row_bytes`, not a full stride.
    pub fn required_len(&self, stride: usize) -> usize {
        if self.rows == 0 {
            0
        } else {
            stride * (self.rows - 1) + self.row_bytes
        }
    }

    /// Size of the plane once stride padding is stripped.
    pub fn packed_len(&self) -> usize {
        self.row_bytes * self.rows
    }
}

/// Picture dimensions plus pixel format.
///
/// This is the negotiated contract between decoder output and a display
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub pixel_format: PixelFormat,
}

impl VideoFormat {
    /// Create a new format description.
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
        }
    }

    /// Per-plane layouts for this format. Chroma planes round up for odd
    /// dimensions.
    pub fn plane_layouts(&self) -> Vec<PlaneLayout> {
        let width = self.width as usize;
        let height = self.height as usize;
        let chroma_width = width.div_ceil(2);
        let chroma_height = height.div_ceil(2);

        match self.pixel_format {
            PixelFormat::Yuv420p | PixelFormat::Yuvj420p => vec![
                PlaneLayout {
                    row_bytes: width,
                    rows: height,
                },
                PlaneLayout {
                    row_bytes: chroma_width,
                    rows: chroma_height,
                },
                PlaneLayout {
                    row_bytes: chroma_width,
                    rows: chroma_height,
                },
            ],
            PixelFormat::Nv12 => vec![
                PlaneLayout {
                    row_bytes: width,
                    rows: height,
                },
                PlaneLayout {
                    row_bytes: chroma_width * 2,
                    rows: chroma_height,
                },
            ],
            PixelFormat::Rgb24 => vec![PlaneLayout {
                row_bytes: width * 3,
                rows: height,
            }],
            PixelFormat::Rgba => vec![PlaneLayout {
                row_bytes: width * 4,
                rows: height,
            }],
            PixelFormat::Gray8 => vec![PlaneLayout {
                row_bytes: width,
                rows: height,
            }],
            PixelFormat::Unknown => Vec::new(),
        }
    }
}

impl Display for VideoFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
    }
}

/// A decoded picture as seen by the presentation path.
///
/// Implementations own their pixel buffers; the presenter only borrows them
/// for the duration of one upload.
pub trait PictureFrame {
    /// Dimensions and pixel layout of this picture.
    fn format(&self) -> VideoFormat;

    /// Presentation timestamp in stream time-base units, if known.
    fn pts(&self) -> Option<i64>;

    /// Presentation timestamp as a [`Duration`], if the frame knows its
    /// time base.
    fn presentation_time(&self) -> Option<Duration> {
        None
    }

    /// Number of data planes actually carried by this frame.
    fn plane_count(&self) -> usize;

    /// Raw bytes of plane `index`, including stride padding.
    ///
    /// Returns an empty slice for a plane the frame does not carry.
    fn plane_data(&self, index: usize) -> &[u8];

    /// Byte distance between the starts of consecutive rows of plane `index`.
    fn stride(&self, index: usize) -> usize;
}

/// An FFmpeg-decoded video frame.
///
/// Produced by [`FfmpegDecoder`](crate::FfmpegDecoder). The underlying
/// `AVFrame` is released when this value is dropped.
pub struct Frame {
    inner: VideoFrame,
    time_base: Rational,
}

impl Frame {
    pub(crate) fn new(inner: VideoFrame, time_base: Rational) -> Self {
        Self { inner, time_base }
    }

    fn raw_linesize(&self, index: usize) -> i32 {
        if index >= MAX_PLANES {
            return 0;
        }
        unsafe { (*self.inner.as_ptr()).linesize[index] }
    }
}

impl PictureFrame for Frame {
    fn format(&self) -> VideoFormat {
        VideoFormat::new(
            self.inner.width(),
            self.inner.height(),
            PixelFormat::from_ffmpeg(self.inner.format()),
        )
    }

    fn pts(&self) -> Option<i64> {
        self.inner.pts().or_else(|| self.inner.timestamp())
    }

    fn presentation_time(&self) -> Option<Duration> {
        self.pts().map(|pts| pts_to_duration(pts, self.time_base))
    }

    fn plane_count(&self) -> usize {
        // `VideoFrame::planes` counts buffer references, which some decoders
        // share across planes; count data pointers instead.
        let raw = unsafe { &*self.inner.as_ptr() };
        raw.data.iter().take_while(|pointer| !pointer.is_null()).count()
    }

    fn plane_data(&self, index: usize) -> &[u8] {
        let layouts = self.format().plane_layouts();
        let Some(layout) = layouts.get(index) else {
            return &[];
        };
        let linesize = self.raw_linesize(index);
        if linesize <= 0 {
            return &[];
        }

        let raw = unsafe { &*self.inner.as_ptr() };
        let pointer = raw.data[index];
        if pointer.is_null() {
            return &[];
        }

        // The decoder allocated `rows` strides for this plane; the layout
        // comes from the frame's own dimensions and format.
        unsafe { std::slice::from_raw_parts(pointer, linesize as usize * layout.rows) }
    }

    fn stride(&self, index: usize) -> usize {
        self.raw_linesize(index).max(0) as usize
    }
}
