//! Error types for the `unspool` crate.
//!
//! This module defines [`UnspoolError`], the unified error type returned by
//! every fallible public operation, and the three closed outcome sets that
//! the demuxer and decoder boundaries map native results onto:
//! [`ReadError`], [`SubmitError`], and [`ReceiveError`]. Pipeline code only
//! ever matches on these named outcomes, never on raw FFmpeg codes.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::frame::VideoFormat;

/// The unified error type for all `unspool` operations.
///
/// Startup failures ([`FileOpen`](UnspoolError::FileOpen),
/// [`DecoderOpen`](UnspoolError::DecoderOpen),
/// [`NoVideoStream`](UnspoolError::NoVideoStream)) abort pipeline
/// construction before any worker starts. Presentation failures are
/// per-frame: the decode worker logs them, drops the frame, and keeps going.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UnspoolError {
    /// The media container could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The video decoder could not be created or opened.
    #[error("Failed to open video decoder: {0}")]
    DecoderOpen(String),

    /// The container does not hold a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A decoded frame does not match the surface's negotiated format.
    #[error("Frame format mismatch: surface expects {expected}, frame is {actual}")]
    FrameFormatMismatch {
        /// Format the surface was allocated for.
        expected: VideoFormat,
        /// Format of the rejected frame.
        actual: VideoFormat,
    },

    /// A frame plane does not fit the negotiated plane layout.
    #[error("Plane {plane} does not fit the negotiated layout: {reason}")]
    InvalidPlane {
        /// Zero-based plane index.
        plane: usize,
        /// What was wrong with the plane.
        reason: String,
    },

    /// The display surface or renderer failed.
    #[error("Surface error: {0}")]
    Surface(String),

    /// A pipeline worker thread panicked before reaching a terminal state.
    #[error("Pipeline worker '{worker}' panicked")]
    WorkerPanicked {
        /// Name of the worker thread.
        worker: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error (including failure to spawn a worker thread).
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while writing snapshots.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for UnspoolError {
    fn from(error: FfmpegError) -> Self {
        UnspoolError::FfmpegError(error.to_string())
    }
}

/// Outcome of a failed [`Demuxer::read_packet`](crate::Demuxer::read_packet).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The container has no more packets. A normal termination signal.
    #[error("End of stream")]
    EndOfStream,

    /// A transient read failure. The producer reports it and keeps reading.
    #[error("Failed to read packet: {0}")]
    Read(String),
}

/// Outcome of a failed [`Decoder::send_packet`](crate::Decoder::send_packet)
/// or [`Decoder::send_eof`](crate::Decoder::send_eof).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The decoder wants its pending frames received before more input.
    #[error("Decoder is not accepting input until pending frames are received")]
    WouldBlock,

    /// The decoder rejected the packet.
    #[error("Failed to decode packet: {0}")]
    Decode(String),
}

/// Outcome of a failed [`Decoder::receive_frame`](crate::Decoder::receive_frame).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiveError {
    /// The decoder is buffering and needs more input. Not an error.
    #[error("No frame ready yet")]
    NoFrameYet,

    /// The decoder has been flushed and emitted everything it buffered.
    #[error("Decoder fully drained")]
    EndOfStream,

    /// The decoder failed to produce a frame for reasons other than buffering.
    #[error("Failed to decode frame: {0}")]
    Decode(String),
}
