//! # unspool
//!
//! A minimal streaming video player core: demux one video stream, decode it,
//! and present every picture on a display surface, with the two halves
//! running on their own threads and joined by a bounded packet queue.
//!
//! Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, but the
//! pipeline itself is generic: anything implementing [`Demuxer`],
//! [`Decoder`], and [`Surface`] can be driven by a [`Pipeline`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use unspool::{ImageSurface, MediaSource, Pipeline, PipelineOptions};
//!
//! let source = MediaSource::open("input.mp4")?;
//! let surface = ImageSurface::new(source.video_format())?.with_snapshots("frames", 25);
//!
//! let pipeline = Pipeline::start(source, surface, PipelineOptions::new())?;
//! let report = pipeline.join()?;
//!
//! println!(
//!     "{} packets queued, {} frames presented",
//!     report.demux.packets_enqueued, report.decode.frames_presented
//! );
//! # Ok::<(), unspool::UnspoolError>(())
//! ```
//!
//! ## Stopping early
//!
//! The controlling thread owns the event loop. Calling
//! [`Pipeline::request_shutdown`] closes the queue, which both workers treat
//! as the signal to stop; [`Pipeline::join`] then returns once they have
//! released everything they hold.
//!
//! ## Features
//!
//! - **Bounded hand-off**: [`PacketQueue`] blocks the producer when full
//!   and the consumer when empty, with no polling.
//! - **Error isolation**: a corrupt packet, a decode failure, or a frame
//!   whose format no longer matches the surface is logged and skipped.
//! - **Flush on drain**: frames the decoder holds for reordering are still
//!   presented at end of stream.
//! - **Headless presentation**: [`ImageSurface`] renders to an RGB image and
//!   can write PNG snapshots.
//! - **Progress**: [`ProgressCallback`] reports presented frames, drops, and
//!   an ETA.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://crates.io/crates/log) facade.
//! FFmpeg's own console output is controlled separately with
//! [`set_ffmpeg_log_level`].

pub mod configuration;
pub mod decode;
pub mod demux;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod media;
pub mod metadata;
pub mod packet;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod queue;
pub mod surface;
mod utilities;

pub use configuration::{DEFAULT_MAX_CONSECUTIVE_READ_ERRORS, PipelineOptions};
pub use decode::{DecodeConsumer, DecodeStats, Decoder};
pub use demux::{DemuxProducer, DemuxStats, Demuxer};
pub use error::{ReadError, ReceiveError, SubmitError, UnspoolError};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use frame::{Frame, PictureFrame, PixelFormat, PlaneLayout, VideoFormat};
pub use media::{FfmpegDecoder, FfmpegDemuxer, MediaSource};
pub use metadata::{MediaMetadata, VideoStreamInfo};
pub use packet::{Packet, StreamPacket};
pub use pipeline::{Pipeline, PlaybackReport};
pub use present::{FramePresenter, Plane, Surface};
pub use progress::{ProgressCallback, ProgressInfo};
pub use queue::{CloseReason, DEFAULT_QUEUE_CAPACITY, Dequeued, PacketQueue, QueueClosed};
pub use surface::ImageSurface;
