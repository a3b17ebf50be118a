//! The decode consumer.
//!
//! [`DecodeConsumer`] drains the packet queue into a stateful [`Decoder`]
//! and hands every frame the decoder emits to a [`FramePresenter`]. It never
//! lets a single bad packet or frame stop playback: submission failures,
//! decode failures, and presentation failures are logged, counted, and the
//! loop moves on.
//!
//! Once the queue reports it is drained, the decoder is flushed so frames it
//! was holding back for reordering are still presented.

use std::sync::Arc;

use crate::configuration::PipelineOptions;
use crate::error::{ReceiveError, SubmitError};
use crate::frame::PictureFrame;
use crate::packet::StreamPacket;
use crate::present::{FramePresenter, Surface};
use crate::progress::{NoOpProgress, ProgressTracker};
use crate::queue::{CloseReason, Dequeued, PacketQueue};

/// A stateful video decoder.
///
/// Call pattern: after every successful [`send_packet`](Decoder::send_packet),
/// call [`receive_frame`](Decoder::receive_frame) until it reports
/// [`ReceiveError::NoFrameYet`]. At end of input, call
/// [`send_eof`](Decoder::send_eof) once and receive until
/// [`ReceiveError::EndOfStream`].
///
/// A decoder is owned by the decode thread and never shared.
pub trait Decoder: Send {
    /// Packets this decoder consumes.
    type Packet: StreamPacket;
    /// Frames this decoder produces.
    type Frame: PictureFrame;

    /// Submit one compressed packet.
    ///
    /// The decoder copies or references what it needs; the caller releases
    /// the packet afterwards either way.
    fn send_packet(&mut self, packet: &Self::Packet) -> Result<(), SubmitError>;

    /// Signal that no more packets will arrive.
    fn send_eof(&mut self) -> Result<(), SubmitError>;

    /// Take the next decoded frame, if one is ready.
    fn receive_frame(&mut self) -> Result<Self::Frame, ReceiveError>;
}

/// Counters describing one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Packets taken from the queue.
    pub packets_received: u64,
    /// Packets the decoder accepted.
    pub packets_submitted: u64,
    /// Packets the decoder refused (would-block or decode error).
    pub packets_rejected: u64,
    /// Frames the decoder emitted.
    pub frames_decoded: u64,
    /// Frames uploaded and presented.
    pub frames_presented: u64,
    /// Frames dropped because presentation failed.
    pub frames_dropped: u64,
    /// Decode failures on submit or receive.
    pub decode_errors: u64,
    /// Whether the decoder was flushed after the queue drained.
    pub flushed: bool,
    /// How the queue was closed when the consumer drained it.
    pub close_reason: Option<CloseReason>,
}

/// Decodes queued packets and presents the resulting frames.
pub struct DecodeConsumer<D: Decoder, S: Surface> {
    decoder: D,
    queue: Arc<PacketQueue<D::Packet>>,
    presenter: FramePresenter<S>,
    progress: ProgressTracker,
    flush_on_drain: bool,
    stats: DecodeStats,
}

impl<D: Decoder, S: Surface> DecodeConsumer<D, S> {
    /// Create a consumer that flushes on drain and reports no progress.
    pub fn new(decoder: D, queue: Arc<PacketQueue<D::Packet>>, presenter: FramePresenter<S>) -> Self {
        Self {
            decoder,
            queue,
            presenter,
            progress: ProgressTracker::new(Arc::new(NoOpProgress), None, 1),
            flush_on_drain: true,
            stats: DecodeStats::default(),
        }
    }

    /// Take the progress callback, batch size, expected frame count, and
    /// flush behaviour from `options`.
    #[must_use]
    pub fn with_options(mut self, options: &PipelineOptions) -> Self {
        self.progress = ProgressTracker::new(
            Arc::clone(&options.progress),
            options.expected_frames,
            options.batch_size,
        );
        self.flush_on_drain = options.flush_on_drain;
        self
    }

    /// Run until the queue is closed and drained, then flush the decoder.
    ///
    /// The decoder and surface are released when this returns.
    pub fn run(mut self) -> DecodeStats {
        log::debug!(
            "Decode consumer started, presenting at {}",
            self.presenter.expected_format()
        );

        loop {
            let packet = match self.queue.dequeue() {
                Dequeued::Packet(packet) => packet,
                Dequeued::Drained(reason) => {
                    log::debug!("Packet queue drained ({reason:?})");
                    self.stats.close_reason = Some(reason);
                    break;
                }
            };
            self.stats.packets_received += 1;

            let submitted = match self.decoder.send_packet(&packet) {
                Err(SubmitError::WouldBlock) => {
                    // Pending output must be received before the decoder
                    // accepts input again.
                    self.receive_frames();
                    self.decoder.send_packet(&packet)
                }
                other => other,
            };
            drop(packet);

            match submitted {
                Ok(()) => {
                    self.stats.packets_submitted += 1;
                    self.receive_frames();
                }
                Err(SubmitError::WouldBlock) => {
                    self.stats.packets_rejected += 1;
                    log::warn!("Decoder still refused packet after draining pending frames; packet dropped");
                }
                Err(SubmitError::Decode(reason)) => {
                    self.stats.packets_rejected += 1;
                    self.stats.decode_errors += 1;
                    log::warn!("Decoder rejected packet: {reason}");
                }
            }
        }

        if self.flush_on_drain {
            self.flush();
        }
        self.progress.finish();

        log::debug!(
            "Decode consumer finished: {} packets, {} frames presented, {} dropped",
            self.stats.packets_received,
            self.stats.frames_presented,
            self.stats.frames_dropped
        );
        self.stats
    }

    fn flush(&mut self) {
        match self.decoder.send_eof() {
            Ok(()) => {
                self.stats.flushed = true;
                self.receive_frames();
            }
            Err(error) => log::warn!("Failed to flush decoder: {error}"),
        }
    }

    fn receive_frames(&mut self) {
        loop {
            match self.decoder.receive_frame() {
                Ok(frame) => {
                    self.stats.frames_decoded += 1;
                    self.present(frame);
                }
                Err(ReceiveError::NoFrameYet) | Err(ReceiveError::EndOfStream) => break,
                Err(ReceiveError::Decode(reason)) => {
                    self.stats.decode_errors += 1;
                    log::warn!("Failed to receive frame from decoder: {reason}");
                    break;
                }
            }
        }
    }

    fn present(&mut self, frame: D::Frame) {
        match self.presenter.present(&frame) {
            Ok(()) => {
                self.stats.frames_presented += 1;
                self.progress.frame_presented(frame.presentation_time());
            }
            Err(error) => {
                self.stats.frames_dropped += 1;
                self.progress.frame_dropped();
                log::warn!("Dropping frame: {error}");
            }
        }
    }
}
