//! Compressed packets.
//!
//! [`StreamPacket`] is what the pipeline needs to know about a compressed
//! unit: which stream it belongs to and its timing. The pipeline never looks
//! at the payload; it only moves packets from the demuxer, through the
//! queue, into the decoder, and drops them.
//!
//! [`Packet`] is the FFmpeg-backed implementation returned by
//! [`FfmpegDemuxer`](crate::FfmpegDemuxer).

use ffmpeg_next::Packet as FfmpegPacket;

/// Metadata every compressed packet exposes.
pub trait StreamPacket {
    /// Index of the container stream this packet belongs to.
    fn stream_index(&self) -> usize;

    /// Presentation timestamp, if the container set one.
    fn pts(&self) -> Option<i64>;

    /// Decoding timestamp, if the container set one.
    fn dts(&self) -> Option<i64>;

    /// Duration in stream time-base units (`0` when unknown).
    fn duration(&self) -> i64;

    /// Payload size in bytes.
    fn size(&self) -> usize;
}

/// A demuxed FFmpeg packet.
///
/// The underlying `AVPacket` is released when this value is dropped, on
/// every path: consumed by the decoder, filtered out, or handed back by a
/// closed queue.
pub struct Packet {
    inner: FfmpegPacket,
}

impl Packet {
    pub(crate) fn new(inner: FfmpegPacket) -> Self {
        Self { inner }
    }

    /// Borrow the underlying FFmpeg packet.
    pub fn as_ffmpeg(&self) -> &FfmpegPacket {
        &self.inner
    }
}

impl StreamPacket for Packet {
    fn stream_index(&self) -> usize {
        self.inner.stream()
    }

    fn pts(&self) -> Option<i64> {
        self.inner.pts()
    }

    fn dts(&self) -> Option<i64> {
        self.inner.dts()
    }

    fn duration(&self) -> i64 {
        self.inner.duration()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}
