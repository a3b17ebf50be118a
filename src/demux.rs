//! The demux producer.
//!
//! [`DemuxProducer`] reads packets from a [`Demuxer`] at I/O pace, throws
//! away packets from streams other than the selected video stream, and
//! pushes the rest into the shared [`PacketQueue`]. A full queue blocks it;
//! a closed queue stops it.

use std::sync::Arc;

use crate::error::ReadError;
use crate::packet::StreamPacket;
use crate::queue::{PacketQueue, QueueClosed};

/// A source of compressed packets, such as an opened container.
///
/// The producer owns its demuxer and calls it from the producer thread
/// only.
pub trait Demuxer: Send {
    /// The packet type this demuxer yields.
    type Packet: StreamPacket + Send;

    /// Read the next packet from any stream.
    ///
    /// # Errors
    ///
    /// [`ReadError::EndOfStream`] once the container is exhausted, or
    /// [`ReadError::Read`] for a failure the caller may retry past.
    fn read_packet(&mut self) -> Result<Self::Packet, ReadError>;
}

/// Counters describing one producer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Packets successfully read from the container, from any stream.
    pub packets_read: u64,
    /// Packets accepted by the queue.
    pub packets_enqueued: u64,
    /// Packets from other streams, released without being queued.
    pub packets_discarded: u64,
    /// Read failures reported by the demuxer.
    pub read_errors: u64,
    /// Whether the producer stopped because the input ended (including a
    /// give-up after too many consecutive read failures).
    pub reached_end_of_stream: bool,
}

/// Pulls packets from a demuxer into the packet queue.
pub struct DemuxProducer<D: Demuxer> {
    demuxer: D,
    queue: Arc<PacketQueue<D::Packet>>,
    stream_index: usize,
    max_consecutive_read_errors: Option<u64>,
}

impl<D: Demuxer> DemuxProducer<D> {
    /// Create a producer that forwards packets of `stream_index` only.
    pub fn new(demuxer: D, queue: Arc<PacketQueue<D::Packet>>, stream_index: usize) -> Self {
        Self {
            demuxer,
            queue,
            stream_index,
            max_consecutive_read_errors: None,
        }
    }

    /// Give up on the input after `limit` back-to-back read failures.
    #[must_use]
    pub fn with_max_consecutive_read_errors(mut self, limit: Option<u64>) -> Self {
        self.max_consecutive_read_errors = limit;
        self
    }

    /// Run until end of stream or until the queue is closed.
    ///
    /// On end of stream the queue is [finished](PacketQueue::finish) so the
    /// consumer can drain and stop. The demuxer is released when this
    /// returns.
    pub fn run(mut self) -> DemuxStats {
        let mut stats = DemuxStats::default();
        let mut consecutive_errors = 0u64;

        log::debug!("Demux producer started for stream {}", self.stream_index);

        loop {
            if self.queue.is_closed() {
                log::debug!("Demux producer observed a closed queue");
                break;
            }

            let packet = match self.demuxer.read_packet() {
                Ok(packet) => {
                    consecutive_errors = 0;
                    packet
                }
                Err(ReadError::EndOfStream) => {
                    log::debug!("Demuxer reached end of stream");
                    stats.reached_end_of_stream = true;
                    self.queue.finish();
                    break;
                }
                Err(ReadError::Read(reason)) => {
                    stats.read_errors += 1;
                    consecutive_errors += 1;
                    log::warn!("Failed to read packet from input: {reason}");

                    if self
                        .max_consecutive_read_errors
                        .is_some_and(|limit| consecutive_errors >= limit)
                    {
                        log::warn!(
                            "Giving up on input after {consecutive_errors} consecutive read errors"
                        );
                        stats.reached_end_of_stream = true;
                        self.queue.finish();
                        break;
                    }
                    continue;
                }
            };
            stats.packets_read += 1;

            if packet.stream_index() != self.stream_index {
                stats.packets_discarded += 1;
                continue;
            }

            if let Err(QueueClosed(packet)) = self.queue.enqueue(packet) {
                drop(packet);
                log::debug!("Packet queue closed while enqueueing; dropping in-flight packet");
                break;
            }
            stats.packets_enqueued += 1;
        }

        log::debug!(
            "Demux producer finished: {} read, {} queued, {} discarded, {} read errors",
            stats.packets_read,
            stats.packets_enqueued,
            stats.packets_discarded,
            stats.read_errors
        );
        stats
    }
}
