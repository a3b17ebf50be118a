//! Bounded, blocking packet hand-off.
//!
//! [`PacketQueue`] sits between the demux producer and the decode consumer.
//! It caps how many compressed packets may be buffered, blocks the producer
//! while full and the consumer while empty, and implements the close/drain
//! protocol both workers use to shut down:
//!
//! - [`finish`](PacketQueue::finish) marks the end of the stream,
//! - [`close`](PacketQueue::close) cancels playback,
//!
//! and in both cases packets already queued stay available until the
//! consumer has drained them. The queue is the only state the two workers
//! share.
//!
//! # Example
//!
//! ```
//! use unspool::{Dequeued, PacketQueue};
//!
//! let queue = PacketQueue::new(2);
//! queue.enqueue("a").unwrap();
//! queue.enqueue("b").unwrap();
//! queue.close();
//!
//! assert!(queue.enqueue("c").is_err());
//! assert!(matches!(queue.dequeue(), Dequeued::Packet("a")));
//! assert!(matches!(queue.dequeue(), Dequeued::Packet("b")));
//! assert!(matches!(queue.dequeue(), Dequeued::Drained(_)));
//! ```

use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

use parking_lot::{Condvar, Mutex};

/// Default queue capacity, in packets.
pub const DEFAULT_QUEUE_CAPACITY: usize = 300;

/// Why a queue stopped accepting packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The producer reached the end of the container.
    EndOfStream,
    /// Playback was cancelled.
    Shutdown,
}

/// Result of [`PacketQueue::dequeue`].
#[derive(Debug)]
pub enum Dequeued<T> {
    /// The packet at the head of the queue.
    Packet(T),
    /// The queue is closed and everything queued has been handed out.
    Drained(CloseReason),
}

/// Returned by [`PacketQueue::enqueue`] when the queue is closed.
///
/// Carries the rejected packet back to the caller, which becomes
/// responsible for releasing it.
pub struct QueueClosed<T>(pub T);

impl<T> QueueClosed<T> {
    /// Take back the rejected packet.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> Display for QueueClosed<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("packet queue is closed")
    }
}

impl<T> Error for QueueClosed<T> {}

struct State<T> {
    packets: VecDeque<T>,
    closed: Option<CloseReason>,
    high_water_mark: usize,
}

/// A capacity-limited FIFO with blocking backpressure.
///
/// Share it between threads behind an [`Arc`](std::sync::Arc).
pub struct PacketQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> PacketQueue<T> {
    /// Create an open, empty queue. A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                packets: VecDeque::with_capacity(capacity),
                closed: None,
                high_water_mark: 0,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Append a packet, blocking while the queue is full and open.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] holding the packet if the queue is closed,
    /// whether it was closed beforehand or while this call was blocked.
    pub fn enqueue(&self, packet: T) -> Result<(), QueueClosed<T>> {
        let mut state = self.state.lock();
        while state.closed.is_none() && state.packets.len() >= self.capacity {
            self.not_full.wait(&mut state);
        }
        if state.closed.is_some() {
            return Err(QueueClosed(packet));
        }

        state.packets.push_back(packet);
        state.high_water_mark = state.high_water_mark.max(state.packets.len());
        drop(state);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head packet, blocking while the queue is empty and open.
    ///
    /// After the queue is closed this keeps returning queued packets in
    /// order, then [`Dequeued::Drained`] forever.
    pub fn dequeue(&self) -> Dequeued<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(packet) = state.packets.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Dequeued::Packet(packet);
            }
            if let Some(reason) = state.closed {
                return Dequeued::Drained(reason);
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Cancel: refuse further packets and wake every blocked caller.
    ///
    /// Idempotent. Packets already queued are kept for draining.
    pub fn close(&self) {
        self.close_with(CloseReason::Shutdown);
    }

    /// Mark the end of the stream. Same as [`close`](Self::close) except for
    /// the reported [`CloseReason`].
    pub fn finish(&self) {
        self.close_with(CloseReason::EndOfStream);
    }

    fn close_with(&self, reason: CloseReason) {
        let mut state = self.state.lock();
        if state.closed.is_none() {
            log::debug!("Closing packet queue ({reason:?}) with {} queued", state.packets.len());
            state.closed = Some(reason);
        }
        drop(state);

        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of queued packets. Advisory only: it may be stale as soon as
    /// it is returned.
    pub fn len(&self) -> usize {
        self.state.lock().packets.len()
    }

    /// Whether no packets are queued. Advisory, like [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.state.lock().packets.is_empty()
    }

    /// Maximum number of queued packets.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether [`close`](Self::close) or [`finish`](Self::finish) was called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }

    /// Why the queue was closed, if it was.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.state.lock().closed
    }

    /// Largest length the queue has reached.
    pub fn high_water_mark(&self) -> usize {
        self.state.lock().high_water_mark
    }
}

impl<T> Debug for PacketQueue<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let state = self.state.lock();
        f.debug_struct("PacketQueue")
            .field("len", &state.packets.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .field("high_water_mark", &state.high_water_mark)
            .finish()
    }
}
