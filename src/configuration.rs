//! Pipeline configuration.
//!
//! [`PipelineOptions`] is a builder that carries tuning knobs and the
//! progress callback into [`Pipeline`](crate::Pipeline) without widening
//! every constructor.
//!
//! # Example
//!
//! ```
//! use unspool::PipelineOptions;
//!
//! let options = PipelineOptions::new()
//!     .with_queue_capacity(120)
//!     .with_max_consecutive_read_errors(Some(8))
//!     .with_flush_on_drain(true);
//! assert_eq!(options.queue_capacity(), 120);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{NoOpProgress, ProgressCallback};
use crate::queue::DEFAULT_QUEUE_CAPACITY;

/// Consecutive read failures after which the producer gives up on the input.
pub const DEFAULT_MAX_CONSECUTIVE_READ_ERRORS: u64 = 64;

/// Settings for a playback pipeline.
///
/// A default-constructed value uses a 300-packet queue, no progress
/// reporting, a cap of 64 consecutive read failures, and flushes the decoder
/// once the queue drains.
#[derive(Clone)]
pub struct PipelineOptions {
    pub(crate) queue_capacity: usize,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
    pub(crate) max_consecutive_read_errors: Option<u64>,
    pub(crate) flush_on_drain: bool,
    pub(crate) expected_frames: Option<u64>,
}

impl Debug for PipelineOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineOptions")
            .field("queue_capacity", &self.queue_capacity)
            .field("batch_size", &self.batch_size)
            .field("max_consecutive_read_errors", &self.max_consecutive_read_errors)
            .field("flush_on_drain", &self.flush_on_drain)
            .field("expected_frames", &self.expected_frames)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
            max_consecutive_read_errors: Some(DEFAULT_MAX_CONSECUTIVE_READ_ERRORS),
            flush_on_drain: true,
            expected_frames: None,
        }
    }

    /// Set the packet queue capacity. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Attach a progress callback, invoked on the decode thread.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Report progress every `size` presented frames. Clamped to a minimum
    /// of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Treat this many back-to-back read failures as the end of the stream.
    ///
    /// `None` keeps reading through any number of failures.
    #[must_use]
    pub fn with_max_consecutive_read_errors(mut self, limit: Option<u64>) -> Self {
        self.max_consecutive_read_errors = limit;
        self
    }

    /// Whether to flush the decoder and present its buffered tail once the
    /// queue has drained. Defaults to `true`.
    #[must_use]
    pub fn with_flush_on_drain(mut self, flush: bool) -> Self {
        self.flush_on_drain = flush;
        self
    }

    /// Expected number of frames, used for progress percentages.
    ///
    /// [`Pipeline::start`](crate::Pipeline::start) fills this in from stream
    /// metadata when it is left unset.
    #[must_use]
    pub fn with_expected_frames(mut self, frames: Option<u64>) -> Self {
        self.expected_frames = frames;
        self
    }

    /// The configured queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// The configured progress batch size.
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// The configured consecutive read-failure cap.
    pub fn max_consecutive_read_errors(&self) -> Option<u64> {
        self.max_consecutive_read_errors
    }

    /// Whether the decoder is flushed after the queue drains.
    pub fn flush_on_drain(&self) -> bool {
        self.flush_on_drain
    }
}
