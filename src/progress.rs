//! Playback progress reporting.
//!
//! The decode worker reports how far playback has come through a
//! [`ProgressCallback`] attached to
//! [`PipelineOptions`](crate::PipelineOptions). Callbacks run on the decode
//! thread, so they should return quickly.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use unspool::{ImageSurface, Pipeline, PipelineOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} frames shown)", info.frames_presented);
//!         }
//!     }
//! }
//!
//! let source = unspool::MediaSource::open("input.mp4")?;
//! let surface = ImageSurface::new(source.video_format())?;
//! let options = PipelineOptions::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_batch_size(30);
//! let pipeline = Pipeline::start(source, surface, options)?;
//! let report = pipeline.join()?;
//! # Ok::<(), unspool::UnspoolError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of playback progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames uploaded and presented so far.
    pub frames_presented: u64,
    /// Frames decoded but dropped (format mismatch or surface failure).
    pub frames_dropped: u64,
    /// Expected total number of frames, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 - 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the decode worker started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Presentation time of the most recent frame, if known.
    pub current_timestamp: Option<Duration>,
}

/// Receives progress updates from the decode worker.
///
/// Implementations must be [`Send`] and [`Sync`]: the callback is created on
/// the controlling thread and invoked from the decode thread.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` presented frames and once at the end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks counts and timing on the decode thread and fires the callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    presented: u64,
    dropped: u64,
    batch_size: u64,
    since_last_report: u64,
    last_timestamp: Option<Duration>,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            callback,
            total,
            presented: 0,
            dropped: 0,
            batch_size: batch_size.max(1),
            since_last_report: 0,
            last_timestamp: None,
            start_time: Instant::now(),
        }
    }

    /// Record one presented frame and report if the batch is full.
    pub(crate) fn frame_presented(&mut self, timestamp: Option<Duration>) {
        self.presented += 1;
        self.since_last_report += 1;
        if timestamp.is_some() {
            self.last_timestamp = timestamp;
        }

        if self.since_last_report >= self.batch_size {
            self.report();
            self.since_last_report = 0;
        }
    }

    /// Record one dropped frame. Drops never trigger a report on their own.
    pub(crate) fn frame_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.presented as f32 / total as f32 * 100.0).min(100.0));

        let estimated_remaining = if self.presented > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.presented);
                elapsed.mul_f64(remaining as f64 / self.presented as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            frames_presented: self.presented,
            frames_dropped: self.dropped,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: self.last_timestamp,
        });
    }
}
