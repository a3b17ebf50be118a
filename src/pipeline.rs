//! The playback lifecycle controller.
//!
//! A [`Pipeline`] owns the packet queue and the two worker threads:
//!
//! ```text
//! demuxer ──▶ DemuxProducer ──▶ PacketQueue ──▶ DecodeConsumer ──▶ decoder ──▶ FramePresenter ──▶ surface
//!             (unspool-demux)                   (unspool-decode)
//! ```
//!
//! Everything that can fail at startup (opening the container, finding the
//! video stream, opening the decoder) happens before any thread is spawned.
//! After that the caller runs its own event loop; to stop early it calls
//! [`Pipeline::request_shutdown`], which closes the queue. Both workers
//! observe the closed queue at their next blocking point or loop top and
//! unwind, releasing every packet and frame they hold. [`Pipeline::join`]
//! waits for both and reports what happened.
//!
//! # Example
//!
//! ```no_run
//! use std::{thread, time::Duration};
//!
//! use unspool::{ImageSurface, MediaSource, Pipeline, PipelineOptions};
//!
//! let source = MediaSource::open("input.mp4")?;
//! let surface = ImageSurface::new(source.video_format())?;
//! let pipeline = Pipeline::start(source, surface, PipelineOptions::new())?;
//!
//! // Play for at most five seconds.
//! for _ in 0..50 {
//!     if pipeline.is_finished() {
//!         break;
//!     }
//!     thread::sleep(Duration::from_millis(100));
//! }
//! pipeline.request_shutdown();
//! let report = pipeline.join()?;
//! println!("presented {} frames", report.decode.frames_presented);
//! # Ok::<(), unspool::UnspoolError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crate::{
    configuration::PipelineOptions,
    decode::{DecodeConsumer, DecodeStats, Decoder},
    demux::{DemuxProducer, DemuxStats, Demuxer},
    error::UnspoolError,
    media::MediaSource,
    packet::{Packet, StreamPacket},
    present::{FramePresenter, Surface},
    queue::PacketQueue,
};

const DEMUX_THREAD: &str = "unspool-demux";
const DECODE_THREAD: &str = "unspool-decode";

/// What both workers did, returned by [`Pipeline::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Producer counters.
    pub demux: DemuxStats,
    /// Consumer counters.
    pub decode: DecodeStats,
    /// Largest number of packets the queue held at once.
    pub queue_high_water_mark: usize,
}

/// A running decode pipeline.
///
/// Dropping a pipeline that was not joined requests shutdown and joins both
/// workers, so no worker outlives its controller.
pub struct Pipeline<P: StreamPacket + Send + 'static = Packet> {
    queue: Arc<PacketQueue<P>>,
    demux: Option<JoinHandle<DemuxStats>>,
    decode: Option<JoinHandle<DecodeStats>>,
}

impl<P: StreamPacket + Send + 'static> Debug for Pipeline<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Pipeline")
            .field("queue", &self.queue)
            .field("demux_running", &self.demux.is_some())
            .field("decode_running", &self.decode.is_some())
            .finish()
    }
}

impl Pipeline<Packet> {
    /// Open `path` and start playing it into `surface`.
    ///
    /// # Errors
    ///
    /// Any error from [`MediaSource::open`], in which case no worker is
    /// started, or [`UnspoolError::IoError`] if a worker thread cannot be
    /// spawned.
    pub fn open<Pth, S>(path: Pth, surface: S, options: PipelineOptions) -> Result<Self, UnspoolError>
    where
        Pth: AsRef<Path>,
        S: Surface + 'static,
    {
        let source = MediaSource::open(path)?;
        Self::start(source, surface, options)
    }

    /// Start playing an opened source into `surface`.
    ///
    /// If the options carry no expected frame count, the stream's estimated
    /// frame count is used for progress percentages.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::IoError`] if a worker thread cannot be spawned.
    pub fn start<S>(
        source: MediaSource,
        surface: S,
        mut options: PipelineOptions,
    ) -> Result<Self, UnspoolError>
    where
        S: Surface + 'static,
    {
        let expected = source.video_format();
        if surface.format() != expected {
            log::warn!(
                "Surface is {} but the stream decodes to {}; frames will be dropped",
                surface.format(),
                expected
            );
        }

        let frame_count = source.metadata().video.frame_count;
        if options.expected_frames.is_none() && frame_count > 0 {
            options.expected_frames = Some(frame_count);
        }

        let (demuxer, decoder, stream_index) = source.into_parts();
        Self::spawn(demuxer, stream_index, decoder, surface, options)
    }
}

impl<P: StreamPacket + Send + 'static> Pipeline<P> {
    /// Start the producer and consumer threads over any demuxer, decoder,
    /// and surface.
    ///
    /// Only packets whose stream index equals `stream_index` reach the
    /// decoder.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::IoError`] if a worker thread cannot be spawned. If the
    /// second spawn fails, the first worker is stopped and joined first.
    pub fn spawn<D, C, S>(
        demuxer: D,
        stream_index: usize,
        decoder: C,
        surface: S,
        options: PipelineOptions,
    ) -> Result<Self, UnspoolError>
    where
        D: Demuxer<Packet = P> + 'static,
        C: Decoder<Packet = P> + 'static,
        S: Surface + 'static,
    {
        let queue = Arc::new(PacketQueue::new(options.queue_capacity));

        let producer = DemuxProducer::new(demuxer, Arc::clone(&queue), stream_index)
            .with_max_consecutive_read_errors(options.max_consecutive_read_errors);
        let consumer = DecodeConsumer::new(decoder, Arc::clone(&queue), FramePresenter::new(surface))
            .with_options(&options);

        let decode = thread::Builder::new()
            .name(DECODE_THREAD.to_string())
            .spawn(move || consumer.run())?;

        let demux = match thread::Builder::new()
            .name(DEMUX_THREAD.to_string())
            .spawn(move || producer.run())
        {
            Ok(handle) => handle,
            Err(error) => {
                log::warn!("Failed to spawn {DEMUX_THREAD}: {error}");
                queue.close();
                if decode.join().is_err() {
                    log::warn!("{DECODE_THREAD} panicked while stopping");
                }
                return Err(error.into());
            }
        };

        log::info!(
            "Pipeline started on stream {stream_index} with a {}-packet queue",
            queue.capacity()
        );

        Ok(Self {
            queue,
            demux: Some(demux),
            decode: Some(decode),
        })
    }

    /// Ask both workers to stop by closing the queue.
    ///
    /// Idempotent, and a no-op once playback has ended on its own. Packets
    /// still queued are released when the consumer drains them.
    pub fn request_shutdown(&self) {
        if !self.queue.is_closed() {
            log::debug!("Pipeline shutdown requested");
        }
        self.queue.close();
    }

    /// Whether the consumer has terminated, i.e. playback is over.
    pub fn is_finished(&self) -> bool {
        self.decode
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Packets currently waiting in the queue. Advisory only.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Wait for both workers to terminate.
    ///
    /// Without a prior [`request_shutdown`](Pipeline::request_shutdown) this
    /// waits for the stream to play to its end.
    ///
    /// # Errors
    ///
    /// [`UnspoolError::WorkerPanicked`] if either worker panicked. Both
    /// workers are joined regardless.
    pub fn join(mut self) -> Result<PlaybackReport, UnspoolError> {
        let (demux, decode) = self.join_workers();

        let report = PlaybackReport {
            demux: demux?,
            decode: decode?,
            queue_high_water_mark: self.queue.high_water_mark(),
        };

        log::debug!("Pipeline joined: {report:?}");
        Ok(report)
    }

    fn join_workers(
        &mut self,
    ) -> (
        Result<DemuxStats, UnspoolError>,
        Result<DecodeStats, UnspoolError>,
    ) {
        // Consumer first. If it panicked, closing the queue is what unblocks
        // a producer stuck on a full queue.
        let decode = join_worker(self.decode.take(), DECODE_THREAD);
        self.queue.close();
        let demux = join_worker(self.demux.take(), DEMUX_THREAD);
        (demux, decode)
    }
}

impl<P: StreamPacket + Send + 'static> Drop for Pipeline<P> {
    fn drop(&mut self) {
        if self.demux.is_none() && self.decode.is_none() {
            return;
        }

        self.request_shutdown();
        let (demux, decode) = self.join_workers();
        if let Err(error) = demux.map(drop).and(decode.map(drop)) {
            log::warn!("Pipeline dropped with a failed worker: {error}");
        }
    }
}

fn join_worker<T: Default>(
    handle: Option<JoinHandle<T>>,
    name: &str,
) -> Result<T, UnspoolError> {
    let Some(handle) = handle else {
        return Ok(T::default());
    };
    handle.join().map_err(|_| {
        log::warn!("Worker {name} panicked");
        UnspoolError::WorkerPanicked {
            worker: name.to_string(),
        }
    })
}
