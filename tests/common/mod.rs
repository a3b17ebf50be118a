//! In-memory stand-ins for the demuxer, decoder, frames, and surface.
//!
//! Every mock packet and frame holds a [`LiveToken`], so tests can assert
//! that nothing is leaked once the pipeline has shut down.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use unspool::{
    Decoder, Demuxer, PictureFrame, PixelFormat, Plane, ReadError, ReceiveError, StreamPacket,
    SubmitError, Surface, UnspoolError, VideoFormat,
};

pub const VIDEO_STREAM: usize = 0;
pub const AUDIO_STREAM: usize = 1;

/// Padding added to every mock plane row, so strides never equal widths.
pub const ROW_PADDING: usize = 8;

pub fn small_format() -> VideoFormat {
    VideoFormat::new(4, 2, PixelFormat::Yuv420p)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

// ── Ownership tracking ────────────────────────────────────────────

/// Counts objects that have been created but not yet dropped.
#[derive(Debug, Clone, Default)]
pub struct LiveCounter {
    live: Arc<AtomicUsize>,
    created: Arc<AtomicUsize>,
}

impl LiveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> LiveToken {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.created.fetch_add(1, Ordering::SeqCst);
        LiveToken {
            live: Arc::clone(&self.live),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct LiveToken {
    live: Arc<AtomicUsize>,
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Packets ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MockPacket {
    pub stream: usize,
    pub pts: i64,
    _token: LiveToken,
}

impl MockPacket {
    pub fn new(stream: usize, pts: i64, counter: &LiveCounter) -> Self {
        Self {
            stream,
            pts,
            _token: counter.token(),
        }
    }
}

impl StreamPacket for MockPacket {
    fn stream_index(&self) -> usize {
        self.stream
    }

    fn pts(&self) -> Option<i64> {
        Some(self.pts)
    }

    fn dts(&self) -> Option<i64> {
        Some(self.pts)
    }

    fn duration(&self) -> i64 {
        1
    }

    fn size(&self) -> usize {
        16
    }
}

// ── Demuxer ───────────────────────────────────────────────────────

/// One scripted demuxer outcome.
#[derive(Debug, Clone)]
pub enum Read {
    Packet { stream: usize, pts: i64 },
    Fail(&'static str),
}

pub struct MockDemuxer {
    script: VecDeque<Read>,
    endless: Option<usize>,
    next_pts: i64,
    counter: LiveCounter,
    reads: Arc<AtomicUsize>,
}

impl MockDemuxer {
    /// Yields `script` in order, then end of stream.
    pub fn scripted(script: Vec<Read>, counter: &LiveCounter) -> Self {
        Self {
            script: script.into(),
            endless: None,
            next_pts: 0,
            counter: counter.clone(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Yields packets of `stream` with increasing PTS forever.
    pub fn endless(stream: usize, counter: &LiveCounter) -> Self {
        Self {
            script: VecDeque::new(),
            endless: Some(stream),
            next_pts: 0,
            counter: counter.clone(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared count of `read_packet` calls.
    pub fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl Demuxer for MockDemuxer {
    type Packet = MockPacket;

    fn read_packet(&mut self) -> Result<MockPacket, ReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(stream) = self.endless {
            let pts = self.next_pts;
            self.next_pts += 1;
            return Ok(MockPacket::new(stream, pts, &self.counter));
        }

        match self.script.pop_front() {
            Some(Read::Packet { stream, pts }) => Ok(MockPacket::new(stream, pts, &self.counter)),
            Some(Read::Fail(reason)) => Err(ReadError::Read(reason.to_string())),
            None => Err(ReadError::EndOfStream),
        }
    }
}

/// `target` video packets with PTS 0.. interleaved with `others` audio packets.
pub fn interleaved_script(target: i64, others: i64) -> Vec<Read> {
    let mut script = Vec::new();
    let mut remaining_others = others;
    for pts in 0..target {
        script.push(Read::Packet {
            stream: VIDEO_STREAM,
            pts,
        });
        if remaining_others > 0 && pts % 2 == 1 {
            script.push(Read::Packet {
                stream: AUDIO_STREAM,
                pts: 1_000 + pts,
            });
            remaining_others -= 1;
        }
    }
    for extra in 0..remaining_others {
        script.push(Read::Packet {
            stream: AUDIO_STREAM,
            pts: 2_000 + extra,
        });
    }
    script
}

// ── Frames ────────────────────────────────────────────────────────

/// A decoded picture whose every pixel byte is the low byte of its PTS.
pub struct MockFrame {
    format: VideoFormat,
    pts: i64,
    planes: Vec<Vec<u8>>,
    strides: Vec<usize>,
    _token: LiveToken,
}

impl MockFrame {
    pub fn solid(format: VideoFormat, pts: i64, counter: &LiveCounter) -> Self {
        let layouts = format.plane_layouts();
        let strides: Vec<usize> = layouts
            .iter()
            .map(|layout| layout.row_bytes + ROW_PADDING)
            .collect();
        let planes = layouts
            .iter()
            .zip(&strides)
            .map(|(layout, stride)| vec![pts as u8; stride * layout.rows])
            .collect();

        Self {
            format,
            pts,
            planes,
            strides,
            _token: counter.token(),
        }
    }

    /// Cut plane `index` down to `len` bytes.
    pub fn truncate_plane(mut self, index: usize, len: usize) -> Self {
        self.planes[index].truncate(len);
        self
    }

    /// Drop every plane from `index` on.
    pub fn without_planes_from(mut self, index: usize) -> Self {
        self.planes.truncate(index);
        self.strides.truncate(index);
        self
    }

    pub fn with_stride(mut self, index: usize, stride: usize) -> Self {
        self.strides[index] = stride;
        self
    }
}

impl PictureFrame for MockFrame {
    fn format(&self) -> VideoFormat {
        self.format
    }

    fn pts(&self) -> Option<i64> {
        Some(self.pts)
    }

    fn presentation_time(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.pts.max(0) as u64 * 40))
    }

    fn plane_count(&self) -> usize {
        self.planes.len()
    }

    fn plane_data(&self, index: usize) -> &[u8] {
        self.planes.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    fn stride(&self, index: usize) -> usize {
        self.strides.get(index).copied().unwrap_or(0)
    }
}

// ── Decoder ───────────────────────────────────────────────────────

/// A decoder with scriptable failures, skipped packets, and reordering delay.
pub struct MockDecoder {
    format: VideoFormat,
    counter: LiveCounter,
    pending: VecDeque<i64>,
    pending_receive_error: bool,
    eof: bool,
    /// Frames held back until this many more packets have arrived.
    delay: usize,
    /// PTS values that never produce a frame.
    silent: HashSet<i64>,
    /// PTS values rejected on submit.
    rejected: HashSet<i64>,
    /// PTS values answered with would-block.
    busy: HashSet<i64>,
    /// Refuse input while a ready frame has not been received.
    block_while_pending: bool,
    /// PTS values whose receive fails once.
    receive_failures: HashSet<i64>,
    /// PTS values whose frame comes out in a different format.
    resized: HashSet<i64>,
    submitted: Arc<Mutex<Vec<i64>>>,
    eof_calls: Arc<AtomicUsize>,
}

impl MockDecoder {
    pub fn new(format: VideoFormat, counter: &LiveCounter) -> Self {
        Self {
            format,
            counter: counter.clone(),
            pending: VecDeque::new(),
            pending_receive_error: false,
            eof: false,
            delay: 0,
            silent: HashSet::new(),
            rejected: HashSet::new(),
            busy: HashSet::new(),
            block_while_pending: false,
            receive_failures: HashSet::new(),
            resized: HashSet::new(),
            submitted: Arc::new(Mutex::new(Vec::new())),
            eof_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    pub fn silent_for(mut self, pts: &[i64]) -> Self {
        self.silent.extend(pts);
        self
    }

    pub fn reject(mut self, pts: &[i64]) -> Self {
        self.rejected.extend(pts);
        self
    }

    pub fn busy_for(mut self, pts: &[i64]) -> Self {
        self.busy.extend(pts);
        self
    }

    pub fn block_while_pending(mut self) -> Self {
        self.block_while_pending = true;
        self
    }

    pub fn fail_receive_for(mut self, pts: &[i64]) -> Self {
        self.receive_failures.extend(pts);
        self
    }

    pub fn resize_for(mut self, pts: &[i64]) -> Self {
        self.resized.extend(pts);
        self
    }

    pub fn submitted(&self) -> Arc<Mutex<Vec<i64>>> {
        Arc::clone(&self.submitted)
    }

    pub fn eof_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.eof_calls)
    }

    fn frame_for(&self, pts: i64) -> MockFrame {
        let format = if self.resized.contains(&pts) {
            VideoFormat::new(self.format.width * 2, self.format.height * 2, self.format.pixel_format)
        } else {
            self.format
        };
        MockFrame::solid(format, pts, &self.counter)
    }
}

impl Decoder for MockDecoder {
    type Packet = MockPacket;
    type Frame = MockFrame;

    fn send_packet(&mut self, packet: &MockPacket) -> Result<(), SubmitError> {
        if self.busy.contains(&packet.pts) {
            return Err(SubmitError::WouldBlock);
        }
        if self.block_while_pending && self.pending.len() > self.delay {
            return Err(SubmitError::WouldBlock);
        }
        if self.rejected.contains(&packet.pts) {
            return Err(SubmitError::Decode(format!("corrupt packet {}", packet.pts)));
        }

        self.submitted.lock().push(packet.pts);
        if self.receive_failures.contains(&packet.pts) {
            self.pending_receive_error = true;
        }
        if !self.silent.contains(&packet.pts) {
            self.pending.push_back(packet.pts);
        }
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), SubmitError> {
        self.eof_calls.fetch_add(1, Ordering::SeqCst);
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<MockFrame, ReceiveError> {
        if self.pending_receive_error {
            self.pending_receive_error = false;
            return Err(ReceiveError::Decode("bitstream error".to_string()));
        }

        if self.eof || self.pending.len() > self.delay {
            if let Some(pts) = self.pending.pop_front() {
                return Ok(self.frame_for(pts));
            }
        }

        if self.eof {
            Err(ReceiveError::EndOfStream)
        } else {
            Err(ReceiveError::NoFrameYet)
        }
    }
}

// ── Surface ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Planes uploaded; holds the first byte of each plane.
    Upload(Vec<u8>),
    Present,
}

/// Records every call and keeps the first byte of each uploaded plane.
pub struct RecordingSurface {
    format: VideoFormat,
    events: Arc<Mutex<Vec<SurfaceEvent>>>,
    fail_present: bool,
    present_delay: Duration,
}

impl RecordingSurface {
    pub fn new(format: VideoFormat) -> Self {
        Self {
            format,
            events: Arc::new(Mutex::new(Vec::new())),
            fail_present: false,
            present_delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_present = true;
        self
    }

    /// Sleep this long in every present, to slow the consumer down.
    pub fn with_present_delay(mut self, delay: Duration) -> Self {
        self.present_delay = delay;
        self
    }

    pub fn events(&self) -> Arc<Mutex<Vec<SurfaceEvent>>> {
        Arc::clone(&self.events)
    }
}

impl Surface for RecordingSurface {
    fn format(&self) -> VideoFormat {
        self.format
    }

    fn update_planes(&mut self, planes: &[Plane<'_>]) -> Result<(), UnspoolError> {
        let first_bytes = planes
            .iter()
            .map(|plane| plane.rows().next().and_then(|row| row.first().copied()).unwrap_or(0))
            .collect();
        self.events.lock().push(SurfaceEvent::Upload(first_bytes));
        Ok(())
    }

    fn present(&mut self) -> Result<(), UnspoolError> {
        if !self.present_delay.is_zero() {
            thread::sleep(self.present_delay);
        }
        if self.fail_present {
            return Err(UnspoolError::Surface("display lost".to_string()));
        }
        self.events.lock().push(SurfaceEvent::Present);
        Ok(())
    }
}

/// PTS bytes of every upload that was followed by a present.
pub fn presented_pts(events: &[SurfaceEvent]) -> Vec<u8> {
    events
        .windows(2)
        .filter_map(|pair| match pair {
            [SurfaceEvent::Upload(bytes), SurfaceEvent::Present] => bytes.first().copied(),
            _ => None,
        })
        .collect()
}
