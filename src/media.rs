//! The FFmpeg backend: an opened container, its demuxer, and its decoder.
//!
//! [`MediaSource::open`] performs the fallible half of startup (open the
//! container, pick the video stream, open its decoder) so that a
//! [`Pipeline`](crate::Pipeline) only ever starts workers for media that is
//! known to be playable. [`MediaSource::into_parts`] then splits the source
//! into an [`FfmpegDemuxer`] for the producer thread and an
//! [`FfmpegDecoder`] for the consumer thread.
//!
//! This is also the only place FFmpeg return codes are interpreted: they are
//! mapped onto [`ReadError`], [`SubmitError`], and [`ReceiveError`] here and
//! nowhere else.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet as FfmpegPacket, Rational,
    codec::context::Context as CodecContext, decoder::Video as VideoDecoder,
    format::context::Input, frame::Video as VideoFrame, media::Type,
};
use ffmpeg_sys_next::EAGAIN;

use crate::{
    decode::Decoder,
    demux::Demuxer,
    error::{ReadError, ReceiveError, SubmitError, UnspoolError},
    frame::{Frame, PixelFormat, VideoFormat},
    metadata::{MediaMetadata, VideoStreamInfo},
    packet::Packet,
    utilities::rational_to_fps,
};

/// An opened container with its video decoder ready.
///
/// # Example
///
/// ```no_run
/// use unspool::MediaSource;
///
/// let source = MediaSource::open("input.mp4")?;
/// println!("Playing {} at {}", source.metadata().video.codec, source.video_format());
/// # Ok::<(), unspool::UnspoolError>(())
/// ```
pub struct MediaSource {
    input: Input,
    decoder: VideoDecoder,
    metadata: MediaMetadata,
    path: PathBuf,
}

impl Debug for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaSource")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl MediaSource {
    /// Open `path`, select its best video stream, and open a decoder for it.
    ///
    /// FFmpeg is initialised on first use; repeated calls are harmless.
    ///
    /// # Errors
    ///
    /// - [`UnspoolError::FileOpen`] if the container cannot be opened.
    /// - [`UnspoolError::NoVideoStream`] if it has no video stream.
    /// - [`UnspoolError::DecoderOpen`] if no decoder can be opened for the
    ///   stream's codec parameters.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UnspoolError> {
        let path = path.as_ref().to_path_buf();

        log::debug!("Opening media source: {}", path.display());

        ffmpeg_next::init().map_err(|error| UnspoolError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| UnspoolError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let (decoder, video) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(UnspoolError::NoVideoStream)?;

            let context = CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                UnspoolError::DecoderOpen(format!(
                    "invalid codec parameters for stream {}: {error}",
                    stream.index()
                ))
            })?;
            let decoder = context
                .decoder()
                .video()
                .map_err(|error| UnspoolError::DecoderOpen(error.to_string()))?;

            let frames_per_second = match rational_to_fps(stream.avg_frame_rate()) {
                fps if fps > 0.0 => fps,
                _ => rational_to_fps(stream.rate()),
            };
            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let native = decoder.format();

            let video = VideoStreamInfo {
                stream_index: stream.index(),
                width: decoder.width(),
                height: decoder.height(),
                pixel_format: PixelFormat::from_ffmpeg(native),
                pixel_format_name: format!("{native:?}"),
                codec,
                frames_per_second,
                frame_count: stream.frames().max(0) as u64,
                time_base: stream.time_base(),
            };
            (decoder, video)
        };

        let duration = match input.duration() {
            micros if micros > 0 => Duration::from_micros(micros as u64),
            _ => Duration::ZERO,
        };

        let mut video = video;
        if video.frame_count == 0 && video.frames_per_second > 0.0 {
            video.frame_count = (duration.as_secs_f64() * video.frames_per_second) as u64;
        }

        let metadata = MediaMetadata {
            format: input.format().name().to_string(),
            duration,
            stream_count: input.streams().count(),
            video,
        };

        log::info!(
            "Opened {} ({}): {} video on stream {} at {}",
            path.display(),
            metadata.format,
            metadata.video.codec,
            metadata.video.stream_index,
            metadata.video.video_format()
        );
        if metadata.video.pixel_format == PixelFormat::Unknown {
            log::warn!(
                "Decoder output format {} cannot be presented",
                metadata.video.pixel_format_name
            );
        }

        Ok(Self {
            input,
            decoder,
            metadata,
            path,
        })
    }

    /// Open `path` and return its metadata without keeping it open.
    ///
    /// # Errors
    ///
    /// Same as [`MediaSource::open`].
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaMetadata, UnspoolError> {
        Self::open(path).map(|source| source.metadata)
    }

    /// Metadata extracted at open time.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// The format decoded frames are expected to have.
    pub fn video_format(&self) -> VideoFormat {
        self.metadata.video.video_format()
    }

    /// Container index of the selected video stream.
    pub fn stream_index(&self) -> usize {
        self.metadata.video.stream_index
    }

    /// The path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Split into the producer's demuxer, the consumer's decoder, and the
    /// selected stream index.
    pub fn into_parts(self) -> (FfmpegDemuxer, FfmpegDecoder, usize) {
        let stream_index = self.metadata.video.stream_index;
        let time_base = self.metadata.video.time_base;

        (
            FfmpegDemuxer { input: self.input },
            FfmpegDecoder {
                decoder: self.decoder,
                time_base,
            },
            stream_index,
        )
    }
}

/// Reads packets from an opened FFmpeg container.
pub struct FfmpegDemuxer {
    input: Input,
}

impl Demuxer for FfmpegDemuxer {
    type Packet = Packet;

    fn read_packet(&mut self) -> Result<Packet, ReadError> {
        let mut packet = FfmpegPacket::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Packet::new(packet)),
            Err(FfmpegError::Eof) => Err(ReadError::EndOfStream),
            Err(error) => Err(ReadError::Read(error.to_string())),
        }
    }
}

/// Decodes packets of one video stream with FFmpeg.
pub struct FfmpegDecoder {
    decoder: VideoDecoder,
    time_base: Rational,
}

impl Decoder for FfmpegDecoder {
    type Packet = Packet;
    type Frame = Frame;

    fn send_packet(&mut self, packet: &Packet) -> Result<(), SubmitError> {
        self.decoder
            .send_packet(packet.as_ffmpeg())
            .map_err(submit_error)
    }

    fn send_eof(&mut self) -> Result<(), SubmitError> {
        self.decoder.send_eof().map_err(submit_error)
    }

    fn receive_frame(&mut self) -> Result<Frame, ReceiveError> {
        let mut frame = VideoFrame::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => Ok(Frame::new(frame, self.time_base)),
            Err(FfmpegError::Other { errno }) if errno == EAGAIN => Err(ReceiveError::NoFrameYet),
            Err(FfmpegError::Eof) => Err(ReceiveError::EndOfStream),
            Err(error) => Err(ReceiveError::Decode(error.to_string())),
        }
    }
}

fn submit_error(error: FfmpegError) -> SubmitError {
    match error {
        FfmpegError::Other { errno } if errno == EAGAIN => SubmitError::WouldBlock,
        error => SubmitError::Decode(error.to_string()),
    }
}
