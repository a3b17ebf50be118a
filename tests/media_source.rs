//! FFmpeg-backed media source and playback tests.
//!
//! Tests that need media skip themselves unless
//! `tests/fixtures/sample_video.mp4` exists.

use std::path::{Path, PathBuf};

use unspool::{
    Decoder, Demuxer, ImageSurface, MediaSource, Pipeline, PipelineOptions, PixelFormat,
    ReadError, ReceiveError, StreamPacket, UnspoolError,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

// ── Startup failures ──────────────────────────────────────────────

#[test]
fn open_nonexistent_file_is_a_file_open_error() {
    let result = MediaSource::open("/nonexistent/path");
    match result {
        Err(UnspoolError::FileOpen { path, reason }) => {
            assert_eq!(path, PathBuf::from("/nonexistent/path"));
            assert!(!reason.is_empty());
        }
        other => panic!("Expected FileOpen, got: {other:?}"),
    }
}

#[test]
fn open_non_media_file_is_a_file_open_error() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("notes.mp4");
    std::fs::write(&path, b"definitely not a container").unwrap();

    let result = MediaSource::open(&path);
    assert!(matches!(result, Err(UnspoolError::FileOpen { .. })));
}

#[test]
fn probe_nonexistent_file_fails() {
    assert!(MediaSource::probe("/nonexistent/path").is_err());
}

// ── Fixture playback ──────────────────────────────────────────────

#[test]
fn open_reports_video_metadata() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = MediaSource::open(path).expect("Failed to open fixture");
    let metadata = source.metadata();

    assert!(metadata.stream_count >= 1);
    assert!(metadata.video.width > 0);
    assert!(metadata.video.height > 0);
    assert!(!metadata.video.codec.is_empty());
    assert_eq!(source.stream_index(), metadata.video.stream_index);
    assert_eq!(source.video_format(), metadata.video.video_format());
    assert_eq!(source.path(), Path::new(path));
}

#[test]
fn demuxer_and_decoder_produce_frames_of_the_negotiated_format() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = MediaSource::open(path).expect("Failed to open fixture");
    let expected = source.video_format();
    let (mut demuxer, mut decoder, stream_index) = source.into_parts();

    let mut frames = Vec::new();
    while frames.len() < 5 {
        let packet = match demuxer.read_packet() {
            Ok(packet) => packet,
            Err(ReadError::EndOfStream) => break,
            Err(error) => panic!("Unexpected read error: {error}"),
        };
        if packet.stream_index() != stream_index {
            continue;
        }
        decoder.send_packet(&packet).expect("Failed to submit packet");
        loop {
            match decoder.receive_frame() {
                Ok(frame) => frames.push(frame),
                Err(ReceiveError::NoFrameYet) | Err(ReceiveError::EndOfStream) => break,
                Err(error) => panic!("Unexpected decode error: {error}"),
            }
        }
    }

    assert!(!frames.is_empty());
    for frame in &frames {
        use unspool::PictureFrame;
        assert_eq!(frame.format(), expected);
        if expected.pixel_format != PixelFormat::Unknown {
            assert!(frame.plane_count() >= expected.pixel_format.plane_count());
            assert!(frame.stride(0) >= expected.width as usize);
        }
    }
}

#[test]
fn plays_fixture_to_the_end() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = MediaSource::open(path).expect("Failed to open fixture");
    if source.video_format().pixel_format == PixelFormat::Unknown {
        return;
    }
    let surface = ImageSurface::new(source.video_format()).unwrap();

    let report = Pipeline::start(source, surface, PipelineOptions::new())
        .unwrap()
        .join()
        .unwrap();

    assert!(report.demux.reached_end_of_stream);
    assert!(report.decode.frames_presented > 0);
    assert_eq!(report.decode.frames_dropped, 0);
    assert_eq!(report.decode.packets_received, report.demux.packets_enqueued);
}

#[test]
fn snapshots_are_written_while_playing() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    let source = MediaSource::open(path).expect("Failed to open fixture");
    if source.video_format().pixel_format == PixelFormat::Unknown {
        return;
    }
    let surface = ImageSurface::new(source.video_format())
        .unwrap()
        .with_snapshots(directory.path(), 10);

    Pipeline::start(source, surface, PipelineOptions::new())
        .unwrap()
        .join()
        .unwrap();

    assert!(directory.path().join("frame_000000.png").exists());
}
