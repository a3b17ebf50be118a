//! Frame presenter tests: format negotiation and plane validation.

mod common;

use common::{LiveCounter, MockFrame, ROW_PADDING, RecordingSurface, SurfaceEvent, small_format};
use unspool::{FramePresenter, PixelFormat, PlaneLayout, UnspoolError, VideoFormat};

#[test]
fn matching_frame_is_uploaded_then_presented() {
    let counter = LiveCounter::new();
    let surface = RecordingSurface::new(small_format());
    let events = surface.events();
    let mut presenter = FramePresenter::new(surface);

    presenter
        .present(&MockFrame::solid(small_format(), 9, &counter))
        .unwrap();

    assert_eq!(
        *events.lock(),
        vec![SurfaceEvent::Upload(vec![9, 9, 9]), SurfaceEvent::Present]
    );
    assert_eq!(presenter.expected_format(), small_format());
}

#[test]
fn different_dimensions_are_a_format_mismatch() {
    let counter = LiveCounter::new();
    let surface = RecordingSurface::new(small_format());
    let events = surface.events();
    let mut presenter = FramePresenter::new(surface);
    let larger = VideoFormat::new(8, 4, PixelFormat::Yuv420p);

    let error = presenter
        .present(&MockFrame::solid(larger, 0, &counter))
        .unwrap_err();

    match error {
        UnspoolError::FrameFormatMismatch { expected, actual } => {
            assert_eq!(expected, small_format());
            assert_eq!(actual, larger);
        }
        other => panic!("Expected FrameFormatMismatch, got: {other}"),
    }
    assert!(events.lock().is_empty());
}

#[test]
fn different_pixel_format_is_a_format_mismatch() {
    let counter = LiveCounter::new();
    let mut presenter = FramePresenter::new(RecordingSurface::new(small_format()));
    let nv12 = VideoFormat::new(4, 2, PixelFormat::Nv12);

    let error = presenter
        .present(&MockFrame::solid(nv12, 0, &counter))
        .unwrap_err();

    assert!(matches!(error, UnspoolError::FrameFormatMismatch { .. }));
    assert!(error.to_string().contains("4x2 yuv420p"));
    assert!(error.to_string().contains("4x2 nv12"));
}

#[test]
fn missing_plane_is_rejected() {
    let counter = LiveCounter::new();
    let surface = RecordingSurface::new(small_format());
    let events = surface.events();
    let mut presenter = FramePresenter::new(surface);
    let frame = MockFrame::solid(small_format(), 0, &counter).without_planes_from(2);

    let error = presenter.present(&frame).unwrap_err();

    assert!(matches!(error, UnspoolError::InvalidPlane { plane: 2, .. }));
    assert!(events.lock().is_empty());
}

#[test]
fn short_plane_buffer_is_rejected() {
    let counter = LiveCounter::new();
    let mut presenter = FramePresenter::new(RecordingSurface::new(small_format()));
    // Luma needs one full stride plus one row of 4 bytes.
    let luma_len = 4 + ROW_PADDING + 3;
    let frame = MockFrame::solid(small_format(), 0, &counter).truncate_plane(0, luma_len);

    let error = presenter.present(&frame).unwrap_err();

    assert!(matches!(error, UnspoolError::InvalidPlane { plane: 0, .. }));
}

#[test]
fn last_row_does_not_need_stride_padding() {
    let counter = LiveCounter::new();
    let mut presenter = FramePresenter::new(RecordingSurface::new(small_format()));
    let luma_len = 4 + ROW_PADDING + 4;
    let frame = MockFrame::solid(small_format(), 0, &counter).truncate_plane(0, luma_len);

    presenter.present(&frame).unwrap();
}

#[test]
fn stride_shorter_than_a_row_is_rejected() {
    let counter = LiveCounter::new();
    let mut presenter = FramePresenter::new(RecordingSurface::new(small_format()));
    let frame = MockFrame::solid(small_format(), 0, &counter).with_stride(1, 1);

    let error = presenter.present(&frame).unwrap_err();

    assert!(matches!(error, UnspoolError::InvalidPlane { plane: 1, .. }));
}

#[test]
fn surface_errors_are_passed_through() {
    let counter = LiveCounter::new();
    let mut presenter = FramePresenter::new(RecordingSurface::new(small_format()).failing());

    let error = presenter
        .present(&MockFrame::solid(small_format(), 0, &counter))
        .unwrap_err();

    assert!(matches!(error, UnspoolError::Surface(_)));
}

// ── Plane layouts ─────────────────────────────────────────────────

#[test]
fn odd_dimensions_round_chroma_up() {
    let layouts = VideoFormat::new(5, 3, PixelFormat::Yuv420p).plane_layouts();
    assert_eq!(
        layouts,
        vec![
            PlaneLayout { row_bytes: 5, rows: 3 },
            PlaneLayout { row_bytes: 3, rows: 2 },
            PlaneLayout { row_bytes: 3, rows: 2 },
        ]
    );

    let nv12 = VideoFormat::new(5, 3, PixelFormat::Nv12).plane_layouts();
    assert_eq!(nv12[1], PlaneLayout { row_bytes: 6, rows: 2 });
}

#[test]
fn full_range_yuv_is_a_distinct_format_with_the_same_layout() {
    use ffmpeg_next::format::Pixel;

    assert_eq!(PixelFormat::from_ffmpeg(Pixel::YUV420P), PixelFormat::Yuv420p);
    assert_eq!(PixelFormat::from_ffmpeg(Pixel::YUVJ420P), PixelFormat::Yuvj420p);
    assert_eq!(PixelFormat::Yuvj420p.name(), "yuvj420p");
    assert_eq!(
        VideoFormat::new(5, 3, PixelFormat::Yuvj420p).plane_layouts(),
        VideoFormat::new(5, 3, PixelFormat::Yuv420p).plane_layouts()
    );
}

#[test]
fn packed_formats_have_one_plane() {
    for (format, bytes_per_pixel) in [
        (PixelFormat::Rgb24, 3),
        (PixelFormat::Rgba, 4),
        (PixelFormat::Gray8, 1),
    ] {
        let layouts = VideoFormat::new(10, 2, format).plane_layouts();
        assert_eq!(layouts.len(), format.plane_count());
        assert_eq!(layouts[0].row_bytes, 10 * bytes_per_pixel);
    }
    assert!(VideoFormat::new(10, 2, PixelFormat::Unknown).plane_layouts().is_empty());
}

#[test]
fn required_len_excludes_last_row_padding() {
    let layout = PlaneLayout { row_bytes: 4, rows: 3 };
    assert_eq!(layout.required_len(16), 16 * 2 + 4);
    assert_eq!(layout.packed_len(), 12);
    assert_eq!(PlaneLayout { row_bytes: 4, rows: 0 }.required_len(16), 0);
}
