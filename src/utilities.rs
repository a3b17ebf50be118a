//! Internal utility functions.
//!
//! Timestamp conversions shared by packets, frames, and metadata.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Rescale a PTS value from stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}

/// Rescale a PTS value to a [`Duration`]. Negative timestamps clamp to zero
/// and timestamps too large to represent saturate at [`Duration::MAX`].
pub fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    Duration::try_from_secs_f64(pts_to_seconds(pts, time_base).max(0.0)).unwrap_or(Duration::MAX)
}

/// Frames per second from a rational frame rate, or `0.0` when the rate is
/// unset.
pub fn rational_to_fps(rate: Rational) -> f64 {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}
