//! Player clock formatting
//!
//! Track positions are shown as `M:SS`; minutes are not wrapped into hours
//! so a 75 minute mix reads `75:00`.

use std::time::Duration;

/// Placeholder shown while a duration is unknown
pub const UNKNOWN_TIME: &str = "0:00";

/// Format seconds as `M:SS`.
///
/// Fractions are truncated. Negative, NaN and infinite values (a stream
/// whose duration the host cannot report) render as [`UNKNOWN_TIME`].
///
/// # Examples
///
/// ```
/// use linkbio_common::human_time::format_track_time;
///
/// assert_eq!(format_track_time(0.0), "0:00");
/// assert_eq!(format_track_time(65.9), "1:05");
/// assert_eq!(format_track_time(f64::NAN), "0:00");
/// ```
pub fn format_track_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return UNKNOWN_TIME.to_string();
    }

    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Format an optional duration as `M:SS`
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format_track_time(d.as_secs_f64()),
        None => UNKNOWN_TIME.to_string(),
    }
}
