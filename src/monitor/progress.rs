//! Parsing of ffmpeg's `-progress` stream and ETA arithmetic.
//!
//! The stream is a repeating block of key=value lines:
//! ```text
//! frame=100
//! out_time_ms=3333333
//! speed=2.5x
//! progress=continue
//! ```
//! Only the processed media time matters here.

use std::time::Duration;

use super::update::{MediaDuration, ProgressUpdate};

/// Key carrying processed media time; microseconds despite the name
pub const PROGRESS_TIME_KEY: &str = "out_time_ms=";

/// Processed media time parsed from one progress line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub elapsed_media_seconds: f64,
}

impl ProgressSample {
    /// Parse a progress line.
    ///
    /// Returns `None` for other keys and for unparseable values such as `N/A`.
    pub fn parse(line: &str) -> Option<Self> {
        let value = line.trim().strip_prefix(PROGRESS_TIME_KEY)?;
        let micros: i64 = value.trim().parse().ok()?;

        // ffmpeg can report slightly negative times at the start
        Some(Self {
            elapsed_media_seconds: micros.max(0) as f64 / 1_000_000.0,
        })
    }
}

/// Estimate the wall-clock seconds left.
///
/// Assumes a constant media-time/wall-time ratio: the whole job takes
/// `wall_elapsed / (media_done / total)`. Returns `None` when no estimate can
/// be made (unknown or zero total, nothing processed yet).
pub fn estimate_remaining(
    sample: ProgressSample,
    total: MediaDuration,
    wall_elapsed: Duration,
) -> Option<f64> {
    let total = total.seconds().filter(|t| *t > 0.0)?;
    if sample.elapsed_media_seconds <= 0.0 {
        return None;
    }

    let elapsed = wall_elapsed.as_secs_f64();
    let estimated_total = elapsed / (sample.elapsed_media_seconds / total);
    Some((estimated_total - elapsed).max(0.0))
}

/// Updates for one parsed sample, in emission order
pub fn updates_for_sample(
    sample: ProgressSample,
    total: MediaDuration,
    wall_elapsed: Duration,
) -> Vec<ProgressUpdate> {
    let current = sample.elapsed_media_seconds;
    match total {
        MediaDuration::Known(total_seconds) => match estimate_remaining(sample, total, wall_elapsed) {
            Some(remaining) => vec![
                ProgressUpdate::status(format!(
                    "Processing {:.1}s / {:.1}s ...",
                    current, total_seconds
                )),
                ProgressUpdate::Eta {
                    seconds_remaining: Some(remaining),
                },
            ],
            None => Vec::new(),
        },
        MediaDuration::Unknown => {
            vec![ProgressUpdate::status(format!("Processing {:.1}s ...", current))]
        }
    }
}
