use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Total media duration of a conversion input, as reported by the probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "seconds")]
pub enum MediaDuration {
    Known(f64),
    Unknown,
}

impl MediaDuration {
    /// Accepts only finite, non-negative second counts
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds.is_finite() && seconds >= 0.0 {
            MediaDuration::Known(seconds)
        } else {
            MediaDuration::Unknown
        }
    }

    pub fn seconds(&self) -> Option<f64> {
        match self {
            MediaDuration::Known(s) => Some(*s),
            MediaDuration::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, MediaDuration::Known(_))
    }
}

impl fmt::Display for MediaDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaDuration::Known(s) => write!(f, "{:.1}s", s),
            MediaDuration::Unknown => write!(f, "unknown"),
        }
    }
}

/// One event in a Job's update sequence.
///
/// A sequence is zero or more `Status`/`Eta` updates followed by exactly one
/// terminal update (`Completed` or `Failed`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ProgressUpdate {
    Status { text: String },
    Eta { seconds_remaining: Option<f64> },
    Completed { output_path: PathBuf },
    Failed,
}

impl ProgressUpdate {
    pub fn status<S: Into<String>>(text: S) -> Self {
        ProgressUpdate::Status { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressUpdate::Completed { .. } | ProgressUpdate::Failed)
    }
}

/// Render an ETA the way a status label shows it: whole seconds, or nothing
pub fn eta_label(seconds_remaining: Option<f64>) -> String {
    match seconds_remaining {
        Some(s) => format!("ETA: {}s", s.max(0.0) as u64),
        None => String::new(),
    }
}
