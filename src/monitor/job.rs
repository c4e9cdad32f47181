use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::update::MediaDuration;

/// A single conversion request, owned by the monitor task for its lifetime
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub total_duration: MediaDuration,
}

impl Job {
    pub fn new(id: Uuid, input_path: PathBuf, total_duration: MediaDuration) -> Self {
        let output_path = output_path_for(&input_path);
        Self {
            id,
            input_path,
            output_path,
            started_at: Utc::now(),
            total_duration,
        }
    }

    /// Input already ends in `.mp4`, so ffmpeg would be asked to overwrite its source
    pub fn writes_over_input(&self) -> bool {
        self.output_path == self.input_path
    }
}

/// Replace the final extension with `.mp4`, or append it if there is none
pub fn output_path_for<P: AsRef<Path>>(input_path: P) -> PathBuf {
    input_path.as_ref().with_extension("mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_replaces_final_extension() {
        assert_eq!(output_path_for("clip.mov"), PathBuf::from("clip.mp4"));
        assert_eq!(output_path_for("/videos/a.b.mkv"), PathBuf::from("/videos/a.b.mp4"));
        assert_eq!(output_path_for("recording"), PathBuf::from("recording.mp4"));
    }

    #[test]
    fn test_job_detects_output_over_input() {
        let job = Job::new(Uuid::new_v4(), PathBuf::from("clip.mp4"), MediaDuration::Unknown);
        assert!(job.writes_over_input());

        let job = Job::new(Uuid::new_v4(), PathBuf::from("clip.avi"), MediaDuration::Known(3.0));
        assert!(!job.writes_over_input());
        assert_eq!(job.output_path, PathBuf::from("clip.mp4"));
    }
}
