use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{MediaConfig, ProbeConfig};
use crate::monitor::MediaDuration;
use super::MediaCommandBuilder;

/// Looks up the total duration of a media file.
///
/// Never fails: anything that goes wrong yields [`MediaDuration::Unknown`],
/// since the duration only feeds the ETA.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn probe(&self, input_path: &Path) -> MediaDuration;
}

/// ffprobe-backed duration probe with an optional time bound
pub struct FfprobeDurationProbe {
    command_builder: MediaCommandBuilder,
    timeout: Option<Duration>,
}

impl FfprobeDurationProbe {
    pub fn new(media: &MediaConfig, probe: &ProbeConfig) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(&media.ffprobe_path),
            timeout: probe.timeout(),
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe(&self, input_path: &Path) -> MediaDuration {
        let command = self.command_builder.probe_duration(input_path);

        // kill_on_drop reaps a hung ffprobe when the timeout drops the future
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, command.execute()).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Duration probe of {} timed out after {:?}", input_path.display(), limit);
                    return MediaDuration::Unknown;
                }
            },
            None => command.execute().await,
        };

        match result {
            Ok(stdout) => {
                let duration = parse_duration_output(&stdout);
                debug!("Probed duration of {}: {}", input_path.display(), duration);
                duration
            }
            Err(e) => {
                warn!("Duration probe of {} failed: {}", input_path.display(), e);
                MediaDuration::Unknown
            }
        }
    }
}

/// Parse ffprobe's bare-number output
pub fn parse_duration_output(stdout: &str) -> MediaDuration {
    match stdout.trim().parse::<f64>() {
        Ok(seconds) => MediaDuration::from_seconds(seconds),
        Err(_) => MediaDuration::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_output() {
        assert_eq!(parse_duration_output("10.000000\n"), MediaDuration::Known(10.0));
        assert_eq!(parse_duration_output("  93.5 "), MediaDuration::Known(93.5));
        assert_eq!(parse_duration_output("N/A\n"), MediaDuration::Unknown);
        assert_eq!(parse_duration_output(""), MediaDuration::Unknown);
        assert_eq!(parse_duration_output("10.0\n12.0\n"), MediaDuration::Unknown);
        assert_eq!(parse_duration_output("-4.0"), MediaDuration::Unknown);
        assert_eq!(parse_duration_output("inf"), MediaDuration::Unknown);
    }

    #[tokio::test]
    async fn test_missing_tool_degrades_to_unknown() {
        let media = MediaConfig {
            ffprobe_path: "/nonexistent/mp4conv-ffprobe".to_string(),
            ..MediaConfig::default()
        };
        let probe = FfprobeDurationProbe::new(&media, &ProbeConfig::default());

        assert_eq!(probe.probe(Path::new("clip.mov")).await, MediaDuration::Unknown);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_degrades_to_unknown() {
        // `false` ignores its arguments and exits 1
        let media = MediaConfig {
            ffprobe_path: "false".to_string(),
            ..MediaConfig::default()
        };
        let probe = FfprobeDurationProbe::new(&media, &ProbeConfig::default());

        assert_eq!(probe.probe(Path::new("clip.mov")).await, MediaDuration::Unknown);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_garbage_output_degrades_to_unknown() {
        // `echo` prints its arguments, which is not a number
        let media = MediaConfig {
            ffprobe_path: "echo".to_string(),
            ..MediaConfig::default()
        };
        let probe = FfprobeDurationProbe::new(&media, &ProbeConfig::default());

        assert_eq!(probe.probe(Path::new("clip.mov")).await, MediaDuration::Unknown);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_tool_times_out_to_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaConfig {
            ffprobe_path: crate::test_support::stalled_tool(dir.path(), "ffprobe")
                .to_string_lossy()
                .into_owned(),
            ..MediaConfig::default()
        };
        let probe = FfprobeDurationProbe::new(&media, &ProbeConfig { timeout_secs: 1 });

        let started = std::time::Instant::now();
        assert_eq!(probe.probe(Path::new("clip.mov")).await, MediaDuration::Unknown);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
