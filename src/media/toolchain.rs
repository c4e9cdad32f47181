use serde::Serialize;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::Result;
use super::MediaCommandBuilder;

/// Version report for one external tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub binary_path: String,
    /// First line of `-version`, or the error that prevented running it
    pub version: std::result::Result<String, String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.version.is_ok()
    }
}

/// Check both tools the converter shells out to
pub async fn check_toolchain(config: &MediaConfig) -> Vec<ToolStatus> {
    let mut statuses = Vec::with_capacity(2);
    for (name, binary_path) in [("ffmpeg", &config.ffmpeg_path), ("ffprobe", &config.ffprobe_path)] {
        let version = version_info(binary_path).await.map_err(|e| e.to_string());
        match &version {
            Ok(v) => info!("{} is available: {}", name, v),
            Err(e) => debug!("{} is unavailable: {}", name, e),
        }
        statuses.push(ToolStatus {
            name: name.to_string(),
            binary_path: binary_path.clone(),
            version,
        });
    }
    statuses
}

/// First line of the tool's `-version` output
pub async fn version_info(binary_path: &str) -> Result<String> {
    let stdout = MediaCommandBuilder::new(binary_path).version_check().execute().await?;
    Ok(first_line(&stdout))
}

fn first_line(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Unknown version")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        assert_eq!(
            first_line("ffmpeg version 6.1.1 Copyright (c) 2000-2023\nbuilt with gcc\n"),
            "ffmpeg version 6.1.1 Copyright (c) 2000-2023"
        );
        assert_eq!(first_line("\n\n  ffprobe version 7.0\n"), "ffprobe version 7.0");
        assert_eq!(first_line(""), "Unknown version");
    }

    #[tokio::test]
    async fn test_missing_tools_reported_unavailable() {
        let config = MediaConfig {
            ffmpeg_path: "/nonexistent/mp4conv-ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/mp4conv-ffprobe".to_string(),
            ..MediaConfig::default()
        };

        let statuses = check_toolchain(&config).await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "ffmpeg");
        assert_eq!(statuses[1].name, "ffprobe");
        assert!(statuses.iter().all(|s| !s.is_available()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_info_takes_first_line() {
        // `echo -version` prints "-version"
        assert_eq!(version_info("echo").await.unwrap(), "-version");
    }
}
