use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::{Result, ConvertError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub probe: ProbeConfig,
    pub spinner: SpinnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Video codec passed to `-c:v` ("copy" keeps the stream untouched)
    pub video_codec: String,
    /// Audio codec passed to `-c:a`
    pub audio_codec: String,
    /// Overwrite an existing output file instead of failing
    pub overwrite: bool,
    /// Additional output options inserted before the output path
    /// e.g. ["-movflags", "+faststart"]
    pub extra_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Upper bound on the duration probe; 0 waits forever
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpinnerConfig {
    /// Milliseconds between spinner frames
    pub interval_ms: u64,
    /// Glyphs cycled by the spinner
    pub frames: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_codec: "copy".to_string(),
            audio_codec: "aac".to_string(),
            overwrite: false,
            extra_options: Vec::new(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 75,
            frames: ["|", "/", "-", "\\"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SpinnerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_defaults_match_original_tooling() {
        let config = Config::default();
        assert_eq!(config.media.ffmpeg_path, "ffmpeg");
        assert_eq!(config.media.ffprobe_path, "ffprobe");
        assert_eq!(config.media.video_codec, "copy");
        assert_eq!(config.media.audio_codec, "aac");
        assert_eq!(config.spinner.interval(), Duration::from_millis(75));
        assert_eq!(config.spinner.frames.concat(), "|/-\\");
        assert_eq!(config.probe.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("config.toml");
        file.write_str("[media]\nffmpeg_path = \"/opt/ffmpeg/bin/ffmpeg\"\n\n[probe]\ntimeout_secs = 0\n")
            .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.media.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.media.audio_codec, "aac");
        assert_eq!(config.probe.timeout(), None);
        assert_eq!(config.spinner, SpinnerConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.media.overwrite = true;
        config.media.extra_options = vec!["-movflags".to_string(), "+faststart".to_string()];
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_errors() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("broken.toml");
        file.write_str("[media\nffmpeg_path = 1").unwrap();

        assert!(matches!(Config::from_file(file.path()), Err(ConvertError::Toml(_))));
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(ConvertError::Config(_))
        ));
    }

    #[test]
    fn test_save_into_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("config.toml");

        assert!(matches!(Config::default().save_to_file(&path), Err(ConvertError::Io(_))));
    }
}
