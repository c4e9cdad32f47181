use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ConvertError};

/// Abstract media tool command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media tool command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Write machine-readable key=value progress to stdout
    pub fn progress_to_stdout(self) -> Self {
        self.arg("-progress").arg("pipe:1")
    }

    /// Suppress the default per-frame statistics line
    pub fn no_stats(self) -> Self {
        self.arg("-nostats")
    }

    /// Build a tokio command with the given stdio wiring.
    ///
    /// The child is killed if the returned handle is dropped before it exits.
    pub fn to_command(&self, stdout: Stdio, stderr: Stdio) -> Command {
        debug!("Preparing media command: {} {:?}", self.binary_path, self.args);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion and return captured stdout
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing media command: {} ({})", self.description, self.binary_path);

        let output = self
            .to_command(Stdio::piped(), Stdio::piped())
            .output()
            .await
            .map_err(|e| ConvertError::Launch {
                tool: self.binary_path.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConvertError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the commands this tool issues
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the ffprobe call printing the container duration as a bare number
    pub fn probe_duration<P: AsRef<Path>>(&self, input_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Duration probe")
            .args(["-v", "error"])
            .args(["-select_streams", "v:0"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .output(input_path)
    }

    /// Build the MP4 conversion command with progress reporting on stdout
    pub fn transcode<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        video_codec: &str,
        audio_codec: &str,
        overwrite: bool,
        additional_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "MP4 conversion");
        if overwrite {
            cmd = cmd.overwrite();
        }

        cmd.input(input_path)
            .video_codec(video_codec)
            .audio_codec(audio_codec)
            .args(additional_options.iter().cloned())
            .output(output_path)
            .progress_to_stdout()
            .no_stats()
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check")
            .arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_duration_args() {
        let cmd = MediaCommandBuilder::new("ffprobe").probe_duration("clip.mov");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(
            cmd.args,
            vec![
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "format=duration",
                "-of", "default=noprint_wrappers=1:nokey=1",
                "clip.mov",
            ]
        );
    }

    #[test]
    fn test_transcode_args() {
        let cmd = MediaCommandBuilder::new("ffmpeg")
            .transcode("clip.mov", "clip.mp4", "copy", "aac", false, &[]);
        assert_eq!(
            cmd.args,
            vec![
                "-i", "clip.mov",
                "-c:v", "copy",
                "-c:a", "aac",
                "clip.mp4",
                "-progress", "pipe:1",
                "-nostats",
            ]
        );
    }

    #[test]
    fn test_transcode_overwrite_and_extra_options() {
        let extra = vec!["-movflags".to_string(), "+faststart".to_string()];
        let cmd = MediaCommandBuilder::new("ffmpeg")
            .transcode("in.mkv", "in.mp4", "copy", "aac", true, &extra);
        assert_eq!(cmd.args.first().map(String::as_str), Some("-y"));

        let output_pos = cmd.args.iter().position(|a| a == "in.mp4").unwrap();
        let extra_pos = cmd.args.iter().position(|a| a == "+faststart").unwrap();
        assert!(extra_pos < output_pos);
    }

    #[tokio::test]
    async fn test_execute_missing_binary_is_launch_error() {
        let cmd = MediaCommandBuilder::new("/nonexistent/mp4conv-ffmpeg").version_check();
        assert!(matches!(cmd.execute().await, Err(ConvertError::Launch { .. })));
    }
}
