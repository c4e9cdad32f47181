use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::{Result, ConvertError};
use crate::media::MediaCommandBuilder;
use super::job::Job;

/// Lines of stderr kept for the failure log
const STDERR_TAIL_LINES: usize = 20;

pub type ProgressReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Starts the external transcoding process for a job
pub trait TranscodeLauncher: Send + Sync {
    fn launch(&self, job: &Job) -> Result<Box<dyn TranscodeProcess>>;
}

/// A running transcoding process
#[async_trait]
pub trait TranscodeProcess: Send {
    /// Take the progress stream; yields `None` once taken
    fn take_progress(&mut self) -> Option<ProgressReader>;

    /// Wait for exit; `true` on exit code zero
    async fn wait(&mut self) -> Result<bool>;

    /// Terminate the process
    async fn kill(&mut self) -> Result<()>;
}

/// Launches ffmpeg as configured
pub struct FfmpegLauncher {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegLauncher {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path);
        Self { config, command_builder }
    }
}

impl TranscodeLauncher for FfmpegLauncher {
    fn launch(&self, job: &Job) -> Result<Box<dyn TranscodeProcess>> {
        Ok(Box::new(self.spawn(job)?))
    }
}

impl FfmpegLauncher {
    fn spawn(&self, job: &Job) -> Result<FfmpegProcess> {
        let command = self.command_builder.transcode(
            &job.input_path,
            &job.output_path,
            &self.config.video_codec,
            &self.config.audio_codec,
            self.config.overwrite,
            &self.config.extra_options,
        );

        let mut child = command
            .to_command(Stdio::piped(), Stdio::piped())
            .spawn()
            .map_err(|e| ConvertError::Launch {
                tool: command.binary_path.clone(),
                reason: e.to_string(),
            })?;

        debug!("Spawned {} (pid {:?}) for job {}", command.binary_path, child.id(), job.id);

        // ffmpeg logs to stderr even with -nostats; drain it so the pipe never fills
        let stderr_tail = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail).join("\n")
            })
        });

        Ok(FfmpegProcess { child, stderr_tail, killed: false })
    }
}

struct FfmpegProcess {
    child: Child,
    stderr_tail: Option<JoinHandle<String>>,
    /// Set once we terminated the child ourselves
    killed: bool,
}

impl FfmpegProcess {
    /// A failed exit we did not cause by killing the child
    fn unexpected_exit(&self, success: bool) -> bool {
        !success && !self.killed
    }
}

#[async_trait]
impl TranscodeProcess for FfmpegProcess {
    fn take_progress(&mut self) -> Option<ProgressReader> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(BufReader::new(stdout)) as ProgressReader)
    }

    async fn wait(&mut self) -> Result<bool> {
        let status = self.child.wait().await?;

        if self.unexpected_exit(status.success()) {
            let stderr = match self.stderr_tail.take() {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };
            warn!("ffmpeg exited with {}: {}", status, stderr.trim());
        } else if self.killed {
            debug!("ffmpeg stopped on request ({})", status);
        }

        Ok(status.success())
    }

    async fn kill(&mut self) -> Result<()> {
        self.killed = true;
        self.child.kill().await?;
        Ok(())
    }
}
