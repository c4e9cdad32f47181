// Headless conversion monitor
//
// Runs one ffmpeg conversion on a background task and publishes its progress
// as a finite sequence of updates:
// - job: the conversion request and its output path
// - launcher: the child-process seam (ffmpeg, or a scripted fake in tests)
// - progress: progress-line parsing and ETA arithmetic
// - update: the values handed to subscribers

pub mod job;
pub mod launcher;
pub mod progress;
pub mod update;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub use job::{output_path_for, Job};
pub use launcher::{FfmpegLauncher, ProgressReader, TranscodeLauncher, TranscodeProcess};
pub use progress::{estimate_remaining, updates_for_sample, ProgressSample};
pub use update::{eta_label, MediaDuration, ProgressUpdate};

use crate::config::Config;
use crate::media::{DurationProbe, FfprobeDurationProbe};

/// Updates buffered ahead of a slow subscriber before the reader waits
const UPDATE_BUFFER: usize = 16;

/// Starts conversions and hands back their update subscriptions
pub struct TranscodeMonitor {
    probe: Arc<dyn DurationProbe>,
    launcher: Arc<dyn TranscodeLauncher>,
}

impl TranscodeMonitor {
    /// Monitor backed by ffprobe and ffmpeg as configured
    pub fn new(config: &Config) -> Self {
        Self::with_components(
            Arc::new(FfprobeDurationProbe::new(&config.media, &config.probe)),
            Arc::new(FfmpegLauncher::new(config.media.clone())),
        )
    }

    pub fn with_components(
        probe: Arc<dyn DurationProbe>,
        launcher: Arc<dyn TranscodeLauncher>,
    ) -> Self {
        Self { probe, launcher }
    }

    /// Start converting `input_path` on a background task.
    ///
    /// Must be called from within a tokio runtime. The returned handle yields
    /// the job's updates in order and ends after the terminal one.
    pub fn start<P: AsRef<Path>>(&self, input_path: P) -> ConversionHandle {
        let id = Uuid::new_v4();
        let input_path = input_path.as_ref().to_path_buf();
        let output_path = output_path_for(&input_path);

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let run = JobRun {
            id,
            input_path,
            probe: Arc::clone(&self.probe),
            launcher: Arc::clone(&self.launcher),
            sink: UpdateSink::new(tx),
            cancel: cancel_rx,
        };
        tokio::spawn(run.execute().instrument(info_span!("job", %id)));

        ConversionHandle {
            id,
            output_path,
            updates: rx,
            cancel: Some(cancel_tx),
            finished: false,
        }
    }
}

/// Subscription to one job's updates.
///
/// Single pass and not restartable. Dropping it cancels the job.
pub struct ConversionHandle {
    id: Uuid,
    output_path: PathBuf,
    updates: mpsc::Receiver<ProgressUpdate>,
    cancel: Option<oneshot::Sender<()>>,
    finished: bool,
}

impl ConversionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Next update; `None` once the terminal update has been delivered
    pub async fn next(&mut self) -> Option<ProgressUpdate> {
        if self.finished {
            return None;
        }

        let update = self.updates.recv().await;
        if update.as_ref().is_none_or(ProgressUpdate::is_terminal) {
            self.finished = true;
        }
        update
    }

    /// Ask the job to stop; it kills the child and ends with `Failed`.
    /// Idempotent, and a no-op once the job has finished.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Sender side of the update channel; refuses anything after a terminal update
struct UpdateSink {
    tx: mpsc::Sender<ProgressUpdate>,
    terminated: bool,
}

impl UpdateSink {
    fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx, terminated: false }
    }

    /// Returns `false` when nothing more can be delivered
    async fn emit(&mut self, update: ProgressUpdate) -> bool {
        if self.terminated {
            return false;
        }
        self.terminated = update.is_terminal();
        self.tx.send(update).await.is_ok()
    }

    async fn finish(&mut self, status: &str, terminal: ProgressUpdate) {
        let _ = self.emit(ProgressUpdate::status(status)).await
            && self.emit(ProgressUpdate::Eta { seconds_remaining: None }).await
            && self.emit(terminal).await;
    }

    async fn completed(&mut self, output_path: PathBuf) {
        self.finish("Finalizing conversion...", ProgressUpdate::Completed { output_path })
            .await;
    }

    async fn failed(&mut self) {
        self.finish("Error during conversion.", ProgressUpdate::Failed).await;
    }

    async fn cancelled(&mut self) {
        self.finish("Conversion cancelled.", ProgressUpdate::Failed).await;
    }
}

enum Step<T> {
    Cancelled,
    Done(T),
}

/// Everything one background job owns
struct JobRun {
    id: Uuid,
    input_path: PathBuf,
    probe: Arc<dyn DurationProbe>,
    launcher: Arc<dyn TranscodeLauncher>,
    sink: UpdateSink,
    cancel: oneshot::Receiver<()>,
}

impl JobRun {
    async fn execute(mut self) {
        info!("Starting conversion of {}", self.input_path.display());

        // A dropped handle also resolves the cancel receiver
        let step = tokio::select! {
            biased;
            _ = &mut self.cancel => Step::Cancelled,
            duration = self.probe.probe(&self.input_path) => Step::Done(duration),
        };
        let total_duration = match step {
            Step::Done(duration) => duration,
            Step::Cancelled => {
                info!("Conversion cancelled before launch");
                self.sink.cancelled().await;
                return;
            }
        };

        let job = Job::new(self.id, self.input_path.clone(), total_duration);
        if job.writes_over_input() {
            error!("Refusing to convert {} onto itself", job.input_path.display());
            self.sink.failed().await;
            return;
        }

        let mut process = match self.launcher.launch(&job) {
            Ok(process) => process,
            Err(e) => {
                error!("Conversion could not start: {}", e);
                self.sink.failed().await;
                return;
            }
        };
        let launched_at = Instant::now();

        if !self.sink.emit(ProgressUpdate::status("Starting conversion...")).await {
            self.abandon(process.as_mut()).await;
            return;
        }

        if let Some(reader) = process.take_progress() {
            let mut lines = reader.lines();
            loop {
                let step = tokio::select! {
                    biased;
                    _ = &mut self.cancel => Step::Cancelled,
                    line = lines.next_line() => Step::Done(line),
                };

                let line = match step {
                    Step::Done(Ok(Some(line))) => line,
                    Step::Done(Ok(None)) => break,
                    Step::Done(Err(e)) => {
                        warn!("Progress stream read failed: {}", e);
                        break;
                    }
                    Step::Cancelled => {
                        self.cancel_running(process.as_mut()).await;
                        return;
                    }
                };

                let Some(sample) = ProgressSample::parse(&line) else {
                    continue;
                };
                for update in updates_for_sample(sample, job.total_duration, launched_at.elapsed()) {
                    if !self.sink.emit(update).await {
                        self.abandon(process.as_mut()).await;
                        return;
                    }
                }
            }
        }

        let step = tokio::select! {
            biased;
            _ = &mut self.cancel => Step::Cancelled,
            exit = process.wait() => Step::Done(exit),
        };

        match step {
            Step::Done(Ok(true)) => {
                info!(
                    "Conversion finished in {:.1}s: {}",
                    launched_at.elapsed().as_secs_f64(),
                    job.output_path.display()
                );
                self.sink.completed(job.output_path).await;
            }
            Step::Done(Ok(false)) => {
                error!("Conversion of {} failed", job.input_path.display());
                self.sink.failed().await;
            }
            Step::Done(Err(e)) => {
                error!("Failed to wait for conversion process: {}", e);
                self.sink.failed().await;
            }
            Step::Cancelled => self.cancel_running(process.as_mut()).await,
        }
    }

    async fn cancel_running(&mut self, process: &mut dyn TranscodeProcess) {
        info!("Conversion cancelled");
        self.stop_process(process).await;
        self.sink.cancelled().await;
    }

    /// Subscriber is gone; nobody is left to report to
    async fn abandon(&mut self, process: &mut dyn TranscodeProcess) {
        debug!("Subscriber dropped, stopping conversion");
        self.stop_process(process).await;
    }

    async fn stop_process(&mut self, process: &mut dyn TranscodeProcess) {
        if let Err(e) = process.kill().await {
            warn!("Failed to kill conversion process: {}", e);
        }
        if let Err(e) = process.wait().await {
            debug!("Failed to reap conversion process: {}", e);
        }
    }
}
