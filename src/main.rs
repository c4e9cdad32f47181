//! mp4conv - convert a video to MP4 with live progress
//!
//! Command-line front end for the conversion monitor: renders status and ETA
//! next to a busy spinner, or streams updates as JSON lines.

use anyhow::{anyhow, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use mp4conv::cli::{Args, Commands};
use mp4conv::config::Config;
use mp4conv::error::ConvertError;
use mp4conv::media::{check_toolchain, DurationProbe, FfprobeDurationProbe};
use mp4conv::monitor::{eta_label, ProgressUpdate, TranscodeMonitor};
use mp4conv::ticker::Ticker;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    let _log_guard = setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Convert { input, overwrite, json, no_spinner } => {
            if overwrite {
                config.media.overwrite = true;
            }
            convert(&config, &input, json, !(json || no_spinner)).await?;
        }
        Commands::Probe { input, json } => {
            if !input.exists() {
                return Err(ConvertError::FileNotFound(input.display().to_string()).into());
            }

            let probe = FfprobeDurationProbe::new(&config.media, &config.probe);
            let duration = probe.probe(&input).await;

            if json {
                let report = serde_json::json!({ "input": input, "duration": duration });
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!("{}: {}", input.display(), duration);
            }
        }
        Commands::Check => {
            let statuses = check_toolchain(&config.media).await;

            println!("{:<10} {:<30} {:<12} {}", "Tool", "Path", "Status", "Version");
            println!("{}", "-".repeat(80));
            for status in &statuses {
                let (state, version) = match &status.version {
                    Ok(version) => ("Available", version.as_str()),
                    Err(reason) => ("Missing", reason.as_str()),
                };
                println!("{:<10} {:<30} {:<12} {}", status.name, status.binary_path, state, version);
            }

            if !statuses.iter().all(|s| s.is_available()) {
                return Err(anyhow!("Required tools are missing; set their paths in config.toml"));
            }
        }
    }

    Ok(())
}

enum Event {
    Update(Option<ProgressUpdate>),
    Interrupted,
}

async fn convert(config: &Config, input: &Path, json: bool, spinner: bool) -> Result<()> {
    if !input.exists() {
        return Err(ConvertError::FileNotFound(input.display().to_string()).into());
    }

    let progress = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::with_template("{prefix} {msg}")?);
        pb
    };
    progress.set_message("Initializing conversion...");

    let mut ticker = spinner.then(|| {
        let pb = progress.clone();
        Ticker::start(config.spinner.interval(), config.spinner.frames.clone(), move |frame| {
            pb.set_prefix(frame.to_string())
        })
    });

    let monitor = TranscodeMonitor::new(config);
    let mut handle = monitor.start(input);
    info!("Job {} converting {} -> {}", handle.id(), input.display(), handle.output_path().display());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let mut status = String::new();
    let mut eta = String::new();
    let mut saved_to: Option<PathBuf> = None;

    loop {
        let event = tokio::select! {
            update = handle.next() => Event::Update(update),
            _ = &mut ctrl_c, if !interrupted => Event::Interrupted,
        };

        let update = match event {
            Event::Update(Some(update)) => update,
            Event::Update(None) => break,
            Event::Interrupted => {
                warn!("Interrupted, cancelling conversion");
                interrupted = true;
                handle.cancel();
                continue;
            }
        };

        if json {
            println!("{}", serde_json::to_string(&update)?);
        }

        let terminal = update.is_terminal();
        match update {
            ProgressUpdate::Status { text } => status = text,
            ProgressUpdate::Eta { seconds_remaining } => eta = eta_label(seconds_remaining),
            ProgressUpdate::Completed { output_path } => saved_to = Some(output_path),
            ProgressUpdate::Failed => {}
        }

        if terminal {
            if let Some(ticker) = ticker.as_mut() {
                ticker.stop();
            }
        }
        progress.set_message(if eta.is_empty() { status.clone() } else { format!("{}  {}", status, eta) });
    }

    if let Some(ticker) = ticker.as_mut() {
        ticker.stop();
    }
    progress.finish_and_clear();

    match saved_to {
        Some(output_path) => {
            if !json {
                println!("Conversion complete! Saved as: {}", output_path.display());
            }
            Ok(())
        }
        None => {
            if !json {
                eprintln!("Error during conversion.");
            }
            Err(anyhow!("Conversion of {} failed", input.display()))
        }
    }
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".mp4conv").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "mp4conv.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console stays quiet unless verbose so it does not tear the spinner
    let console_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(console_level);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          console_level, log_dir.join("mp4conv.log").display());

    Ok(guard)
}
