use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video file to MP4 (video copied, audio re-encoded)
    Convert {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Overwrite the output file if it already exists
        #[arg(long)]
        overwrite: bool,

        /// Print progress updates as JSON lines instead of a spinner
        #[arg(long)]
        json: bool,

        /// Disable the busy spinner
        #[arg(long)]
        no_spinner: bool,
    },

    /// Print the duration of a media file
    Probe {
        /// Input media file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that ffmpeg and ffprobe are available
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let args = Args::try_parse_from(["mp4conv", "-v", "convert", "-i", "clip.mov", "--overwrite"])
            .unwrap();
        assert!(args.verbose);
        match args.command {
            Commands::Convert { input, overwrite, json, no_spinner } => {
                assert_eq!(input, PathBuf::from("clip.mov"));
                assert!(overwrite);
                assert!(!json);
                assert!(!no_spinner);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_convert_requires_input() {
        assert!(Args::try_parse_from(["mp4conv", "convert"]).is_err());
    }
}
