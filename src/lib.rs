//! mp4conv - MP4 conversion with live progress
//!
//! Converts a video to MP4 with ffmpeg (video stream copied, audio re-encoded
//! to AAC) and reports progress and an ETA as a stream of updates that any
//! front end can render.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod monitor;
pub mod ticker;

#[cfg(all(test, unix))]
mod test_support;
