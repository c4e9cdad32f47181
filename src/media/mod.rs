// External media tools
//
// - Commands: builders for the ffmpeg/ffprobe invocations
// - Probe: duration lookup via ffprobe
// - Toolchain: availability and version checks

pub mod commands;
pub mod probe;
pub mod toolchain;

pub use commands::*;
pub use probe::{parse_duration_output, DurationProbe, FfprobeDurationProbe};
pub use toolchain::*;

#[cfg(test)]
pub use probe::MockDurationProbe;
