/*!
 * Merging a video with translated audio through ffmpeg.
 *
 * - `command`: argument lists for the two merge modes
 * - `progress`: parsing of ffmpeg's machine-readable progress stream
 * - `runner`: process supervision and failure diagnostics
 */

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};

pub use self::command::{build_merge_command, MediaCommand};
pub use self::progress::{parse_progress_seconds, ProgressTracker};
pub use self::runner::AssemblyEngine;

pub mod command;
pub mod progress;
pub mod runner;

/// How the translated audio is combined with the original
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// One re-encoded track blending the attenuated original and the amplified dub
    #[default]
    Mix,
    /// Original and dub kept as two separate stream-copied tracks
    Dual,
}

impl MergeMode {
    /// Tag used in output file names
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Mix => "Mix",
            Self::Dual => "Dual",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for MergeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "mix" | "m" => Ok(Self::Mix),
            "2" | "dual" | "d" => Ok(Self::Dual),
            _ => Err(anyhow!("Invalid merge mode: {}", s)),
        }
    }
}

/// Everything one merge invocation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    pub mode: MergeMode,
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub container_is_matroska: bool,
}
