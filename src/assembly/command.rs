/*!
 * ffmpeg argument lists for Mix and Dual merges.
 *
 * Arguments are always passed as a list, never through a shell; `render`
 * exists only to show the command in diagnostics.
 */

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{MergeMode, MergeSpec};
use crate::app_config::AssemblyConfig;

/// A program plus its argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl MediaCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// A `std::process::Command` with the same program and arguments
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    /// Shell-quoted rendering for logs and error reports
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|part| shell_quote(&part.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=+,@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Build the ffmpeg invocation for `spec`
///
/// Both inputs are named explicitly. Mix re-encodes one blended audio track
/// bounded by the shorter input; Dual stream-copies both tracks and labels
/// them. Output always gets `+faststart`.
pub fn build_merge_command(ffmpeg: &Path, spec: &MergeSpec, config: &AssemblyConfig) -> MediaCommand {
    let mut command = MediaCommand::new(ffmpeg);
    command
        .args(["-y", "-loglevel", "error", "-progress", "pipe:1", "-threads", "0"])
        .arg("-i")
        .arg(spec.video_path.as_os_str())
        .arg("-i")
        .arg(spec.audio_path.as_os_str());

    match spec.mode {
        MergeMode::Mix => {
            let filter = format!(
                "[0:a]volume={}[orig];[1:a]volume={}[dub];[orig][dub]amix=inputs=2:duration=shortest[out]",
                config.original_gain, config.translation_gain
            );
            command
                .arg("-filter_complex")
                .arg(filter)
                .args(["-map", "0:v", "-map", "[out]", "-c:v", "copy", "-c:a", "aac", "-b:a"])
                .arg(config.mix_bitrate.as_str())
                .args(["-strict", "-2"]);
        }
        MergeMode::Dual => {
            command
                .args(["-map", "0:v", "-map", "0:a", "-map", "1:a", "-c", "copy"])
                .arg("-metadata:s:a:0")
                .arg(format!("title={}", config.original_track_title))
                .arg("-metadata:s:a:0")
                .arg(format!("handler_name={}", config.original_track_title))
                .arg("-metadata:s:a:1")
                .arg(format!("title={}", config.translated_track_title))
                .arg("-metadata:s:a:1")
                .arg(format!("handler_name={}", config.translated_track_title))
                .arg("-metadata:s:a:1")
                .arg(format!("language={}", config.translated_track_language));
            if !spec.container_is_matroska {
                command.args(["-bsf:a:0", "aac_adtstoasc"]);
            }
        }
    }

    command.args(["-movflags", "+faststart"]).arg(spec.output_path.as_os_str());
    command
}
