/*!
 * Supervised ffmpeg execution.
 *
 * Standard output and standard error are read line by line and merged into
 * a single stream. Progress records drive the caller's callback; every
 * other line goes into a bounded tail that is reported if ffmpeg fails.
 */

use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::mpsc;
use std::thread;

use log::{debug, error, info};

use super::command::build_merge_command;
use super::progress::{is_progress_record, parse_progress_seconds, ProgressTracker};
use super::MergeSpec;
use crate::app_config::AssemblyConfig;
use crate::errors::AssemblyError;

/// Runs merges with a given ffmpeg binary
#[derive(Debug)]
pub struct AssemblyEngine<'a> {
    ffmpeg: PathBuf,
    config: &'a AssemblyConfig,
}

impl<'a> AssemblyEngine<'a> {
    pub fn new(ffmpeg: impl Into<PathBuf>, config: &'a AssemblyConfig) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            config,
        }
    }

    /// Merge according to `spec`, reporting elapsed output seconds to `on_progress`
    ///
    /// Progress is clamped to `duration_secs` and only ever moves forward; on
    /// success it is filled to the total. ffmpeg writes to a staging file
    /// next to the output, which replaces the output only once the merge
    /// succeeds. A failed merge is never retried and leaves whatever was at
    /// the output path untouched.
    pub fn merge(&self, spec: &MergeSpec, duration_secs: f64, on_progress: &mut dyn FnMut(f64)) -> Result<(), AssemblyError> {
        ensure_ready(&spec.video_path)?;
        ensure_ready(&spec.audio_path)?;

        let staging = staging_path(&spec.output_path);
        let staged = MergeSpec {
            output_path: staging.clone(),
            ..spec.clone()
        };
        let command = build_merge_command(&self.ffmpeg, &staged, self.config);
        let rendered = command.render();
        debug!("Running {}", rendered);
        info!("Merging in {} mode into {:?}", spec.mode, spec.output_path);

        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(AssemblyError::Spawn)?;

        let (sender, receiver) = mpsc::channel::<String>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, sender.clone()));
        }
        drop(sender);

        let mut tracker = ProgressTracker::new(duration_secs);
        let mut tail = VecDeque::with_capacity(self.config.log_tail_lines);
        for line in receiver {
            if let Some(seconds) = parse_progress_seconds(&line) {
                if let Some(position) = tracker.update(seconds) {
                    on_progress(position);
                }
            } else if !is_progress_record(&line) && !line.trim().is_empty() {
                if tail.len() == self.config.log_tail_lines {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        for reader in readers {
            let _ = reader.join();
        }

        let status = child.wait().map_err(AssemblyError::Spawn)?;
        if status.success() {
            fs::rename(&staging, &spec.output_path).map_err(|source| AssemblyError::Finalize {
                path: staging.clone(),
                source,
            })?;
            if let Some(position) = tracker.finish() {
                on_progress(position);
            }
            return Ok(());
        }

        let code = status.code().unwrap_or(-1);
        let log_tail = Vec::from(tail).join("\n");
        error!("ffmpeg exited with code {}", code);
        error!("Command: {}", rendered);
        for line in log_tail.lines() {
            error!("  {}", line);
        }
        if staging.exists() {
            let _ = fs::remove_file(&staging);
        }

        Err(AssemblyError::ToolFailed {
            code,
            command: rendered,
            log_tail,
        })
    }
}

/// `dir/name.partial.ext` for `dir/name.ext`; the extension still tells ffmpeg the container
fn staging_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().unwrap_or_default().to_string_lossy();
    let name = match output.extension() {
        Some(ext) => format!("{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!("{}.partial", stem),
    };
    output.with_file_name(name)
}

fn ensure_ready(path: &Path) -> Result<(), AssemblyError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(AssemblyError::MissingInput(path.to_path_buf())),
    }
}

/// Forward lines of `source` until EOF, decoding invalid UTF-8 lossily
///
/// The pipe is drained even after the receiver is gone so ffmpeg never
/// blocks or dies on a closed pipe.
fn forward_lines<R: Read + Send + 'static>(source: R, sender: mpsc::Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&raw).trim_end_matches(['\r', '\n']).to_string();
                    let _ = sender.send(line);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Stopped reading ffmpeg output: {}", e);
                    break;
                }
            }
        }
    })
}
