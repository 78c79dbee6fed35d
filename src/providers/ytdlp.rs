/*!
 * `MediaExtractor` backed by the yt-dlp command-line tool.
 *
 * Metadata comes from `--dump-single-json`; downloads run with a custom
 * progress template on stdout, one record per line, parsed into byte
 * progress. Errors printed on stderr are classified into media errors.
 */

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, error, warn};
use serde::Deserialize;

use super::{ByteProgress, DownloadReport, MediaExtractor, VideoInfo};
use crate::errors::MediaError;
use crate::media::format::FormatSelection;

const PROGRESS_PREFIX: &str = "ytdub-progress:";
const REPORT_PREFIX: &str = "ytdub-report:";
const MIN_LISTED_HEIGHT: u32 = 144;

/// yt-dlp invocation settings
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    retries: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeJson {
    title: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    language: Option<String>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    height: Option<u32>,
    vcodec: Option<String>,
    format_note: Option<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>, ffmpeg_location: Option<PathBuf>, retries: u32) -> Self {
        Self {
            program: program.into(),
            ffmpeg_location,
            retries,
        }
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--retries".to_string(),
            self.retries.to_string(),
            "--fragment-retries".to_string(),
            self.retries.to_string(),
            "--retry-sleep".to_string(),
            "5".to_string(),
        ];
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.to_string_lossy().to_string());
        }
        args
    }

    fn progress_args() -> Vec<String> {
        vec![
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{}%(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s",
                PROGRESS_PREFIX
            ),
        ]
    }

    /// Arguments for a video download into `destination`
    pub fn download_args(&self, url: &str, format: &FormatSelection, destination: &Path) -> Vec<String> {
        let mut args = self.common_args();
        args.extend([
            "-f".to_string(),
            format.expression.clone(),
            "--merge-output-format".to_string(),
            format.container.extension().to_string(),
            "--no-part".to_string(),
            "-o".to_string(),
            destination.to_string_lossy().to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            format!("after_move:{}%(height)s %(duration)s", REPORT_PREFIX),
        ]);
        args.extend(Self::progress_args());
        args.push(url.to_string());
        args
    }

    /// Arguments for an audio-only download transcoded to mp3
    pub fn audio_args(&self, url: &str, destination: &Path, bitrate_kbps: u32) -> Vec<String> {
        let template = destination.with_extension("%(ext)s");
        let mut args = self.common_args();
        args.extend([
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", bitrate_kbps),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
        ]);
        args.extend(Self::progress_args());
        args.push(url.to_string());
        args
    }

    /// Run yt-dlp, feeding progress lines to `progress`, and return the other stdout lines
    fn run(&self, args: &[String], progress: &mut dyn FnMut(ByteProgress)) -> Result<Vec<String>, MediaError> {
        debug!("Running {:?} {}", self.program, args.join(" "));
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::Tool(format!("Failed to start {:?}: {}", self.program, e)))?;

        // Drained separately so a chatty stderr cannot block the stdout reader.
        let stderr_drain = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        // Output may carry raw bytes from titles or paths, so lines are
        // decoded lossily and the pipe is always read to the end.
        let mut lines = Vec::new();
        let mut read_error = None;
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&raw).trim_end_matches(['\r', '\n']).to_string();
                        match parse_progress_line(&line) {
                            Some(update) => progress(update),
                            None => lines.push(line),
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Lost yt-dlp output, stopping it: {}", e);
                        let _ = child.kill();
                        read_error = Some(e);
                        break;
                    }
                }
            }
        }

        let status = child.wait()?;
        let stderr = stderr_drain
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if let Some(e) = read_error {
            return Err(MediaError::Tool(format!("Failed to read yt-dlp output: {}", e)));
        }
        if status.success() {
            return Ok(lines);
        }

        let message = last_error_line(&stderr)
            .unwrap_or_else(|| format!("yt-dlp exited with {}", status));
        error!("yt-dlp failed: {}", message);
        Err(MediaError::from_download_message(message))
    }
}

impl MediaExtractor for YtDlp {
    fn probe(&self, url: &str) -> Result<VideoInfo, MediaError> {
        let mut args = self.common_args();
        args.extend(["--dump-single-json".to_string(), "--skip-download".to_string(), url.to_string()]);
        let lines = self.run(&args, &mut |_| {})?;
        parse_probe_json(lines.join("\n").as_bytes())
    }

    fn download(
        &self,
        url: &str,
        format: &FormatSelection,
        destination: &Path,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<DownloadReport, MediaError> {
        let args = self.download_args(url, format, destination);
        let lines = self.run(&args, progress)?;
        let (height, duration) = lines
            .iter()
            .rev()
            .find_map(|line| parse_report_line(line))
            .unwrap_or((None, None));

        Ok(DownloadReport {
            path: destination.to_path_buf(),
            height,
            duration,
        })
    }

    fn extract_audio(
        &self,
        url: &str,
        destination: &Path,
        bitrate_kbps: u32,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<(), MediaError> {
        let args = self.audio_args(url, destination, bitrate_kbps);
        self.run(&args, progress)?;
        Ok(())
    }
}

/// Parse `--dump-single-json` output into `VideoInfo`
///
/// Storyboards, video-less formats and heights of 144 or below are dropped.
pub fn parse_probe_json(raw: &[u8]) -> Result<VideoInfo, MediaError> {
    let probe: ProbeJson =
        serde_json::from_slice(raw).map_err(|e| MediaError::Tool(format!("yt-dlp returned invalid JSON: {}", e)))?;

    let heights: BTreeSet<u32> = probe
        .formats
        .iter()
        .filter(|f| f.vcodec.as_deref() != Some("none"))
        .filter(|f| !f.format_note.as_deref().unwrap_or_default().contains("storyboard"))
        .filter_map(|f| f.height)
        .filter(|h| *h > MIN_LISTED_HEIGHT)
        .collect();

    Ok(VideoInfo {
        heights: heights.into_iter().rev().collect(),
        title: probe.title.unwrap_or_else(|| "Video".to_string()),
        uploader: probe.uploader.unwrap_or_else(|| "Unknown".to_string()),
        duration: probe.duration.filter(|d| *d > 0.0),
        language: probe.language,
    })
}

/// Parse a progress-template line: downloaded, total, and estimated total bytes
pub fn parse_progress_line(line: &str) -> Option<ByteProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut parts = rest.split_whitespace();
    let downloaded = parse_number(parts.next()?)?;
    let total = parts.next().and_then(parse_number);
    let estimate = parts.next().and_then(parse_number);
    Some(ByteProgress {
        downloaded,
        total: total.or(estimate),
    })
}

/// Parse the post-download report line into (height, duration)
pub fn parse_report_line(line: &str) -> Option<(Option<u32>, Option<f64>)> {
    let rest = line.trim().strip_prefix(REPORT_PREFIX)?;
    let mut parts = rest.split_whitespace();
    let height = parts.next().and_then(|h| h.parse::<u32>().ok());
    let duration = parts.next().and_then(|d| d.parse::<f64>().ok());
    Some((height, duration))
}

fn parse_number(raw: &str) -> Option<u64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)
}

fn last_error_line(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or(lines.last())
        .map(|l| l.to_string())
}
