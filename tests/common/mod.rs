/*!
 * Common test utilities for the ytdub test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ytdub::app_config::Config;
use ytdub::providers::VideoInfo;
use ytdub::translation::WireWriter;

/// Translated audio URL served by the scripted transport
pub const AUDIO_URL: &str = "https://cdn.example.com/dub/abc.mp3";

/// A video URL the translation client accepts
pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Route library logs through the test harness; `RUST_LOG=debug` shows them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Default configuration rooted in `dir`, with separate output and work directories
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.output_dir = dir.join("out");
    config.paths.work_dir = dir.join("work");
    config
}

/// A 10 minute English video offered at 1080p and 720p
pub fn sample_video() -> VideoInfo {
    VideoInfo {
        heights: vec![1080, 720],
        title: "Rust in Production".to_string(),
        uploader: "Ferris Talks".to_string(),
        duration: Some(600.0),
        language: Some("en".to_string()),
    }
}

/// Response body with the given status code and optional audio URL
pub fn translation_response(status: i32, url: Option<&str>, message: Option<&str>) -> Vec<u8> {
    let mut writer = WireWriter::new();
    if let Some(url) = url {
        writer = writer.string(1, url);
    }
    writer = writer.int32(4, status);
    if let Some(message) = message {
        writer = writer.string(9, message);
    }
    writer.into_bytes()
}

pub fn waiting_response() -> Vec<u8> {
    translation_response(2, None, None)
}

pub fn ready_response(url: &str) -> Vec<u8> {
    translation_response(1, Some(url), None)
}

pub fn failed_response(message: &str) -> Vec<u8> {
    translation_response(0, None, Some(message))
}

/// Names of the files directly inside `dir`, sorted
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Stand-in for ffmpeg
///
/// Records its arguments one per line in `ffmpeg-args.txt` next to the
/// script, prints two progress records, and then either writes `merged`
/// to its last argument or fails with `exit_code`.
#[cfg(unix)]
pub fn fake_ffmpeg(dir: &Path, exit_code: i32) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir)?;
    let args_file = dir.join("ffmpeg-args.txt");
    let script = format!(
        r#"#!/bin/sh
printf '%s\n' "$@" > "{args}"
for last; do :; done
echo "out_time_us=300000000"
echo "progress=continue"
echo "out_time_us=600000000"
echo "progress=end"
if [ {code} -ne 0 ]; then
  echo "Invalid data found when processing input" >&2
  exit {code}
fi
printf merged > "$last"
"#,
        args = args_file.display(),
        code = exit_code
    );
    let path = dir.join("ffmpeg");
    fs::write(&path, script)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Arguments the fake ffmpeg in `dir` was last called with
#[cfg(unix)]
pub fn recorded_ffmpeg_args(dir: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(dir.join("ffmpeg-args.txt"))?;
    Ok(content.lines().map(str::to_string).collect())
}
