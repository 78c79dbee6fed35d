use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Translation service settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Download settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Merge settings
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Output and working locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// External tool locations
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation service configuration
///
/// The endpoint, key and user agent are fixed by the service; they live here
/// so nothing in the crate reads them from globals.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Shared HMAC key for request signatures
    #[serde(default = "default_signing_key")]
    pub signing_key: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Language spoken in the video (ISO 639-1)
    #[serde(default = "default_request_language")]
    pub request_language: String,

    /// Language of the dub (ISO 639-1)
    #[serde(default = "default_response_language")]
    pub response_language: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Maximum answered requests before giving up
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Wait between Waiting answers
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Duration sent when the real one is unknown
    #[serde(default = "default_fallback_duration_secs")]
    pub fallback_duration_secs: f64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            signing_key: default_signing_key(),
            user_agent: default_user_agent(),
            request_language: default_request_language(),
            response_language: default_response_language(),
            accept_language: default_accept_language(),
            max_poll_attempts: default_max_poll_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_duration_secs: default_fallback_duration_secs(),
        }
    }
}

/// Download configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MediaConfig {
    /// A failed download whose file is larger than this is kept as recovered
    #[serde(default = "default_recovery_threshold_bytes")]
    pub recovery_threshold_bytes: u64,

    /// Bitrate of extracted original audio
    #[serde(default = "default_audio_bitrate_kbps")]
    pub audio_bitrate_kbps: u32,

    /// Connect timeout for the translated audio stream
    #[serde(default = "default_audio_download_timeout_secs")]
    pub audio_download_timeout_secs: u64,

    /// Heights above this are downloaded into matroska
    #[serde(default = "default_high_res_threshold")]
    pub high_res_threshold: u32,

    /// Retries the extractor performs internally per fragment
    #[serde(default = "default_extractor_retries")]
    pub extractor_retries: u32,

    /// Attempt cap of the non-interactive retry policy
    #[serde(default = "default_unattended_retry_attempts")]
    pub unattended_retry_attempts: u32,

    /// Delay between non-interactive retries
    #[serde(default = "default_unattended_retry_delay_secs")]
    pub unattended_retry_delay_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            recovery_threshold_bytes: default_recovery_threshold_bytes(),
            audio_bitrate_kbps: default_audio_bitrate_kbps(),
            audio_download_timeout_secs: default_audio_download_timeout_secs(),
            high_res_threshold: default_high_res_threshold(),
            extractor_retries: default_extractor_retries(),
            unattended_retry_attempts: default_unattended_retry_attempts(),
            unattended_retry_delay_secs: default_unattended_retry_delay_secs(),
        }
    }
}

/// Merge configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssemblyConfig {
    /// Gain applied to the original track in Mix mode
    #[serde(default = "default_original_gain")]
    pub original_gain: f64,

    /// Gain applied to the dub in Mix mode
    #[serde(default = "default_translation_gain")]
    pub translation_gain: f64,

    /// AAC bitrate of the mixed track
    #[serde(default = "default_mix_bitrate")]
    pub mix_bitrate: String,

    /// ffmpeg log lines kept for failure reports
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,

    #[serde(default = "default_original_track_title")]
    pub original_track_title: String,

    #[serde(default = "default_translated_track_title")]
    pub translated_track_title: String,

    /// ISO 639-2 tag of the dub track in Dual mode
    #[serde(default = "default_translated_track_language")]
    pub translated_track_language: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            original_gain: default_original_gain(),
            translation_gain: default_translation_gain(),
            mix_bitrate: default_mix_bitrate(),
            log_tail_lines: default_log_tail_lines(),
            original_track_title: default_original_track_title(),
            translated_track_title: default_translated_track_title(),
            translated_track_language: default_translated_track_language(),
        }
    }
}

/// Locations used by a run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    /// Where finished files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where temp artifacts live during a run
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(default = "default_temp_video_stem")]
    pub temp_video_stem: String,

    #[serde(default = "default_temp_audio_stem")]
    pub temp_audio_stem: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            work_dir: default_work_dir(),
            temp_video_stem: default_temp_video_stem(),
            temp_audio_stem: default_temp_audio_stem(),
        }
    }
}

/// External tool locations; unset entries are looked up on PATH
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// Resolve the ffmpeg binary
    pub fn resolve_ffmpeg(&self) -> Result<PathBuf> {
        resolve_tool(self.ffmpeg_path.as_deref(), "ffmpeg")
    }

    /// Resolve the yt-dlp binary
    pub fn resolve_ytdlp(&self) -> Result<PathBuf> {
        resolve_tool(self.ytdlp_path.as_deref(), "yt-dlp")
    }
}

fn resolve_tool(configured: Option<&Path>, name: &str) -> Result<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => which::which(path).with_context(|| format!("Configured {} not found at {:?}", name, path)),
        None => which::which(name).with_context(|| format!("{} not found on PATH", name)),
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.browser.yandex.ru/video-translation/translate".to_string()
}

fn default_signing_key() -> String {
    "bt8xH3VOlb4mqf0nqAibnDOoiPlXsisf".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 YaBrowser/24.4.0.0 Safari/537.36".to_string()
}

fn default_request_language() -> String {
    "en".to_string()
}

fn default_response_language() -> String {
    "ru".to_string()
}

fn default_accept_language() -> String {
    "en".to_string()
}

fn default_max_poll_attempts() -> u32 {
    30
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fallback_duration_secs() -> f64 {
    341.0
}

fn default_recovery_threshold_bytes() -> u64 {
    1024
}

fn default_audio_bitrate_kbps() -> u32 {
    192
}

fn default_audio_download_timeout_secs() -> u64 {
    15
}

fn default_high_res_threshold() -> u32 {
    crate::media::format::HIGH_RES_THRESHOLD
}

fn default_extractor_retries() -> u32 {
    10
}

fn default_unattended_retry_attempts() -> u32 {
    5
}

fn default_unattended_retry_delay_secs() -> u64 {
    5
}

fn default_original_gain() -> f64 {
    0.2
}

fn default_translation_gain() -> f64 {
    1.2
}

fn default_mix_bitrate() -> String {
    "128k".to_string()
}

fn default_log_tail_lines() -> usize {
    20
}

fn default_original_track_title() -> String {
    "Original".to_string()
}

fn default_translated_track_title() -> String {
    "Русский".to_string()
}

fn default_translated_track_language() -> String {
    "rus".to_string()
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_temp_video_stem() -> String {
    "temp_video".to_string()
}

fn default_temp_audio_stem() -> String {
    "temp_audio".to_string()
}

impl Config {
    /// Load a configuration file; missing sections and fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load `path` when it exists, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => {
                log::warn!("Config file {:?} not found, using defaults", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path.as_ref(), content).with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _request_name = crate::language_utils::get_language_name(&self.translation.request_language)?;
        let _response_name = crate::language_utils::get_language_name(&self.translation.response_language)?;

        if self.translation.signing_key.is_empty() {
            return Err(anyhow!("Translation signing key must not be empty"));
        }
        if self.translation.endpoint.is_empty() {
            return Err(anyhow!("Translation endpoint must not be empty"));
        }
        if self.translation.max_poll_attempts == 0 {
            return Err(anyhow!("max_poll_attempts must be at least 1"));
        }
        if self.assembly.log_tail_lines == 0 {
            return Err(anyhow!("log_tail_lines must be at least 1"));
        }
        if self.paths.temp_video_stem.is_empty() || self.paths.temp_audio_stem.is_empty() {
            return Err(anyhow!("Temp file stems must not be empty"));
        }
        if self.paths.temp_video_stem.starts_with(&self.paths.temp_audio_stem)
            || self.paths.temp_audio_stem.starts_with(&self.paths.temp_video_stem)
        {
            return Err(anyhow!(
                "Temp file stems must not be prefixes of each other: {:?} / {:?}",
                self.paths.temp_video_stem,
                self.paths.temp_audio_stem
            ));
        }

        Ok(())
    }
}
