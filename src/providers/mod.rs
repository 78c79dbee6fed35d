/*!
 * Seams to the outside world.
 *
 * Every network-touching or tool-driving component talks to its
 * collaborator through one of these traits:
 * - `HttpTransport`: signed POSTs to the translation endpoint and streamed GETs
 * - `MediaExtractor`: probing and downloading from the video host
 * - `Sleeper`: blocking waits between poll attempts and retries
 *
 * `http` and `ytdlp` hold the production implementations, `mock` the
 * in-memory ones used by the test suite.
 */

use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{MediaError, TransportError};
use crate::media::format::FormatSelection;

pub mod http;
pub mod mock;
pub mod ytdlp;

/// Streamed response body
pub struct HttpBody {
    /// Value of the Content-Length header, when the server sent one
    pub content_length: Option<u64>,
    /// Body reader; read errors are transport failures
    pub reader: Box<dyn Read + Send>,
}

impl Debug for HttpBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Blocking HTTP transport
pub trait HttpTransport: Debug {
    /// POST `body` with `headers` and return the full response body
    ///
    /// Connection failures, timeouts and non-2xx statuses are all errors.
    fn post(&self, url: &str, headers: &[(&'static str, String)], body: Vec<u8>) -> Result<Vec<u8>, TransportError>;

    /// GET `url` and hand back the body as a stream
    fn get(&self, url: &str) -> Result<HttpBody, TransportError>;
}

/// Metadata the video host reports about a video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    /// Available video heights, highest first
    pub heights: Vec<u32>,
    pub title: String,
    pub uploader: String,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Detected spoken language, as reported
    pub language: Option<String>,
}

/// Byte-level progress of a running download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

/// Result of a completed extractor download
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    /// Where the file actually landed
    pub path: PathBuf,
    pub height: Option<u32>,
    pub duration: Option<f64>,
}

/// Stream discovery and download, delegated to an external extractor
pub trait MediaExtractor: Debug {
    /// Look up stream heights, title, uploader, duration and language
    fn probe(&self, url: &str) -> Result<VideoInfo, MediaError>;

    /// Download the streams picked by `format` into `destination`
    fn download(
        &self,
        url: &str,
        format: &FormatSelection,
        destination: &Path,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<DownloadReport, MediaError>;

    /// Download the best audio stream and transcode it to mp3 at `bitrate_kbps`
    fn extract_audio(
        &self,
        url: &str,
        destination: &Path,
        bitrate_kbps: u32,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<(), MediaError>;
}

/// Blocking wait, injectable so poll loops can be tested instantly
pub trait Sleeper: Debug {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
