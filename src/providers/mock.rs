/*!
 * In-memory provider implementations for testing.
 *
 * - `MockTransport` answers POSTs from a scripted queue and GETs from a URL map
 * - `MockExtractor` writes scripted bytes instead of talking to a video host
 * - `RecordingSleeper` records requested waits and returns immediately
 *
 * Every mock records what it was asked so tests can assert on call counts.
 */

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::{ByteProgress, DownloadReport, HttpBody, HttpTransport, MediaExtractor, Sleeper, VideoInfo};
use crate::errors::{MediaError, TransportError};
use crate::media::format::FormatSelection;

const DEFAULT_PAYLOAD_SIZE: usize = 4096;

/// A POST the mock transport received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Value of the first header named `name`, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted HTTP transport
#[derive(Debug, Default)]
pub struct MockTransport {
    post_responses: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    get_bodies: HashMap<String, Vec<u8>>,
    get_calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful POST response body
    pub fn with_post(self, body: Vec<u8>) -> Self {
        self.push_post(Ok(body));
        self
    }

    /// Queue a failing POST
    pub fn with_post_error(self, error: TransportError) -> Self {
        self.push_post(Err(error));
        self
    }

    /// Serve `body` for GETs of `url`
    pub fn with_get(mut self, url: &str, body: Vec<u8>) -> Self {
        self.get_bodies.insert(url.to_string(), body);
        self
    }

    pub fn push_post(&self, response: Result<Vec<u8>, TransportError>) {
        self.post_responses.lock().unwrap().push_back(response);
    }

    /// All POSTs received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn post_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.get_calls.lock().unwrap().clone()
    }
}

impl HttpTransport for MockTransport {
    fn post(&self, url: &str, headers: &[(&'static str, String)], body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            body,
        });
        self.post_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("no scripted response left".to_string())))
    }

    fn get(&self, url: &str) -> Result<HttpBody, TransportError> {
        self.get_calls.lock().unwrap().push(url.to_string());
        match self.get_bodies.get(url) {
            Some(body) => Ok(HttpBody {
                content_length: Some(body.len() as u64),
                reader: Box::new(Cursor::new(body.clone())),
            }),
            None => Err(TransportError::Status {
                status_code: 404,
                message: format!("no mock body for {}", url),
            }),
        }
    }
}

/// Scripted media extractor
///
/// Downloads consume queued outcomes in order; once the queue is empty every
/// download succeeds with a fixed payload.
#[derive(Debug)]
pub struct MockExtractor {
    info: VideoInfo,
    probe_errors: Mutex<VecDeque<MediaError>>,
    downloads: Mutex<VecDeque<Result<Vec<u8>, MediaError>>>,
    audio_bytes: Vec<u8>,
    selections: Mutex<Vec<FormatSelection>>,
    audio_calls: Mutex<Vec<u32>>,
}

impl MockExtractor {
    pub fn new(info: VideoInfo) -> Self {
        Self {
            info,
            probe_errors: Mutex::new(VecDeque::new()),
            downloads: Mutex::new(VecDeque::new()),
            audio_bytes: vec![5u8; DEFAULT_PAYLOAD_SIZE],
            selections: Mutex::new(Vec::new()),
            audio_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful download writing `bytes`
    pub fn with_download_bytes(self, bytes: Vec<u8>) -> Self {
        self.downloads.lock().unwrap().push_back(Ok(bytes));
        self
    }

    /// Queue failing downloads, consumed in order
    pub fn with_download_errors(self, errors: Vec<MediaError>) -> Self {
        self.downloads.lock().unwrap().extend(errors.into_iter().map(Err));
        self
    }

    /// Queue probe failures ahead of the successful probe
    pub fn with_probe_errors(self, errors: Vec<MediaError>) -> Self {
        self.probe_errors.lock().unwrap().extend(errors);
        self
    }

    pub fn with_audio_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.audio_bytes = bytes;
        self
    }

    /// Format selections passed to `download`, in call order
    pub fn selections(&self) -> Vec<FormatSelection> {
        self.selections.lock().unwrap().clone()
    }

    pub fn download_calls(&self) -> usize {
        self.selections.lock().unwrap().len()
    }

    /// Bitrates passed to `extract_audio`, in call order
    pub fn audio_calls(&self) -> Vec<u32> {
        self.audio_calls.lock().unwrap().clone()
    }
}

fn write_with_progress(destination: &Path, bytes: &[u8], progress: &mut dyn FnMut(ByteProgress)) -> Result<(), MediaError> {
    let total = Some(bytes.len() as u64);
    progress(ByteProgress { downloaded: 0, total });
    fs::write(destination, bytes)?;
    progress(ByteProgress {
        downloaded: bytes.len() as u64,
        total,
    });
    Ok(())
}

impl MediaExtractor for MockExtractor {
    fn probe(&self, _url: &str) -> Result<VideoInfo, MediaError> {
        match self.probe_errors.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(self.info.clone()),
        }
    }

    fn download(
        &self,
        _url: &str,
        format: &FormatSelection,
        destination: &Path,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<DownloadReport, MediaError> {
        self.selections.lock().unwrap().push(format.clone());
        let next = self.downloads.lock().unwrap().pop_front();
        let bytes = match next {
            Some(Ok(bytes)) => bytes,
            Some(Err(error)) => return Err(error),
            None => vec![1u8; DEFAULT_PAYLOAD_SIZE],
        };
        write_with_progress(destination, &bytes, progress)?;
        Ok(DownloadReport {
            path: destination.to_path_buf(),
            height: self.info.heights.first().copied(),
            duration: self.info.duration,
        })
    }

    fn extract_audio(
        &self,
        _url: &str,
        destination: &Path,
        bitrate_kbps: u32,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<(), MediaError> {
        self.audio_calls.lock().unwrap().push(bitrate_kbps);
        write_with_progress(destination, &self.audio_bytes, progress)
    }
}

/// Records requested sleeps without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.calls.lock().unwrap().push(duration);
    }
}
