/*!
 * Retry-wrapped acquisition of video and audio files.
 */

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::format::FormatPolicy;
use super::retry::{NoRetry, Retrier};
use super::temp::TempArtifacts;
use crate::app_config::MediaConfig;
use crate::errors::MediaError;
use crate::providers::{ByteProgress, DownloadReport, HttpTransport, MediaExtractor, Sleeper, VideoInfo};

const CHUNK_SIZE: usize = 8192;

/// One unit of download work
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub source_url: String,
    pub destination: PathBuf,
    pub policy: FormatPolicy,
    /// Whether transient failures go through the retry policy
    pub retryable: bool,
}

/// How a download task ended
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionOutcome {
    /// The extractor reported success
    Completed(DownloadReport),
    /// The extractor failed, but a usable file was already on disk
    Recovered { report: DownloadReport, reason: String },
}

impl AcquisitionOutcome {
    pub fn report(&self) -> &DownloadReport {
        match self {
            Self::Completed(report) | Self::Recovered { report, .. } => report,
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Materializes local media files from remote sources
#[derive(Debug)]
pub struct MediaAcquisition<'a> {
    extractor: &'a dyn MediaExtractor,
    transport: &'a dyn HttpTransport,
    retrier: Retrier<'a>,
    sleeper: &'a dyn Sleeper,
    temp: &'a TempArtifacts,
    config: &'a MediaConfig,
}

impl<'a> MediaAcquisition<'a> {
    pub fn new(
        extractor: &'a dyn MediaExtractor,
        transport: &'a dyn HttpTransport,
        retrier: Retrier<'a>,
        sleeper: &'a dyn Sleeper,
        temp: &'a TempArtifacts,
        config: &'a MediaConfig,
    ) -> Self {
        Self {
            extractor,
            transport,
            retrier,
            sleeper,
            temp,
            config,
        }
    }

    /// Probe the video host for available heights and metadata
    pub fn probe(&self, url: &str) -> Result<VideoInfo, MediaError> {
        self.retrier.run("analyzing the video", |_| self.extractor.probe(url))
    }

    /// Build the task for downloading `url` into the temp video slot
    pub fn video_task(&self, url: &str, policy: FormatPolicy) -> DownloadTask {
        let selection = policy.selection_with_threshold(self.config.high_res_threshold);
        DownloadTask {
            source_url: url.to_string(),
            destination: self.temp.video_path(selection.container),
            policy,
            retryable: true,
        }
    }

    /// Download the video at the height chosen by `policy` into the temp video slot
    pub fn download_video(
        &self,
        url: &str,
        policy: FormatPolicy,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<AcquisitionOutcome, MediaError> {
        let task = self.video_task(url, policy);
        self.run_task(&task, progress)
    }

    /// Execute a download task
    ///
    /// Critical errors purge the video-side partial artifacts before the next
    /// attempt; the translated audio is never touched.
    pub fn run_task(&self, task: &DownloadTask, progress: &mut dyn FnMut(ByteProgress)) -> Result<AcquisitionOutcome, MediaError> {
        let selection = task.policy.selection_with_threshold(self.config.high_res_threshold);
        debug!("Format selector for {}: {}", task.policy.label(), selection.expression);

        let no_retry = NoRetry;
        let retrier = if task.retryable {
            self.retrier
        } else {
            Retrier::new(&no_retry, self.sleeper)
        };

        retrier.run_with_cleanup(
            "downloading the video",
            |attempt| {
                if attempt > 1 {
                    info!("Retrying video download (attempt {})", attempt);
                }
                match self.extractor.download(&task.source_url, &selection, &task.destination, &mut *progress) {
                    Ok(report) => Ok(AcquisitionOutcome::Completed(report)),
                    Err(error) => self.try_recover(task, error),
                }
            },
            |error| {
                if error.requires_purge() {
                    let removed = self.temp.purge_video_partials();
                    info!("Purged {} partial video file(s) before restarting", removed);
                }
            },
        )
    }

    /// Treat a failed download as done when the destination already holds enough bytes
    ///
    /// The size check runs before any error classification, so a critical
    /// error (range or codec failure) with a large destination still counts
    /// as recovered and skips the purge-and-retry path. With `--no-part` the
    /// destination is written in place, so a truncated file over the
    /// threshold is accepted; ffmpeg rejects it later if it is unusable.
    fn try_recover(&self, task: &DownloadTask, error: MediaError) -> Result<AcquisitionOutcome, MediaError> {
        if matches!(error, MediaError::Aborted { .. }) {
            return Err(error);
        }
        let size = match fs::metadata(&task.destination) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(error),
        };
        if size <= self.config.recovery_threshold_bytes {
            return Err(error);
        }

        warn!(
            "Downloader failed but {:?} already holds {} bytes, continuing with it: {}",
            task.destination, size, error
        );
        let height = match task.policy {
            FormatPolicy::Video { height } => height,
            FormatPolicy::AudioOnly => None,
        };
        Ok(AcquisitionOutcome::Recovered {
            report: DownloadReport {
                path: task.destination.clone(),
                height,
                duration: None,
            },
            reason: error.to_string(),
        })
    }

    /// Stream an already-resolved translated-audio URL into the temp audio slot
    pub fn download_translated_audio(&self, url: &str, progress: &mut dyn FnMut(ByteProgress)) -> Result<PathBuf, MediaError> {
        let destination = self.temp.audio_path();
        self.retrier.run("downloading the translated audio", |_| {
            self.stream_to_file(url, &destination, &mut *progress)
        })?;
        Ok(destination)
    }

    /// Extract the video's best audio stream, transcoded to mp3 at the configured bitrate
    pub fn extract_original_audio(
        &self,
        url: &str,
        destination: &Path,
        progress: &mut dyn FnMut(ByteProgress),
    ) -> Result<(), MediaError> {
        self.retrier.run("extracting the original audio", |_| {
            self.extractor
                .extract_audio(url, destination, self.config.audio_bitrate_kbps, &mut *progress)
        })
    }

    fn stream_to_file(&self, url: &str, destination: &Path, progress: &mut dyn FnMut(ByteProgress)) -> Result<u64, MediaError> {
        let mut body = self.transport.get(url)?;
        let total = body.content_length.filter(|len| *len > 0);
        let mut file = File::create(destination)?;

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut downloaded = 0u64;
        progress(ByteProgress { downloaded, total });

        loop {
            let read = match body.reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(MediaError::Network(e.to_string())),
            };
            file.write_all(&buffer[..read])?;
            downloaded += read as u64;
            progress(ByteProgress { downloaded, total });
        }

        file.flush()?;
        debug!("Wrote {} bytes to {:?}", downloaded, destination);
        Ok(downloaded)
    }
}
