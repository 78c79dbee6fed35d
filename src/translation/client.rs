/*!
 * Signed round trips against the translation endpoint and the polling loop.
 */

use std::time::Duration;

use log::{debug, info, warn};

use super::request::TranslationRequest;
use super::video_id::extract_video_id;
use super::wire::WireMessage;
use crate::app_config::TranslationConfig;
use crate::errors::{DecodeError, MediaError, TranslationError};
use crate::media::retry::{NoRetry, RetryDecision, RetryPolicy};
use crate::providers::{HttpTransport, Sleeper};

const FIELD_AUDIO_URL: u32 = 1;
const FIELD_STATUS: u32 = 4;
const FIELD_MESSAGE: u32 = 9;

const CONTENT_TYPE: &str = "application/x-protobuf";

/// Translation state reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    Ready,
    Waiting,
    Error,
    /// Any other code, or no status field at all
    Unknown(Option<u64>),
}

impl TranslationStatus {
    pub fn from_code(code: Option<u64>) -> Self {
        match code {
            Some(1) => Self::Ready,
            Some(2) => Self::Waiting,
            Some(0) => Self::Error,
            other => Self::Unknown(other),
        }
    }
}

/// Decoded response of one request
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub status: TranslationStatus,
    pub audio_url: Option<String>,
    pub message: Option<String>,
}

impl TranslationResult {
    /// Read status, audio URL and message out of a decoded response
    ///
    /// A Ready status without an audio URL is downgraded to Error.
    pub fn from_message(message: &WireMessage) -> Result<Self, DecodeError> {
        let status = TranslationStatus::from_code(message.get_int(FIELD_STATUS)?);
        let audio_url = message.get_string(FIELD_AUDIO_URL)?.filter(|url| !url.is_empty());
        let text = message.get_string(FIELD_MESSAGE)?.filter(|m| !m.is_empty());

        if status == TranslationStatus::Ready && audio_url.is_none() {
            return Ok(Self {
                status: TranslationStatus::Error,
                audio_url: None,
                message: Some(text.unwrap_or_else(|| "Ready response carried no audio URL".to_string())),
            });
        }

        Ok(Self {
            status,
            audio_url,
            message: text,
        })
    }
}

/// Client for the video translation endpoint
#[derive(Debug)]
pub struct TranslationClient<'a> {
    transport: &'a dyn HttpTransport,
    sleeper: &'a dyn Sleeper,
    config: &'a TranslationConfig,
}

impl<'a> TranslationClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport, sleeper: &'a dyn Sleeper, config: &'a TranslationConfig) -> Self {
        Self {
            transport,
            sleeper,
            config,
        }
    }

    /// Duration sent to the service, falling back to the configured default when unknown
    pub fn effective_duration(&self, duration: Option<f64>) -> f64 {
        duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.config.fallback_duration_secs)
    }

    /// Perform one signed request and decode the answer
    pub fn request_translation(&self, video_url: &str, duration_secs: f64) -> Result<TranslationResult, TranslationError> {
        let video_id = extract_video_id(video_url)?;
        debug!("Requesting translation for video {}", video_id);

        let signed = TranslationRequest {
            video_url,
            duration_secs,
            request_language: &self.config.request_language,
            response_language: &self.config.response_language,
        }
        .sign(self.config.signing_key.as_bytes());

        let headers = vec![
            ("Accept", CONTENT_TYPE.to_string()),
            ("Content-Type", CONTENT_TYPE.to_string()),
            ("Accept-Language", self.config.accept_language.clone()),
            ("User-Agent", self.config.user_agent.clone()),
            ("Vtrans-Signature", signed.signature().to_string()),
            ("Sec-Vtrans-Token", signed.token().to_string()),
        ];

        let response = self.transport.post(&self.config.endpoint, &headers, signed.into_body())?;
        let message = WireMessage::decode(&response);
        debug!("Translation response carried {} field(s)", message.len());
        Ok(TranslationResult::from_message(&message)?)
    }

    /// Poll until the dub is ready; network failures are returned to the caller
    pub fn poll(&self, video_url: &str, duration_secs: f64) -> Result<String, TranslationError> {
        self.poll_with_policy(video_url, duration_secs, &NoRetry)
    }

    /// Poll until the dub is ready, consulting `policy` on transient network failures
    ///
    /// Only answered requests count toward the attempt cap. Waiting sleeps
    /// the configured interval; Error and Unknown end polling at once.
    pub fn poll_with_policy(
        &self,
        video_url: &str,
        duration_secs: f64,
        policy: &dyn RetryPolicy,
    ) -> Result<String, TranslationError> {
        extract_video_id(video_url)?;
        let max_attempts = self.config.max_poll_attempts;
        let interval = Duration::from_secs(self.config.poll_interval_secs);

        for attempt in 1..=max_attempts {
            let result = self.request_with_policy(video_url, duration_secs, policy)?;
            match result.status {
                TranslationStatus::Ready => {
                    info!("Translation ready after {} attempt(s)", attempt);
                    // Ready without a URL was already turned into Error
                    if let Some(url) = result.audio_url {
                        return Ok(url);
                    }
                }
                TranslationStatus::Waiting => {
                    info!("Translation in progress (attempt {}/{})", attempt, max_attempts);
                    if attempt < max_attempts {
                        self.sleeper.sleep(interval);
                    }
                    continue;
                }
                TranslationStatus::Error => {}
                TranslationStatus::Unknown(code) => {
                    return Err(TranslationError::Semantic {
                        status: match code {
                            Some(code) => format!("unknown status {}", code),
                            None => "missing status".to_string(),
                        },
                        message: result.message.unwrap_or_else(|| "Unknown error".to_string()),
                    });
                }
            }

            return Err(TranslationError::Semantic {
                status: "error".to_string(),
                message: result.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        warn!("Translation still not ready after {} attempts", max_attempts);
        Err(TranslationError::Timeout { attempts: max_attempts })
    }

    fn request_with_policy(
        &self,
        video_url: &str,
        duration_secs: f64,
        policy: &dyn RetryPolicy,
    ) -> Result<TranslationResult, TranslationError> {
        let mut failures = 0;
        loop {
            match self.request_translation(video_url, duration_secs) {
                Err(TranslationError::Network(error)) if error.is_transient() => {
                    failures += 1;
                    warn!("Translation request failed: {}", error);
                    let as_media = MediaError::Network(error.to_string());
                    match policy.decide("requesting the translation", &as_media, failures) {
                        RetryDecision::Abort => return Err(TranslationError::Network(error)),
                        RetryDecision::Retry { after } => {
                            if !after.is_zero() {
                                self.sleeper.sleep(after);
                            }
                        }
                    }
                }
                other => return other,
            }
        }
    }
}
