/*!
 * Error types for the ytdub application.
 *
 * Each layer owns one error enum, defined with the thiserror crate:
 * wire decoding, HTTP transport, the translation client, media acquisition,
 * assembly, and the top-level application error that wraps them all.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by typed accessors on a decoded wire message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The field holds a different wire type than the accessor expects
    #[error("field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: u32,
        expected: &'static str,
        found: &'static str,
    },

    /// A length-delimited field is not valid UTF-8
    #[error("field {field}: invalid UTF-8 in string value")]
    InvalidUtf8 { field: u32 },
}

/// Errors that can occur while talking HTTP to a remote endpoint
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection could not be established or was dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// The transport gave up waiting for the peer
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The peer answered with a non-2xx status
    #[error("HTTP status {status_code}: {message}")]
    Status { status_code: u16, message: String },

    /// Reading the response body failed midway
    #[error("Body read failed: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether repeating the same request can succeed
    ///
    /// Client errors (4xx) are final, except request timeout and rate limiting.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status_code, .. } => !(400..500).contains(status_code) || matches!(status_code, 408 | 429),
            Self::Connection(_) | Self::Timeout(_) | Self::Body(_) => true,
        }
    }
}

/// Errors from the translation client
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The URL does not match any recognized video URL shape
    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a usable HTTP response
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    /// The service reported failure or an unknown status
    #[error("Translation failed ({status}): {message}")]
    Semantic { status: String, message: String },

    /// A response field had the wrong shape
    #[error("Malformed response: {0}")]
    Decode(#[from] DecodeError),

    /// The translation never became ready within the attempt cap
    #[error("Translation not ready after {attempts} attempts")]
    Timeout { attempts: u32 },
}

/// Errors from media acquisition (video and audio downloads)
#[derive(Error, Debug)]
pub enum MediaError {
    /// Transient transport-class failure; retry is possible
    #[error("Network error: {0}")]
    Network(String),

    /// Range/codec failure; partial video artifacts must be purged before retrying
    #[error("Critical media error: {0}")]
    Critical(String),

    /// The extraction tool could not be run or returned unusable output
    #[error("Extractor error: {0}")]
    Tool(String),

    /// Local file operation failed
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// The retry decision layer declined to continue
    #[error("Aborted after {attempts} attempt(s): {reason}")]
    Aborted { attempts: u32, reason: String },
}

impl MediaError {
    /// Classify a raw downloader message into a media error
    ///
    /// Range-not-satisfiable responses and codec-parameter failures leave the
    /// partial file unusable, so they are critical; everything else is
    /// treated as an ordinary network failure.
    pub fn from_download_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("416") || message.contains("codec parameters") {
            Self::Critical(message)
        } else {
            Self::Network(message)
        }
    }

    /// Whether the retry policy should be consulted for this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Critical(_))
    }

    /// Whether a retry requires purging partial video artifacts first
    pub fn requires_purge(&self) -> bool {
        matches!(self, Self::Critical(_))
    }
}

impl From<TransportError> for MediaError {
    fn from(error: TransportError) -> Self {
        Self::Network(error.to_string())
    }
}

/// Errors from the media assembly step
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// An input file is missing or empty
    #[error("Merge input not ready: {0:?}")]
    MissingInput(PathBuf),

    /// The media tool could not be launched
    #[error("Failed to launch media tool: {0}")]
    Spawn(#[source] std::io::Error),

    /// The media tool exited with a nonzero status
    #[error("Media tool exited with code {code}\nCommand: {command}\n{log_tail}")]
    ToolFailed {
        code: i32,
        command: String,
        log_tail: String,
    },

    /// The merged file could not be moved over the output path
    #[error("Failed to move merged file {path:?} into place: {source}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Output location is not usable
    #[error("Permission error: {0}")]
    Permission(String),

    /// Required external tool is missing
    #[error("Missing tool: {0}")]
    MissingTool(String),

    /// Error from the translation client
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from media acquisition
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Error from assembly
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
