/*!
 * Tests for error types and conversions
 */

use std::path::PathBuf;

use ytdub::errors::{AppError, AssemblyError, DecodeError, MediaError, TranslationError, TransportError};

#[test]
fn test_mediaError_fromDownloadMessage_shouldClassifyRangeAndCodecAsCritical() {
    let range = MediaError::from_download_message("HTTP Error 416: Requested range not satisfiable");
    assert!(matches!(range, MediaError::Critical(_)));
    assert!(range.requires_purge());
    assert!(range.is_transient());

    let codec = MediaError::from_download_message("Could not write header: codec parameters not set");
    assert!(matches!(codec, MediaError::Critical(_)));

    let reset = MediaError::from_download_message("Connection reset by peer");
    assert!(matches!(reset, MediaError::Network(_)));
    assert!(!reset.requires_purge());
}

#[test]
fn test_mediaError_toolAndAborted_shouldNotBeTransient() {
    assert!(!MediaError::Tool("yt-dlp: not found".to_string()).is_transient());
    let aborted = MediaError::Aborted {
        attempts: 3,
        reason: "declined".to_string(),
    };
    assert!(!aborted.is_transient());
    assert!(aborted.to_string().contains("3 attempt(s)"));
}

#[test]
fn test_transportError_intoMediaError_shouldBeNetwork() {
    let error: MediaError = TransportError::Timeout("30s".to_string()).into();
    assert!(matches!(error, MediaError::Network(ref m) if m.contains("30s")));
}

#[test]
fn test_translationError_timeout_shouldDisplayAttempts() {
    let error = TranslationError::Timeout { attempts: 30 };
    assert_eq!(error.to_string(), "Translation not ready after 30 attempts");
}

#[test]
fn test_translationError_fromDecodeError_shouldWrap() {
    let decode = DecodeError::TypeMismatch {
        field: 4,
        expected: "varint",
        found: "bytes",
    };
    let error: TranslationError = decode.into();
    let display = error.to_string();
    assert!(display.contains("Malformed response"));
    assert!(display.contains("field 4"));
}

#[test]
fn test_assemblyError_toolFailed_shouldCarryCommandAndTail() {
    let error = AssemblyError::ToolFailed {
        code: 1,
        command: "ffmpeg -i temp_video.mp4".to_string(),
        log_tail: "Invalid data found".to_string(),
    };
    let display = error.to_string();
    assert!(display.contains("code 1"));
    assert!(display.contains("ffmpeg -i temp_video.mp4"));
    assert!(display.contains("Invalid data found"));

    let missing = AssemblyError::MissingInput(PathBuf::from("temp_audio.mp3"));
    assert!(missing.to_string().contains("temp_audio.mp3"));
}

#[test]
fn test_appError_fromLayerErrors_shouldWrapAndExitNonZero() {
    let errors: Vec<AppError> = vec![
        TranslationError::InvalidUrl("https://example.com".to_string()).into(),
        MediaError::Tool("broken".to_string()).into(),
        AssemblyError::MissingInput(PathBuf::from("x")).into(),
        AppError::Permission("read-only".to_string()),
        AppError::MissingTool("ffmpeg".to_string()),
    ];

    assert!(matches!(errors[0], AppError::Translation(_)));
    assert!(matches!(errors[1], AppError::Media(_)));
    assert!(matches!(errors[2], AppError::Assembly(_)));
    for error in &errors {
        assert_ne!(error.exit_code(), 0);
    }
}
