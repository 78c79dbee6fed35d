/*!
 * Tests for application configuration functionality
 */

use std::fs;
use std::str::FromStr;

use ytdub::app_config::{Config, LogLevel};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.translation.request_language, "en");
    assert_eq!(config.translation.response_language, "ru");
    assert_eq!(config.translation.max_poll_attempts, 30);
    assert_eq!(config.translation.poll_interval_secs, 10);
    assert_eq!(config.translation.fallback_duration_secs, 341.0);

    assert_eq!(config.media.recovery_threshold_bytes, 1024);
    assert_eq!(config.media.audio_bitrate_kbps, 192);
    assert_eq!(config.media.high_res_threshold, 1080);

    assert_eq!(config.assembly.original_gain, 0.2);
    assert_eq!(config.assembly.translation_gain, 1.2);
    assert_eq!(config.assembly.mix_bitrate, "128k");
    assert_eq!(config.assembly.log_tail_lines, 20);

    assert_eq!(config.paths.temp_video_stem, "temp_video");
    assert_eq!(config.paths.temp_audio_stem, "temp_audio");
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.translation.response_language = "xyz".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.max_poll_attempts = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.signing_key.clear();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.assembly.log_tail_lines = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_withOverlappingTempStems_shouldFail() {
    let mut config = Config::default();
    config.paths.temp_video_stem = "temp".to_string();
    config.paths.temp_audio_stem = "temp_audio".to_string();

    let err = config.validate().unwrap_err();
    assert!(format!("{:#}", err).contains("prefixes"));
}

#[test]
fn test_from_file_withPartialJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "ytdub.json",
        br#"{ "translation": { "response_language": "de", "max_poll_attempts": 5 }, "log_level": "debug" }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.translation.response_language, "de");
    assert_eq!(config.translation.max_poll_attempts, 5);
    assert_eq!(config.translation.poll_interval_secs, 10);
    assert_eq!(config.media.audio_bitrate_kbps, 192);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_from_file_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "broken.json", b"{ not json").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_or_default_withMissingFile_shouldUseDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let config = Config::load_or_default(Some(dir.path().join("absent.json").as_path())).unwrap();

    assert_eq!(config.translation.max_poll_attempts, 30);
}

#[test]
fn test_save_thenLoad_shouldKeepChangedValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("saved.json");

    let mut config = Config::default();
    config.assembly.mix_bitrate = "192k".to_string();
    config.paths.work_dir = dir.path().join("scratch");
    config.save(&path).unwrap();

    assert!(fs::read_to_string(&path).unwrap().contains("192k"));
    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.assembly.mix_bitrate, "192k");
    assert_eq!(loaded.paths.work_dir, dir.path().join("scratch"));
}

#[test]
fn test_log_level_fromStr_shouldParseCaseInsensitively() {
    assert_eq!(LogLevel::from_str("WARN").unwrap(), LogLevel::Warn);
    assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
    assert!(LogLevel::from_str("loud").is_err());
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
}
