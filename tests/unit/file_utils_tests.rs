/*!
 * Tests for file and directory utilities
 */

use std::fs;

use ytdub::file_utils::{FileManager, OutputKind};
use crate::common;

#[test]
fn test_output_file_name_withDubbedKind_shouldTagHeightAndMode() {
    let name = FileManager::output_file_name(
        "Ferris Talks",
        "Rust: in Production?",
        OutputKind::Dubbed {
            height: Some(2160),
            mode: "Dual",
        },
        "mkv",
    );
    assert_eq!(name, "Ferris Talks - Rust in Production [2160p][Dual].mkv");
}

#[test]
fn test_output_file_name_withAudioOriginal_shouldUseOriginalTag() {
    let name = FileManager::output_file_name("Ferris", "Talk", OutputKind::AudioOriginal, "mp3");
    assert_eq!(name, "Ferris - Talk [Original].mp3");
}

#[test]
fn test_output_file_name_withEmptyUploader_shouldFallBack() {
    let name = FileManager::output_file_name("", "Talk", OutputKind::Original { height: None }, "mp4");
    assert_eq!(name, "Video_Dubbed - Talk.mp4");
}

#[test]
fn test_resolve_output_path_withExistingFile_shouldPickFreeName() {
    let dir = common::create_temp_dir().unwrap();
    let existing = common::create_test_file(dir.path(), "a [Mix].mp4", b"old").unwrap();

    let resolved = FileManager::resolve_output_path(&existing, false).unwrap();

    assert_eq!(resolved, dir.path().join("a [Mix] (1).mp4"));
    assert_eq!(fs::read(&existing).unwrap(), b"old");
}

#[test]
fn test_move_file_shouldRelocateContent() {
    let dir = common::create_temp_dir().unwrap();
    let from = common::create_test_file(dir.path(), "temp_video.mp4", b"video").unwrap();
    let to = dir.path().join("out/final.mp4");
    FileManager::ensure_dir(dir.path().join("out")).unwrap();

    FileManager::move_file(&from, &to).unwrap();

    assert!(!FileManager::file_exists(&from));
    assert_eq!(fs::read(&to).unwrap(), b"video");
}

#[test]
fn test_copy_file_withMissingSource_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let result = FileManager::copy_file(dir.path().join("absent.mp3"), dir.path().join("copy.mp3"));
    assert!(result.is_err());
}

#[test]
fn test_check_writable_withFileInTheWay_shouldBePermissionError() {
    let dir = common::create_temp_dir().unwrap();
    let blocker = common::create_test_file(dir.path(), "blocker", b"x").unwrap();

    let result = FileManager::check_writable(blocker.join("nested"));

    assert!(matches!(result, Err(ytdub::AppError::Permission(_))));
}
