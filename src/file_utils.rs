use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::errors::AppError;

// @module: File and directory utilities

const MAX_NAME_CHARS: usize = 60;
const DEFAULT_NAME: &str = "Video_Dubbed";

/// What the final file name should advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind<'a> {
    /// Video with merged dub, tagged with height and merge mode
    Dubbed { height: Option<u32>, mode: &'a str },
    /// Original video without translation
    Original { height: Option<u32> },
    /// Translated audio only
    AudioTranslation,
    /// Original audio only
    AudioOriginal,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Make sure `dir` exists and a file can be created inside it
    pub fn check_writable<P: AsRef<Path>>(dir: P) -> Result<(), AppError> {
        let dir = dir.as_ref();
        Self::ensure_dir(dir).map_err(|e| AppError::Permission(format!("{:#}", e)))?;

        let probe = dir.join(format!(".ytdub-write-test-{}", std::process::id()));
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&probe)
            .map_err(|e| AppError::Permission(format!("Cannot write to {:?}: {}", dir, e)))?;
        let _ = fs::remove_file(&probe);
        Ok(())
    }

    /// Reduce a title or uploader to a file-name-safe fragment
    ///
    /// Keeps alphanumerics and ` .-_(),`, trims, caps the length, and falls
    /// back to a fixed name when nothing is left.
    pub fn clean_name(raw: &str) -> String {
        let kept: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || " .-_(),".contains(*c))
            .collect();
        let trimmed: String = kept.trim().chars().take(MAX_NAME_CHARS).collect();
        let trimmed = trimmed.trim();
        if trimmed.is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    }

    // @generates: Final file name, e.g. `Uploader - Title [1080p][Mix].mp4`
    pub fn output_file_name(uploader: &str, title: &str, kind: OutputKind<'_>, extension: &str) -> String {
        let base = format!("{} - {}", Self::clean_name(uploader), Self::clean_name(title));
        let height_tag = |height: Option<u32>| height.map(|h| format!(" [{}p]", h)).unwrap_or_default();
        match kind {
            OutputKind::Dubbed { height, mode } => {
                let tag = height_tag(height);
                if tag.is_empty() {
                    format!("{} [{}].{}", base, mode, extension)
                } else {
                    format!("{}{}[{}].{}", base, tag, mode, extension)
                }
            }
            OutputKind::Original { height } => format!("{}{}.{}", base, height_tag(height), extension),
            OutputKind::AudioTranslation => format!("{} [AudioTranslation].{}", base, extension),
            OutputKind::AudioOriginal => format!("{} [Original].{}", base, extension),
        }
    }

    /// First free variant of `path`: `name.ext`, `name (1).ext`, `name (2).ext`, ...
    pub fn unique_path<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        if !path.exists() {
            return path.to_path_buf();
        }

        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let extension = path.extension().map(|e| e.to_string_lossy().to_string());

        (1..)
            .map(|n| {
                let name = match &extension {
                    Some(ext) => format!("{} ({}).{}", stem, n, ext),
                    None => format!("{} ({})", stem, n),
                };
                parent.join(name)
            })
            .find(|candidate| !candidate.exists())
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Resolve the final output path: keep it when `force`, otherwise pick a free name
    ///
    /// An existing file is never removed here; with `force` it is replaced
    /// by whatever step writes the finished output.
    pub fn resolve_output_path<P: AsRef<Path>>(path: P, force: bool) -> Result<PathBuf> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(path.to_path_buf());
        }
        if force {
            log::warn!("{:?} will be replaced once the new file is complete", path);
            return Ok(path.to_path_buf());
        }
        let unique = Self::unique_path(path);
        log::info!("{:?} already exists, writing {:?} instead", path, unique);
        Ok(unique)
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        // Ensure the target directory exists
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// Move a file, falling back to copy-and-delete across filesystems
    pub fn move_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        Self::copy_file(from, to)?;
        fs::remove_file(from).with_context(|| format!("Failed to remove {:?} after copy", from))?;
        Ok(())
    }
}
