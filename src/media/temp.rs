/*!
 * Temporary artifact naming and cleanup.
 *
 * Video and audio temp files share a working directory but never a name
 * prefix, so either side can be purged without touching the other.
 */

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::format::Container;
use crate::app_config::PathsConfig;

const AUDIO_EXTENSION: &str = "mp3";

/// Paths of the per-run temporary artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempArtifacts {
    work_dir: PathBuf,
    video_stem: String,
    audio_stem: String,
}

impl TempArtifacts {
    pub fn new(work_dir: impl Into<PathBuf>, video_stem: impl Into<String>, audio_stem: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            video_stem: video_stem.into(),
            audio_stem: audio_stem.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(&paths.work_dir, &paths.temp_video_stem, &paths.temp_audio_stem)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Temp video path for the given container
    pub fn video_path(&self, container: Container) -> PathBuf {
        self.work_dir.join(format!("{}.{}", self.video_stem, container.extension()))
    }

    /// Temp audio path; audio is always mp3
    pub fn audio_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.{}", self.audio_stem, AUDIO_EXTENSION))
    }

    /// Remove every file whose name starts with the video stem
    ///
    /// Covers both containers and any partial or fragment files the
    /// downloader left behind. The audio artifact is never touched.
    pub fn purge_video_partials(&self) -> usize {
        self.purge_prefix(&self.video_stem, Some(&self.audio_stem))
    }

    /// Remove both video and audio artifacts
    pub fn purge_all(&self) -> usize {
        self.purge_prefix(&self.video_stem, None) + self.purge_prefix(&self.audio_stem, None)
    }

    /// Cleanup at the end of a run; on error the artifacts are kept for diagnosis
    pub fn finish(&self, failed: bool) {
        if failed {
            debug!("Keeping temp artifacts in {:?} for inspection", self.work_dir);
            return;
        }
        self.purge_all();
    }

    fn purge_prefix(&self, prefix: &str, protected: Option<&str>) -> usize {
        let entries = match fs::read_dir(&self.work_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {:?}: {}", self.work_dir, e);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(prefix) || protected.is_some_and(|p| name.starts_with(p)) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed temp file {:?}", path);
                    removed += 1;
                }
                Err(e) => warn!("Failed to remove temp file {:?}: {}", path, e),
            }
        }
        removed
    }
}
