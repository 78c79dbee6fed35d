use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::app_config::Config;
use crate::assembly::{AssemblyEngine, MergeMode, MergeSpec};
use crate::errors::{AppError, TranslationError};
use crate::file_utils::{FileManager, OutputKind};
use crate::language_utils;
use crate::media::{
    AcquisitionOutcome, Confirm, Container, FormatPolicy, MediaAcquisition, QualityChoice, QualityChooser, Retrier, RetryPolicy,
    TempArtifacts,
};
use crate::providers::{ByteProgress, HttpTransport, MediaExtractor, Sleeper, VideoInfo};
use crate::translation::TranslationClient;
use indicatif::{ProgressBar, ProgressStyle};

// @module: Application controller for the dubbing pipeline

/// What a single run should do
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub url: String,
    pub mode: MergeMode,
    /// Requested video height; when unset or unavailable the quality chooser is asked
    pub quality: Option<u32>,
    /// Produce an mp3 instead of a merged video
    pub audio_only: bool,
    /// Replace an existing output file instead of picking a free name
    pub force: bool,
}

/// External collaborators of a run
#[derive(Debug, Clone, Copy)]
pub struct Collaborators<'a> {
    pub transport: &'a dyn HttpTransport,
    pub extractor: &'a dyn MediaExtractor,
    pub sleeper: &'a dyn Sleeper,
    pub retry_policy: &'a dyn RetryPolicy,
    pub confirm: &'a dyn Confirm,
    /// Asked for a quality when none was requested or the requested one is missing
    pub chooser: &'a dyn QualityChooser,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Video merged with the dub
    Dubbed { path: PathBuf, mode: MergeMode, recovered: bool },
    /// Original video saved without translation
    OriginalVideo { path: PathBuf },
    /// Translated audio saved as mp3
    TranslatedAudio { path: PathBuf },
    /// Original audio extracted to mp3
    OriginalAudio { path: PathBuf },
    /// Nothing was produced on the user's request
    Skipped,
}

impl RunOutcome {
    pub fn output_path(&self) -> Option<&Path> {
        match self {
            Self::Dubbed { path, .. }
            | Self::OriginalVideo { path }
            | Self::TranslatedAudio { path }
            | Self::OriginalAudio { path } => Some(path),
            Self::Skipped => None,
        }
    }
}

/// Main application controller for video dubbing
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Resolved ffmpeg binary
    ffmpeg: PathBuf,
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            config,
            ffmpeg: ffmpeg.into(),
            show_progress: true,
        }
    }

    /// Enable or disable terminal progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline for one video
    ///
    /// Temp artifacts left by a previous run are purged first. They are
    /// removed again on success and kept when the run fails.
    pub fn run(&self, options: &RunOptions, deps: &Collaborators<'_>) -> Result<RunOutcome, AppError> {
        let start_time = Instant::now();

        FileManager::check_writable(&self.config.paths.output_dir)?;
        FileManager::check_writable(&self.config.paths.work_dir)?;

        let temp = TempArtifacts::from_config(&self.config.paths);
        let stale = temp.purge_all();
        if stale > 0 {
            debug!("Removed {} stale temp file(s) from a previous run", stale);
        }

        let result = self.run_pipeline(options, deps, &temp);
        temp.finish(result.is_err());

        match &result {
            Ok(outcome) => {
                if let Some(path) = outcome.output_path() {
                    info!("Saved {:?} in {:.1}s", path, start_time.elapsed().as_secs_f64());
                }
            }
            Err(e) => error!("Run failed: {}", e),
        }
        result
    }

    fn run_pipeline(&self, options: &RunOptions, deps: &Collaborators<'_>, temp: &TempArtifacts) -> Result<RunOutcome, AppError> {
        let retrier = Retrier::new(deps.retry_policy, deps.sleeper);
        let acquisition = MediaAcquisition::new(deps.extractor, deps.transport, retrier, deps.sleeper, temp, &self.config.media);
        let client = TranslationClient::new(deps.transport, deps.sleeper, &self.config.translation);

        info!("Analyzing {}", options.url);
        let video = acquisition.probe(&options.url)?;
        info!("{} - {} (heights: {:?})", video.uploader, video.title, video.heights);
        let (height, audio_only) = self.choose_quality(&video, options, deps.chooser);
        let options = &RunOptions {
            audio_only,
            ..options.clone()
        };

        let target = &self.config.translation.response_language;
        if let Some(language) = video
            .language
            .as_deref()
            .filter(|l| language_utils::matches_language(l, target))
        {
            warn!("Video language is {}, which is already the dub language", language);
            if !deps.confirm.confirm("The video is already in the target language. Download the original instead?") {
                return Ok(RunOutcome::Skipped);
            }
            return self.save_original(&acquisition, temp, &video, options, height);
        }

        let duration = client.effective_duration(video.duration);
        info!("Requesting translation for {:.0}s of video", duration);
        let spinner = self.spinner("Waiting for the translation");
        let translation = client.poll_with_policy(&options.url, duration, deps.retry_policy);
        spinner.finish_and_clear();

        let audio_url = match translation {
            Ok(url) => url,
            Err(e @ TranslationError::InvalidUrl(_)) => return Err(e.into()),
            Err(e) => {
                error!("Translation failed: {}", e);
                let question = if options.audio_only {
                    "Translation failed. Download the original audio instead?"
                } else {
                    "Translation failed. Download the original video without translation?"
                };
                if deps.confirm.confirm(question) {
                    return self.save_original(&acquisition, temp, &video, options, height);
                }
                return Err(e.into());
            }
        };

        let bar = self.byte_bar("Translated audio");
        let audio_path = acquisition.download_translated_audio(&audio_url, &mut |p| track_bytes(&bar, p));
        bar.finish_and_clear();
        let audio_path = audio_path?;

        if options.audio_only {
            let name = FileManager::output_file_name(&video.uploader, &video.title, OutputKind::AudioTranslation, "mp3");
            let path = self.final_path(&name, options.force)?;
            FileManager::copy_file(&audio_path, &path).map_err(file_error)?;
            return Ok(RunOutcome::TranslatedAudio { path });
        }

        let (outcome, container) = self.download_video(&acquisition, &options.url, height)?;
        let report = outcome.report();
        let name = FileManager::output_file_name(
            &video.uploader,
            &video.title,
            OutputKind::Dubbed {
                height: report.height.or(height),
                mode: options.mode.tag(),
            },
            container.extension(),
        );
        let output_path = self.final_path(&name, options.force)?;

        let spec = MergeSpec {
            mode: options.mode,
            video_path: report.path.clone(),
            audio_path,
            output_path: output_path.clone(),
            container_is_matroska: container.is_matroska(),
        };
        let total = report.duration.or(video.duration).unwrap_or(duration);
        let engine = AssemblyEngine::new(&self.ffmpeg, &self.config.assembly);
        let bar = self.seconds_bar(total);
        let merged = engine.merge(&spec, total, &mut |position| bar.set_position(position.round() as u64));
        bar.finish_and_clear();
        merged?;

        Ok(RunOutcome::Dubbed {
            path: output_path,
            mode: options.mode,
            recovered: outcome.is_recovered(),
        })
    }

    /// Save the untranslated video (or its audio) under the original-only name
    fn save_original(
        &self,
        acquisition: &MediaAcquisition<'_>,
        temp: &TempArtifacts,
        video: &VideoInfo,
        options: &RunOptions,
        height: Option<u32>,
    ) -> Result<RunOutcome, AppError> {
        if options.audio_only {
            let name = FileManager::output_file_name(&video.uploader, &video.title, OutputKind::AudioOriginal, "mp3");
            let path = self.final_path(&name, options.force)?;
            // Extracted next to the other temp files so a failed run never touches `path`
            let extracted_path = temp.audio_path();
            let bar = self.byte_bar("Original audio");
            let extracted = acquisition.extract_original_audio(&options.url, &extracted_path, &mut |p| track_bytes(&bar, p));
            bar.finish_and_clear();
            extracted?;
            FileManager::move_file(&extracted_path, &path).map_err(file_error)?;
            return Ok(RunOutcome::OriginalAudio { path });
        }

        let (outcome, container) = self.download_video(acquisition, &options.url, height)?;
        let report = outcome.report();
        let name = FileManager::output_file_name(
            &video.uploader,
            &video.title,
            OutputKind::Original {
                height: report.height.or(height),
            },
            container.extension(),
        );
        let path = self.final_path(&name, options.force)?;
        FileManager::move_file(&report.path, &path).map_err(file_error)?;
        Ok(RunOutcome::OriginalVideo { path })
    }

    fn download_video(
        &self,
        acquisition: &MediaAcquisition<'_>,
        url: &str,
        height: Option<u32>,
    ) -> Result<(AcquisitionOutcome, Container), AppError> {
        let policy = FormatPolicy::Video { height };
        let bar = self.byte_bar(&format!("Video {}", policy.label()));
        let outcome = acquisition.download_video(url, policy, &mut |p| track_bytes(&bar, p));
        bar.finish_and_clear();
        let outcome = outcome?;

        if let AcquisitionOutcome::Recovered { reason, .. } = &outcome {
            warn!("Continuing with a recovered video file ({})", reason);
        }
        let container = outcome
            .report()
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Container::from_extension)
            .unwrap_or(Container::Mp4);
        Ok((outcome, container))
    }

    /// Keep the requested height only when the host offers it
    fn pick_height(&self, video: &VideoInfo, requested: Option<u32>) -> Option<u32> {
        match requested {
            Some(h) if video.heights.contains(&h) => Some(h),
            Some(h) => {
                warn!("{}p is not available (available: {:?}), using the best quality", h, video.heights);
                None
            }
            None => None,
        }
    }

    /// Resolve the height to download, showing the quality menu when nothing usable was requested
    ///
    /// Returns the height (`None` for best) and whether the run became audio-only.
    fn choose_quality(&self, video: &VideoInfo, options: &RunOptions, chooser: &dyn QualityChooser) -> (Option<u32>, bool) {
        let height = self.pick_height(video, options.quality);
        if height.is_some() || options.audio_only || video.heights.is_empty() {
            return (height, options.audio_only);
        }

        match chooser.choose(video) {
            QualityChoice::Height(h) => (self.pick_height(video, Some(h)), false),
            QualityChoice::AudioOnly => {
                info!("Audio-only output selected");
                (None, true)
            }
            QualityChoice::Best => (None, false),
        }
    }

    fn final_path(&self, name: &str, force: bool) -> Result<PathBuf, AppError> {
        FileManager::resolve_output_path(self.config.paths.output_dir.join(name), force).map_err(file_error)
    }

    fn byte_bar(&self, label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} {msg} [{bar:40}] {bytes}/{total_bytes}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.set_message(label.to_string());
        bar
    }

    fn seconds_bar(&self, total: f64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total.round().max(1.0) as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} Merging [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}s ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} Merging [{bar:40}] {pos}/{len}s ({percent}%)"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));
        spinner
    }
}

fn track_bytes(bar: &ProgressBar, progress: ByteProgress) {
    if let Some(total) = progress.total {
        bar.set_length(total);
    }
    bar.set_position(progress.downloaded);
}

fn file_error(error: anyhow::Error) -> AppError {
    AppError::File(format!("{:#}", error))
}
