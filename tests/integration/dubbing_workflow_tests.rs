/*!
 * End-to-end dubbing runs
 *
 * The controller is driven with a scripted transport and extractor and a
 * shell script standing in for ffmpeg, so every run exercises probing,
 * polling, downloads, merging, naming and cleanup without the network.
 */

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use ytdub::app_controller::{Collaborators, Controller, RunOptions, RunOutcome};
use ytdub::assembly::MergeMode;
use ytdub::errors::{AppError, TranslationError};
use ytdub::media::{AutoConfirm, FixedChoice, NoRetry, QualityChoice};
use ytdub::providers::mock::{MockExtractor, MockTransport, RecordingSleeper};
use ytdub::providers::VideoInfo;
use crate::common;

const DUB_BYTES: &[u8] = b"translated voice track";

struct Run {
    dir: TempDir,
    transport: MockTransport,
    extractor: MockExtractor,
    sleeper: RecordingSleeper,
    confirm: AutoConfirm,
    chooser: FixedChoice,
}

impl Run {
    fn new(video: VideoInfo, transport: MockTransport) -> Self {
        common::init_test_logging();
        Self {
            dir: common::create_temp_dir().unwrap(),
            transport,
            extractor: MockExtractor::new(video),
            sleeper: RecordingSleeper::default(),
            confirm: AutoConfirm(true),
            chooser: FixedChoice::default(),
        }
    }

    fn confirming(mut self, answer: bool) -> Self {
        self.confirm = AutoConfirm(answer);
        self
    }

    fn choosing(mut self, choice: QualityChoice) -> Self {
        self.chooser = FixedChoice(choice);
        self
    }

    fn tools_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("tools")
    }

    fn out_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("out")
    }

    fn work_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("work")
    }

    fn execute(&self, options: &RunOptions) -> Result<RunOutcome, AppError> {
        let ffmpeg = common::fake_ffmpeg(&self.tools_dir(), 0).unwrap();
        let controller = Controller::with_config(common::test_config(self.dir.path()), ffmpeg).with_progress(false);
        let deps = Collaborators {
            transport: &self.transport,
            extractor: &self.extractor,
            sleeper: &self.sleeper,
            retry_policy: &NoRetry,
            confirm: &self.confirm,
            chooser: &self.chooser,
        };
        controller.run(options, &deps)
    }

    fn ffmpeg_called(&self) -> bool {
        self.tools_dir().join("ffmpeg-args.txt").exists()
    }
}

fn options(mode: MergeMode, quality: Option<u32>) -> RunOptions {
    RunOptions {
        url: common::VIDEO_URL.to_string(),
        mode,
        quality,
        audio_only: false,
        force: false,
    }
}

fn ready_after_two_waits() -> MockTransport {
    MockTransport::new()
        .with_post(common::waiting_response())
        .with_post(common::waiting_response())
        .with_post(common::ready_response(common::AUDIO_URL))
        .with_get(common::AUDIO_URL, DUB_BYTES.to_vec())
}

fn assert_no_temp_files(work_dir: &Path) {
    let leftovers: Vec<String> = common::file_names(work_dir)
        .into_iter()
        .filter(|name| name.starts_with("temp_video") || name.starts_with("temp_audio"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
}

#[test]
fn test_run_withMixMode_shouldProduceSingleTaggedVideo() {
    let run = Run::new(common::sample_video(), ready_after_two_waits());

    let outcome = run.execute(&options(MergeMode::Mix, Some(1080))).unwrap();

    let names = common::file_names(&run.out_dir());
    assert_eq!(names, vec!["Ferris Talks - Rust in Production [1080p][Mix].mp4".to_string()]);
    match &outcome {
        RunOutcome::Dubbed { path, mode, recovered } => {
            assert_eq!(*mode, MergeMode::Mix);
            assert!(!recovered);
            assert_eq!(fs::read(path).unwrap(), b"merged");
        }
        other => panic!("expected a dubbed video, got {:?}", other),
    }
    assert_no_temp_files(&run.work_dir());

    assert_eq!(run.transport.post_calls(), 3);
    assert_eq!(run.transport.get_calls(), vec![common::AUDIO_URL.to_string()]);
    assert_eq!(run.sleeper.calls(), vec![Duration::from_secs(10); 2]);

    let args = common::recorded_ffmpeg_args(&run.tools_dir()).unwrap();
    assert!(args.contains(&"-filter_complex".to_string()));
    assert!(args.iter().any(|a| a.ends_with("temp_audio.mp3")));
    assert!(args.iter().any(|a| a.ends_with("temp_video.mp4")));
}

#[test]
fn test_run_withDualModeAtHighResolution_shouldUseMatroskaWithoutBitstreamFilter() {
    let video = VideoInfo {
        heights: vec![2160, 1080],
        ..common::sample_video()
    };
    let run = Run::new(video, ready_after_two_waits());

    let outcome = run.execute(&options(MergeMode::Dual, Some(2160))).unwrap();

    assert_eq!(
        outcome.output_path().and_then(|p| p.file_name()).map(|n| n.to_string_lossy().to_string()),
        Some("Ferris Talks - Rust in Production [2160p][Dual].mkv".to_string())
    );
    let selections = run.extractor.selections();
    assert_eq!(selections.len(), 1);
    assert!(selections[0].container.is_matroska());

    let args = common::recorded_ffmpeg_args(&run.tools_dir()).unwrap();
    assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
    assert!(!args.contains(&"aac_adtstoasc".to_string()));
    assert!(args.iter().any(|a| a.ends_with("temp_video.mkv")));
}

#[test]
fn test_run_withUnavailableQuality_shouldFallBackToBest() {
    let run = Run::new(common::sample_video(), ready_after_two_waits());

    let outcome = run.execute(&options(MergeMode::Mix, Some(1440))).unwrap();

    // The extractor reports the height it actually delivered
    let name = outcome.output_path().unwrap().file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(name, "Ferris Talks - Rust in Production [1080p][Mix].mp4");
    assert!(!run.extractor.selections()[0].expression.contains("1440"));
}

#[test]
fn test_run_withExistingOutput_shouldAddCounter() {
    let run = Run::new(common::sample_video(), ready_after_two_waits());
    fs::create_dir_all(run.out_dir()).unwrap();
    let taken = run.out_dir().join("Ferris Talks - Rust in Production [1080p][Mix].mp4");
    fs::write(&taken, b"earlier run").unwrap();

    let outcome = run.execute(&options(MergeMode::Mix, Some(1080))).unwrap();

    assert_eq!(
        outcome.output_path().unwrap(),
        run.out_dir().join("Ferris Talks - Rust in Production [1080p][Mix] (1).mp4")
    );
    assert_eq!(fs::read(&taken).unwrap(), b"earlier run");
}

#[test]
fn test_run_withForce_shouldReplaceExistingOutput() {
    let run = Run::new(common::sample_video(), ready_after_two_waits());
    fs::create_dir_all(run.out_dir()).unwrap();
    let taken = run.out_dir().join("Ferris Talks - Rust in Production [1080p][Mix].mp4");
    fs::write(&taken, b"earlier run").unwrap();
    let mut opts = options(MergeMode::Mix, Some(1080));
    opts.force = true;

    let outcome = run.execute(&opts).unwrap();

    assert_eq!(outcome.output_path().unwrap(), taken);
    assert_eq!(fs::read(&taken).unwrap(), b"merged");
    assert_eq!(common::file_names(&run.out_dir()).len(), 1);
}

#[test]
fn test_run_withAudioOnly_shouldSaveTranslatedMp3WithoutVideo() {
    let run = Run::new(common::sample_video(), ready_after_two_waits());
    let mut opts = options(MergeMode::Mix, None);
    opts.audio_only = true;

    let outcome = run.execute(&opts).unwrap();

    let path = match outcome {
        RunOutcome::TranslatedAudio { path } => path,
        other => panic!("expected translated audio, got {:?}", other),
    };
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        "Ferris Talks - Rust in Production [AudioTranslation].mp3"
    );
    assert_eq!(fs::read(&path).unwrap(), DUB_BYTES);
    assert_eq!(run.extractor.download_calls(), 0);
    assert!(!run.ffmpeg_called());
    assert_no_temp_files(&run.work_dir());
}

#[test]
fn test_run_withTranslationFailureAndFallbackAccepted_shouldSaveOriginalVideo() {
    let transport = MockTransport::new().with_post(common::failed_response("Translation is unavailable"));
    let run = Run::new(common::sample_video(), transport);

    let outcome = run.execute(&options(MergeMode::Mix, Some(1080))).unwrap();

    let path = match outcome {
        RunOutcome::OriginalVideo { path } => path,
        other => panic!("expected the original video, got {:?}", other),
    };
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        "Ferris Talks - Rust in Production [1080p].mp4"
    );
    assert!(path.is_file());
    assert!(!run.ffmpeg_called());
    assert!(run.transport.get_calls().is_empty());
}

#[test]
fn test_run_withTranslationFailureAndFallbackDeclined_shouldFail() {
    let transport = MockTransport::new().with_post(common::failed_response("Translation is unavailable"));
    let run = Run::new(common::sample_video(), transport).confirming(false);

    let result = run.execute(&options(MergeMode::Mix, Some(1080)));

    assert!(matches!(result, Err(AppError::Translation(TranslationError::Semantic { .. }))));
    assert!(common::file_names(&run.out_dir()).is_empty());
    assert_eq!(run.extractor.download_calls(), 0);
}

#[test]
fn test_run_withAudioOnlyAndTranslationFailure_shouldExtractOriginalAudio() {
    let transport = MockTransport::new().with_post(common::failed_response("Translation is unavailable"));
    let run = Run::new(common::sample_video(), transport);
    let mut opts = options(MergeMode::Mix, None);
    opts.audio_only = true;

    let outcome = run.execute(&opts).unwrap();

    let path = match outcome {
        RunOutcome::OriginalAudio { path } => path,
        other => panic!("expected the original audio, got {:?}", other),
    };
    assert_eq!(path.file_name().unwrap().to_string_lossy(), "Ferris Talks - Rust in Production [Original].mp3");
    assert_eq!(run.extractor.audio_calls(), vec![192]);
}

#[test]
fn test_run_withVideoAlreadyInTargetLanguage_shouldSkipTranslation() {
    let video = VideoInfo {
        language: Some("Russian".to_string()),
        ..common::sample_video()
    };
    let run = Run::new(video, MockTransport::new());

    let outcome = run.execute(&options(MergeMode::Mix, Some(720))).unwrap();

    assert!(matches!(outcome, RunOutcome::OriginalVideo { .. }));
    assert_eq!(run.transport.post_calls(), 0);
}

#[test]
fn test_run_withUnrecognizedUrl_shouldFailWithoutFallback() {
    let run = Run::new(common::sample_video(), MockTransport::new());
    let mut opts = options(MergeMode::Mix, None);
    opts.url = "https://vimeo.com/12345".to_string();

    let result = run.execute(&opts);

    assert!(matches!(result, Err(AppError::Translation(TranslationError::InvalidUrl(_)))));
    assert_eq!(run.transport.post_calls(), 0);
    assert_eq!(run.extractor.download_calls(), 0);
}

#[test]
fn test_run_withoutQualityAndAudioOnlyChosen_shouldSaveTranslatedMp3() {
    let run = Run::new(common::sample_video(), ready_after_two_waits()).choosing(QualityChoice::AudioOnly);

    let outcome = run.execute(&options(MergeMode::Mix, None)).unwrap();

    assert!(matches!(outcome, RunOutcome::TranslatedAudio { .. }));
    assert_eq!(
        common::file_names(&run.out_dir()),
        vec!["Ferris Talks - Rust in Production [AudioTranslation].mp3".to_string()]
    );
    assert_eq!(run.extractor.download_calls(), 0);
    assert!(!run.ffmpeg_called());
}

#[test]
fn test_run_withoutQualityAndMidHeightChosen_shouldDownloadThatHeight() {
    let video = VideoInfo {
        heights: vec![1080, 720, 480],
        ..common::sample_video()
    };
    let run = Run::new(video, ready_after_two_waits()).choosing(QualityChoice::Height(720));

    let outcome = run.execute(&options(MergeMode::Mix, None)).unwrap();

    assert!(matches!(outcome, RunOutcome::Dubbed { .. }));
    let selections = run.extractor.selections();
    assert_eq!(selections.len(), 1);
    assert!(selections[0].expression.contains("height=720"));
    assert!(!selections[0].container.is_matroska());
}

#[test]
fn test_run_withRequestedQuality_shouldNotAskForQuality() {
    let run = Run::new(common::sample_video(), ready_after_two_waits()).choosing(QualityChoice::AudioOnly);

    let outcome = run.execute(&options(MergeMode::Mix, Some(720))).unwrap();

    assert!(matches!(outcome, RunOutcome::Dubbed { .. }));
    assert!(run.extractor.selections()[0].expression.contains("height=720"));
}
