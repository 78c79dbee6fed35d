// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use ytdub::app_config::{Config, LogLevel};
use ytdub::app_controller::{Collaborators, Controller, RunOptions, RunOutcome};
use ytdub::assembly::MergeMode;
use ytdub::errors::AppError;
use ytdub::media::{AutoConfirm, Confirm, FixedChoice, InteractiveRetry, LimitedRetry, QualityChoice, QualityChooser, RetryPolicy};
use ytdub::providers::http::ReqwestTransport;
use ytdub::providers::ytdlp::YtDlp;
use ytdub::providers::{ThreadSleeper, VideoInfo};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for ytdub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct DubArgs {
    /// Video URL (asked interactively when omitted)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Directory for finished files (default: Downloads)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Mix the dub over the attenuated original track
    #[arg(short, long, conflicts_with = "dual")]
    mix: bool,

    /// Keep the original and the dub as two separate audio tracks
    #[arg(short, long)]
    dual: bool,

    /// Video height, e.g. 1080 (a menu is shown when omitted or unavailable)
    #[arg(short, long, value_name = "HEIGHT")]
    quality: Option<u32>,

    /// Save only the translated audio as mp3
    #[arg(short, long)]
    audio: bool,

    /// Replace an existing output file instead of adding a counter
    #[arg(short, long)]
    force: bool,

    /// Answer every question with yes and retry network errors automatically
    #[arg(short, long)]
    yes: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "CONFIG", default_value = "ytdub.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// ytdub - dub YouTube videos with machine-translated voice-over
#[derive(Parser, Debug)]
#[command(name = "ytdub")]
#[command(version)]
#[command(about = "Dub YouTube videos with a machine-translated voice track")]
#[command(long_about = "ytdub requests a translated voice track for a video, downloads the video, and merges both with ffmpeg.

EXAMPLES:
    ytdub https://youtu.be/dQw4w9WgXcQ                # Ask for mode, mix into Downloads
    ytdub -d -q 1080 https://youtu.be/dQw4w9WgXcQ     # Two audio tracks at 1080p
    ytdub -a https://youtu.be/dQw4w9WgXcQ             # Translated audio only
    ytdub -y -o ~/Videos https://youtu.be/...         # Unattended run
    ytdub completions bash > ytdub.bash               # Generate bash completions

REQUIREMENTS:
    ffmpeg and yt-dlp must be on PATH, or set under \"tools\" in the config file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    dub: DubArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

/// Yes/no answers read from the terminal
#[derive(Debug)]
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        loop {
            match prompt(&format!("{} [y/n]: ", question)) {
                None => return false,
                Some(answer) => match answer.to_lowercase().as_str() {
                    "y" | "yes" | "д" | "да" => return true,
                    "n" | "no" | "н" | "нет" => return false,
                    _ => continue,
                },
            }
        }
    }
}

/// Quality menu over the probed heights, plus an audio-only entry
#[derive(Debug)]
struct StdinChooser;

impl QualityChooser for StdinChooser {
    fn choose(&self, video: &VideoInfo) -> QualityChoice {
        eprintln!("{}", video.title);
        eprintln!("Choose quality:");
        for (i, height) in video.heights.iter().enumerate() {
            eprintln!("  [{}] {}p", i + 1, height);
        }
        eprintln!("  [0] Audio only");

        loop {
            let Some(answer) = prompt("Choice [1]: ") else {
                return QualityChoice::Best;
            };
            if answer.is_empty() {
                return QualityChoice::Best;
            }
            match answer.parse::<usize>() {
                Ok(0) => return QualityChoice::AudioOnly,
                Ok(n) if n <= video.heights.len() => return QualityChoice::Height(video.heights[n - 1]),
                _ => eprintln!("Enter a number from 0 to {}", video.heights.len()),
            }
        }
    }
}

/// Print `question` and read one trimmed line; `None` on end of input
fn prompt(question: &str) -> Option<String> {
    eprint!("{}", question);
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn ask_merge_mode() -> MergeMode {
    loop {
        let Some(answer) = prompt("Merge mode: [1] Mix (dub over quiet original)  [2] Dual (two audio tracks): ") else {
            return MergeMode::default();
        };
        if answer.is_empty() {
            return MergeMode::default();
        }
        match answer.parse() {
            Ok(mode) => return mode,
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn main() {
    // The logger accepts everything; the global max level does the filtering
    // and is raised or lowered once the config is loaded
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    let code = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "ytdub", &mut io::stdout());
            0
        }
        None => match run_dub(cli.dub) {
            Ok(()) => 0,
            Err(e) => {
                error!("{}", e);
                e.exit_code()
            }
        },
    };
    std::process::exit(code);
}

fn run_dub(args: DubArgs) -> Result<(), AppError> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &args.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_default(Some(args.config.as_path()))?;
    if let Some(output_dir) = &args.output_dir {
        config.paths.output_dir = output_dir.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone().into();
    }
    config
        .validate()
        .map_err(|e| AppError::Unknown(format!("Configuration validation failed: {:#}", e)))?;

    // If log level was not set via command line, update it from config now
    log::set_max_level(config.log_level.to_level_filter());

    let ffmpeg = config
        .tools
        .resolve_ffmpeg()
        .map_err(|e| AppError::MissingTool(format!("{:#}", e)))?;
    let ytdlp = config
        .tools
        .resolve_ytdlp()
        .map_err(|e| AppError::MissingTool(format!("{:#}", e)))?;
    debug!("Using ffmpeg at {:?}, yt-dlp at {:?}", ffmpeg, ytdlp);

    let url = match args.url.clone().or_else(|| prompt("Video URL: ")) {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => return Err(AppError::Unknown("No video URL given".to_string())),
    };

    let mode = if args.dual {
        MergeMode::Dual
    } else if args.mix || args.yes || args.audio {
        MergeMode::Mix
    } else {
        ask_merge_mode()
    };

    let transport = ReqwestTransport::new(
        Duration::from_secs(config.translation.request_timeout_secs),
        Duration::from_secs(config.media.audio_download_timeout_secs),
    );
    let extractor = YtDlp::new(ytdlp, Some(ffmpeg.clone()), config.media.extractor_retries);
    let sleeper = ThreadSleeper;

    let stdin_confirm = StdinConfirm;
    let auto_confirm = AutoConfirm(true);
    let confirm: &dyn Confirm = if args.yes { &auto_confirm } else { &stdin_confirm };

    let unattended = LimitedRetry {
        max_attempts: config.media.unattended_retry_attempts,
        delay: Duration::from_secs(config.media.unattended_retry_delay_secs),
    };
    let interactive = InteractiveRetry::new(confirm);
    let retry_policy: &dyn RetryPolicy = if args.yes { &unattended } else { &interactive };

    let stdin_chooser = StdinChooser;
    let best_quality = FixedChoice(QualityChoice::Best);
    let chooser: &dyn QualityChooser = if args.yes { &best_quality } else { &stdin_chooser };

    let deps = Collaborators {
        transport: &transport,
        extractor: &extractor,
        sleeper: &sleeper,
        retry_policy,
        confirm,
        chooser,
    };
    let options = RunOptions {
        url,
        mode,
        quality: args.quality,
        audio_only: args.audio,
        force: args.force,
    };

    let controller = Controller::with_config(config, ffmpeg);
    match controller.run(&options, &deps)? {
        RunOutcome::Skipped => info!("Nothing to do"),
        outcome => {
            if let Some(path) = outcome.output_path() {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
