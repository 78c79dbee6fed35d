/*!
 * # ytdub - dub YouTube videos with machine-translated voice-over
 *
 * A Rust library and CLI that requests a translated voice track for a
 * video, downloads the video, and merges both into one file with ffmpeg.
 *
 * ## Features
 *
 * - Signed requests to the video translation service over a small
 *   hand-rolled binary wire format, with a bounded polling loop
 * - Resolution-tier format selection for yt-dlp downloads
 * - Retry policies for every network-touching step, interactive or unattended
 * - Salvage of downloads that failed after the file was already complete
 * - Mix mode (dub over the attenuated original) and Dual mode (two tracks)
 * - Audio-only output and original-only fallback
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `translation`: the translation service client:
 *   - `translation::wire`: binary encode/decode primitives
 *   - `translation::request`: request layout and signing
 *   - `translation::client`: round trips and polling
 * - `media`: download tasks, format policy, retry policies, temp files
 * - `assembly`: ffmpeg command building and supervised execution
 * - `providers`: HTTP, yt-dlp and in-memory implementations of the I/O seams
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `file_utils`: Output naming and file system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod assembly;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Collaborators, Controller, RunOptions, RunOutcome};
pub use assembly::{MergeMode, MergeSpec};
pub use errors::{AppError, AssemblyError, MediaError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, matches_language, normalize_to_part2t};
pub use translation::TranslationClient;
