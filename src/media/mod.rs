/*!
 * Acquisition of local media files.
 *
 * - `format`: resolution-tier format selection
 * - `retry`: retry policies and the retrier used by every network-touching step
 * - `temp`: temporary artifact naming and cleanup
 * - `acquisition`: video and audio download tasks
 */

pub use self::acquisition::{AcquisitionOutcome, DownloadTask, MediaAcquisition};
pub use self::format::{Container, FormatPolicy, FormatSelection};
pub use self::retry::{
    AutoConfirm, Confirm, FixedChoice, InteractiveRetry, LimitedRetry, NoRetry, QualityChoice, QualityChooser, Retrier, RetryDecision,
    RetryPolicy,
};
pub use self::temp::TempArtifacts;

pub mod acquisition;
pub mod format;
pub mod retry;
pub mod temp;
