/*!
 * Format-selector expressions for the extractor, chosen by resolution tier.
 */

use std::fmt;

/// Heights above this go to the high-resolution (matroska) path
pub const HIGH_RES_THRESHOLD: u32 = 1080;

/// Output container of a video download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Mp4,
    Matroska,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Matroska => "mkv",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "mkv" => Some(Self::Matroska),
            _ => None,
        }
    }

    pub fn is_matroska(&self) -> bool {
        matches!(self, Self::Matroska)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// What a download task should fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPolicy {
    /// Video at the given height, or the best available when unset
    Video { height: Option<u32> },
    /// Best audio stream only
    AudioOnly,
}

/// A concrete format-selector expression and the container it lands in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    pub expression: String,
    pub container: Container,
}

impl FormatPolicy {
    /// Build the selector for this policy using the default tier threshold
    pub fn selection(&self) -> FormatSelection {
        self.selection_with_threshold(HIGH_RES_THRESHOLD)
    }

    /// Build the selector, treating heights above `threshold` as high resolution
    ///
    /// High resolution prefers separate best streams merged into matroska.
    /// Otherwise H.264-in-MP4 is preferred, falling back through any MP4,
    /// a single combined MP4, any separate streams, then any single file.
    pub fn selection_with_threshold(&self, threshold: u32) -> FormatSelection {
        match *self {
            Self::AudioOnly => FormatSelection {
                expression: "bestaudio/best".to_string(),
                container: Container::Mp4,
            },
            Self::Video { height: Some(h) } if h > threshold => FormatSelection {
                expression: format!("bestvideo[height={h}]+bestaudio[ext=m4a]/best[height={h}]/best"),
                container: Container::Matroska,
            },
            Self::Video { height: Some(h) } => FormatSelection {
                expression: [
                    format!("bestvideo[height={h}][ext=mp4][vcodec^=avc]+bestaudio[ext=m4a]"),
                    format!("bestvideo[height={h}][ext=mp4]+bestaudio[ext=m4a]"),
                    format!("best[height={h}][ext=mp4]"),
                    format!("bestvideo[height={h}]+bestaudio"),
                    format!("best[height={h}]"),
                ]
                .join("/"),
                container: Container::Mp4,
            },
            Self::Video { height: None } => FormatSelection {
                expression: "bestvideo[ext=mp4][vcodec^=avc]+bestaudio[ext=m4a]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
                    .to_string(),
                container: Container::Mp4,
            },
        }
    }

    /// Label used in progress bars, e.g. `1080p` or `Best`
    pub fn label(&self) -> String {
        match self {
            Self::Video { height: Some(h) } => format!("{}p", h),
            Self::Video { height: None } => "Best".to_string(),
            Self::AudioOnly => "Audio".to_string(),
        }
    }
}
