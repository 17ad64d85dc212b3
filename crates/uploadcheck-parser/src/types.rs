//! Output types for the filename parser.

use crate::quality::{Quality, ReleaseTier, Resolution};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sizes in configuration and messages are binary megabytes.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Metadata read from a release name alone.
///
/// # Examples
///
/// ```
/// use uploadcheck_parser::{parse_name, Quality, Resolution};
///
/// let n = parse_name("Movie.Title.2014.1080p.BluRay.x264-GROUP");
/// assert_eq!(n.title, "Movie Title");
/// assert_eq!(n.year, Some(2014));
/// assert_eq!(n.resolution, Resolution::_1080p);
/// assert_eq!(n.quality, Quality::Encode);
/// assert_eq!(n.group.as_deref(), Some("GROUP"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    /// Title words joined with spaces.
    pub title: String,

    /// Release year (1900--2100), `None` when absent or ambiguous.
    pub year: Option<u16>,

    pub resolution: Resolution,

    pub quality: Quality,

    /// Release group (text after the final hyphen).
    pub group: Option<String>,

    /// Video codec, e.g. `"x264"`, `"H.265"`.
    pub video_codec: Option<String>,

    /// Whether an SxxEyy marker was present.
    pub is_episode: bool,
}

impl ParsedName {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
            resolution: Resolution::Unknown,
            quality: Quality::Unknown,
            group: None,
            video_codec: None,
            is_episode: false,
        }
    }
}

/// Why a file was excluded from the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BanReason {
    Extension { extension: String },
    TooSmall { size: u64, minimum: u64 },
    Keyword { keyword: String },
    Episode,
    IgnoredQuality { quality: Quality },
    Group { group: String },
}

impl fmt::Display for BanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BanReason::Extension { extension } if extension.is_empty() => {
                write!(f, "file has no extension")
            }
            BanReason::Extension { extension } => {
                write!(f, "unsupported extension '.{}'", extension)
            }
            BanReason::TooSmall { size, minimum } => write!(
                f,
                "file size {} MB is below the {} MB minimum",
                size / BYTES_PER_MB,
                minimum / BYTES_PER_MB
            ),
            BanReason::Keyword { keyword } => write!(f, "banned keyword '{}'", keyword),
            BanReason::Episode => write!(f, "TV episode"),
            BanReason::IgnoredQuality { quality } => write!(f, "ignored quality {}", quality),
            BanReason::Group { group } => write!(f, "banned group '{}'", group),
        }
    }
}

/// Everything the pipeline knows about a local file after the scan stage.
///
/// Immutable once produced; a rescan of a changed file produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAttributes {
    pub title: String,
    pub year: Option<u16>,
    pub resolution: Resolution,
    pub quality: Quality,
    pub group: Option<String>,
    #[serde(default)]
    pub video_codec: Option<String>,
    pub file_size: u64,
    pub banned: bool,
    #[serde(default)]
    pub ban_reason: Option<BanReason>,
}

impl ReleaseAttributes {
    pub fn from_parsed(name: ParsedName, file_size: u64, ban_reason: Option<BanReason>) -> Self {
        Self {
            title: name.title,
            year: name.year,
            resolution: name.resolution,
            quality: name.quality,
            group: name.group,
            video_codec: name.video_codec,
            file_size,
            banned: ban_reason.is_some(),
            ban_reason,
        }
    }

    pub fn tier(&self) -> ReleaseTier {
        ReleaseTier::new(self.resolution, self.quality)
    }

    /// Year as text, `"unknown"` when absent.
    pub fn year_label(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Group name, `"unknown"` when absent.
    pub fn group_label(&self) -> &str {
        self.group.as_deref().unwrap_or("unknown")
    }
}
