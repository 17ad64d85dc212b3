//! Media information types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Stream-level information about a media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// Container format (e.g., "Matroska").
    pub container: String,
    /// Duration of the media.
    pub duration: Option<Duration>,
    pub video_tracks: Vec<VideoTrack>,
    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// Information about a video track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Video codec (e.g., "HEVC", "AVC").
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub bit_depth: Option<u8>,
    pub hdr_format: Option<HdrFormat>,
}

/// HDR format types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HdrFormat {
    Hdr10,
    Hdr10Plus,
    DolbyVision,
    Hlg,
}

impl std::fmt::Display for HdrFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HdrFormat::Hdr10 => "HDR10",
            HdrFormat::Hdr10Plus => "HDR10+",
            HdrFormat::DolbyVision => "DV",
            HdrFormat::Hlg => "HLG",
        };
        f.write_str(s)
    }
}

/// Information about an audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Audio codec (e.g., "E-AC-3", "DTS").
    pub codec: String,
    pub channels: u32,
    /// Language code as reported by the container (e.g., "en", "en-US").
    pub language: Option<String>,
    pub title: Option<String>,
    pub default: bool,
}

/// Information about a subtitle track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Subtitle format (e.g., "UTF-8", "PGS").
    pub codec: String,
    pub language: Option<String>,
    pub title: Option<String>,
    pub forced: bool,
}

fn language_set<'a>(languages: impl Iterator<Item = Option<&'a String>>) -> BTreeSet<String> {
    languages
        .flatten()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect()
}

impl MediaInfo {
    /// Lowercased audio language codes, without duplicates.
    pub fn audio_languages(&self) -> BTreeSet<String> {
        language_set(self.audio_tracks.iter().map(|t| t.language.as_ref()))
    }

    /// Lowercased subtitle language codes, without duplicates.
    pub fn subtitle_languages(&self) -> BTreeSet<String> {
        language_set(self.subtitle_tracks.iter().map(|t| t.language.as_ref()))
    }

    /// Runtime rounded to whole minutes.
    pub fn runtime_minutes(&self) -> Option<u32> {
        self.duration
            .map(|d| (d.as_secs_f64() / 60.0).round() as u32)
            .filter(|m| *m > 0)
    }

    /// Short description of the first video track, e.g. `"HEVC 3840x2160 HDR10"`.
    pub fn video_summary(&self) -> Option<String> {
        let track = self.video_tracks.first()?;
        let mut summary = format!("{} {}x{}", track.codec, track.width, track.height);
        if let Some(hdr) = track.hdr_format {
            summary.push(' ');
            summary.push_str(&hdr.to_string());
        }
        Some(summary)
    }

    /// Short description of the default (or first) audio track, e.g. `"E-AC-3 6ch en"`.
    pub fn audio_summary(&self) -> Option<String> {
        let track = self
            .audio_tracks
            .iter()
            .find(|t| t.default)
            .or_else(|| self.audio_tracks.first())?;
        let mut summary = format!("{} {}ch", track.codec, track.channels);
        if let Some(lang) = &track.language {
            summary.push(' ');
            summary.push_str(lang);
        }
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(lang: Option<&str>, default: bool) -> AudioTrack {
        AudioTrack {
            codec: "AC-3".to_string(),
            channels: 6,
            language: lang.map(str::to_string),
            title: None,
            default,
        }
    }

    #[test]
    fn test_languages_are_normalized() {
        let info = MediaInfo {
            audio_tracks: vec![audio(Some("EN"), false), audio(Some("en"), true), audio(None, false)],
            subtitle_tracks: vec![SubtitleTrack {
                codec: "PGS".to_string(),
                language: Some(" fr ".to_string()),
                title: None,
                forced: false,
            }],
            ..Default::default()
        };
        assert_eq!(info.audio_languages().into_iter().collect::<Vec<_>>(), vec!["en"]);
        assert!(info.subtitle_languages().contains("fr"));
    }

    #[test]
    fn test_runtime_minutes() {
        let mut info = MediaInfo::default();
        assert_eq!(info.runtime_minutes(), None);
        info.duration = Some(Duration::from_secs_f64(7_054.5));
        assert_eq!(info.runtime_minutes(), Some(118));
    }

    #[test]
    fn test_summaries() {
        let info = MediaInfo {
            video_tracks: vec![VideoTrack {
                codec: "HEVC".to_string(),
                width: 3840,
                height: 2160,
                bit_depth: Some(10),
                hdr_format: Some(HdrFormat::DolbyVision),
            }],
            audio_tracks: vec![audio(Some("de"), false), audio(Some("en"), true)],
            ..Default::default()
        };
        assert_eq!(info.video_summary().as_deref(), Some("HEVC 3840x2160 DV"));
        assert_eq!(info.audio_summary().as_deref(), Some("AC-3 6ch en"));
        assert_eq!(MediaInfo::default().video_summary(), None);
    }
}
