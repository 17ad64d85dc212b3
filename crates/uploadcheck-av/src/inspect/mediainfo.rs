//! MediaInfo-based media probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Name of the mediainfo executable.
pub const MEDIAINFO: &str = "mediainfo";

#[derive(Debug, Deserialize)]
struct MediaInfoOutput {
    media: Option<MediaInfoMedia>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<MediaInfoTrack>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoTrack {
    #[serde(rename = "@type")]
    track_type: String,
    #[serde(rename = "Format")]
    format: Option<String>,
    #[serde(rename = "Duration")]
    duration: Option<String>,
    #[serde(rename = "Width")]
    width: Option<String>,
    #[serde(rename = "Height")]
    height: Option<String>,
    #[serde(rename = "BitDepth")]
    bit_depth: Option<String>,
    #[serde(rename = "HDR_Format")]
    hdr_format: Option<String>,
    #[serde(rename = "Channels")]
    channels: Option<String>,
    #[serde(rename = "Language")]
    language: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Default")]
    default: Option<String>,
    #[serde(rename = "Forced")]
    forced: Option<String>,
}

/// Inspect a media file using mediainfo.
pub fn inspect_with_mediainfo(path: &Path) -> Result<MediaInfo> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(path = %path.display(), "running mediainfo");

    let output = Command::new(MEDIAINFO)
        .args(["--Output=JSON"])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(MEDIAINFO)
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(MEDIAINFO, stderr.trim().to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse(MEDIAINFO, format!("Invalid UTF-8: {}", e)))?;

    parse_mediainfo_json(path, &json_str)
}

/// Build [`MediaInfo`] from `mediainfo --Output=JSON` output.
pub fn parse_mediainfo_json(path: &Path, json: &str) -> Result<MediaInfo> {
    let output: MediaInfoOutput = serde_json::from_str(json)?;
    let media = output
        .media
        .ok_or_else(|| Error::parse(MEDIAINFO, "no media section in output"))?;

    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        ..Default::default()
    };

    for track in media.track {
        match track.track_type.as_str() {
            "General" => {
                info.container = track.format.unwrap_or_default();
                info.duration = track
                    .duration
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(Duration::from_secs_f64);
            }
            "Video" => {
                info.video_tracks.push(VideoTrack {
                    hdr_format: parse_hdr_format(track.hdr_format.as_deref()),
                    codec: track.format.unwrap_or_default(),
                    width: track.width.and_then(|s| parse_numeric(&s)).unwrap_or(0),
                    height: track.height.and_then(|s| parse_numeric(&s)).unwrap_or(0),
                    bit_depth: track.bit_depth.and_then(|s| parse_numeric(&s)),
                });
            }
            "Audio" => {
                info.audio_tracks.push(AudioTrack {
                    codec: track.format.unwrap_or_default(),
                    channels: track.channels.and_then(|s| parse_numeric(&s)).unwrap_or(2),
                    language: track.language,
                    title: track.title,
                    default: track.default.as_deref() == Some("Yes"),
                });
            }
            "Text" => {
                info.subtitle_tracks.push(SubtitleTrack {
                    codec: track.format.unwrap_or_default(),
                    language: track.language,
                    title: track.title,
                    forced: track.forced.as_deref() == Some("Yes"),
                });
            }
            _ => {}
        }
    }

    Ok(info)
}

fn parse_numeric<T: std::str::FromStr>(s: &str) -> Option<T> {
    // "6 channels", "1 920 pixels"
    let digits: String = s
        .split(|c: char| !(c.is_ascii_digit() || c == ' '))
        .next()?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    digits.parse().ok()
}

fn parse_hdr_format(hdr_str: Option<&str>) -> Option<HdrFormat> {
    let s = hdr_str?.to_lowercase();
    if s.contains("dolby vision") {
        Some(HdrFormat::DolbyVision)
    } else if s.contains("hdr10+") || s.contains("hdr10 plus") {
        Some(HdrFormat::Hdr10Plus)
    } else if s.contains("hdr10") || s.contains("smpte st 2086") {
        Some(HdrFormat::Hdr10)
    } else if s.contains("hlg") {
        Some(HdrFormat::Hlg)
    } else {
        None
    }
}
