//! # uploadcheck-av
//!
//! Thin wrapper around the `mediainfo` CLI. Produces the track-level facts the
//! upload checker needs: audio and subtitle languages, runtime, and a short
//! video/audio summary.
//!
//! ## Features
//!
//! - `tracing` - Emit debug events when running external tools
//!
//! ## Example
//!
//! ```no_run
//! use uploadcheck_av::inspect;
//!
//! let info = inspect("/path/to/video.mkv")?;
//! println!("Audio languages: {:?}", info.audio_languages());
//! # Ok::<(), uploadcheck_av::Error>(())
//! ```

mod error;
pub mod inspect;
pub mod tools;

pub use error::{Error, Result};
pub use inspect::{parse_mediainfo_json, AudioTrack, HdrFormat, MediaInfo, SubtitleTrack, VideoTrack};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};

/// Inspect a media file and return its stream information.
pub fn inspect<P: AsRef<std::path::Path>>(path: P) -> Result<MediaInfo> {
    inspect::inspect_with_mediainfo(path.as_ref())
}
