//! Required-language check over inspected audio and subtitle tracks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uploadcheck_av::MediaInfo;

/// Language codes found in a file, lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub audio: BTreeSet<String>,
    pub subtitles: BTreeSet<String>,
}

impl LanguageInfo {
    pub fn new<A, S>(audio: A, subtitles: S) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let norm = |s: &str| s.trim().to_lowercase();
        Self {
            audio: audio.into_iter().map(|a| norm(a.as_ref())).collect(),
            subtitles: subtitles.into_iter().map(|s| norm(s.as_ref())).collect(),
        }
    }

    pub fn from_media(info: &MediaInfo) -> Self {
        Self {
            audio: info.audio_languages(),
            subtitles: info.subtitle_languages(),
        }
    }

    pub fn has_audio(&self, code: &str) -> bool {
        self.audio.iter().any(|l| matches_code(l, code))
    }

    pub fn has_subtitles(&self, code: &str) -> bool {
        self.subtitles.iter().any(|l| matches_code(l, code))
    }
}

/// `"en"` matches `"en"`, `"en-US"` and `"eng"`.
fn matches_code(language: &str, code: &str) -> bool {
    let code = code.trim().to_lowercase();
    !code.is_empty() && language.to_lowercase().starts_with(&code)
}

/// True iff `required` appears in the audio or subtitle languages.
pub fn verify(info: &LanguageInfo, required: &str) -> bool {
    info.has_audio(required) || info.has_subtitles(required)
}

/// `None` when the file was never inspected: inconclusive, not a failure.
pub fn check(info: Option<&LanguageInfo>, required: &str) -> Option<bool> {
    info.map(|i| verify(i, required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_or_subtitles_satisfy() {
        let audio_only = LanguageInfo::new(["en-US"], Vec::<String>::new());
        assert!(verify(&audio_only, "en"));

        let subs_only = LanguageInfo::new(["de"], ["eng"]);
        assert!(verify(&subs_only, "en"));

        let neither = LanguageInfo::new(["de"], ["fr"]);
        assert!(!verify(&neither, "en"));
    }

    #[test]
    fn required_code_is_configurable() {
        let info = LanguageInfo::new(["fr"], ["en"]);
        assert!(verify(&info, "FR"));
        assert!(!verify(&info, "de"));
    }

    #[test]
    fn untagged_tracks_fail() {
        let info = LanguageInfo::default();
        assert!(!verify(&info, "en"));
        assert_eq!(check(Some(&info), "en"), Some(false));
    }

    #[test]
    fn missing_info_is_inconclusive() {
        assert_eq!(check(None, "en"), None);
    }
}
