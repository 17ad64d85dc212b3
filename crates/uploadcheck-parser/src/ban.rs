//! Ban policy applied to every scanned file.
//!
//! Checks run in a fixed order and stop at the first hit: extension, file
//! size, keyword (denylisted words, TV episodes, ignored qualities), then
//! release group.

use crate::quality::Quality;
use crate::types::{BanReason, ParsedName};

/// Denylists and thresholds for excluding files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRules {
    /// Accepted extensions, without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Minimum file size in bytes.
    pub min_file_size: u64,
    /// Case-insensitive substrings of the file name.
    pub banned_keywords: Vec<String>,
    /// Case-insensitive group names.
    pub banned_groups: Vec<String>,
    pub ignored_qualities: Vec<Quality>,
    pub ban_episodes: bool,
}

impl Default for BanRules {
    fn default() -> Self {
        Self {
            extensions: vec!["mkv".to_string()],
            min_file_size: 0,
            banned_keywords: Vec::new(),
            banned_groups: Vec::new(),
            ignored_qualities: Vec::new(),
            ban_episodes: true,
        }
    }
}

impl BanRules {
    /// First ban reason that applies to a file, if any.
    pub fn check(
        &self,
        file_name: &str,
        extension: &str,
        file_size: u64,
        name: &ParsedName,
    ) -> Option<BanReason> {
        if !self
            .extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
        {
            return Some(BanReason::Extension {
                extension: extension.to_ascii_lowercase(),
            });
        }

        if file_size < self.min_file_size {
            return Some(BanReason::TooSmall {
                size: file_size,
                minimum: self.min_file_size,
            });
        }

        if let Some(reason) = self.check_keywords(file_name, name) {
            return Some(reason);
        }

        let group = name.group.as_deref()?;
        self.banned_groups
            .iter()
            .find(|g| g.eq_ignore_ascii_case(group))
            .map(|_| BanReason::Group {
                group: group.to_string(),
            })
    }

    fn check_keywords(&self, file_name: &str, name: &ParsedName) -> Option<BanReason> {
        let lower = file_name.to_lowercase();
        if let Some(keyword) = self
            .banned_keywords
            .iter()
            .find(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
        {
            return Some(BanReason::Keyword {
                keyword: keyword.clone(),
            });
        }

        if self.ban_episodes && name.is_episode {
            return Some(BanReason::Episode);
        }

        if self.ignored_qualities.contains(&name.quality) {
            return Some(BanReason::IgnoredQuality {
                quality: name.quality,
            });
        }

        None
    }
}
