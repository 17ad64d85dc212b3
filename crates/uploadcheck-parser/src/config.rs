//! Parser configuration.

use crate::ban::BanRules;
use crate::quality::Quality;

/// Configuration for the parser.
///
/// Use the builder to override individual settings:
///
/// ```
/// use uploadcheck_parser::config::ParserConfig;
///
/// let config = ParserConfig::builder()
///     .min_file_size(800 * 1024 * 1024)
///     .banned_groups(["YIFY"])
///     .build();
/// assert_eq!(config.rules.banned_groups, vec!["YIFY".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Ban policy applied after parsing.
    pub rules: BanRules,

    /// Words dropped from titles wherever they appear.
    /// Default: `UHD`, `HYBRID`
    pub title_noise: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            rules: BanRules::default(),
            title_noise: vec!["UHD".to_string(), "HYBRID".to_string()],
        }
    }
}

impl ParserConfig {
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::default()
    }
}

/// Builder for [`ParserConfig`].
#[derive(Debug, Clone, Default)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

fn owned<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl ParserConfigBuilder {
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.rules.extensions = owned(extensions);
        self
    }

    /// Minimum size in bytes.
    pub fn min_file_size(mut self, bytes: u64) -> Self {
        self.config.rules.min_file_size = bytes;
        self
    }

    pub fn banned_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.rules.banned_keywords = owned(keywords);
        self
    }

    pub fn banned_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.rules.banned_groups = owned(groups);
        self
    }

    pub fn ignored_qualities(mut self, qualities: impl IntoIterator<Item = Quality>) -> Self {
        self.config.rules.ignored_qualities = qualities.into_iter().collect();
        self
    }

    pub fn ban_episodes(mut self, ban: bool) -> Self {
        self.config.rules.ban_episodes = ban;
        self
    }

    pub fn title_noise<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.title_noise = owned(words);
        self
    }

    pub fn build(self) -> ParserConfig {
        self.config
    }
}
