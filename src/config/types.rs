use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uploadcheck_parser::{BanRules, ParserConfig, Quality, QualityLadder, BYTES_PER_MB};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub parser: ParserSection,

    #[serde(default)]
    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub year_check: YearCheckConfig,

    #[serde(default)]
    pub quality: QualityConfig,

    #[serde(default)]
    pub trackers: Vec<TrackerConfig>,
}

impl Config {
    /// Parser configuration assembled from the `[scan]` and `[parser]` sections.
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            rules: BanRules {
                extensions: self.scan.extensions.clone(),
                min_file_size: self.scan.min_file_size_mb * BYTES_PER_MB,
                banned_keywords: self.parser.banned_keywords.clone(),
                banned_groups: self.parser.banned_groups.clone(),
                ignored_qualities: self.parser.ignored_qualities.clone(),
                ban_episodes: self.parser.ban_tv,
            },
            title_noise: self.parser.title_noise.clone(),
        }
    }

    /// Path of the record store.
    pub fn records_path(&self) -> PathBuf {
        self.general.data_dir.join("records.json")
    }

    pub fn enabled_trackers(&self) -> impl Iterator<Item = &TrackerConfig> {
        self.trackers.iter().filter(|t| t.enabled)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Directory holding `records.json` and exports.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Files processed concurrently within a stage.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Run mediainfo and require the configured language.
    #[serde(default = "default_true")]
    pub check_language: bool,

    /// Language code that must appear in audio or subtitles.
    #[serde(default = "default_required_language")]
    pub required_language: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_workers() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_required_language() -> String {
    "en".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            workers: default_workers(),
            check_language: true,
            required_language: default_required_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_min_file_size_mb")]
    pub min_file_size_mb: u64,

    /// Directories whose name matches are not descended into.
    #[serde(default = "default_skip_dirs_pattern")]
    pub skip_dirs_pattern: Option<String>,

    #[serde(default = "default_true")]
    pub follow_links: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["mkv".to_string()]
}
fn default_min_file_size_mb() -> u64 {
    800
}
fn default_skip_dirs_pattern() -> Option<String> {
    Some(r"(?i)(season[ ._-]?\d+|\bS\d{1,2}\b)".to_string())
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            min_file_size_mb: default_min_file_size_mb(),
            skip_dirs_pattern: default_skip_dirs_pattern(),
            follow_links: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserSection {
    #[serde(default)]
    pub banned_groups: Vec<String>,

    #[serde(default)]
    pub banned_keywords: Vec<String>,

    #[serde(default = "default_ignored_qualities")]
    pub ignored_qualities: Vec<Quality>,

    #[serde(default = "default_title_noise")]
    pub title_noise: Vec<String>,

    #[serde(default = "default_true")]
    pub ban_tv: bool,
}

fn default_ignored_qualities() -> Vec<Quality> {
    vec![Quality::Cam, Quality::Telesync, Quality::DvdRip, Quality::Hdtv]
}
fn default_title_noise() -> Vec<String> {
    ParserConfig::default().title_noise
}

impl Default for ParserSection {
    fn default() -> Self {
        Self {
            banned_groups: Vec::new(),
            banned_keywords: Vec::new(),
            ignored_qualities: default_ignored_qualities(),
            title_noise: default_title_noise(),
            ban_tv: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    /// Overridden by `TMDB_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_tmdb_language")]
    pub language: String,

    /// Candidates with this many votes or fewer are ignored.
    #[serde(default = "default_min_votes")]
    pub min_votes: u32,

    /// Minimum title similarity (0.0 - 1.0) for a candidate to match.
    #[serde(default = "default_min_title_score")]
    pub min_title_score: f64,

    #[serde(default = "default_tmdb_rps")]
    pub requests_per_second: u32,

    /// Override for tests and proxies.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}
fn default_min_votes() -> u32 {
    5
}
fn default_min_title_score() -> f64 {
    0.75
}
fn default_tmdb_rps() -> u32 {
    4
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: default_tmdb_language(),
            min_votes: default_min_votes(),
            min_title_score: default_min_title_score(),
            requests_per_second: default_tmdb_rps(),
            base_url: None,
        }
    }
}

/// Secondary check that can clear a year mismatch between filename and catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YearCheckConfig {
    /// With `false`, every year mismatch is danger.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_year_delta")]
    pub max_year_delta: u16,

    #[serde(default = "default_runtime_tolerance")]
    pub runtime_tolerance_minutes: u32,

    /// Checks (out of three) that must pass to clear the mismatch.
    #[serde(default = "default_required_score")]
    pub required_score: u8,
}

fn default_max_year_delta() -> u16 {
    1
}
fn default_runtime_tolerance() -> u32 {
    5
}
fn default_required_score() -> u8 {
    2
}

impl Default for YearCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_year_delta: default_max_year_delta(),
            runtime_tolerance_minutes: default_runtime_tolerance(),
            required_score: default_required_score(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QualityConfig {
    /// Quality tiers, lowest first.
    #[serde(default)]
    pub ladder: QualityLadder,

    /// Groups whose WEBRips rank just above encodes. Matched
    /// case-insensitively as a substring of the release group.
    #[serde(default)]
    pub hq_webrip_groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
    pub name: String,

    /// Base URL, e.g. `https://tracker.example/`.
    pub url: String,

    /// Overridden by `UPLOADCHECK_<NAME>_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub driver: TrackerDriver,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Per-tracker quality ordering; falls back to `[quality] ladder`.
    #[serde(default)]
    pub ladder: Option<QualityLadder>,

    #[serde(default = "default_categories")]
    pub categories: Vec<u32>,

    /// Release groups this tracker does not accept. Files from them are not
    /// searched there and never listed for upload to it.
    #[serde(default)]
    pub banned_groups: Vec<String>,
}

fn default_requests_per_minute() -> u32 {
    30
}
fn default_categories() -> Vec<u32> {
    vec![1]
}

impl TrackerConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key: None,
            enabled: true,
            driver: TrackerDriver::default(),
            requests_per_minute: default_requests_per_minute(),
            ladder: None,
            categories: default_categories(),
            banned_groups: Vec::new(),
        }
    }

    /// API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Environment variable that overrides this tracker's key.
    pub fn api_key_env(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("UPLOADCHECK_{}_API_KEY", name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerDriver {
    #[default]
    Unit3d,
}
