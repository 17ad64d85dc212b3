//! # uploadcheck-parser
//!
//! Turns movie file paths into structured release attributes and ranks
//! releases against each other.
//!
//! ## Quick Start
//!
//! ```
//! use uploadcheck_parser::{Parser, Quality, Resolution};
//! use std::path::Path;
//!
//! let parser = Parser::default();
//! let attrs = parser.parse(Path::new("/movies/Movie.Title.2014.1080p.BluRay.x264-GROUP.mkv"), 4_000_000_000);
//!
//! assert_eq!(attrs.title, "Movie Title");
//! assert_eq!(attrs.year, Some(2014));
//! assert_eq!(attrs.resolution, Resolution::_1080p);
//! assert_eq!(attrs.quality, Quality::Encode);
//! assert!(!attrs.banned);
//! ```

pub mod ban;
pub mod config;
pub mod quality;
pub mod tokenizer;
pub mod types;

mod parser;

pub use ban::BanRules;
pub use config::ParserConfig;
pub use quality::{Comparison, ParseError, Quality, QualityLadder, ReleaseTier, Resolution};
pub use types::{BanReason, ParsedName, ReleaseAttributes, BYTES_PER_MB};

use std::path::Path;

/// Parse a bare release name with default title cleanup.
pub fn parse_name(name: &str) -> ParsedName {
    parser::parse(name, &ParserConfig::default().title_noise)
}

/// A configured filename parser.
///
/// Parsing never fails: fields that cannot be read from the name are left
/// unknown, and the ban policy decides whether the file continues.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a release name (no directory, no extension).
    pub fn parse_name(&self, name: &str) -> ParsedName {
        parser::parse(name, &self.config.title_noise)
    }

    /// Parse a file path. `file_size` comes from the filesystem, never from
    /// the name.
    pub fn parse(&self, path: &Path, file_size: u64) -> ReleaseAttributes {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let name = self.parse_name(&stem);
        let ban = self
            .config
            .rules
            .check(&file_name, &extension, file_size, &name);
        ReleaseAttributes::from_parsed(name, file_size, ban)
    }
}
