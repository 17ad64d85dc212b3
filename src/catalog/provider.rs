//! Trait definition and types for catalog lookups.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single candidate returned from a movie search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Catalog identifier (TMDB numeric ID).
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Original-language title, if different from `title`.
    pub original_title: Option<String>,
    /// Year of the primary release.
    pub year: Option<u16>,
    /// Number of community votes; very low counts are usually junk entries.
    pub vote_count: u32,
}

/// Details fetched for one catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: u64,
    /// Runtime in minutes, if known.
    pub runtime_minutes: Option<u32>,
    /// ISO-639-1 code of the original language.
    pub original_language: Option<String>,
    pub imdb_id: Option<String>,
}

/// Async trait implemented by every catalog backend.
///
/// Errors are [`crate::Error::LookupFailed`]; retries are the provider's own
/// business and have already been exhausted when an error comes back.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has credentials.
    fn is_available(&self) -> bool;

    /// Search for movies matching `title`, optionally constrained by `year`.
    ///
    /// Results keep the provider's ranking order.
    async fn search_movie(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchResult>>;

    /// Fetch runtime and original language for a movie.
    async fn movie_details(&self, id: u64) -> Result<MovieDetails>;
}
