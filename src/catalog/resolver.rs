//! Identity resolution: parsed title and year to one catalog entry.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{MetadataProvider, SearchResult};
use crate::config::TmdbConfig;
use crate::{Error, Result};

/// The canonical movie a local file was matched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogIdentity {
    pub id: u64,
    pub title: String,
    pub year: Option<u16>,
    /// Only fetched when the years disagree.
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
    #[serde(default)]
    pub original_language: Option<String>,
    /// Title similarity of the accepted candidate, 0.0 - 1.0.
    #[serde(default)]
    pub match_score: f64,
}

/// How the catalog year relates to the year in the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum YearMatch {
    Match,
    Mismatch { parsed: u16, catalog: u16 },
    /// One side has no year; nothing to compare.
    Unknown,
}

impl YearMatch {
    pub fn between(parsed: Option<u16>, catalog: Option<u16>) -> Self {
        match (parsed, catalog) {
            (Some(p), Some(c)) if p == c => YearMatch::Match,
            (Some(parsed), Some(catalog)) => YearMatch::Mismatch { parsed, catalog },
            _ => YearMatch::Unknown,
        }
    }

    pub fn is_mismatch(self) -> bool {
        matches!(self, YearMatch::Mismatch { .. })
    }
}

/// Resolver output: the best match plus its year relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub identity: CatalogIdentity,
    pub year_match: YearMatch,
}

/// Candidate filtering thresholds.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    /// Candidates with this many votes or fewer are skipped.
    pub min_votes: u32,
    pub min_title_score: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::from(&TmdbConfig::default())
    }
}

impl From<&TmdbConfig> for MatchPolicy {
    fn from(config: &TmdbConfig) -> Self {
        Self {
            min_votes: config.min_votes,
            min_title_score: config.min_title_score,
        }
    }
}

type CacheKey = (String, Option<u16>);

/// Resolves parsed titles against a [`MetadataProvider`].
///
/// Successful matches and definite misses are cached per `(title, year)` for
/// the lifetime of the resolver, so several cuts of one movie cost one lookup.
/// Failures are not cached.
pub struct IdentityResolver {
    provider: Arc<dyn MetadataProvider>,
    policy: MatchPolicy,
    cache: DashMap<CacheKey, Option<ResolvedIdentity>>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>, policy: MatchPolicy) -> Self {
        Self {
            provider,
            policy,
            cache: DashMap::new(),
        }
    }

    pub fn provider(&self) -> &dyn MetadataProvider {
        self.provider.as_ref()
    }

    /// Number of cached `(title, year)` keys.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Resolve a title, returning [`Error::LookupNotFound`] when nothing
    /// acceptable comes back and [`Error::LookupFailed`] on provider errors.
    pub async fn resolve(&self, title: &str, year: Option<u16>) -> Result<ResolvedIdentity> {
        let key = (title.trim().to_lowercase(), year);
        if let Some(hit) = self.cache.get(&key) {
            debug!(title, ?year, "catalog cache hit");
            return hit.value().clone().ok_or_else(|| Error::LookupNotFound {
                title: title.to_string(),
            });
        }

        let resolved = self.lookup(title, year).await?;
        self.cache.insert(key, resolved.clone());
        resolved.ok_or_else(|| Error::LookupNotFound {
            title: title.to_string(),
        })
    }

    async fn lookup(&self, title: &str, year: Option<u16>) -> Result<Option<ResolvedIdentity>> {
        let (primary, alternate) = split_aka(title);
        let queries: Vec<&str> = std::iter::once(primary.as_str())
            .chain(alternate.as_deref())
            .collect();

        for query in &queries {
            let mut results = self.provider.search_movie(query, year).await?;
            if results.is_empty() && year.is_some() {
                // The catalog's year filter is strict; a file a year off
                // should still find its movie.
                results = self.provider.search_movie(query, None).await?;
            }

            if let Some((candidate, score)) = self.pick(&results, &queries, year) {
                return Ok(Some(self.finish(candidate, score, year).await));
            }
        }

        debug!(title, ?year, "no acceptable catalog candidate");
        Ok(None)
    }

    /// First acceptable candidate, preferring one whose year matches.
    fn pick<'a>(
        &self,
        results: &'a [SearchResult],
        queries: &[&str],
        year: Option<u16>,
    ) -> Option<(&'a SearchResult, f64)> {
        let accepted: Vec<(&SearchResult, f64)> = results
            .iter()
            .filter(|r| {
                let enough_votes = r.vote_count > self.policy.min_votes;
                if !enough_votes {
                    debug!(id = r.id, votes = r.vote_count, "skipping low-vote candidate");
                }
                enough_votes
            })
            .filter_map(|r| {
                let score = candidate_score(r, queries);
                (score >= self.policy.min_title_score).then_some((r, score))
            })
            .collect();

        year.and_then(|y| accepted.iter().find(|(r, _)| r.year == Some(y)).copied())
            .or_else(|| accepted.first().copied())
    }

    async fn finish(&self, candidate: &SearchResult, score: f64, year: Option<u16>) -> ResolvedIdentity {
        let mut identity = CatalogIdentity {
            id: candidate.id,
            title: candidate.title.clone(),
            year: candidate.year,
            runtime_minutes: None,
            original_language: None,
            match_score: score,
        };
        let year_match = YearMatch::between(year, candidate.year);

        if year_match.is_mismatch() {
            match self.provider.movie_details(candidate.id).await {
                Ok(details) => {
                    identity.runtime_minutes = details.runtime_minutes;
                    identity.original_language = details.original_language;
                }
                Err(e) => warn!(id = candidate.id, "Failed to fetch catalog details: {}", e),
            }
        }

        ResolvedIdentity {
            identity,
            year_match,
        }
    }
}

/// Split `"Primary aka Alternate"` into its parts.
pub fn split_aka(title: &str) -> (String, Option<String>) {
    let idx = title
        .as_bytes()
        .windows(5)
        .position(|w| w.eq_ignore_ascii_case(b" aka "));
    match idx {
        Some(idx) => {
            let primary = title[..idx].trim().to_string();
            let alternate = title[idx + 5..].trim().to_string();
            (primary, Some(alternate).filter(|a| !a.is_empty()))
        }
        None => (title.trim().to_string(), None),
    }
}

fn candidate_score(candidate: &SearchResult, queries: &[&str]) -> f64 {
    std::iter::once(candidate.title.as_str())
        .chain(candidate.original_title.as_deref())
        .flat_map(|name| queries.iter().map(move |q| title_similarity(name, q)))
        .fold(0.0, f64::max)
}

fn words(s: &str) -> BTreeSet<String> {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn join(words: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    words
        .into_iter()
        .map(|w| w.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Word-order-insensitive title similarity in `0.0..=1.0`.
///
/// Compares the shared words against each side's full word set, so a title
/// that only adds words to the other still scores 1.0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = words(a);
    let b = words(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let common = join(a.intersection(&b));
    let only_a = join(a.difference(&b));
    let only_b = join(b.difference(&a));
    let with = |rest: &str| {
        if common.is_empty() {
            rest.to_string()
        } else if rest.is_empty() {
            common.clone()
        } else {
            format!("{} {}", common, rest)
        }
    };
    let full_a = with(&only_a);
    let full_b = with(&only_b);

    let mut best = strsim::normalized_levenshtein(&full_a, &full_b);
    if !common.is_empty() {
        best = best
            .max(strsim::normalized_levenshtein(&common, &full_a))
            .max(strsim::normalized_levenshtein(&common, &full_b));
    }
    best
}
