//! TMDB (The Movie Database) catalog provider.
//!
//! Implements [`MetadataProvider`] against the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting via [`governor`] (4 requests / second by default).
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{MetadataProvider, MovieDetails, SearchResult};
use crate::config::TmdbConfig;
use crate::{Error, Result};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    vote_count: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: u64,
    runtime: Option<u32>,
    original_language: Option<String>,
    imdb_id: Option<String>,
}

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// TMDB catalog provider.
///
/// ```no_run
/// use uploadcheck::catalog::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into());
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    rate_limiter: DirectLimiter,
}

impl TmdbProvider {
    /// Create a provider against the public API at 4 requests per second.
    pub fn new(api_key: String, language: String) -> Self {
        Self::with_options(api_key, language, TMDB_BASE_URL.to_string(), 4)
    }

    pub fn from_config(config: &TmdbConfig) -> Self {
        Self::with_options(
            config.api_key.clone().unwrap_or_default(),
            config.language.clone(),
            config
                .base_url
                .clone()
                .unwrap_or_else(|| TMDB_BASE_URL.to_string()),
            config.requests_per_second,
        )
    }

    pub fn with_options(
        api_key: String,
        language: String,
        base_url: String,
        requests_per_second: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build TMDB HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Self {
            client,
            api_key,
            language,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        }
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
                .query(params)
                .send()
                .await
                .map_err(|e| Error::LookupFailed(format!("TMDB request failed: {path}: {e}")))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return resp
                .error_for_status()
                .map_err(|e| Error::LookupFailed(format!("TMDB request returned error: {path}: {e}")));
        }
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: &Option<String>) -> Option<u16> {
    date.as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_movie(&self, title: &str, year: Option<u16>) -> Result<Vec<SearchResult>> {
        let mut params = vec![
            ("query", title.to_string()),
            ("include_adult", "true".to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }
        debug!(title, ?year, "TMDB search movie");

        let body: TmdbSearchResponse<TmdbMovieSearchResult> = self
            .get("/search/movie", &params)
            .await?
            .json()
            .await
            .map_err(|e| Error::LookupFailed(format!("failed to parse TMDB search response: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| {
                let title = r.title.unwrap_or_default();
                let original_title = r.original_title.filter(|t| *t != title);
                SearchResult {
                    id: r.id,
                    title,
                    original_title,
                    year: parse_year(&r.release_date),
                    vote_count: r.vote_count,
                }
            })
            .collect())
    }

    async fn movie_details(&self, id: u64) -> Result<MovieDetails> {
        debug!(id, "TMDB get movie details");

        let detail: TmdbMovieDetail = self
            .get(&format!("/movie/{id}"), &[])
            .await?
            .json()
            .await
            .map_err(|e| Error::LookupFailed(format!("failed to parse TMDB movie detail: {e}")))?;

        Ok(MovieDetails {
            id: detail.id,
            runtime_minutes: detail.runtime.filter(|r| *r > 0),
            original_language: detail.original_language.filter(|l| !l.is_empty()),
            imdb_id: detail.imdb_id.filter(|i| !i.is_empty()),
        })
    }
}
