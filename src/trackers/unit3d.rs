//! UNIT3D tracker API client.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use uploadcheck_parser::{Quality, ReleaseTier, Resolution};

use super::{ExistingRelease, Tracker};
use crate::config::TrackerConfig;
use crate::{Error, Result};

/// Timeout for UNIT3D API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct FilterResponse {
    #[serde(default)]
    data: Vec<TorrentItem>,
}

#[derive(Debug, Deserialize)]
struct TorrentItem {
    #[serde(default)]
    attributes: TorrentAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct TorrentAttributes {
    name: Option<String>,
    #[serde(rename = "type")]
    release_type: Option<String>,
    resolution: Option<String>,
}

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct Unit3dTracker {
    name: String,
    client: Client,
    base_url: String,
    api_key: String,
    categories: Vec<u32>,
    rate_limiter: DirectLimiter,
}

impl Unit3dTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        let rate = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            name: config.name.clone(),
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key().unwrap_or_default().to_string(),
            categories: config.categories.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_minute(rate)),
        }
    }

    fn unavailable(&self, message: impl ToString) -> Error {
        Error::tracker_unavailable(&self.name, message)
    }
}

/// Map a UNIT3D `type` onto a quality tier.
fn normalize_type(release_type: &str) -> Quality {
    let t = release_type.to_lowercase();
    if t.contains("remux") {
        Quality::Remux
    } else if t.contains("full") || t.contains("disc") {
        Quality::FullDisc
    } else if t.contains("web") && t.contains("dl") {
        Quality::WebDl
    } else if t.contains("web") && t.contains("rip") {
        Quality::WebRip
    } else if t.contains("encode") || t.contains("x264") || t.contains("x265") {
        Quality::Encode
    } else if t.contains("hdtv") {
        Quality::Hdtv
    } else {
        Quality::Unknown
    }
}

fn normalize_resolution(resolution: &str) -> Resolution {
    resolution.parse().unwrap_or(Resolution::Unknown)
}

#[async_trait]
impl Tracker for Unit3dTracker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_by_catalog_id(
        &self,
        catalog_id: u64,
        resolution: Option<Resolution>,
    ) -> Result<Vec<ExistingRelease>> {
        self.rate_limiter.until_ready().await;

        let mut query: Vec<(&str, String)> = vec![("tmdbId", catalog_id.to_string())];
        query.extend(self.categories.iter().map(|c| ("categories[]", c.to_string())));

        debug!(tracker = %self.name, catalog_id, "UNIT3D torrent filter");
        let response = self
            .client
            .get(format!("{}/api/torrents/filter", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.unavailable(format!("HTTP {}: {}", status, body.trim())));
        }

        let body: FilterResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("invalid response: {}", e)))?;

        let releases: Vec<ExistingRelease> = body
            .data
            .into_iter()
            .map(|item| {
                let attrs = item.attributes;
                ExistingRelease {
                    tier: ReleaseTier::new(
                        attrs
                            .resolution
                            .as_deref()
                            .map(normalize_resolution)
                            .unwrap_or_default(),
                        attrs
                            .release_type
                            .as_deref()
                            .map(normalize_type)
                            .unwrap_or_default(),
                    ),
                    name: attrs.name,
                }
            })
            .filter(|r| match resolution {
                Some(wanted) if wanted.is_known() && r.tier.resolution.is_known() => {
                    r.tier.resolution == wanted
                }
                _ => true,
            })
            .collect();

        debug!(tracker = %self.name, catalog_id, found = releases.len(), "UNIT3D results");
        Ok(releases)
    }
}
