//! Tracker clients behind one capability: list existing releases for a
//! catalog id.

mod unit3d;

pub use unit3d::Unit3dTracker;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uploadcheck_parser::{QualityLadder, ReleaseTier, Resolution};

use crate::config::{Config, TrackerConfig, TrackerDriver};
use crate::Result;

/// A release a tracker already carries for some catalog identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRelease {
    pub tier: ReleaseTier,
    /// Torrent name as listed, kept for the audit trail.
    #[serde(default)]
    pub name: Option<String>,
}

impl ExistingRelease {
    /// Release group read from the torrent name.
    pub fn group(&self) -> Option<String> {
        self.name
            .as_deref()
            .and_then(|name| uploadcheck_parser::parse_name(name).group)
    }
}

/// Common trait for tracker clients
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Name from the configuration, used as the key in stored records.
    fn name(&self) -> &str;

    /// Releases listed for `catalog_id`.
    ///
    /// With `resolution` set, only releases at that resolution, or with no
    /// reported resolution, are returned. Errors are
    /// [`crate::Error::TrackerUnavailable`].
    async fn find_by_catalog_id(
        &self,
        catalog_id: u64,
        resolution: Option<Resolution>,
    ) -> Result<Vec<ExistingRelease>>;
}

/// Create an appropriate client based on config.
///
/// Returns `None` when the tracker has no API key.
pub fn create_tracker(config: &TrackerConfig) -> Option<Arc<dyn Tracker>> {
    config.api_key()?;
    match config.driver {
        TrackerDriver::Unit3d => Some(Arc::new(Unit3dTracker::new(config))),
    }
}

/// A tracker client together with the rules it ranks and accepts
/// releases by.
#[derive(Clone)]
pub struct TrackerEntry {
    pub tracker: Arc<dyn Tracker>,
    pub ladder: QualityLadder,
    /// Groups this tracker does not accept.
    pub banned_groups: Vec<String>,
    /// Groups whose WEBRips rank just above encodes.
    pub hq_webrip_groups: Vec<String>,
}

impl TrackerEntry {
    pub fn new(tracker: Arc<dyn Tracker>, ladder: QualityLadder) -> Self {
        Self {
            tracker,
            ladder,
            banned_groups: Vec::new(),
            hq_webrip_groups: Vec::new(),
        }
    }

    pub fn with_banned_groups(mut self, groups: Vec<String>) -> Self {
        self.banned_groups = groups;
        self
    }

    pub fn with_hq_webrip_groups(mut self, groups: Vec<String>) -> Self {
        self.hq_webrip_groups = groups;
        self
    }

    pub fn name(&self) -> &str {
        self.tracker.name()
    }

    /// The banned entry matching `group`, compared case-insensitively.
    pub fn banned_group(&self, group: Option<&str>) -> Option<&str> {
        let group = group?;
        self.banned_groups
            .iter()
            .find(|g| g.eq_ignore_ascii_case(group))
            .map(String::as_str)
    }

    pub fn is_hq_webrip_group(&self, group: Option<&str>) -> bool {
        let Some(group) = group.map(str::to_lowercase) else {
            return false;
        };
        self.hq_webrip_groups
            .iter()
            .any(|hq| !hq.is_empty() && group.contains(&hq.to_lowercase()))
    }

    /// `tier` as this tracker ranks a release from `group`.
    pub fn rank_tier(&self, tier: ReleaseTier, group: Option<&str>) -> ReleaseTier {
        tier.with_hq_webrip(self.is_hq_webrip_group(group))
    }
}

/// Enabled trackers, built once at startup.
#[derive(Clone, Default)]
pub struct TrackerRegistry {
    entries: Vec<TrackerEntry>,
    skipped: Vec<String>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every enabled tracker that has an API key.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for tracker in config.enabled_trackers() {
            match create_tracker(tracker) {
                Some(client) => {
                    let ladder = tracker
                        .ladder
                        .clone()
                        .unwrap_or_else(|| config.quality.ladder.clone());
                    registry.add(
                        TrackerEntry::new(client, ladder)
                            .with_banned_groups(tracker.banned_groups.clone())
                            .with_hq_webrip_groups(config.quality.hq_webrip_groups.clone()),
                    );
                }
                None => {
                    tracing::warn!(
                        tracker = %tracker.name,
                        "Skipping tracker without API key (set {})",
                        tracker.api_key_env()
                    );
                    registry.skipped.push(tracker.name.clone());
                }
            }
        }
        registry
    }

    pub fn add(&mut self, entry: TrackerEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TrackerEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TrackerEntry> {
        self.entries
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    /// Enabled trackers left out for lack of credentials.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
