//! Stage drivers.
//!
//! Each stage reads the record store, does its per-file work with bounded
//! concurrency, and writes every finished record back before moving on.
//! Stages can be run on their own in any later invocation; a record only
//! ever holds results of completed work.

mod classify;
mod resolve;
mod scan;
mod search;
mod verify;

pub use classify::ClassifyStats;
pub use scan::ScanStats;
pub use verify::MediaInspector;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::warn;

use crate::catalog::{MetadataProvider, TmdbProvider};
use crate::classifier::Tier;
use crate::config::Config;
use crate::store::{IdentityStatus, MediaStatus, RecordStore};
use crate::trackers::TrackerRegistry;

/// Counters for a network or mediainfo stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    pub stage: &'static str,
    /// Files whose work completed and was recorded.
    pub processed: usize,
    /// Files with nothing left to do for this stage.
    pub skipped: usize,
    /// Files recorded with a failure that a later run retries.
    pub failed: usize,
}

impl StageStats {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Default::default()
        }
    }
}

impl fmt::Display for StageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} skipped, {} failed",
            self.stage, self.processed, self.skipped, self.failed
        )
    }
}

/// Per-stage counts over the whole record store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatus {
    pub total: usize,
    pub banned: usize,
    pub resolved: usize,
    pub not_found: usize,
    pub lookup_failed: usize,
    pub unresolved: usize,
    pub searched: usize,
    pub inspected: usize,
    pub inspect_failed: usize,
    pub classified: usize,
    /// Classified counts in [`Tier::ALL`] order.
    pub tiers: [usize; 4],
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files:      {} ({} banned)", self.total, self.banned)?;
        writeln!(
            f,
            "Identity:   {} resolved, {} not found, {} failed, {} pending",
            self.resolved, self.not_found, self.lookup_failed, self.unresolved
        )?;
        writeln!(f, "Searched:   {}", self.searched)?;
        writeln!(
            f,
            "Verified:   {} inspected, {} failed",
            self.inspected, self.inspect_failed
        )?;
        write!(f, "Classified: {}", self.classified)?;
        for (tier, count) in Tier::ALL.iter().zip(self.tiers) {
            write!(f, "\n  {:<7} {}", tier.as_str(), count)?;
        }
        Ok(())
    }
}

/// Runs pipeline stages against one record store.
pub struct Pipeline {
    config: Arc<Config>,
    store: Arc<RecordStore>,
    provider: Option<Arc<dyn MetadataProvider>>,
    trackers: Option<TrackerRegistry>,
    inspector: Option<MediaInspector>,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, store: Arc<RecordStore>) -> Self {
        Self {
            config,
            store,
            provider: None,
            trackers: None,
            inspector: None,
        }
    }

    /// Open the store configured under `general.data_dir`.
    pub fn open(config: Config) -> crate::Result<Self> {
        let store = RecordStore::open(config.records_path())?;
        Ok(Self::new(Arc::new(config), Arc::new(store)))
    }

    /// Use `provider` instead of the configured TMDB client.
    pub fn with_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `registry` instead of the trackers from the configuration.
    pub fn with_trackers(mut self, registry: TrackerRegistry) -> Self {
        self.trackers = Some(registry);
        self
    }

    /// Replace the mediainfo call used by the verify stage.
    pub fn with_inspector(mut self, inspector: MediaInspector) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn provider(&self) -> Arc<dyn MetadataProvider> {
        self.provider
            .clone()
            .unwrap_or_else(|| Arc::new(TmdbProvider::from_config(&self.config.tmdb)))
    }

    fn trackers(&self) -> TrackerRegistry {
        self.trackers
            .clone()
            .unwrap_or_else(|| TrackerRegistry::from_config(&self.config))
    }

    fn workers(&self) -> usize {
        self.config.general.workers.max(1)
    }

    pub fn status(&self) -> StoreStatus {
        let mut status = StoreStatus::default();
        for record in self.store.records() {
            status.total += 1;
            if record.is_banned() {
                status.banned += 1;
                continue;
            }
            match &record.identity {
                Some(IdentityStatus::Resolved { .. }) => status.resolved += 1,
                Some(IdentityStatus::NotFound { .. }) => status.not_found += 1,
                Some(IdentityStatus::Failed { .. }) => status.lookup_failed += 1,
                None => status.unresolved += 1,
            }
            if !record.searches.is_empty() {
                status.searched += 1;
            }
            match &record.media {
                Some(MediaStatus::Inspected { .. }) => status.inspected += 1,
                Some(MediaStatus::Failed { .. }) => status.inspect_failed += 1,
                None => {}
            }
            if let Some(classified) = &record.classification {
                status.classified += 1;
                if let Some(i) = Tier::ALL.iter().position(|t| *t == classified.result.tier) {
                    status.tiers[i] += 1;
                }
            }
        }
        status
    }
}

/// Run `task` over `items` with at most `workers` in flight.
///
/// Results come back in input order; a task that panics is logged and
/// dropped without affecting the others.
pub(crate) async fn run_bounded<T, F, Fut>(workers: usize, items: Vec<T>, task: F) -> Vec<Fut::Output>
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let sem = semaphore.clone();
        let fut = task(item);
        handles.push(tokio::spawn(async move {
            // Never closed.
            let _permit = sem.acquire_owned().await.ok();
            fut.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok(output) => results.push(output),
            Err(e) => warn!("Pipeline task panicked: {}", e),
        }
    }
    results
}
