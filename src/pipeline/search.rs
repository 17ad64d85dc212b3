use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use super::{run_bounded, Pipeline, StageStats};
use crate::duplicate;
use crate::store::{FileRecord, RecordStore};
use crate::trackers::TrackerEntry;

impl Pipeline {
    /// Query trackers for every resolved file.
    ///
    /// Resumes per tracker: a tracker with a recorded answer for a file is not
    /// asked again, unless the earlier query failed or the tracker's group
    /// ban changed since. With `only` set, just that tracker is queried.
    pub async fn search(&self, only: Option<&str>) -> Result<StageStats> {
        let mut stats = StageStats::new("search");
        let registry = self.trackers();

        let entries: Vec<TrackerEntry> = match only {
            Some(name) => match registry.get(name) {
                Some(entry) => vec![entry.clone()],
                None => bail!("Tracker '{}' is not configured or has no API key", name),
            },
            None => registry.entries().to_vec(),
        };
        if entries.is_empty() {
            warn!("No trackers available; nothing to search");
            return Ok(stats);
        }

        let candidates = self
            .store
            .select(|r| !r.is_banned() && r.resolved().is_some());
        let (pending, done): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|r| entries.iter().any(|e| needs_search(r, e)));
        stats.skipped = done.len();
        info!(
            "Searching {} files on {} tracker(s)",
            pending.len(),
            entries.len()
        );

        let entries = Arc::new(entries);
        let store = self.store.clone();
        let results = run_bounded(self.workers(), pending, |record| {
            let entries = entries.clone();
            let store = store.clone();
            async move { search_one(&entries, &store, record).await }
        })
        .await;
        self.store.flush().context("Failed to write records")?;

        for failures in results {
            if failures > 0 {
                stats.failed += 1;
            } else {
                stats.processed += 1;
            }
        }
        info!("{}", stats);
        Ok(stats)
    }
}

fn needs_search(record: &FileRecord, entry: &TrackerEntry) -> bool {
    let excluded = duplicate::excluded(&record.attributes, entry).is_some();
    record
        .searches
        .get(entry.name())
        .map_or(true, |o| o.is_failure() || o.outcome.is_excluded() != excluded)
}

/// Returns the number of trackers that could not be queried.
async fn search_one(entries: &[TrackerEntry], store: &RecordStore, mut record: FileRecord) -> usize {
    let Some(catalog_id) = record.resolved().map(|r| r.identity.id) else {
        return 0;
    };
    let mut failures = 0;

    let todo: Vec<&TrackerEntry> = entries
        .iter()
        .filter(|e| needs_search(&record, e))
        .collect();
    for entry in todo {
        let outcome = duplicate::check(catalog_id, &record.attributes, entry).await;
        if outcome.is_failure() {
            failures += 1;
        }
        debug!(
            path = %record.path.display(),
            tracker = %entry.name(),
            outcome = outcome.outcome.label(),
            "Searched"
        );
        record.searches.insert(entry.name().to_string(), outcome);
    }

    record.classification = None;
    store.persist(record);
    failures
}
