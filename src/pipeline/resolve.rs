use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{run_bounded, Pipeline, StageStats};
use crate::catalog::{IdentityResolver, MatchPolicy};
use crate::store::{FileRecord, IdentityStatus, RecordStore};
use crate::Error;

impl Pipeline {
    /// Resolve every non-banned file that has no final identity yet.
    ///
    /// Lookup failures are recorded and retried by the next run; a miss is
    /// final until the file is rescanned with a different name.
    pub async fn resolve(&self) -> Result<StageStats> {
        let mut stats = StageStats::new("resolve");
        let provider = self.provider();
        if !provider.is_available() {
            bail!(
                "No {} API key configured (set {})",
                provider.name(),
                crate::config::TMDB_API_KEY_ENV
            );
        }

        let pending = self.store.select(|r| {
            !r.is_banned() && r.identity.as_ref().map_or(true, |i| !i.is_final())
        });
        stats.skipped = self
            .store
            .select(|r| !r.is_banned())
            .len()
            .saturating_sub(pending.len());
        info!("Resolving {} files against {}", pending.len(), provider.name());

        let resolver = Arc::new(IdentityResolver::new(
            provider,
            MatchPolicy::from(&self.config.tmdb),
        ));
        let store = self.store.clone();

        let results = run_bounded(self.workers(), pending, |record| {
            let resolver = resolver.clone();
            let store = store.clone();
            async move { resolve_one(&resolver, &store, record).await }
        })
        .await;
        self.store.flush().context("Failed to write records")?;

        for failed in results {
            if failed {
                stats.failed += 1;
            } else {
                stats.processed += 1;
            }
        }
        debug!(cached = resolver.cached(), "Catalog cache size");
        info!("{}", stats);
        Ok(stats)
    }
}

/// Returns `true` when the lookup failed and should be retried.
async fn resolve_one(resolver: &IdentityResolver, store: &RecordStore, mut record: FileRecord) -> bool {
    let title = record.attributes.title.clone();
    let year = record.attributes.year;

    let status = if title.trim().is_empty() {
        IdentityStatus::NotFound { at: Utc::now() }
    } else {
        match resolver.resolve(&title, year).await {
            Ok(resolved) => {
                debug!(
                    path = %record.path.display(),
                    id = resolved.identity.id,
                    title = %resolved.identity.title,
                    "Resolved"
                );
                IdentityStatus::Resolved {
                    resolved,
                    at: Utc::now(),
                }
            }
            Err(Error::LookupNotFound { .. }) => {
                debug!(path = %record.path.display(), %title, "No catalog match");
                IdentityStatus::NotFound { at: Utc::now() }
            }
            Err(e) => {
                warn!(path = %record.path.display(), "Catalog lookup failed: {}", e);
                IdentityStatus::Failed {
                    message: e.to_string(),
                    at: Utc::now(),
                }
            }
        }
    };

    let failed = !status.is_final();
    record.set_identity(status);
    store.persist(record);
    failed
}
