use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use uploadcheck_av::MediaInfo;

use super::{run_bounded, Pipeline, StageStats};
use crate::language::LanguageInfo;
use crate::store::{FileRecord, MediaFacts, MediaStatus, RecordStore};

/// Reads stream information from a file. Runs on the blocking pool.
pub type MediaInspector = fn(&Path) -> uploadcheck_av::Result<MediaInfo>;

fn mediainfo(path: &Path) -> uploadcheck_av::Result<MediaInfo> {
    uploadcheck_av::inspect(path)
}

impl Pipeline {
    /// Inspect every non-banned file that has no media facts yet.
    ///
    /// Does nothing when `general.check_language` is off.
    pub async fn verify(&self) -> Result<StageStats> {
        let mut stats = StageStats::new("verify");
        if !self.config.general.check_language {
            info!("Language check disabled; skipping verify");
            return Ok(stats);
        }

        let inspector = match self.inspector {
            Some(inspector) => inspector,
            None => {
                uploadcheck_av::require_tool(uploadcheck_av::inspect::MEDIAINFO)
                    .context("The verify stage needs mediainfo on PATH")?;
                mediainfo as MediaInspector
            }
        };

        let candidates = self.store.select(|r| !r.is_banned());
        let (pending, done): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|r| r.media_facts().is_none());
        stats.skipped = done.len();
        info!("Verifying {} files", pending.len());

        let store = self.store.clone();
        let results = run_bounded(self.workers(), pending, |record| {
            let store = store.clone();
            async move { verify_one(inspector, &store, record).await }
        })
        .await;
        self.store.flush().context("Failed to write records")?;

        for ok in results {
            if ok {
                stats.processed += 1;
            } else {
                stats.failed += 1;
            }
        }
        info!("{}", stats);
        Ok(stats)
    }
}

/// Returns `true` when the file was inspected.
async fn verify_one(inspector: MediaInspector, store: &RecordStore, mut record: FileRecord) -> bool {
    let path = record.path.clone();
    let inspected = tokio::task::spawn_blocking(move || inspector(&path)).await;

    let status = match inspected {
        Ok(Ok(info)) => {
            let facts = MediaFacts {
                languages: LanguageInfo::from_media(&info),
                runtime_minutes: info.runtime_minutes(),
                video: info.video_summary(),
                audio: info.audio_summary(),
            };
            debug!(
                path = %record.path.display(),
                audio = ?facts.languages.audio,
                subtitles = ?facts.languages.subtitles,
                "Inspected"
            );
            MediaStatus::Inspected {
                facts,
                at: Utc::now(),
            }
        }
        Ok(Err(e)) => {
            warn!(path = %record.path.display(), "Inspection failed: {}", e);
            MediaStatus::Failed {
                message: e.to_string(),
                at: Utc::now(),
            }
        }
        Err(e) => {
            warn!(path = %record.path.display(), "Inspection task panicked: {}", e);
            MediaStatus::Failed {
                message: e.to_string(),
                at: Utc::now(),
            }
        }
    };

    let ok = matches!(status, MediaStatus::Inspected { .. });
    record.media = Some(status);
    record.classification = None;
    store.persist(record);
    ok
}
