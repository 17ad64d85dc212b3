use std::fmt;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

use super::Pipeline;
use crate::classifier::{ClassificationInput, Classifier, Tier};
use crate::duplicate::TrackerOutcome;
use crate::language;
use crate::store::{Classified, FileRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyStats {
    pub processed: usize,
    /// Files still waiting on the resolve or search stage.
    pub pending: usize,
    pub banned: usize,
    pub safe: usize,
    pub risky: usize,
    pub danger: usize,
    /// Files with nowhere to go: on every tracker already at equal or
    /// better quality, or not accepted.
    pub exact_duplicates: usize,
}

impl ClassifyStats {
    fn count(&mut self, tier: Tier) {
        self.processed += 1;
        match tier {
            Tier::Safe => self.safe += 1,
            Tier::Risky => self.risky += 1,
            Tier::Danger => self.danger += 1,
            Tier::Skip => self.exact_duplicates += 1,
        }
    }
}

impl fmt::Display for ClassifyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "classify: {} processed ({} safe, {} risky, {} danger, {} exact duplicates), {} pending, {} banned",
            self.processed,
            self.safe,
            self.risky,
            self.danger,
            self.exact_duplicates,
            self.pending,
            self.banned
        )
    }
}

impl Pipeline {
    /// Recompute the tier of every file whose earlier stages are complete.
    ///
    /// Classification is a pure function of the record, so this always
    /// starts from scratch and needs no network.
    pub fn classify(&self) -> Result<ClassifyStats> {
        let classifier = Classifier::from_config(&self.config);
        let trackers: Vec<String> = self
            .trackers()
            .entries()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        let check_language = self.config.general.check_language;
        let required = &self.config.general.required_language;

        let mut stats = ClassifyStats::default();
        let mut updates = Vec::new();

        for mut record in self.store.records() {
            if record.is_banned() {
                stats.banned += 1;
                continue;
            }
            if !is_ready(&record, &trackers) {
                stats.pending += 1;
                if record.classification.take().is_some() {
                    updates.push(record);
                }
                continue;
            }

            // Answers from trackers since disabled or removed do not count.
            let outcomes: Vec<TrackerOutcome> = record
                .searches
                .values()
                .filter(|o| trackers.contains(&o.tracker))
                .cloned()
                .collect();
            let facts = record.media_facts();
            let languages = facts.map(|f| &f.languages);
            let lang_ok = if check_language {
                language::check(languages, required)
            } else {
                None
            };

            let input = ClassificationInput {
                attrs: &record.attributes,
                resolved: record.resolved(),
                outcomes: &outcomes,
                lang_ok,
                languages,
                runtime_minutes: facts.and_then(|f| f.runtime_minutes),
            };
            let Some(result) = classifier.classify(input) else {
                continue;
            };

            debug!(
                path = %record.path.display(),
                tier = %result.tier,
                reasons = ?result.reasons,
                "Classified"
            );
            stats.count(result.tier);
            record.classification = Some(Classified {
                result,
                at: Utc::now(),
            });
            updates.push(record);
        }

        self.store
            .put_many(updates)
            .context("Failed to write classifications")?;
        info!("{}", stats);
        Ok(stats)
    }
}

/// Resolve has run, and a resolved file has answers from every tracker.
fn is_ready(record: &FileRecord, trackers: &[String]) -> bool {
    if record.identity.is_none() {
        return false;
    }
    if record.resolved().is_none() {
        return true;
    }
    trackers.iter().all(|t| record.searches.contains_key(t))
}
