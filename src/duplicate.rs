//! Per-tracker duplicate check: is an equal-or-better release already there?

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uploadcheck_parser::{Comparison, QualityLadder, ReleaseAttributes, ReleaseTier};

use crate::trackers::{ExistingRelease, TrackerEntry};

/// What one tracker already has relative to the local release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DuplicateOutcome {
    NotPresent,
    /// Only worse releases exist; `existing` is the best of them.
    PresentLower { existing: ReleaseTier },
    PresentEqualOrHigher { existing: ReleaseTier },
    /// Releases exist but cannot be ranked against the local file, or the
    /// tracker could not be queried.
    PresentUndetermined { reason: String },
    /// The tracker does not accept this release; it was not queried.
    Excluded { reason: String },
}

impl DuplicateOutcome {
    pub fn is_undetermined(&self) -> bool {
        matches!(self, DuplicateOutcome::PresentUndetermined { .. })
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, DuplicateOutcome::Excluded { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DuplicateOutcome::NotPresent => "not_present",
            DuplicateOutcome::PresentLower { .. } => "present_lower",
            DuplicateOutcome::PresentEqualOrHigher { .. } => "present_equal_or_higher",
            DuplicateOutcome::PresentUndetermined { .. } => "present_undetermined",
            DuplicateOutcome::Excluded { .. } => "excluded",
        }
    }
}

/// One tracker's outcome plus the releases it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerOutcome {
    pub tracker: String,
    pub outcome: DuplicateOutcome,
    #[serde(default)]
    pub releases: Vec<ReleaseTier>,
    pub checked_at: DateTime<Utc>,
}

impl TrackerOutcome {
    /// The tracker could not be queried. Such outcomes are retried by the
    /// next search run.
    pub fn is_failure(&self) -> bool {
        self.outcome.is_undetermined() && self.releases.is_empty()
    }
}

/// Compare a tracker's releases with the local release.
///
/// Pure: the same inputs always give the same outcome.
pub fn compare_releases(
    local: &ReleaseTier,
    existing: &[ReleaseTier],
    ladder: &QualityLadder,
) -> DuplicateOutcome {
    if existing.is_empty() {
        return DuplicateOutcome::NotPresent;
    }

    if !local.is_known() {
        return DuplicateOutcome::PresentUndetermined {
            reason: format!(
                "local release is {} and the tracker has {} release(s)",
                local,
                existing.len()
            ),
        };
    }

    let mut best_lower: Option<ReleaseTier> = None;
    let mut unranked = 0usize;
    for release in existing {
        match ladder.compare_release(release, local) {
            Comparison::Equal | Comparison::Higher => {
                return DuplicateOutcome::PresentEqualOrHigher { existing: *release };
            }
            Comparison::Lower => {
                let better = best_lower.map_or(true, |best| {
                    ladder.compare_release(release, &best) == Comparison::Higher
                });
                if better {
                    best_lower = Some(*release);
                }
            }
            Comparison::Incomparable => unranked += 1,
        }
    }

    if unranked > 0 {
        return DuplicateOutcome::PresentUndetermined {
            reason: format!("{} existing release(s) could not be ranked", unranked),
        };
    }

    match best_lower {
        Some(existing) => DuplicateOutcome::PresentLower { existing },
        None => DuplicateOutcome::NotPresent,
    }
}

/// Outcome for a release group the tracker bans, if it does.
pub fn excluded(attrs: &ReleaseAttributes, entry: &TrackerEntry) -> Option<DuplicateOutcome> {
    entry
        .banned_group(attrs.group.as_deref())
        .map(|group| DuplicateOutcome::Excluded {
            reason: format!("group {} is banned", group),
        })
}

/// Query one tracker and classify what it has.
///
/// A tracker failure never propagates: it becomes an undetermined outcome
/// for that tracker only. Releases from a group the tracker bans are not
/// looked up at all.
pub async fn check(catalog_id: u64, attrs: &ReleaseAttributes, entry: &TrackerEntry) -> TrackerOutcome {
    if let Some(outcome) = excluded(attrs, entry) {
        debug!(tracker = %entry.name(), group = attrs.group_label(), "Group banned on tracker");
        return TrackerOutcome {
            tracker: entry.name().to_string(),
            outcome,
            releases: Vec::new(),
            checked_at: Utc::now(),
        };
    }

    let local = entry.rank_tier(attrs.tier(), attrs.group.as_deref());
    let resolution = local.resolution.is_known().then_some(local.resolution);
    let (outcome, releases) = match entry
        .tracker
        .find_by_catalog_id(catalog_id, resolution)
        .await
    {
        Ok(found) => {
            let tiers: Vec<ReleaseTier> = found
                .iter()
                .map(|r: &ExistingRelease| entry.rank_tier(r.tier, r.group().as_deref()))
                .collect();
            (compare_releases(&local, &tiers, &entry.ladder), tiers)
        }
        Err(e) => {
            warn!(tracker = %entry.name(), catalog_id, "Tracker query failed: {}", e);
            (
                DuplicateOutcome::PresentUndetermined {
                    reason: e.to_string(),
                },
                Vec::new(),
            )
        }
    };

    debug!(
        tracker = %entry.name(),
        catalog_id,
        outcome = outcome.label(),
        "duplicate check"
    );

    TrackerOutcome {
        tracker: entry.name().to_string(),
        outcome,
        releases,
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uploadcheck_parser::{Quality, Resolution};

    fn tier(resolution: Resolution, quality: Quality) -> ReleaseTier {
        ReleaseTier::new(resolution, quality)
    }

    fn local() -> ReleaseTier {
        tier(Resolution::_1080p, Quality::Encode)
    }

    #[test]
    fn nothing_listed_is_not_present() {
        assert_eq!(
            compare_releases(&local(), &[], &QualityLadder::default()),
            DuplicateOutcome::NotPresent
        );
    }

    #[test]
    fn remux_on_tracker_blocks_encode() {
        let outcome = compare_releases(
            &local(),
            &[tier(Resolution::_1080p, Quality::Remux)],
            &QualityLadder::default(),
        );
        assert_matches!(outcome, DuplicateOutcome::PresentEqualOrHigher { existing }
            if existing.quality == Quality::Remux);
    }

    #[test]
    fn equal_short_circuits_after_lower() {
        let outcome = compare_releases(
            &local(),
            &[
                tier(Resolution::_1080p, Quality::WebRip),
                tier(Resolution::_1080p, Quality::Encode),
            ],
            &QualityLadder::default(),
        );
        assert_matches!(outcome, DuplicateOutcome::PresentEqualOrHigher { .. });
    }

    #[test]
    fn lower_reports_best_lower() {
        let outcome = compare_releases(
            &local(),
            &[
                tier(Resolution::_1080p, Quality::WebRip),
                tier(Resolution::_1080p, Quality::WebDl),
            ],
            &QualityLadder::default(),
        );
        assert_eq!(
            outcome,
            DuplicateOutcome::PresentLower {
                existing: tier(Resolution::_1080p, Quality::WebDl)
            }
        );
    }

    #[test]
    fn ladder_order_is_per_tracker() {
        // This tracker ranks WEB-DL above encodes.
        let ladder =
            QualityLadder::new(vec![Quality::WebRip, Quality::Encode, Quality::WebDl, Quality::Remux])
                .unwrap();
        let outcome = compare_releases(
            &local(),
            &[tier(Resolution::_1080p, Quality::WebDl)],
            &ladder,
        );
        assert_matches!(outcome, DuplicateOutcome::PresentEqualOrHigher { .. });
    }

    #[test]
    fn unknown_local_is_undetermined() {
        let outcome = compare_releases(
            &tier(Resolution::_1080p, Quality::Unknown),
            &[tier(Resolution::_1080p, Quality::WebRip)],
            &QualityLadder::default(),
        );
        assert!(outcome.is_undetermined());

        // Nothing listed is still not_present.
        assert_eq!(
            compare_releases(
                &tier(Resolution::Unknown, Quality::Unknown),
                &[],
                &QualityLadder::default()
            ),
            DuplicateOutcome::NotPresent
        );
    }

    #[test]
    fn unrankable_existing_is_undetermined() {
        let outcome = compare_releases(
            &local(),
            &[
                tier(Resolution::_1080p, Quality::WebRip),
                tier(Resolution::_1080p, Quality::Unknown),
            ],
            &QualityLadder::default(),
        );
        assert!(outcome.is_undetermined());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(DuplicateOutcome::NotPresent).unwrap();
        assert_eq!(json["outcome"], "not_present");
    }

    fn attrs(name: &str) -> ReleaseAttributes {
        uploadcheck_parser::Parser::default().parse(std::path::Path::new(name), 4_000_000_000)
    }

    #[test]
    fn hq_webrip_outranks_encode_on_tracker() {
        let hq = tier(Resolution::_1080p, Quality::WebRip).with_hq_webrip(true);
        let outcome = compare_releases(&local(), &[hq], &QualityLadder::default());
        assert_matches!(outcome, DuplicateOutcome::PresentEqualOrHigher { existing } if existing.hq_webrip);

        let outcome = compare_releases(
            &hq,
            &[local()],
            &QualityLadder::default(),
        );
        assert_matches!(outcome, DuplicateOutcome::PresentLower { .. });
    }

    struct DownTracker;

    #[async_trait::async_trait]
    impl crate::trackers::Tracker for DownTracker {
        fn name(&self) -> &str {
            "down"
        }

        async fn find_by_catalog_id(
            &self,
            _catalog_id: u64,
            _resolution: Option<Resolution>,
        ) -> crate::Result<Vec<ExistingRelease>> {
            Err(crate::Error::tracker_unavailable("down", "connection refused"))
        }
    }

    #[tokio::test]
    async fn tracker_failure_is_undetermined_for_that_tracker() {
        let entry = TrackerEntry::new(std::sync::Arc::new(DownTracker), QualityLadder::default());
        let outcome = check(550, &attrs("Movie.2014.1080p.BluRay.x264-GRP.mkv"), &entry).await;
        assert_eq!(outcome.tracker, "down");
        assert!(outcome.outcome.is_undetermined());
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn banned_group_is_excluded_without_a_query() {
        // The tracker is down, so any query would come back undetermined.
        let entry = TrackerEntry::new(std::sync::Arc::new(DownTracker), QualityLadder::default())
            .with_banned_groups(vec!["grp".to_string()]);
        let outcome = check(550, &attrs("Movie.2014.1080p.BluRay.x264-GRP.mkv"), &entry).await;
        assert_eq!(
            outcome.outcome,
            DuplicateOutcome::Excluded {
                reason: "group grp is banned".to_string()
            }
        );
        assert!(!outcome.is_failure());
        assert_eq!(outcome.outcome.label(), "excluded");
    }
}
