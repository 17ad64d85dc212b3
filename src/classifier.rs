//! Safety tier decision.
//!
//! Danger is global: a year mismatch, missing language or an undetermined
//! tracker makes the whole file danger, and danger reasons accumulate.
//! Otherwise every tracker gets its own verdict (skip when an equal-or-better
//! release is there or the tracker bans the group, risky when only worse
//! releases are, safe when nothing is), and the file takes the best of them:
//! safe if it can go to some tracker, then risky, then skip.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uploadcheck_parser::ReleaseAttributes;

use crate::catalog::{CatalogIdentity, ResolvedIdentity, YearMatch};
use crate::config::{Config, YearCheckConfig};
use crate::duplicate::{DuplicateOutcome, TrackerOutcome};
use crate::language::LanguageInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Safe,
    Risky,
    Danger,
    /// Nowhere to upload: already present at equal or better quality, or
    /// not accepted. Left out of exports.
    Skip,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Safe, Tier::Risky, Tier::Danger, Tier::Skip];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Safe => "safe",
            Tier::Risky => "risky",
            Tier::Danger => "danger",
            Tier::Skip => "skip",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for one tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerVerdict {
    pub tier: Tier,
    /// Duplicate check outcome label, e.g. `present_lower`.
    pub outcome: String,
    pub reason: String,
}

impl TrackerVerdict {
    fn from_outcome(o: &TrackerOutcome) -> Self {
        let (tier, reason) = match &o.outcome {
            DuplicateOutcome::NotPresent => (Tier::Safe, format!("not present on {}", o.tracker)),
            DuplicateOutcome::PresentLower { existing } => (
                Tier::Risky,
                format!("{} has lower release {}", o.tracker, existing),
            ),
            DuplicateOutcome::PresentEqualOrHigher { existing } => (
                Tier::Skip,
                format!("already on {} as {}", o.tracker, existing),
            ),
            DuplicateOutcome::PresentUndetermined { reason } => (
                Tier::Danger,
                format!(
                    "quality/resolution undetermined while present on {} ({})",
                    o.tracker, reason
                ),
            ),
            DuplicateOutcome::Excluded { reason } => {
                (Tier::Skip, format!("excluded on {}: {}", o.tracker, reason))
            }
        };
        Self {
            tier,
            outcome: o.outcome.label().to_string(),
            reason,
        }
    }

    /// Files this verdict allows uploading to the tracker.
    pub fn is_uploadable(&self, allow_risky: bool) -> bool {
        self.tier == Tier::Safe || (allow_risky && self.tier == Tier::Risky)
    }
}

/// Final decision for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub tier: Tier,
    /// Human-readable reasons in rule order.
    pub reasons: Vec<String>,
    #[serde(default)]
    pub identity: Option<CatalogIdentity>,
    #[serde(default)]
    pub languages: Option<LanguageInfo>,
    /// Verdict per tracker. For a danger file every verdict is danger.
    #[serde(default)]
    pub trackers: BTreeMap<String, TrackerVerdict>,
}

/// Everything the decision depends on.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    pub attrs: &'a ReleaseAttributes,
    pub resolved: Option<&'a ResolvedIdentity>,
    /// Outcomes of the trackers currently enabled.
    pub outcomes: &'a [TrackerOutcome],
    /// `None` when the language check was skipped or the file was not inspected.
    pub lang_ok: Option<bool>,
    pub languages: Option<&'a LanguageInfo>,
    /// Runtime measured from the file, used by the year secondary check.
    pub runtime_minutes: Option<u32>,
}

pub struct Classifier {
    year_check: YearCheckConfig,
    required_language: String,
}

impl Classifier {
    pub fn new(year_check: YearCheckConfig, required_language: impl Into<String>) -> Self {
        Self {
            year_check,
            required_language: required_language.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.year_check.clone(),
            config.general.required_language.clone(),
        )
    }

    /// Classify a file. Banned files get `None`: they never reach a tier.
    pub fn classify(&self, input: ClassificationInput<'_>) -> Option<ClassificationResult> {
        if input.attrs.banned {
            return None;
        }

        let mut trackers: BTreeMap<String, TrackerVerdict> = input
            .outcomes
            .iter()
            .map(|o| (o.tracker.clone(), TrackerVerdict::from_outcome(o)))
            .collect();

        let mut danger = Vec::new();

        if let Some(resolved) = input.resolved {
            if let YearMatch::Mismatch { parsed, catalog } = resolved.year_match {
                if !self.year_mismatch_cleared(&resolved.identity, parsed, catalog, &input) {
                    danger.push(format!(
                        "year mismatch (file {}, catalog {})",
                        parsed, catalog
                    ));
                }
            }
        }

        if input.lang_ok == Some(false) {
            danger.push(format!(
                "no {} audio/subtitles",
                language_name(&self.required_language)
            ));
        }

        danger.extend(
            trackers
                .values()
                .filter(|v| v.tier == Tier::Danger)
                .map(|v| v.reason.clone()),
        );

        let (tier, reasons) = if !danger.is_empty() {
            for verdict in trackers.values_mut() {
                verdict.tier = Tier::Danger;
            }
            (Tier::Danger, danger)
        } else if trackers.is_empty() {
            let reason = if input.resolved.is_none() {
                "no catalog match"
            } else {
                "no trackers checked"
            };
            (Tier::Safe, vec![reason.to_string()])
        } else {
            best_tier(&trackers)
        };

        Some(ClassificationResult {
            tier,
            reasons,
            identity: input.resolved.map(|r| r.identity.clone()),
            languages: input.languages.cloned(),
            trackers,
        })
    }

    /// Score the secondary checks (year delta, runtime, original language).
    pub fn year_check_score(
        &self,
        identity: &CatalogIdentity,
        parsed: u16,
        catalog: u16,
        runtime_minutes: Option<u32>,
        languages: Option<&LanguageInfo>,
    ) -> u8 {
        let cfg = &self.year_check;
        let mut score = 0;

        if parsed.abs_diff(catalog) <= cfg.max_year_delta {
            score += 1;
        }

        if let (Some(file), Some(catalog)) = (runtime_minutes, identity.runtime_minutes) {
            if file.abs_diff(catalog) <= cfg.runtime_tolerance_minutes {
                score += 1;
            }
        }

        if let (Some(original), Some(languages)) = (&identity.original_language, languages) {
            if languages.has_audio(original) {
                score += 1;
            }
        }

        score
    }

    fn year_mismatch_cleared(
        &self,
        identity: &CatalogIdentity,
        parsed: u16,
        catalog: u16,
        input: &ClassificationInput<'_>,
    ) -> bool {
        if !self.year_check.enabled {
            return false;
        }
        let score = self.year_check_score(
            identity,
            parsed,
            catalog,
            input.runtime_minutes,
            input.languages,
        );
        score >= self.year_check.required_score
    }
}

/// The best tier any tracker allows, with the reasons of the trackers at it.
fn best_tier(trackers: &BTreeMap<String, TrackerVerdict>) -> (Tier, Vec<String>) {
    for tier in [Tier::Safe, Tier::Risky, Tier::Skip] {
        let reasons: Vec<String> = trackers
            .values()
            .filter(|v| v.tier == tier)
            .map(|v| v.reason.clone())
            .collect();
        if reasons.is_empty() {
            continue;
        }
        if tier == Tier::Safe && reasons.len() == trackers.len() {
            return (tier, vec!["not present on any tracker".to_string()]);
        }
        return (tier, reasons);
    }
    (Tier::Skip, Vec::new())
}

/// Display name for the common language codes; any other code is printed
/// quoted as configured, e.g. `'pt'`.
fn language_name(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "en" | "eng" => "English".to_string(),
        "fr" | "fre" | "fra" => "French".to_string(),
        "de" | "ger" | "deu" => "German".to_string(),
        "es" | "spa" => "Spanish".to_string(),
        _ => format!("'{}'", code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uploadcheck_parser::{Parser, Quality, ReleaseTier, Resolution};

    fn attrs() -> ReleaseAttributes {
        Parser::default().parse(
            std::path::Path::new("/m/Movie.Title.2014.1080p.BluRay.x264-GROUP.mkv"),
            5_000_000_000,
        )
    }

    fn resolved(catalog_year: u16) -> ResolvedIdentity {
        ResolvedIdentity {
            identity: CatalogIdentity {
                id: 42,
                title: "Movie Title".into(),
                year: Some(catalog_year),
                runtime_minutes: Some(120),
                original_language: Some("en".into()),
                match_score: 1.0,
            },
            year_match: YearMatch::between(Some(2014), Some(catalog_year)),
        }
    }

    fn outcome(tracker: &str, outcome: DuplicateOutcome) -> TrackerOutcome {
        TrackerOutcome {
            tracker: tracker.into(),
            outcome,
            releases: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    fn strict() -> Classifier {
        Classifier::new(
            YearCheckConfig {
                enabled: false,
                ..Default::default()
            },
            "en",
        )
    }

    fn input<'a>(
        attrs: &'a ReleaseAttributes,
        resolved: Option<&'a ResolvedIdentity>,
        outcomes: &'a [TrackerOutcome],
    ) -> ClassificationInput<'a> {
        ClassificationInput {
            attrs,
            resolved,
            outcomes,
            lang_ok: None,
            languages: None,
            runtime_minutes: None,
        }
    }

    #[test]
    fn no_matches_is_safe() {
        let a = attrs();
        let result = strict().classify(input(&a, None, &[])).unwrap();
        assert_eq!(result.tier, Tier::Safe);
    }

    #[test]
    fn banned_files_are_not_classified() {
        let a = Parser::default().parse(std::path::Path::new("Movie.2014.mp4"), 1);
        assert!(strict().classify(input(&a, None, &[])).is_none());
    }

    #[test]
    fn equal_or_higher_skips_only_that_tracker() {
        let a = attrs();
        let r = resolved(2014);
        let outcomes = [
            outcome("a", DuplicateOutcome::NotPresent),
            outcome(
                "b",
                DuplicateOutcome::PresentEqualOrHigher {
                    existing: ReleaseTier::new(Resolution::_1080p, Quality::Remux),
                },
            ),
        ];
        let result = strict().classify(input(&a, Some(&r), &outcomes)).unwrap();
        assert_eq!(result.tier, Tier::Safe);
        assert_eq!(result.reasons, vec!["not present on a".to_string()]);
        assert_eq!(result.trackers["a"].tier, Tier::Safe);
        assert_eq!(result.trackers["a"].outcome, "not_present");
        assert_eq!(result.trackers["b"].tier, Tier::Skip);
        assert_eq!(result.trackers["b"].reason, "already on b as 1080p REMUX");
    }

    #[test]
    fn skip_everywhere_skips_the_file() {
        let a = attrs();
        let r = resolved(2014);
        let outcomes = [
            outcome(
                "a",
                DuplicateOutcome::Excluded {
                    reason: "group GROUP is banned".into(),
                },
            ),
            outcome(
                "b",
                DuplicateOutcome::PresentEqualOrHigher {
                    existing: ReleaseTier::new(Resolution::_1080p, Quality::Remux),
                },
            ),
        ];
        let result = strict().classify(input(&a, Some(&r), &outcomes)).unwrap();
        assert_eq!(result.tier, Tier::Skip);
        assert_eq!(
            result.reasons,
            vec![
                "excluded on a: group GROUP is banned".to_string(),
                "already on b as 1080p REMUX".to_string()
            ]
        );
    }

    #[test]
    fn risky_on_one_tracker_safe_on_another_is_safe() {
        let a = attrs();
        let r = resolved(2014);
        let outcomes = [
            outcome(
                "a",
                DuplicateOutcome::PresentLower {
                    existing: ReleaseTier::new(Resolution::_1080p, Quality::WebDl),
                },
            ),
            outcome("b", DuplicateOutcome::NotPresent),
        ];
        let result = strict().classify(input(&a, Some(&r), &outcomes)).unwrap();
        assert_eq!(result.tier, Tier::Safe);
        assert_eq!(result.trackers["a"].tier, Tier::Risky);
        assert!(result.trackers["a"].is_uploadable(true));
        assert!(!result.trackers["a"].is_uploadable(false));
    }

    #[test]
    fn danger_applies_to_every_tracker() {
        let a = attrs();
        let r = resolved(2014);
        let outcomes = [
            outcome("a", DuplicateOutcome::NotPresent),
            outcome(
                "b",
                DuplicateOutcome::PresentUndetermined {
                    reason: "timeout".into(),
                },
            ),
        ];
        let result = strict().classify(input(&a, Some(&r), &outcomes)).unwrap();
        assert_eq!(result.tier, Tier::Danger);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.trackers.values().all(|v| v.tier == Tier::Danger));
        assert_eq!(result.trackers["a"].reason, "not present on a");
    }

    #[test]
    fn unlisted_language_code_is_quoted() {
        let a = attrs();
        let classifier = Classifier::new(YearCheckConfig::default(), "pt");
        let mut i = input(&a, None, &[]);
        i.lang_ok = Some(false);
        let result = classifier.classify(i).unwrap();
        assert_eq!(result.reasons, vec!["no 'pt' audio/subtitles".to_string()]);
    }

    #[test]
    fn lower_is_risky_and_names_the_tracker() {
        let a = attrs();
        let r = resolved(2014);
        let outcomes = [outcome(
            "blu",
            DuplicateOutcome::PresentLower {
                existing: ReleaseTier::new(Resolution::_1080p, Quality::WebDl),
            },
        )];
        let result = strict().classify(input(&a, Some(&r), &outcomes)).unwrap();
        assert_eq!(result.tier, Tier::Risky);
        assert!(result.reasons[0].contains("blu"));
        assert!(result.reasons[0].contains("WEB-DL"));
    }

    #[test]
    fn year_mismatch_beats_lower_and_skip() {
        let a = attrs();
        let r = resolved(2013);
        let outcomes = [
            outcome(
                "blu",
                DuplicateOutcome::PresentLower {
                    existing: ReleaseTier::new(Resolution::_1080p, Quality::WebDl),
                },
            ),
            outcome(
                "ait",
                DuplicateOutcome::PresentEqualOrHigher {
                    existing: ReleaseTier::new(Resolution::_1080p, Quality::Remux),
                },
            ),
        ];
        let result = strict().classify(input(&a, Some(&r), &outcomes)).unwrap();
        assert_eq!(result.tier, Tier::Danger);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].starts_with("year mismatch"));
    }

    #[test]
    fn danger_reasons_accumulate() {
        let a = attrs();
        let r = resolved(2013);
        let outcomes = [outcome(
            "blu",
            DuplicateOutcome::PresentUndetermined {
                reason: "timeout".into(),
            },
        )];
        let mut i = input(&a, Some(&r), &outcomes);
        i.lang_ok = Some(false);
        let result = strict().classify(i).unwrap();
        assert_eq!(result.tier, Tier::Danger);
        assert_eq!(result.reasons.len(), 3);
        assert_eq!(result.reasons[1], "no English audio/subtitles");
        assert!(result.reasons[2].contains("undetermined"));
    }

    #[test]
    fn skipped_language_check_is_not_danger() {
        let a = attrs();
        let mut i = input(&a, None, &[]);
        i.lang_ok = None;
        assert_eq!(strict().classify(i).unwrap().tier, Tier::Safe);
    }

    #[test]
    fn secondary_check_clears_close_mismatch() {
        let a = attrs();
        let r = resolved(2013);
        let languages = LanguageInfo::new(["en"], Vec::<String>::new());
        let classifier = Classifier::new(YearCheckConfig::default(), "en");
        let mut i = input(&a, Some(&r), &[]);
        i.languages = Some(&languages);
        i.runtime_minutes = Some(150);

        // Year within one (1) + language (1), runtime off: 2 of 3.
        assert_eq!(
            classifier.year_check_score(&r.identity, 2014, 2013, Some(150), Some(&languages)),
            2
        );
        assert_eq!(classifier.classify(i).unwrap().tier, Tier::Safe);
    }

    #[test]
    fn secondary_check_fails_far_mismatch() {
        let a = attrs();
        let r = resolved(2009);
        let classifier = Classifier::new(YearCheckConfig::default(), "en");
        let mut i = input(&a, Some(&r), &[]);
        i.runtime_minutes = Some(121);

        // Runtime only: 1 of 3.
        let result = classifier.classify(i).unwrap();
        assert_eq!(result.tier, Tier::Danger);
    }

    #[test]
    fn unresolved_with_trackers_skipped_is_safe() {
        let a = attrs();
        let result = strict().classify(input(&a, None, &[])).unwrap();
        assert_eq!(result.reasons, vec!["no catalog match".to_string()]);
    }
}
