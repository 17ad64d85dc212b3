//! Read-only exporters over classified records.
//!
//! Skipped files (nowhere to upload) never appear in an export. Besides the
//! per-tier lists, every tracker gets its own upload list.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::classifier::{ClassificationResult, Tier, TrackerVerdict};
use crate::store::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// One list per tier (`safe.txt`, `risky.txt`, `danger.txt`) and one
    /// `uploads_<tracker>.txt` per tracker
    Txt,
    /// Every result grouped by tier, plus the per-tracker upload lists, in
    /// `results.json`
    Json,
}

/// One classified file as exported.
#[derive(Debug, Clone, Serialize)]
pub struct ExportEntry<'a> {
    pub path: &'a Path,
    #[serde(flatten)]
    pub result: &'a ClassificationResult,
}

#[derive(Debug, Default, Serialize)]
pub struct TierGroups<'a> {
    pub safe: Vec<ExportEntry<'a>>,
    pub risky: Vec<ExportEntry<'a>>,
    pub danger: Vec<ExportEntry<'a>>,
}

impl<'a> TierGroups<'a> {
    pub fn from_records(records: &'a [FileRecord]) -> Self {
        let mut groups = Self::default();
        for record in records {
            let Some(classified) = &record.classification else {
                continue;
            };
            let entry = ExportEntry {
                path: &record.path,
                result: &classified.result,
            };
            match classified.result.tier {
                Tier::Safe => groups.safe.push(entry),
                Tier::Risky => groups.risky.push(entry),
                Tier::Danger => groups.danger.push(entry),
                Tier::Skip => {}
            }
        }
        groups
    }

    /// Files to upload: safe ones, plus risky ones when allowed.
    pub fn upload_list(&self, allow_risky: bool) -> Vec<&ExportEntry<'a>> {
        let mut list: Vec<_> = self.safe.iter().collect();
        if allow_risky {
            list.extend(self.risky.iter());
            list.sort_by_key(|e| e.path);
        }
        list
    }
}

/// A file that may go to one tracker.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerUpload<'a> {
    pub path: &'a Path,
    #[serde(flatten)]
    pub verdict: &'a TrackerVerdict,
}

/// Upload list per tracker: files safe there, plus risky ones when allowed.
/// Trackers with nothing to upload still get an empty list.
pub fn tracker_uploads(
    records: &[FileRecord],
    allow_risky: bool,
) -> BTreeMap<&str, Vec<TrackerUpload<'_>>> {
    let mut uploads: BTreeMap<&str, Vec<TrackerUpload<'_>>> = BTreeMap::new();
    for record in records {
        let Some(classified) = &record.classification else {
            continue;
        };
        for (tracker, verdict) in &classified.result.trackers {
            let list = uploads.entry(tracker.as_str()).or_default();
            if verdict.is_uploadable(allow_risky) {
                list.push(TrackerUpload {
                    path: &record.path,
                    verdict,
                });
            }
        }
    }
    for list in uploads.values_mut() {
        list.sort_by_key(|u| u.path);
    }
    uploads
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    #[serde(flatten)]
    tiers: &'a TierGroups<'a>,
    uploads: &'a BTreeMap<&'a str, Vec<TrackerUpload<'a>>>,
}

/// Render entries one per line: the path, a tab, then the reasons.
pub fn render_txt<'e, 'a: 'e>(entries: impl IntoIterator<Item = &'e ExportEntry<'a>>) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}\t{}",
            entry.path.display(),
            entry.result.reasons.join("; ")
        );
    }
    out
}

/// Render a tracker upload list: the path, a tab, then that tracker's reason.
pub fn render_uploads(uploads: &[TrackerUpload<'_>]) -> String {
    let mut out = String::new();
    for upload in uploads {
        let _ = writeln!(out, "{}\t{}", upload.path.display(), upload.verdict.reason);
    }
    out
}

/// File name for a tracker's upload list, keeping it filesystem-safe.
fn uploads_file_name(tracker: &str) -> String {
    let name: String = tracker
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("uploads_{}.txt", name)
}

/// Write the export into `output_dir` and return the files written.
pub fn export(
    records: &[FileRecord],
    format: ExportFormat,
    output_dir: &Path,
    allow_risky: bool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create export directory {:?}", output_dir))?;
    let groups = TierGroups::from_records(records);
    let uploads = tracker_uploads(records, allow_risky);

    let files = match format {
        ExportFormat::Txt => {
            let mut files = vec![
                write(output_dir, "safe.txt", render_txt(groups.upload_list(allow_risky)))?,
                write(output_dir, "risky.txt", render_txt(&groups.risky))?,
                write(output_dir, "danger.txt", render_txt(&groups.danger))?,
            ];
            for (tracker, list) in &uploads {
                files.push(write(
                    output_dir,
                    &uploads_file_name(tracker),
                    render_uploads(list),
                )?);
            }
            files
        }
        ExportFormat::Json => {
            let json = serde_json::to_string_pretty(&ExportDocument {
                tiers: &groups,
                uploads: &uploads,
            })?;
            vec![write(output_dir, "results.json", json)?]
        }
    };

    info!(
        safe = groups.safe.len(),
        risky = groups.risky.len(),
        danger = groups.danger.len(),
        trackers = uploads.len(),
        allow_risky,
        "Exported to {:?}",
        output_dir
    );
    Ok(files)
}

fn write(dir: &Path, name: &str, contents: String) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
