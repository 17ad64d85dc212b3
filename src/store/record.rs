//! Per-file record, one named field per pipeline stage.
//!
//! A missing stage field means the stage has not run for that file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uploadcheck_parser::ReleaseAttributes;

use crate::catalog::ResolvedIdentity;
use crate::classifier::ClassificationResult;
use crate::duplicate::TrackerOutcome;
use crate::language::LanguageInfo;

/// Identifies file contents cheaply: a changed size or mtime means rescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileKey {
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub modified: Option<i64>,
}

impl FileKey {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).timestamp());
        Self {
            size: meta.len(),
            modified,
        }
    }
}

/// Identity stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdentityStatus {
    Resolved {
        resolved: ResolvedIdentity,
        at: DateTime<Utc>,
    },
    /// The catalog had no acceptable candidate.
    NotFound { at: DateTime<Utc> },
    /// The catalog could not be reached; retried on the next run.
    Failed { message: String, at: DateTime<Utc> },
}

impl IdentityStatus {
    pub fn resolved(&self) -> Option<&ResolvedIdentity> {
        match self {
            IdentityStatus::Resolved { resolved, .. } => Some(resolved),
            _ => None,
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, IdentityStatus::Failed { .. })
    }
}

/// Facts taken from mediainfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFacts {
    pub languages: LanguageInfo,
    pub runtime_minutes: Option<u32>,
    pub video: Option<String>,
    pub audio: Option<String>,
}

/// Verify stage result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MediaStatus {
    Inspected {
        facts: MediaFacts,
        at: DateTime<Utc>,
    },
    Failed { message: String, at: DateTime<Utc> },
}

impl MediaStatus {
    pub fn facts(&self) -> Option<&MediaFacts> {
        match self {
            MediaStatus::Inspected { facts, .. } => Some(facts),
            MediaStatus::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classified {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Scan root the file was found under.
    pub root: PathBuf,
    pub file_key: FileKey,
    pub scanned_at: DateTime<Utc>,
    pub attributes: ReleaseAttributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityStatus>,

    /// Keyed by tracker name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub searches: BTreeMap<String, TrackerOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classified>,
}

impl FileRecord {
    pub fn new(path: &Path, root: &Path, file_key: FileKey, attributes: ReleaseAttributes) -> Self {
        Self {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
            file_key,
            scanned_at: Utc::now(),
            attributes,
            identity: None,
            searches: BTreeMap::new(),
            media: None,
            classification: None,
        }
    }

    pub fn is_banned(&self) -> bool {
        self.attributes.banned
    }

    pub fn resolved(&self) -> Option<&ResolvedIdentity> {
        self.identity.as_ref().and_then(IdentityStatus::resolved)
    }

    pub fn media_facts(&self) -> Option<&MediaFacts> {
        self.media.as_ref().and_then(MediaStatus::facts)
    }

    /// Store a new identity, dropping searches made for a different one.
    pub fn set_identity(&mut self, status: IdentityStatus) {
        let old = self.resolved().map(|r| r.identity.id);
        let new = status.resolved().map(|r| r.identity.id);
        if old != new {
            self.searches.clear();
        }
        self.identity = Some(status);
        self.classification = None;
    }

    pub fn key(&self) -> String {
        record_key(&self.path)
    }
}

pub fn record_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
