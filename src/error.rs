//! Error taxonomy for the classification pipeline.
//!
//! None of these abort a run: a failed lookup leaves a file unresolved, an
//! unavailable tracker marks that tracker's outcome undetermined.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The catalog returned no usable candidate.
    #[error("no catalog match for '{title}'")]
    LookupNotFound { title: String },

    /// The catalog could not be queried after retries.
    #[error("catalog lookup failed: {0}")]
    LookupFailed(String),

    #[error("tracker {tracker} unavailable: {message}")]
    TrackerUnavailable { tracker: String, message: String },

    #[error("record store {}: {message}", path.display())]
    Store { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn tracker_unavailable(tracker: impl Into<String>, message: impl ToString) -> Self {
        Self::TrackerUnavailable {
            tracker: tracker.into(),
            message: message.to_string(),
        }
    }

    pub fn store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Store {
            path: path.into(),
            message: message.into(),
        }
    }
}

