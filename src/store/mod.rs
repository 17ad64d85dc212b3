//! Record store shared by all pipeline stages.
//!
//! One JSON document, `{ "version": 1, "records": { "<path>": FileRecord } }`.
//! Writes replace whole records and the file is rewritten atomically, so a
//! crash leaves either the previous or the new document on disk.
//!
//! Stage workers hand finished records to [`RecordStore::persist`], which
//! writes the file every [`DEFAULT_FLUSH_EVERY`] records; stages call
//! [`RecordStore::flush`] when they finish. A crash loses at most the
//! unflushed records, which the next run redoes.

mod record;

pub use record::{
    record_key, Classified, FileKey, FileRecord, IdentityStatus, MediaFacts, MediaStatus,
};

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Current on-disk format version.
pub const RECORD_VERSION: u32 = 1;

/// Records persisted between two writes of the backing file.
pub const DEFAULT_FLUSH_EVERY: usize = 25;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    records: BTreeMap<String, FileRecord>,
}

pub struct RecordStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, FileRecord>>,
    // Serializes writers of the backing file.
    write_lock: Mutex<()>,
    // Records persisted since the last write.
    unsaved: Mutex<usize>,
    flush_every: usize,
}

impl RecordStore {
    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), records = records.len(), "Opened record store");
        Ok(Self {
            path,
            records: RwLock::new(records),
            write_lock: Mutex::new(()),
            unsaved: Mutex::new(0),
            flush_every: DEFAULT_FLUSH_EVERY,
        })
    }

    /// Write the file after every `n` persisted records (at least one).
    pub fn with_flush_every(mut self, n: usize) -> Self {
        self.flush_every = n.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(path: &Path) -> Result<BTreeMap<String, FileRecord>> {
        let content = std::fs::read_to_string(path)?;
        let file: StoreFile = serde_json::from_str(&content)
            .map_err(|e| Error::store(path, format!("unreadable record file: {}", e)))?;

        if file.version == 0 || file.version > RECORD_VERSION {
            return Err(Error::store(
                path,
                format!(
                    "unsupported record version {} (this build reads {})",
                    file.version, RECORD_VERSION
                ),
            ));
        }

        // Keys must agree with the record they hold.
        Ok(file
            .records
            .into_values()
            .map(|r| (r.key(), r))
            .collect())
    }

    pub fn get(&self, path: &Path) -> Option<FileRecord> {
        self.records.read().get(&record_key(path)).cloned()
    }

    /// All records, ordered by path.
    pub fn records(&self) -> Vec<FileRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Records for which `filter` holds, ordered by path.
    pub fn select(&self, filter: impl Fn(&FileRecord) -> bool) -> Vec<FileRecord> {
        self.records
            .read()
            .values()
            .filter(|r| filter(r))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Replace a record and write the store.
    pub fn put(&self, record: FileRecord) -> Result<()> {
        self.records.write().insert(record.key(), record);
        self.save()
    }

    /// Replace several records and write the store once.
    pub fn put_many(&self, records: impl IntoIterator<Item = FileRecord>) -> Result<usize> {
        let written = {
            let mut map = self.records.write();
            records
                .into_iter()
                .map(|r| map.insert(r.key(), r))
                .count()
        };
        if written > 0 {
            self.save()?;
        }
        Ok(written)
    }

    /// Remove the records for `paths` and write the store once.
    pub fn remove_all<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Result<usize> {
        let removed = {
            let mut records = self.records.write();
            paths
                .into_iter()
                .filter(|p| records.remove(&record_key(p)).is_some())
                .count()
        };
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    /// Write the whole store to disk atomically.
    pub fn save(&self) -> Result<()> {
        let _guard = self.write_lock.lock();

        let json = {
            let records = self.records.read();
            *self.unsaved.lock() = 0;
            #[derive(Serialize)]
            struct StoreFileRef<'a> {
                version: u32,
                records: &'a BTreeMap<String, FileRecord>,
            }
            serde_json::to_string_pretty(&StoreFileRef {
                version: RECORD_VERSION,
                records: &records,
            })?
        };

        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::store(&self.path, format!("failed to replace file: {}", e)))?;
        Ok(())
    }

    /// Replace a record, writing the file once enough records are waiting.
    /// Logs instead of failing.
    pub fn persist(&self, record: FileRecord) {
        let path = record.path.clone();
        self.records.write().insert(record.key(), record);
        let due = {
            let mut unsaved = self.unsaved.lock();
            *unsaved += 1;
            *unsaved >= self.flush_every
        };
        if due {
            if let Err(e) = self.save() {
                tracing::error!(path = %path.display(), "Failed to persist record: {}", e);
            }
        }
    }

    /// Number of persisted records not yet written to disk.
    pub fn unsaved(&self) -> usize {
        *self.unsaved.lock()
    }

    /// Write the file if any persisted record is waiting.
    pub fn flush(&self) -> Result<()> {
        if self.unsaved() > 0 {
            self.save()?;
        }
        Ok(())
    }
}
