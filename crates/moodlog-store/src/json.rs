//! JSON file store: the whole journal is one pretty-printed array.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use moodlog_core::{JournalEntry, Tags};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

/// File-backed journal.
///
/// Every write rewrites the file through a temp file in the same directory
/// followed by a rename, so readers never see a half-written journal. Appends
/// from one process are serialized; concurrent writers in separate processes
/// are not coordinated.
pub struct JsonStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open the journal at `path`, creating parent directories as needed.
    /// The file itself is created on first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        info!(path = %path.display(), "opened journal");
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in file order. A missing or blank file is an empty journal.
    pub fn entries(&self) -> Result<Vec<JournalEntry>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(vec![]);
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Persist a labelled entry and return it with its assigned id
    /// (one more than the largest existing id, starting at 1).
    pub fn append(
        &self,
        text: &str,
        tags: Tags,
        timestamp: DateTime<Utc>,
    ) -> Result<JournalEntry, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut entries = self.entries()?;
        let id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let entry = JournalEntry {
            id,
            timestamp,
            text: text.to_string(),
            tags,
        };
        entries.push(entry.clone());
        self.write_all(&entries)?;

        debug!(id, chars = text.chars().count(), "appended entry");
        Ok(entry)
    }

    /// Up to `limit` entries, newest first. Equal timestamps order by id, highest first.
    pub fn latest(&self, limit: usize) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries = self.entries()?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        entries.truncate(limit);
        Ok(entries)
    }

    fn write_all(&self, entries: &[JournalEntry]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(entries)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
