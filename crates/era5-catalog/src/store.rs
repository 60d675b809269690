//! File-backed catalog store.
//!
//! The file is a JSON object mapping band key to record body. It is only ever
//! replaced as a whole: the new content goes to a temporary file in the same
//! directory, is synced, and is renamed over the old one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::types::VariableRecord;

pub type RecordMap = BTreeMap<String, VariableRecord>;

#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    records: RecordMap,
    modified: Option<SystemTime>,
    corrupt: bool,
}

impl CatalogStore {
    /// Open the store at `path`.
    ///
    /// A missing file gives an empty store. An unreadable or malformed file
    /// also gives an empty store, flagged corrupt so the next access rebuilds.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read(&path) {
            Ok(Some((records, modified))) => {
                debug!(path = %path.display(), count = records.len(), "Loaded variable catalog");
                Self {
                    path,
                    records,
                    modified,
                    corrupt: false,
                }
            }
            Ok(None) => {
                debug!(path = %path.display(), "No variable catalog on disk");
                Self::empty(path, false)
            }
            Err(e) => {
                warn!("{}; treating catalog as absent", e);
                Self::empty(path, true)
            }
        }
    }

    fn empty(path: PathBuf, corrupt: bool) -> Self {
        Self {
            path,
            records: RecordMap::new(),
            modified: None,
            corrupt,
        }
    }

    /// Parse the catalog file. `Ok(None)` means there is no file.
    pub fn read(path: &Path) -> Result<Option<(RecordMap, Option<SystemTime>)>, CatalogError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CatalogError::corrupt(path, e.to_string())),
        };

        let mut records: RecordMap = serde_json::from_str(&contents)
            .map_err(|e| CatalogError::corrupt(path, e.to_string()))?;

        for (key, record) in records.iter_mut() {
            record.key.clone_from(key);
            if !record.has_valid_range() {
                return Err(CatalogError::corrupt(
                    path,
                    format!("record {} has an invalid visual range", key),
                ));
            }
        }

        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Some((records, modified)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&VariableRecord> {
        self.records.get(key)
    }

    pub fn records(&self) -> &RecordMap {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The file existed but could not be used.
    pub fn was_corrupt(&self) -> bool {
        self.corrupt
    }

    /// Whether the next access should rebuild.
    ///
    /// Empty or corrupt stores are always stale; otherwise the file is stale
    /// once older than `max_age`. A zero `max_age` disables the age check.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        if self.corrupt || self.records.is_empty() {
            return true;
        }
        if max_age.is_zero() {
            return false;
        }
        match self.modified.and_then(|m| m.elapsed().ok()) {
            Some(age) => age > max_age,
            // Modified time in the future or unsupported: trust the file
            None => false,
        }
    }

    /// Replace the whole catalog.
    ///
    /// Records are validated first; nothing touches the disk if any is invalid.
    pub fn put_all(&mut self, records: RecordMap) -> Result<(), CatalogError> {
        for (key, record) in &records {
            if record.key != *key {
                return Err(CatalogError::invalid_record(
                    key,
                    format!("record carries key {}", record.key),
                ));
            }
            if !record.has_valid_range() {
                return Err(CatalogError::invalid_record(
                    key,
                    format!("invalid range {}..{}", record.visual_min, record.visual_max),
                ));
            }
        }

        let json = serialize(&records)?;
        write_atomic(&self.path, json.as_bytes())?;

        info!(path = %self.path.display(), count = records.len(), "Persisted variable catalog");
        self.modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        self.records = records;
        self.corrupt = false;
        Ok(())
    }
}

/// Deterministic rendering: sorted keys, pretty JSON, trailing newline.
pub fn serialize(records: &RecordMap) -> Result<String, CatalogError> {
    let mut json = serde_json::to_string_pretty(records)
        .map_err(|e| CatalogError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?;
    json.push('\n');
    Ok(json)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CatalogError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".catalog-")
        .suffix(".tmp")
        .tempfile_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CatalogError::Io(e.error))?;
    Ok(())
}
