//! Read-only view of the catalog handed to the view layer.

use tracing::debug;

use crate::error::CatalogError;
use crate::presets::{band_candidates, CURATED};
use crate::store::RecordMap;
use crate::types::{CatalogStatus, VariableRecord};

#[derive(Debug, Clone)]
pub struct CatalogAccessor {
    records: RecordMap,
    status: CatalogStatus,
}

impl CatalogAccessor {
    pub fn new(records: RecordMap, status: CatalogStatus) -> Self {
        Self { records, status }
    }

    /// Accessor with no records; every lookup yields the default record.
    pub fn unavailable() -> Self {
        Self::new(RecordMap::new(), CatalogStatus::Unavailable)
    }

    /// Record for `key`, or the default record when the key is unknown.
    ///
    /// Never fails: the view can always render a unit, a range and a palette.
    pub fn lookup(&self, key: &str) -> VariableRecord {
        match self.records.get(key) {
            Some(record) => record.clone(),
            None => {
                debug!(key, "Variable not in catalog, using default record");
                VariableRecord::unknown(key)
            }
        }
    }

    /// Strict lookup for callers that need to tell known and unknown keys apart.
    pub fn get(&self, key: &str) -> Result<&VariableRecord, CatalogError> {
        self.records
            .get(key)
            .ok_or_else(|| CatalogError::UnknownVariable(key.to_string()))
    }

    /// Band that carries the variable `preset_key` in this catalog, trying
    /// the exact key first and then its aggregate spellings.
    pub fn resolve(&self, preset_key: &str) -> Option<&str> {
        band_candidates(preset_key)
            .iter()
            .find_map(|candidate| self.records.get_key_value(candidate.as_str()))
            .map(|(band, _)| band.as_str())
    }

    /// Curated variables with no matching band, in curated order.
    pub fn missing_presets(&self) -> Vec<&'static str> {
        CURATED
            .iter()
            .copied()
            .filter(|key| self.resolve(key).is_none())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Known band keys in sorted order, for the variable selector.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
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

    pub fn status(&self) -> CatalogStatus {
        self.status
    }
}
