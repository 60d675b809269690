use serde::{Deserialize, Serialize};

/// Palette used when nothing better is known about a band.
pub const NEUTRAL_PALETTE: &str = "neutral";

/// Description given to variables missing from the catalog.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown variable";

/// Display metadata for one band of the collection.
///
/// In the persisted catalog the key is the map key, so it is not written
/// inside the record body; [`CatalogStore`](crate::CatalogStore) fills it in on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    #[serde(default, skip_serializing)]
    pub key: String,

    /// Short display name, e.g. "Temperature (2m)"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,

    pub unit: String,
    pub description: String,
    pub visual_min: f64,
    pub visual_max: f64,
    pub palette: String,
}

impl VariableRecord {
    /// The record served for keys the catalog does not know.
    ///
    /// Generic unit (empty), "Unknown variable", range 0..1 and the neutral palette.
    pub fn unknown(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            unit: String::new(),
            description: UNKNOWN_DESCRIPTION.to_string(),
            visual_min: 0.0,
            visual_max: 1.0,
            palette: NEUTRAL_PALETTE.to_string(),
        }
    }

    /// Label for legends and selectors; falls back to the band key.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }

    /// Axis title such as "Temperature (2m) [K]".
    pub fn axis_title(&self) -> String {
        if self.unit.is_empty() {
            self.display_label().to_string()
        } else {
            format!("{} [{}]", self.display_label(), self.unit)
        }
    }

    /// Both bounds finite and ordered.
    pub fn has_valid_range(&self) -> bool {
        self.visual_min.is_finite()
            && self.visual_max.is_finite()
            && self.visual_min <= self.visual_max
    }
}

/// How the accessor currently being served was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    /// Fresh catalog read from disk
    Cached,
    /// Built from the provider and persisted
    Rebuilt,
    /// Built from the provider but the write failed; memory only
    Unpersisted,
    /// Provider unavailable; an outdated or partial catalog is served
    Stale,
    /// Provider unavailable and nothing on disk; every lookup is the default record
    Unavailable,
}

impl CatalogStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Stale | Self::Unavailable)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Cached => "Variable catalog loaded from cache",
            Self::Rebuilt => "Variable catalog refreshed from Earth Engine",
            Self::Unpersisted => "Variable catalog refreshed but could not be saved",
            Self::Stale => "Earth Engine unreachable; showing cached variables",
            Self::Unavailable => "Earth Engine unreachable; variable details unavailable",
        }
    }
}
