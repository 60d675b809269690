//! Catalog builder: turns provider bands into variable records.
//!
//! Every field is resolved through the same fallback chain, in order:
//! provider metadata, the static preset table, the generic default.

use std::time::Duration;

use tracing::{debug, info};

use era5_core::ProviderConfig;

use crate::error::CatalogError;
use crate::presets::{find_preset, Preset};
use crate::provider::{BandProvider, ProviderBand};
use crate::store::RecordMap;
use crate::types::{VariableRecord, NEUTRAL_PALETTE};

/// One link of the fallback chain.
#[derive(Debug, Clone, Copy)]
pub enum MetadataSource<'a> {
    Provider(&'a ProviderBand),
    Preset(&'static Preset),
    Generic,
}

impl<'a> MetadataSource<'a> {
    /// Sources for `band`, highest priority first. Always ends with `Generic`.
    pub fn chain(band: &'a ProviderBand) -> Vec<MetadataSource<'a>> {
        let mut chain = vec![MetadataSource::Provider(band)];
        if let Some(preset) = find_preset(&band.name) {
            chain.push(MetadataSource::Preset(preset));
        }
        chain.push(MetadataSource::Generic);
        chain
    }

    fn unit(&self) -> Option<String> {
        match self {
            Self::Provider(band) => non_blank(band.unit.as_deref()),
            Self::Preset(preset) => Some(preset.unit.to_string()),
            Self::Generic => Some(String::new()),
        }
    }

    fn description(&self, key: &str) -> Option<String> {
        match self {
            Self::Provider(band) => non_blank(band.description.as_deref()),
            Self::Preset(preset) => Some(preset.description.to_string()),
            Self::Generic => Some(humanize(key)),
        }
    }

    fn range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Provider(band) => match (band.visual_min, band.visual_max) {
                (Some(min), Some(max)) if min.is_finite() && max.is_finite() && min < max => {
                    Some((min, max))
                }
                _ => None,
            },
            Self::Preset(preset) => Some((preset.visual_min, preset.visual_max)),
            Self::Generic => Some((0.0, 1.0)),
        }
    }

    // Provider palettes are raw color lists, not ramp ids, so they never win here.
    fn palette(&self) -> Option<String> {
        match self {
            Self::Provider(_) => None,
            Self::Preset(preset) => Some(preset.palette.to_string()),
            Self::Generic => Some(NEUTRAL_PALETTE.to_string()),
        }
    }

    fn label(&self) -> Option<String> {
        match self {
            Self::Provider(_) => None,
            Self::Preset(preset) => Some(preset.label.to_string()),
            Self::Generic => Some(String::new()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// "snow_cover" -> "Snow cover"
fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn resolve<'a, T>(
    chain: &[MetadataSource<'a>],
    field: impl Fn(&MetadataSource<'a>) -> Option<T>,
    fallback: T,
) -> T {
    chain.iter().find_map(field).unwrap_or(fallback)
}

/// Derive the record for one provider band.
pub fn derive_record(band: &ProviderBand) -> VariableRecord {
    let key = band.name.as_str();
    let chain = MetadataSource::chain(band);

    let (visual_min, visual_max) = resolve(&chain, MetadataSource::range, (0.0, 1.0));

    VariableRecord {
        key: key.to_string(),
        label: resolve(&chain, MetadataSource::label, String::new()),
        unit: resolve(&chain, MetadataSource::unit, String::new()),
        description: resolve(&chain, |s| s.description(key), humanize(key)),
        visual_min,
        visual_max,
        palette: resolve(&chain, MetadataSource::palette, NEUTRAL_PALETTE.to_string()),
    }
}

pub struct CatalogBuilder<P> {
    provider: P,
    timeout: Duration,
}

impl<P: BandProvider> CatalogBuilder<P> {
    /// `timeout` bounds the whole provider exchange of one build.
    pub fn new(provider: P, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Builder whose budget is the configured provider timeout.
    pub fn configured(provider: P, config: &ProviderConfig) -> Self {
        Self::new(provider, config.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Query the provider and derive one record per distinct band.
    pub async fn build(&self) -> Result<RecordMap, CatalogError> {
        let bands = tokio::time::timeout(self.timeout, self.provider.list_bands())
            .await
            .map_err(|_| {
                CatalogError::provider(format!("band listing timed out after {:?}", self.timeout))
            })??;

        let mut records = RecordMap::new();
        for band in &bands {
            let name = band.name.trim();
            if name.is_empty() {
                debug!("Skipping band without a name");
                continue;
            }
            if records.contains_key(name) {
                debug!(band = name, "Skipping duplicate band");
                continue;
            }
            let band = ProviderBand {
                name: name.to_string(),
                ..band.clone()
            };
            records.insert(band.name.clone(), derive_record(&band));
        }

        if records.is_empty() {
            return Err(CatalogError::provider("provider returned no usable bands"));
        }

        info!(count = records.len(), "Built variable catalog");
        Ok(records)
    }
}
