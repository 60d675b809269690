//! ERA5 variable catalog for the dashboard.
//!
//! Derives display metadata (unit, description, color scaling, palette) for
//! the bands of an Earth Engine collection, persists it next to the app and
//! serves read-only lookups to the view layer.

pub mod accessor;
pub mod builder;
pub mod context;
pub mod error;
pub mod months;
pub mod presets;
pub mod provider;
pub mod retry;
pub mod store;
pub mod types;

pub use accessor::CatalogAccessor;
pub use builder::{CatalogBuilder, MetadataSource};
pub use context::CatalogContext;
pub use error::CatalogError;
pub use months::month_starts;
pub use presets::{band_candidates, find_preset, is_known_palette, palette_colors, Preset, CURATED};
pub use provider::{BandProvider, EarthEngineProvider, ProviderBand, TemporalExtent};
pub use store::CatalogStore;
pub use types::{CatalogStatus, VariableRecord};
