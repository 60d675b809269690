//! Static display presets for ERA5 / ERA5-Land bands.
//!
//! Names and units follow the ECMWF ERA5-Land parameter listing as exposed in
//! Earth Engine (`ECMWF/ERA5_LAND/*`), plus the classic ERA5 daily aggregates.
//! Aggregated variants such as `temperature_2m_min` or `runoff_sum` resolve
//! through their base name: lookup is by longest prefix on `_` boundaries.

use crate::types::NEUTRAL_PALETTE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub prefix: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
    pub visual_min: f64,
    pub visual_max: f64,
    pub palette: &'static str,
}

const fn preset(
    prefix: &'static str,
    label: &'static str,
    unit: &'static str,
    description: &'static str,
    visual_min: f64,
    visual_max: f64,
    palette: &'static str,
) -> Preset {
    Preset {
        prefix,
        label,
        unit,
        description,
        visual_min,
        visual_max,
        palette,
    }
}

const J_M2: &str = "J/m²";

pub static PRESETS: &[Preset] = &[
    // Temperatures
    preset("temperature_2m", "Temperature (2m)", "K", "Air temperature at 2m above the surface", 250.0, 310.0, "thermal"),
    preset("dewpoint_temperature_2m", "Dewpoint (2m)", "K", "Dewpoint temperature at 2m above the surface", 240.0, 300.0, "thermal"),
    preset("skin_temperature", "Skin Temperature", "K", "Temperature of the surface of the Earth", 240.0, 320.0, "thermal"),
    preset("soil_temperature_level", "Soil Temperature", "K", "Temperature of the soil in the given layer", 250.0, 310.0, "thermal"),
    preset("temperature_of_snow_layer", "Snow Layer Temperature", "K", "Temperature of the snow layer", 230.0, 273.15, "thermal"),
    preset("lake_bottom_temperature", "Lake Bottom Temperature", "K", "Temperature of water at the bottom of inland water bodies", 270.0, 300.0, "thermal"),
    preset("lake_ice_temperature", "Lake Ice Temperature", "K", "Temperature of the uppermost surface of ice on inland water", 240.0, 273.15, "thermal"),
    preset("lake_mix_layer_temperature", "Lake Mix-Layer Temperature", "K", "Temperature of the upper mixed layer of inland water", 270.0, 305.0, "thermal"),
    preset("lake_total_layer_temperature", "Lake Temperature", "K", "Mean temperature of the total water column of inland water", 270.0, 305.0, "thermal"),
    preset("mean_2m_air_temperature", "Mean Temperature (2m)", "K", "Average air temperature at 2m", 250.0, 310.0, "thermal"),
    preset("minimum_2m_air_temperature", "Minimum Temperature (2m)", "K", "Minimum air temperature at 2m", 240.0, 300.0, "thermal"),
    preset("maximum_2m_air_temperature", "Maximum Temperature (2m)", "K", "Maximum air temperature at 2m", 255.0, 320.0, "thermal"),
    preset("dewpoint_2m_temperature", "Dewpoint (2m)", "K", "Dewpoint temperature at 2m", 240.0, 300.0, "thermal"),
    // Lakes
    preset("lake_ice_depth", "Lake Ice Depth", "m", "Thickness of ice on inland water bodies", 0.0, 2.0, "snow"),
    preset("lake_mix_layer_depth", "Lake Mix-Layer Depth", "m", "Thickness of the upper mixed layer of inland water", 0.0, 50.0, "runoff"),
    preset("lake_shape_factor", "Lake Shape Factor", "", "Shape of the temperature profile in the lake thermocline", 0.0, 1.0, NEUTRAL_PALETTE),
    // Snow
    preset("snow_depth", "Snow Depth", "m", "Depth of snow from the snow-covered area of a grid box", 0.0, 1.0, "snow"),
    preset("snow_depth_water_equivalent", "Snow Water Equivalent", "m", "Depth of snow as water equivalent", 0.0, 0.5, "snow"),
    preset("snow_cover", "Snow Cover", "%", "Fraction of the grid box covered by snow", 0.0, 100.0, "snow"),
    preset("snow_density", "Snow Density", "kg/m³", "Mass of snow per cubic metre in the snow layer", 100.0, 500.0, "snow"),
    preset("snow_albedo", "Snow Albedo", "", "Fraction of solar radiation reflected by snow", 0.0, 1.0, "albedo"),
    preset("snowfall", "Snowfall", "m", "Accumulated snowfall, water equivalent", 0.0, 0.05, "snow"),
    preset("snowmelt", "Snowmelt", "m", "Melting of snow, water equivalent", 0.0, 0.05, "snow"),
    preset("snow_evaporation", "Snow Evaporation", "m", "Evaporation from snow, water equivalent", -0.005, 0.0, "evaporation"),
    // Soil water
    preset("volumetric_soil_water_layer", "Soil Moisture", "m³/m³", "Volume of water in the soil layer", 0.0, 0.5, "soil_moisture"),
    preset("volumetric_soil_water_layer_1", "Soil Moisture (0-7cm)", "m³/m³", "Volume of water in soil layer 1 (0-7 cm)", 0.0, 0.5, "soil_moisture"),
    preset("volumetric_soil_water_layer_2", "Soil Moisture (7-28cm)", "m³/m³", "Volume of water in soil layer 2 (7-28 cm)", 0.0, 0.5, "soil_moisture"),
    preset("volumetric_soil_water_layer_3", "Soil Moisture (28-100cm)", "m³/m³", "Volume of water in soil layer 3 (28-100 cm)", 0.0, 0.5, "soil_moisture"),
    preset("volumetric_soil_water_layer_4", "Soil Moisture (100-289cm)", "m³/m³", "Volume of water in soil layer 4 (100-289 cm)", 0.0, 0.5, "soil_moisture"),
    preset("skin_reservoir_content", "Skin Reservoir Content", "m", "Water intercepted by vegetation and the surface", 0.0, 0.001, "soil_moisture"),
    // Pressure
    preset("surface_pressure", "Surface Pressure", "Pa", "Pressure of the atmosphere at the surface", 50000.0, 110000.0, "pressure"),
    preset("mean_sea_level_pressure", "Mean Sea Level Pressure", "Pa", "Atmospheric pressure reduced to mean sea level", 96000.0, 105000.0, "pressure"),
    // Wind
    preset("u_component_of_wind_10m", "Wind U (10m)", "m/s", "Eastward wind component at 10m", -20.0, 20.0, "wind"),
    preset("v_component_of_wind_10m", "Wind V (10m)", "m/s", "Northward wind component at 10m", -20.0, 20.0, "wind"),
    // Precipitation, evaporation and runoff
    preset("total_precipitation", "Total Precipitation", "m", "Accumulated liquid and frozen water falling to the surface", 0.0, 0.1, "precipitation"),
    preset("total_evaporation", "Evaporation", "m", "Accumulated evaporation, water equivalent (negative is evaporation)", -0.01, 0.0, "evaporation"),
    preset("potential_evaporation", "Potential Evaporation", "m", "Evaporation under saturated surface conditions", -0.02, 0.0, "evaporation"),
    preset("evaporation_from", "Evaporation Component", "m", "Partial evaporation flux, water equivalent", -0.01, 0.0, "evaporation"),
    preset("runoff", "Runoff", "m", "Water draining from the surface and subsurface", 0.0, 0.05, "runoff"),
    preset("surface_runoff", "Surface Runoff", "m", "Water draining over the soil surface", 0.0, 0.05, "runoff"),
    preset("sub_surface_runoff", "Sub-surface Runoff", "m", "Water draining beneath the soil surface", 0.0, 0.05, "runoff"),
    // Radiation and heat fluxes
    preset("surface_net_solar_radiation", "Solar Radiation", J_M2, "Net shortwave radiation reaching the surface", 0.0, 30_000_000.0, "radiation"),
    preset("surface_solar_radiation_downwards", "Downward Solar Radiation", J_M2, "Shortwave radiation reaching the surface", 0.0, 35_000_000.0, "radiation"),
    preset("surface_net_thermal_radiation", "Net Thermal Radiation", J_M2, "Net longwave radiation at the surface", -10_000_000.0, 0.0, "radiation"),
    preset("surface_thermal_radiation_downwards", "Downward Thermal Radiation", J_M2, "Longwave radiation reaching the surface", 10_000_000.0, 40_000_000.0, "radiation"),
    preset("surface_latent_heat_flux", "Latent Heat Flux", J_M2, "Exchange of latent heat with the surface", -15_000_000.0, 0.0, "radiation"),
    preset("surface_sensible_heat_flux", "Sensible Heat Flux", J_M2, "Turbulent heat exchange with the surface", -5_000_000.0, 5_000_000.0, "radiation"),
    // Vegetation and albedo
    preset("leaf_area_index_high_vegetation", "Leaf Area Index (high vegetation)", "m²/m²", "One-half of green leaf area per ground area, high vegetation", 0.0, 7.0, "vegetation"),
    preset("leaf_area_index_low_vegetation", "Leaf Area Index (low vegetation)", "m²/m²", "One-half of green leaf area per ground area, low vegetation", 0.0, 5.0, "vegetation"),
    preset("forecast_albedo", "Albedo", "", "Fraction of solar radiation reflected by the surface", 0.0, 1.0, "albedo"),
];

/// Find the preset whose prefix is the longest `_`-bounded prefix of `band`.
pub fn find_preset(band: &str) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .filter(|p| matches_prefix(band, p.prefix))
        .max_by_key(|p| p.prefix.len())
}

/// Variables the dashboard offers up front, by preset key.
pub static CURATED: &[&str] = &[
    "temperature_2m",
    "total_precipitation",
    "volumetric_soil_water_layer_1",
    "surface_pressure",
    "snow_depth",
    "total_evaporation",
    "runoff",
    "surface_net_solar_radiation",
];

/// Band names that may carry `key` in a collection, in preference order:
/// the key itself, its base (without `_mean` / `_sum`), then `base_mean`
/// and `base_sum`.
pub fn band_candidates(key: &str) -> Vec<String> {
    let base = key.strip_suffix("_mean").unwrap_or(key);
    let base = base.strip_suffix("_sum").unwrap_or(base);

    let mut candidates: Vec<String> = Vec::with_capacity(4);
    for candidate in [
        key.to_string(),
        base.to_string(),
        format!("{}_mean", base),
        format!("{}_sum", base),
    ] {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

fn matches_prefix(band: &str, prefix: &str) -> bool {
    match band.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('_'),
        None => false,
    }
}

/// Color ramps, as ordered hex stops
static PALETTES: &[(&str, &[&str])] = &[
    ("thermal", &["#0000ff", "#00ffff", "#ffff00", "#ff0000"]),
    ("precipitation", &["#ffffff", "#00fbff", "#0033ff"]),
    ("soil_moisture", &["#f7fbff", "#08306b"]),
    ("pressure", &["#fee5d9", "#fcae91", "#fb6a4a", "#cb181d"]),
    ("snow", &["#ffffff", "#ebf5fb", "#aed6f1", "#2e86c1"]),
    ("evaporation", &["#440154", "#21908d", "#fde725"]),
    ("runoff", &["#ffffcc", "#41b6c4", "#081d58"]),
    ("radiation", &["#000000", "#990000", "#ffcc00", "#ffffff"]),
    ("wind", &["#2166ac", "#f7f7f7", "#b2182b"]),
    ("vegetation", &["#ffffe5", "#78c679", "#004529"]),
    ("albedo", &["#000000", "#ffffff"]),
    (NEUTRAL_PALETTE, &["#f7f7f7", "#969696", "#252525"]),
];

/// Hex stops for a palette id; unknown ids get the neutral ramp.
pub fn palette_colors(id: &str) -> &'static [&'static str] {
    PALETTES
        .iter()
        .find(|(name, _)| *name == id)
        .or_else(|| PALETTES.iter().find(|(name, _)| *name == NEUTRAL_PALETTE))
        .map(|(_, colors)| *colors)
        .unwrap_or(&[])
}

pub fn is_known_palette(id: &str) -> bool {
    PALETTES.iter().any(|(name, _)| *name == id)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_exact_match() {
        let p = find_preset("temperature_2m").unwrap();
        assert_eq!(p.unit, "K");
        assert_eq!(p.palette, "thermal");
        assert_eq!(p.visual_min, 250.0);
        assert_eq!(p.visual_max, 310.0);
    }

    #[test]
    fn test_aggregate_suffix_uses_base_preset() {
        assert_eq!(find_preset("temperature_2m_max").unwrap().prefix, "temperature_2m");
        assert_eq!(
            find_preset("total_precipitation_sum").unwrap().label,
            "Total Precipitation"
        );
        assert_eq!(find_preset("runoff_sum").unwrap().prefix, "runoff");
    }

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(
            find_preset("snow_depth_water_equivalent").unwrap().prefix,
            "snow_depth_water_equivalent"
        );
        assert_eq!(find_preset("snow_depth").unwrap().prefix, "snow_depth");
        assert_eq!(
            find_preset("volumetric_soil_water_layer_1").unwrap().label,
            "Soil Moisture (0-7cm)"
        );
        assert_eq!(
            find_preset("surface_runoff_sum").unwrap().prefix,
            "surface_runoff"
        );
    }

    #[test]
    fn test_prefix_must_end_on_word_boundary() {
        assert!(find_preset("runoffs").is_none());
        assert!(find_preset("temperature_2meters").is_none());
    }

    #[test]
    fn test_band_candidates_order() {
        assert_eq!(
            band_candidates("total_precipitation"),
            vec!["total_precipitation", "total_precipitation_mean", "total_precipitation_sum"]
        );
        assert_eq!(
            band_candidates("runoff_sum"),
            vec!["runoff_sum", "runoff", "runoff_mean"]
        );
        assert_eq!(
            band_candidates("temperature_2m_mean"),
            vec!["temperature_2m_mean", "temperature_2m", "temperature_2m_sum"]
        );
    }

    #[test]
    fn test_curated_variables_have_presets() {
        for key in CURATED {
            assert_eq!(find_preset(key).map(|p| p.prefix), Some(*key));
        }
    }

    #[test]
    fn test_unknown_band() {
        assert!(find_preset("unknown_var").is_none());
        assert!(find_preset("").is_none());
    }

    #[test]
    fn test_presets_are_well_formed() {
        for p in PRESETS {
            assert!(p.visual_min < p.visual_max, "{} has an empty range", p.prefix);
            assert!(is_known_palette(p.palette), "{} uses an unknown palette", p.prefix);
        }
    }

    #[test]
    fn test_prefixes_are_unique() {
        let mut prefixes: Vec<_> = PRESETS.iter().map(|p| p.prefix).collect();
        prefixes.sort_unstable();
        let before = prefixes.len();
        prefixes.dedup();
        assert_eq!(before, prefixes.len());
    }

    #[test]
    fn test_palette_lookup() {
        assert_eq!(palette_colors("thermal").len(), 4);
        assert_eq!(palette_colors("does_not_exist"), palette_colors("neutral"));
        assert!(!palette_colors("neutral").is_empty());
    }
}
