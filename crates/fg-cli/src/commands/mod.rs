//! Command handler modules for fieldgate.
//!
//! Shared utilities used by multiple command paths live here.

pub mod check;

use anyhow::{Context, Result};
use fg_config::{
    load_layered_yaml, report_unused_keys, ConfigSurface, FieldGateConfig, UnusedKeyPolicy,
};
use fg_schemas::Coordinate;
use tracing::warn;

/// Logs go to stderr so stdout stays machine-readable. Default level: warn.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

/// Load, validate and type the layered config. Returns the config and its hash.
pub fn load_config(paths: &[String]) -> Result<(FieldGateConfig, String)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(
        ConfigSurface::Cli,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }

    let config = FieldGateConfig::from_loaded(&loaded)?;
    Ok((config, loaded.config_hash))
}

/// Parse "lat,lon" into a validated coordinate.
pub fn parse_lat_lon(s: &str) -> Result<Coordinate> {
    let (lat, lon) = s
        .split_once(',')
        .with_context(|| format!("expected 'lat,lon', got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("invalid longitude '{}'", lon.trim()))?;
    Ok(Coordinate::validated(lat, lon)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lat_lon_accepts_spaces_and_negatives() {
        let c = parse_lat_lon(" 40.7128 , -74.0060 ").unwrap();
        assert_eq!(c, Coordinate::new(40.7128, -74.0060));
    }

    #[test]
    fn parse_lat_lon_rejects_garbage() {
        assert!(parse_lat_lon("40.7").is_err());
        assert!(parse_lat_lon("north,west").is_err());
        assert!(parse_lat_lon("100,0").is_err());
    }
}
