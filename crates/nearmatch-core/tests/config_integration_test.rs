//! Integration tests for layered configuration
//!
//! Precedence is CLI arguments > environment variables > config file > defaults.

use nearmatch_core::config::{CliConfigOverrides, ConfigSource, IndexKind, LayeredConfig};
use nearmatch_core::models::Crs;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_KEYS: [&str; 6] = [
    "NEARMATCH_INDEX",
    "NEARMATCH_WITH_DISTANCE",
    "NEARMATCH_LON_COLUMN",
    "NEARMATCH_LAT_COLUMN",
    "NEARMATCH_CSV_CRS",
    "NEARMATCH_IQR_MULTIPLIER",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
index = "brute-force"
csv_crs = "EPSG:32633"
"#
    )
    .unwrap();

    env::set_var("NEARMATCH_INDEX", "rtree");

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    assert_eq!(config.index.value, IndexKind::RTree);
    assert_eq!(config.index.source, ConfigSource::Environment);
    assert_eq!(config.csv_crs.value, Some(Crs::Epsg(32633)));
    assert_eq!(config.csv_crs.source, ConfigSource::File);

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var("NEARMATCH_WITH_DISTANCE", "false");
    env::set_var("NEARMATCH_CSV_CRS", "EPSG:4326");

    let mut config = LayeredConfig::with_defaults().load_from_env();
    assert!(!config.with_distance.value);
    assert_eq!(config.with_distance.source, ConfigSource::Environment);

    config.update_from_cli(CliConfigOverrides {
        with_distance: Some(true),
        ..Default::default()
    });

    assert!(config.with_distance.value);
    assert_eq!(config.with_distance.source, ConfigSource::Cli);
    assert_eq!(config.csv_crs.value, Some(Crs::wgs84()));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_values_are_ignored() {
    clear_env();
    env::set_var("NEARMATCH_INDEX", "kd-tree");
    env::set_var("NEARMATCH_IQR_MULTIPLIER", "-2");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.index.value, IndexKind::RTree);
    assert_eq!(config.index.source, ConfigSource::Default);
    assert_eq!(config.iqr_multiplier.value, 1.5);
    assert_eq!(config.iqr_multiplier.source, ConfigSource::Default);

    clear_env();
}

#[test]
#[serial]
fn test_coordinate_columns_from_env() {
    clear_env();
    env::set_var("NEARMATCH_LON_COLUMN", "lng");
    env::set_var("NEARMATCH_LAT_COLUMN", "lat");

    let config = LayeredConfig::with_defaults().load_from_env();
    assert_eq!(config.lon_column.value, "lng");
    assert_eq!(config.lat_column.value, "lat");

    clear_env();
}
