use crate::error::{NearmatchError, Result};
use crate::models::Crs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "nearmatch.toml";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Spatial index used for candidate lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// R-tree over the candidate points, O(log m) per query
    #[default]
    #[serde(rename = "rtree")]
    RTree,
    /// Linear scan, O(m) per query
    #[serde(rename = "brute-force")]
    BruteForce,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::RTree => f.write_str("rtree"),
            IndexKind::BruteForce => f.write_str("brute-force"),
        }
    }
}

impl FromStr for IndexKind {
    type Err = NearmatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rtree" | "r-tree" => Ok(IndexKind::RTree),
            "brute-force" | "brute_force" | "bruteforce" => Ok(IndexKind::BruteForce),
            _ => Err(NearmatchError::ConfigInvalid {
                key: "index".to_string(),
                reason: format!("Invalid index kind: {}. Use rtree or brute-force", s),
            }),
        }
    }
}

/// Layered configuration for nearmatch
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub index: ConfigValue<IndexKind>,
    pub with_distance: ConfigValue<bool>,
    pub lon_column: ConfigValue<String>,
    pub lat_column: ConfigValue<String>,
    pub csv_crs: ConfigValue<Option<Crs>>,
    pub iqr_multiplier: ConfigValue<f64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            index: ConfigValue::new(IndexKind::RTree, ConfigSource::Default),
            with_distance: ConfigValue::new(true, ConfigSource::Default),
            lon_column: ConfigValue::new("longitude".to_string(), ConfigSource::Default),
            lat_column: ConfigValue::new("latitude".to_string(), ConfigSource::Default),
            csv_crs: ConfigValue::new(None, ConfigSource::Default),
            iqr_multiplier: ConfigValue::new(1.5, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| NearmatchError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| NearmatchError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(index) = file_config.index {
            self.index.update(index, ConfigSource::File);
        }

        if let Some(with_distance) = file_config.with_distance {
            self.with_distance.update(with_distance, ConfigSource::File);
        }

        if let Some(lon_column) = file_config.lon_column {
            self.lon_column.update(lon_column, ConfigSource::File);
        }

        if let Some(lat_column) = file_config.lat_column {
            self.lat_column.update(lat_column, ConfigSource::File);
        }

        if let Some(csv_crs) = file_config.csv_crs {
            self.csv_crs.update(Some(csv_crs), ConfigSource::File);
        }

        if let Some(multiplier) = file_config.iqr_multiplier {
            validate_multiplier(multiplier)?;
            self.iqr_multiplier.update(multiplier, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load the file only if it exists
    pub fn load_from_file_if_exists<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().exists() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // NEARMATCH_INDEX
        if let Ok(index_str) = env::var("NEARMATCH_INDEX") {
            match index_str.parse::<IndexKind>() {
                Ok(index) => self.index.update(index, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid NEARMATCH_INDEX value '{}': expected rtree or brute-force",
                    index_str
                ),
            }
        }

        // NEARMATCH_WITH_DISTANCE
        if let Ok(flag) = env::var("NEARMATCH_WITH_DISTANCE") {
            match parse_bool(&flag) {
                Some(value) => self.with_distance.update(value, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid NEARMATCH_WITH_DISTANCE value '{}': expected true or false",
                    flag
                ),
            }
        }

        if let Ok(column) = env::var("NEARMATCH_LON_COLUMN") {
            self.lon_column.update(column, ConfigSource::Environment);
        }

        if let Ok(column) = env::var("NEARMATCH_LAT_COLUMN") {
            self.lat_column.update(column, ConfigSource::Environment);
        }

        // NEARMATCH_CSV_CRS
        if let Ok(crs_str) = env::var("NEARMATCH_CSV_CRS") {
            match crs_str.parse::<Crs>() {
                Ok(crs) => self.csv_crs.update(Some(crs), ConfigSource::Environment),
                Err(_) => tracing::warn!("Invalid NEARMATCH_CSV_CRS value '{}'", crs_str),
            }
        }

        // NEARMATCH_IQR_MULTIPLIER
        if let Ok(raw) = env::var("NEARMATCH_IQR_MULTIPLIER") {
            match raw.parse::<f64>().ok().filter(|m| validate_multiplier(*m).is_ok()) {
                Some(multiplier) => {
                    self.iqr_multiplier.update(multiplier, ConfigSource::Environment)
                }
                None => tracing::warn!(
                    "Invalid NEARMATCH_IQR_MULTIPLIER value '{}': expected a non-negative number",
                    raw
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(index) = overrides.index {
            self.index.update(index, ConfigSource::Cli);
        }

        if let Some(with_distance) = overrides.with_distance {
            self.with_distance.update(with_distance, ConfigSource::Cli);
        }

        if let Some(lon_column) = overrides.lon_column {
            self.lon_column.update(lon_column, ConfigSource::Cli);
        }

        if let Some(lat_column) = overrides.lat_column {
            self.lat_column.update(lat_column, ConfigSource::Cli);
        }

        if let Some(csv_crs) = overrides.csv_crs {
            self.csv_crs.update(Some(csv_crs), ConfigSource::Cli);
        }

        if let Some(multiplier) = overrides.iqr_multiplier {
            self.iqr_multiplier.update(multiplier, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("index".to_string(), (self.index.value.to_string(), self.index.source));

        map.insert(
            "with_distance".to_string(),
            (self.with_distance.value.to_string(), self.with_distance.source),
        );

        map.insert("lon_column".to_string(), (self.lon_column.value.clone(), self.lon_column.source));

        map.insert("lat_column".to_string(), (self.lat_column.value.clone(), self.lat_column.source));

        map.insert(
            "csv_crs".to_string(),
            (
                self.csv_crs.value.as_ref().map_or_else(|| "none".to_string(), |c| c.to_string()),
                self.csv_crs.source,
            ),
        );

        map.insert(
            "iqr_multiplier".to_string(),
            (self.iqr_multiplier.value.to_string(), self.iqr_multiplier.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    index: Option<IndexKind>,
    with_distance: Option<bool>,
    lon_column: Option<String>,
    lat_column: Option<String>,
    csv_crs: Option<Crs>,
    iqr_multiplier: Option<f64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub index: Option<IndexKind>,
    pub with_distance: Option<bool>,
    pub lon_column: Option<String>,
    pub lat_column: Option<String>,
    pub csv_crs: Option<Crs>,
    pub iqr_multiplier: Option<f64>,
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate_multiplier(multiplier: f64) -> Result<()> {
    if multiplier.is_finite() && multiplier >= 0.0 {
        Ok(())
    } else {
        Err(NearmatchError::ConfigInvalid {
            key: "iqr_multiplier".to_string(),
            reason: format!("Expected a non-negative number, got {}", multiplier),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.index.value, IndexKind::RTree);
        assert_eq!(config.index.source, ConfigSource::Default);
        assert!(config.with_distance.value);
        assert_eq!(config.lon_column.value, "longitude");
        assert_eq!(config.csv_crs.value, None);
        assert_eq!(config.iqr_multiplier.value, 1.5);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        // CLI should override environment
        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
index = "brute-force"
with_distance = false
lon_column = "lon"
lat_column = "lat"
csv_crs = "EPSG:4326"
iqr_multiplier = 3.0
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.index.value, IndexKind::BruteForce);
        assert_eq!(config.index.source, ConfigSource::File);
        assert!(!config.with_distance.value);
        assert_eq!(config.lon_column.value, "lon");
        assert_eq!(config.lat_column.value, "lat");
        assert_eq!(config.csv_crs.value, Some(Crs::wgs84()));
        assert_eq!(config.iqr_multiplier.value, 3.0);
    }

    #[test]
    fn test_load_from_file_rejects_negative_multiplier() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "iqr_multiplier = -1.0").unwrap();

        let result = LayeredConfig::with_defaults().load_from_file(file.path());
        assert!(matches!(result, Err(NearmatchError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_missing_optional_file_keeps_defaults() {
        let config = LayeredConfig::with_defaults()
            .load_from_file_if_exists("/nonexistent/nearmatch.toml")
            .unwrap();
        assert_eq!(config.index.source, ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            index: Some(IndexKind::BruteForce),
            csv_crs: Some(Crs::Epsg(32635)),
            ..Default::default()
        });

        assert_eq!(config.index.value, IndexKind::BruteForce);
        assert_eq!(config.index.source, ConfigSource::Cli);
        assert_eq!(config.csv_crs.value, Some(Crs::Epsg(32635)));
        assert_eq!(config.with_distance.source, ConfigSource::Default);
    }

    #[test]
    fn test_parse_index_kind() {
        assert_eq!("rtree".parse::<IndexKind>().unwrap(), IndexKind::RTree);
        assert_eq!("BRUTE-FORCE".parse::<IndexKind>().unwrap(), IndexKind::BruteForce);
        assert_eq!("brute_force".parse::<IndexKind>().unwrap(), IndexKind::BruteForce);
        assert!("kdtree".parse::<IndexKind>().is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert_eq!(map.len(), 6);
        let (csv_crs, source) = &map["csv_crs"];
        assert_eq!(csv_crs, "none");
        assert_eq!(*source, ConfigSource::Default);
        assert_eq!(map["index"].0, "rtree");
    }
}
