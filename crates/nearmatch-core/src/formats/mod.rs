//! Format abstraction layer for dataset inputs
//!
//! Each format implements the `FormatReader` trait, and the `FormatRegistry`
//! manages format detection and dispatching to the appropriate reader.
//! Readers turn files into [`Dataset`]s; everything downstream of them works
//! on the in-memory model only.

use std::path::Path;

use crate::config::LayeredConfig;
use crate::error::{NearmatchError, Result};
use crate::models::{Crs, Dataset};

pub mod csv;
pub mod geojson;
pub mod results;
pub mod shapefile;
pub mod validation;

/// Format reader trait that all format implementations must implement
pub trait FormatReader: Send + Sync {
    /// Read a dataset from the given path
    fn read(&self, path: &Path) -> Result<Dataset>;

    /// Get supported file extensions (e.g., ["shp"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "Shapefile", "GeoJSON")
    fn format_name(&self) -> &str;

    /// Validate file structure without a full read
    fn validate(&self, _path: &Path) -> Result<FormatValidation> {
        Ok(FormatValidation::default())
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Options shared by readers that need outside knowledge of the file
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Column holding longitudes in CSV inputs
    pub lon_column: String,

    /// Column holding latitudes in CSV inputs
    pub lat_column: String,

    /// CRS assigned to CSV inputs; CSV files carry none of their own
    pub csv_crs: Option<Crs>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            lon_column: "longitude".to_string(),
            lat_column: "latitude".to_string(),
            csv_crs: None,
        }
    }
}

impl From<&LayeredConfig> for ReadOptions {
    fn from(config: &LayeredConfig) -> Self {
        Self {
            lon_column: config.lon_column.value.clone(),
            lat_column: config.lat_column.value.clone(),
            csv_crs: config.csv_crs.value.clone(),
        }
    }
}

/// Central registry for format readers
pub struct FormatRegistry {
    readers: Vec<Box<dyn FormatReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry with the GeoJSON, Shapefile and CSV readers
    pub fn with_defaults(options: ReadOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(geojson::GeoJsonReader));
        registry.register(Box::new(shapefile::ShapefileFormatReader));
        registry.register(Box::new(csv::CsvReader::new(options)));
        registry
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn FormatReader>) {
        self.readers.push(reader);
    }

    /// Detect format and return appropriate reader
    pub fn detect_format(&self, path: &Path) -> Result<&dyn FormatReader> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| NearmatchError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            })?;

        self.readers
            .iter()
            .find(|r| r.supported_extensions().contains(&extension.as_str()))
            .map(|r| r.as_ref())
            .ok_or_else(|| NearmatchError::UnsupportedFormat {
                extension,
                supported: self.supported_formats(),
            })
    }

    /// Detect, validate and read in one step
    pub fn read(&self, path: &Path) -> Result<Dataset> {
        let reader = self.detect_format(path)?;

        let validation = reader.validate(path)?;
        for warning in &validation.warnings {
            tracing::warn!("{}: {}", path.display(), warning);
        }
        if !validation.is_valid() {
            return Err(NearmatchError::FormatError {
                format: reader.format_name().to_string(),
                message: validation.errors.join("; "),
            });
        }

        let dataset = reader.read(path)?;
        tracing::debug!(
            format = reader.format_name(),
            rows = dataset.len(),
            "read {} from {}",
            dataset.kind_name(),
            path.display()
        );
        Ok(dataset)
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

    /// Get all registered readers
    pub fn readers(&self) -> &[Box<dyn FormatReader>] {
        &self.readers
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults(ReadOptions::default())
    }
}

/// Dataset name from a file stem
pub(crate) fn dataset_name(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;

    struct MockReader {
        extensions: Vec<&'static str>,
        name: &'static str,
    }

    impl FormatReader for MockReader {
        fn read(&self, _path: &Path) -> Result<Dataset> {
            Ok(Dataset::Tabular(Table::default()))
        }

        fn supported_extensions(&self) -> &[&str] {
            &self.extensions
        }

        fn format_name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn test_format_registration() {
        let mut registry = FormatRegistry::new();
        registry.register(Box::new(MockReader { extensions: vec!["json", "geojson"], name: "GeoJSON" }));

        assert_eq!(registry.readers().len(), 1);
        assert_eq!(registry.supported_formats(), vec!["json", "geojson"]);
    }

    #[test]
    fn test_default_registry_detection() {
        let registry = FormatRegistry::default();

        assert_eq!(registry.detect_format(Path::new("rentals.geojson")).unwrap().format_name(), "GeoJSON");
        assert_eq!(registry.detect_format(Path::new("centers.SHP")).unwrap().format_name(), "Shapefile");
        assert_eq!(registry.detect_format(Path::new("listings.csv")).unwrap().format_name(), "CSV");
    }

    #[test]
    fn test_unsupported_format() {
        let registry = FormatRegistry::default();
        let err = registry.detect_format(Path::new("districts.gpkg")).err().unwrap();
        assert!(matches!(err, NearmatchError::UnsupportedFormat { ref extension, .. } if extension == "gpkg"));
        assert!(registry.detect_format(Path::new("README")).is_err());
    }

    #[test]
    fn test_format_validation_with_warnings() {
        let validation = FormatValidation {
            errors: vec![],
            warnings: vec!["No .prj file, CRS is unknown".to_string()],
        };
        assert!(validation.is_valid());
        assert!(validation.has_warnings());
    }
}
