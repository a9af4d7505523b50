//! CSV format reader implementation
//!
//! A CSV file with both coordinate columns becomes a point collection; any
//! other CSV is read as an attribute-only table. CSV carries no CRS, so the
//! one configured in [`ReadOptions`] is attached (or none at all).

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{NearmatchError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{dataset_name, FormatReader, FormatValidation, ReadOptions};
use crate::models::{Dataset, Geometry, SpatialCollection, SpatialEntity, Table};

/// CSV format reader
pub struct CsvReader {
    options: ReadOptions,
}

impl CsvReader {
    pub fn new(options: ReadOptions) -> Self {
        Self { options }
    }
}

impl FormatReader for CsvReader {
    fn read(&self, path: &Path) -> Result<Dataset> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(::csv::Trim::All)
            .from_path(path)
            .map_err(csv_error)?;

        let columns: Vec<String> =
            reader.headers().map_err(csv_error)?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let row: Map<String, Value> = columns
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| (column.clone(), parse_cell(cell)))
                .collect();
            rows.push(row);
        }

        let name = dataset_name(path);
        let has_coordinates = columns.contains(&self.options.lon_column)
            && columns.contains(&self.options.lat_column);

        if !has_coordinates {
            tracing::debug!(
                "{} has no {}/{} columns, reading as a table",
                path.display(),
                self.options.lon_column,
                self.options.lat_column
            );
            return Ok(Dataset::Tabular(Table { name, columns, rows }));
        }

        let entities = rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut attributes)| {
                let x = coordinate(&mut attributes, &self.options.lon_column, idx)?;
                let y = coordinate(&mut attributes, &self.options.lat_column, idx)?;
                Ok(SpatialEntity { attributes, geometry: Some(Geometry::point(x, y)) })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Dataset::Spatial(
            SpatialCollection::new(name, self.options.csv_crs.clone()).with_entities(entities),
        ))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["csv"]
    }

    fn format_name(&self) -> &str {
        "CSV"
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let mut validation = FormatValidator::validate_file_exists(path);
        if validation.is_valid() && self.options.csv_crs.is_none() {
            validation
                .warnings
                .push("No CRS configured for CSV input (set csv_crs)".to_string());
        }
        Ok(validation)
    }
}

fn csv_error(e: ::csv::Error) -> NearmatchError {
    NearmatchError::FormatError { format: "CSV".to_string(), message: e.to_string() }
}

/// Numbers become JSON numbers, blanks become null, the rest stays text
fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

/// Take a coordinate column out of the attribute bag
fn coordinate(attributes: &mut Map<String, Value>, column: &str, row: usize) -> Result<f64> {
    match attributes.remove(column) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| NearmatchError::InvalidCoordinate {
            row,
            reason: format!("{} is not representable as a float", column),
        }),
        Some(Value::Null) | None => Err(NearmatchError::InvalidCoordinate {
            row,
            reason: format!("{} is empty", column),
        }),
        Some(other) => Err(NearmatchError::InvalidCoordinate {
            row,
            reason: format!("{} is not numeric: {}", column, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Crs;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_points_with_configured_crs() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "listings.csv",
            "id,longitude,latitude,district\n1,28.98,41.04,Sisli\n2,29.01,41.05,Besiktas\n",
        );

        let reader = CsvReader::new(ReadOptions { csv_crs: Some(Crs::wgs84()), ..Default::default() });
        let dataset = reader.read(&path).unwrap();
        let collection = dataset.as_spatial().unwrap();

        assert_eq!(collection.name, "listings");
        assert_eq!(collection.crs, Some(Crs::wgs84()));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.entities[1].geometry, Some(Geometry::point(29.01, 41.05)));
        assert_eq!(collection.entities[0].attribute("district"), Some(&Value::from("Sisli")));
        assert_eq!(collection.entities[0].attribute("id"), Some(&Value::from(1)));
        assert!(collection.entities[0].attribute("longitude").is_none());
    }

    #[test]
    fn test_without_coordinates_is_tabular() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "income.csv", "district,median_income\nSisli,5400\n");

        let dataset = CsvReader::new(ReadOptions::default()).read(&path).unwrap();

        match dataset {
            Dataset::Tabular(table) => {
                assert_eq!(table.columns, vec!["district", "median_income"]);
                assert_eq!(table.rows.len(), 1);
            }
            other => panic!("expected a table, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_missing_crs_stays_missing() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "pts.csv", "longitude,latitude\n0,0\n");

        let validation = CsvReader::new(ReadOptions::default()).validate(&path).unwrap();
        assert!(validation.has_warnings());

        let dataset = CsvReader::new(ReadOptions::default()).read(&path).unwrap();
        assert_eq!(dataset.as_spatial().unwrap().crs, None);
    }

    #[test]
    fn test_bad_coordinate_reports_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "pts.csv", "longitude,latitude\n1,2\nabc,3\n");

        let err = CsvReader::new(ReadOptions::default()).read(&path).unwrap_err();
        assert!(matches!(err, NearmatchError::InvalidCoordinate { row: 1, .. }));
    }

    #[test]
    fn test_custom_coordinate_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "pts.csv", "x,y\n500000,4649776\n");

        let options = ReadOptions {
            lon_column: "x".to_string(),
            lat_column: "y".to_string(),
            csv_crs: Some(Crs::Epsg(32633)),
        };
        let dataset = CsvReader::new(options).read(&path).unwrap();
        let collection = dataset.as_spatial().unwrap();
        assert_eq!(collection.entities[0].geometry, Some(Geometry::point(500000.0, 4649776.0)));
    }
}
