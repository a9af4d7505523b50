//! Integration tests for the format registry and result export
//!
//! These tests verify that:
//! - The registry picks the right reader by extension
//! - CRS handling differs per format (GeoJSON default, CSV configured or absent)
//! - Result tables survive a CSV round trip and are schema-checked on read

use geo::Point;
use nearmatch_core::formats::results::{read_results_csv, write_results_csv, write_results_geojson};
use nearmatch_core::formats::{FormatRegistry, ReadOptions};
use nearmatch_core::models::{Crs, Dataset, GeometryType, MatchRow, MatchTable};
use nearmatch_core::{ErrorKind, NearmatchError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_registry_reads_geojson_polygons() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("districts.geojson");
    fs::write(
        &path,
        r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "A"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}},
                {"type": "Feature", "properties": {"name": "B"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[5,5],[6,5],[6,6],[5,5]]]]}}
            ]
        }"#,
    )
    .unwrap();

    let dataset = FormatRegistry::default().read(&path).unwrap();
    let collection = dataset.as_spatial().unwrap();

    assert_eq!(collection.name, "districts");
    assert_eq!(collection.crs, Some(Crs::wgs84()));
    assert_eq!(
        collection.entities[1].geometry.as_ref().unwrap().geometry_type(),
        GeometryType::MultiPolygon
    );
}

#[test]
fn test_registry_reads_csv_with_configured_crs() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("clinics.csv");
    fs::write(&path, "name,longitude,latitude\nNorth,29.0,41.1\nSouth,29.0,40.9\n").unwrap();

    let options = ReadOptions { csv_crs: Some(Crs::wgs84()), ..Default::default() };
    let dataset = FormatRegistry::with_defaults(options).read(&path).unwrap();

    assert!(matches!(dataset, Dataset::Spatial(_)));
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.as_spatial().unwrap().crs, Some(Crs::wgs84()));
}

#[test]
fn test_registry_rejects_incomplete_shapefile() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("centers.shp");
    fs::write(&path, b"").unwrap();

    let err = FormatRegistry::default().read(&path).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().contains("centers.shx"));
}

#[test]
fn test_results_csv_roundtrip_and_geojson_export() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("matches.csv");
    let geojson_path = temp_dir.path().join("matches.geojson");

    let mut row = MatchRow::new(Point::new(28.97, 41.01), Point::new(28.98, 41.04), 3);
    row.distance_in_meter = Some(3412.5);
    let table = MatchTable::new(Some(Crs::wgs84()), vec![row]);

    write_results_csv(&table, &csv_path).unwrap();
    write_results_geojson(&table, &geojson_path).unwrap();

    let back = read_results_csv(&csv_path, Some(Crs::wgs84())).unwrap();
    assert_eq!(back, table);

    let exported = fs::read_to_string(&geojson_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(value["type"], "FeatureCollection");
    assert_eq!(value["features"][0]["properties"]["candidate"], 3);
    assert!(value.get("crs").is_none());
}

#[test]
fn test_results_csv_schema_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("other.csv");
    fs::write(&path, "origin,distance_in_meter\nPOINT(0 0),1\n").unwrap();

    let err = read_results_csv(&path, None).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    match err {
        NearmatchError::Schema { missing } => {
            assert_eq!(missing, vec!["point_of_origin".to_string(), "nearest_point".to_string()])
        }
        other => panic!("unexpected error: {}", other),
    }
}
