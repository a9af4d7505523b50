//! GeoJSON format reader implementation

use std::fs;
use std::path::Path;

use crate::error::{NearmatchError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{dataset_name, FormatReader, FormatValidation};
use crate::models::{Crs, Dataset, Geometry, SpatialCollection, SpatialEntity};

/// GeoJSON format reader
pub struct GeoJsonReader;

impl FormatReader for GeoJsonReader {
    fn read(&self, path: &Path) -> Result<Dataset> {
        let content = fs::read_to_string(path)?;
        let collection = parse_geojson(&content, &dataset_name(path))?;
        Ok(Dataset::Spatial(collection))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json", "geojson"]
    }

    fn format_name(&self) -> &str {
        "GeoJSON"
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let mut parse_validation = FormatValidation::default();
        match fs::read_to_string(path) {
            Ok(content) => {
                if let Err(e) = content.parse::<::geojson::GeoJson>() {
                    parse_validation.errors.push(format!("Invalid GeoJSON: {}", e));
                }
            }
            Err(e) => parse_validation.errors.push(format!("Cannot read file: {}", e)),
        }

        Ok(FormatValidator::merge_validations(vec![validation, parse_validation]))
    }
}

/// Parse GeoJSON text into a spatial collection
///
/// The CRS comes from a legacy `crs` member when present; RFC 7946 GeoJSON
/// without one is WGS 84.
pub fn parse_geojson(content: &str, name: &str) -> Result<SpatialCollection> {
    let geojson: ::geojson::GeoJson =
        content.parse().map_err(|e| NearmatchError::FormatError {
            format: "GeoJSON".to_string(),
            message: format!("Failed to parse GeoJSON: {}", e),
        })?;

    match geojson {
        ::geojson::GeoJson::FeatureCollection(fc) => {
            let crs = match fc.foreign_members.as_ref().and_then(|fm| fm.get("crs")) {
                Some(crs_obj) => extract_crs(crs_obj)?,
                None => Crs::wgs84(),
            };

            let entities = fc
                .features
                .into_iter()
                .enumerate()
                .map(|(idx, feature)| convert_feature(feature, idx))
                .collect::<Result<Vec<_>>>()?;

            Ok(SpatialCollection::new(name, Some(crs)).with_entities(entities))
        }
        ::geojson::GeoJson::Feature(feature) => {
            let entity = convert_feature(feature, 0)?;
            Ok(SpatialCollection::new(name, Some(Crs::wgs84())).with_entities(vec![entity]))
        }
        ::geojson::GeoJson::Geometry(geometry) => {
            let entity = SpatialEntity::new(convert_geometry(&geometry.value, "0")?);
            Ok(SpatialCollection::new(name, Some(Crs::wgs84())).with_entities(vec![entity]))
        }
    }
}

/// Read the legacy `{"type": "name", "properties": {"name": ...}}` CRS member
fn extract_crs(crs_obj: &serde_json::Value) -> Result<Crs> {
    let name = crs_obj
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| NearmatchError::FormatError {
            format: "GeoJSON".to_string(),
            message: format!("Unrecognized crs member: {}", crs_obj),
        })?;
    name.parse()
}

fn convert_feature(feature: ::geojson::Feature, idx: usize) -> Result<SpatialEntity> {
    let id = feature
        .id
        .as_ref()
        .map(|id| match id {
            ::geojson::feature::Id::String(s) => s.clone(),
            ::geojson::feature::Id::Number(n) => n.to_string(),
        })
        .unwrap_or_else(|| idx.to_string());

    let geometry = match &feature.geometry {
        Some(geometry) => Some(convert_geometry(&geometry.value, &id)?),
        None => None,
    };

    Ok(SpatialEntity { attributes: feature.properties.unwrap_or_default(), geometry })
}

fn convert_geometry(value: &::geojson::Value, feature: &str) -> Result<Geometry> {
    let geometry = match value {
        ::geojson::Value::Point(position) => geo::Geometry::Point(to_coord(position, feature)?.into()),
        ::geojson::Value::MultiPoint(positions) => geo::Geometry::MultiPoint(
            positions
                .iter()
                .map(|p| to_coord(p, feature).map(geo::Point::from))
                .collect::<Result<Vec<_>>>()?
                .into(),
        ),
        ::geojson::Value::LineString(positions) => {
            geo::Geometry::LineString(to_line_string(positions, feature)?)
        }
        ::geojson::Value::MultiLineString(lines) => geo::Geometry::MultiLineString(
            geo::MultiLineString::new(
                lines.iter().map(|l| to_line_string(l, feature)).collect::<Result<Vec<_>>>()?,
            ),
        ),
        ::geojson::Value::Polygon(rings) => geo::Geometry::Polygon(to_polygon(rings, feature)?),
        ::geojson::Value::MultiPolygon(polygons) => geo::Geometry::MultiPolygon(
            geo::MultiPolygon::new(
                polygons.iter().map(|p| to_polygon(p, feature)).collect::<Result<Vec<_>>>()?,
            ),
        ),
        ::geojson::Value::GeometryCollection(_) => {
            return Err(NearmatchError::UnsupportedGeometry {
                feature: feature.to_string(),
                geometry_type: "GeometryCollection".to_string(),
            })
        }
    };

    Geometry::from_geo(geometry, feature)
}

fn to_coord(position: &[f64], feature: &str) -> Result<geo::Coord> {
    match position {
        [x, y, ..] => Ok(geo::Coord { x: *x, y: *y }),
        _ => Err(NearmatchError::FormatError {
            format: "GeoJSON".to_string(),
            message: format!("Feature {} has a position with fewer than 2 values", feature),
        }),
    }
}

fn to_line_string(positions: &[Vec<f64>], feature: &str) -> Result<geo::LineString> {
    let coords = positions.iter().map(|p| to_coord(p, feature)).collect::<Result<Vec<_>>>()?;
    Ok(geo::LineString::new(coords))
}

fn to_polygon(rings: &[Vec<Vec<f64>>], feature: &str) -> Result<geo::Polygon> {
    let mut rings =
        rings.iter().map(|r| to_line_string(r, feature)).collect::<Result<Vec<_>>>()?.into_iter();
    let exterior = rings.next().unwrap_or_else(|| geo::LineString::new(vec![]));
    Ok(geo::Polygon::new(exterior, rings.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeometryType;

    #[test]
    fn test_feature_collection_defaults_to_wgs84() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [28.98, 41.04]},
                 "properties": {"district_e": "Sisli", "price": 250}}
            ]
        }"#;

        let collection = parse_geojson(content, "rentals").unwrap();

        assert_eq!(collection.crs, Some(Crs::wgs84()));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.entities[0].geometry, Some(Geometry::point(28.98, 41.04)));
        assert_eq!(collection.entities[0].attribute("district_e"), Some(&serde_json::json!("Sisli")));
    }

    #[test]
    fn test_legacy_crs_member() {
        let content = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32635"}},
            "features": []
        }"#;

        let collection = parse_geojson(content, "projected").unwrap();
        assert_eq!(collection.crs, Some(Crs::Epsg(32635)));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_null_geometry_is_kept_as_none() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "geometry": null, "properties": {}}]
        }"#;

        let collection = parse_geojson(content, "broken").unwrap();
        assert_eq!(collection.entities[0].geometry, None);
    }

    #[test]
    fn test_polygon_feature() {
        let content = r#"{
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]},
            "properties": {"name": "Besiktas"}
        }"#;

        let collection = parse_geojson(content, "districts").unwrap();
        let geometry = collection.entities[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.geometry_type(), GeometryType::Polygon);
    }

    #[test]
    fn test_geometry_collection_rejected_with_feature_id() {
        let content = r#"{
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "id": "clinic-9",
                "geometry": {"type": "GeometryCollection", "geometries": []}, "properties": {}}]
        }"#;

        let err = parse_geojson(content, "bad").unwrap_err();
        assert!(err.to_string().contains("clinic-9"));
    }
}
