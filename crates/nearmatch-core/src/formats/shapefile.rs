//! Shapefile format reader implementation
//!
//! Shapefiles consist of multiple component files (.shp, .shx, .dbf, .prj).
//! The first three are required. A missing .prj leaves the collection without
//! a CRS rather than assuming one.

use ::shapefile::dbase::FieldValue as DbaseFieldValue;
use ::shapefile::{PolygonRing, Reader as ShapefileReader, Shape};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NearmatchError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{dataset_name, FormatReader, FormatValidation};
use crate::models::{Crs, Dataset, Geometry, SpatialCollection, SpatialEntity};

/// Shapefile format reader
pub struct ShapefileFormatReader;

impl FormatReader for ShapefileFormatReader {
    fn read(&self, path: &Path) -> Result<Dataset> {
        self.verify_components(path)?;

        let mut reader = ShapefileReader::from_path(path).map_err(|e| format_error(format!(
            "Failed to open Shapefile: {}",
            e
        )))?;

        let crs = self.extract_crs(path)?;
        if crs.is_none() {
            tracing::warn!("{} has no .prj file, CRS is unknown", path.display());
        }

        let mut entities = Vec::new();
        for result in reader.iter_shapes_and_records() {
            let (shape, record) =
                result.map_err(|e| format_error(format!("Failed to read feature: {}", e)))?;

            let feature = entities.len().to_string();
            let geometry = convert_shape(shape, &feature)?;
            let mut entity = SpatialEntity { geometry, ..Default::default() };

            for (name, value) in record {
                entity.attributes.insert(name, convert_dbase_value(&value));
            }
            entities.push(entity);
        }

        Ok(Dataset::Spatial(SpatialCollection::new(dataset_name(path), crs).with_entities(entities)))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        "Shapefile"
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let base = self.get_shapefile_base(path)?;
        let component_validation =
            FormatValidator::validate_component_files(&base, &["shp", "shx", "dbf"], &["prj"]);

        Ok(FormatValidator::merge_validations(vec![validation, component_validation]))
    }
}

impl ShapefileFormatReader {
    /// Get the base path for a Shapefile (without extension)
    fn get_shapefile_base(&self, path: &Path) -> Result<PathBuf> {
        let is_shp = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("shp"))
            .unwrap_or(false);

        if !is_shp {
            return Err(NearmatchError::InvalidPath {
                path: path.to_path_buf(),
                reason: "Not a Shapefile (.shp)".to_string(),
            });
        }

        Ok(path.with_extension(""))
    }

    /// Verify that all required Shapefile component files exist
    fn verify_components(&self, path: &Path) -> Result<()> {
        let base = self.get_shapefile_base(path)?;
        let missing: Vec<String> = ["shp", "shx", "dbf"]
            .iter()
            .filter(|ext| !base.with_extension(ext).exists())
            .map(|ext| format!(".{}", ext))
            .collect();

        if !missing.is_empty() {
            return Err(format_error(format!(
                "Missing required component files: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    /// CRS from the .prj file, `None` when there is no .prj
    fn extract_crs(&self, path: &Path) -> Result<Option<Crs>> {
        let prj_path = self.get_shapefile_base(path)?.with_extension("prj");
        if !prj_path.exists() {
            return Ok(None);
        }

        let prj_content = fs::read_to_string(&prj_path)
            .map_err(|e| format_error(format!("Failed to read .prj file: {}", e)))?;

        Ok(Some(parse_prj(&prj_content)))
    }
}

/// Resolve a .prj WKT string to a CRS
///
/// The outermost `AUTHORITY["EPSG",...]` is the last one in WKT1. ESRI-style
/// WGS 84 definitions carry no authority and are recognised by name.
pub fn parse_prj(wkt: &str) -> Crs {
    let trimmed = wkt.trim();
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    const MARKER: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = compact.rfind(MARKER) {
        let digits: String =
            compact[start + MARKER.len()..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = digits.parse::<u32>() {
            return Crs::Epsg(code);
        }
    }

    let upper = compact.to_uppercase();
    if upper.starts_with("GEOGCS[") && (upper.contains("WGS_1984") || upper.contains("WGS84")) {
        return Crs::wgs84();
    }

    Crs::Definition(trimmed.to_string())
}

fn format_error(message: String) -> NearmatchError {
    NearmatchError::FormatError { format: "Shapefile".to_string(), message }
}

fn convert_shape(shape: Shape, feature: &str) -> Result<Option<Geometry>> {
    let point = |x: f64, y: f64| geo::Geometry::Point(geo::Point::new(x, y));

    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => point(p.x, p.y),
        Shape::PointM(p) => point(p.x, p.y),
        Shape::PointZ(p) => point(p.x, p.y),
        Shape::Polyline(polyline) => lines(polyline.parts().iter().map(|part| {
            part.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>()
        })),
        Shape::PolylineM(polyline) => lines(polyline.parts().iter().map(|part| {
            part.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>()
        })),
        Shape::PolylineZ(polyline) => lines(polyline.parts().iter().map(|part| {
            part.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>()
        })),
        Shape::Polygon(polygon) => polygons(polygon.rings().iter().map(|ring| {
            let coords = ring.points().iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
            (matches!(ring, PolygonRing::Outer(_)), coords)
        })),
        Shape::PolygonM(polygon) => polygons(polygon.rings().iter().map(|ring| {
            let coords = ring.points().iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
            (matches!(ring, PolygonRing::Outer(_)), coords)
        })),
        Shape::PolygonZ(polygon) => polygons(polygon.rings().iter().map(|ring| {
            let coords = ring.points().iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
            (matches!(ring, PolygonRing::Outer(_)), coords)
        })),
        Shape::Multipoint(mp) => multipoint(mp.points().iter().map(|p| (p.x, p.y))),
        Shape::MultipointM(mp) => multipoint(mp.points().iter().map(|p| (p.x, p.y))),
        Shape::MultipointZ(mp) => multipoint(mp.points().iter().map(|p| (p.x, p.y))),
        Shape::Multipatch(_) => {
            return Err(NearmatchError::UnsupportedGeometry {
                feature: feature.to_string(),
                geometry_type: "Multipatch".to_string(),
            })
        }
    };

    Geometry::from_geo(geometry, feature).map(Some)
}

fn lines<I>(parts: I) -> geo::Geometry
where
    I: Iterator<Item = Vec<(f64, f64)>>,
{
    let mut lines: Vec<geo::LineString> = parts.map(geo::LineString::from).collect();
    if lines.len() == 1 {
        geo::Geometry::LineString(lines.remove(0))
    } else {
        geo::Geometry::MultiLineString(geo::MultiLineString::new(lines))
    }
}

/// Group rings into polygons: each outer ring opens a polygon, inner rings
/// attach to the most recent one.
fn polygons<I>(rings: I) -> geo::Geometry
where
    I: Iterator<Item = (bool, Vec<(f64, f64)>)>,
{
    let mut grouped: Vec<(geo::LineString, Vec<geo::LineString>)> = Vec::new();
    for (is_outer, coords) in rings {
        let ring = geo::LineString::from(coords);
        match grouped.last_mut() {
            Some((_, holes)) if !is_outer => holes.push(ring),
            _ => grouped.push((ring, Vec::new())),
        }
    }

    let mut polygons: Vec<geo::Polygon> =
        grouped.into_iter().map(|(exterior, holes)| geo::Polygon::new(exterior, holes)).collect();
    if polygons.len() == 1 {
        geo::Geometry::Polygon(polygons.remove(0))
    } else {
        geo::Geometry::MultiPolygon(geo::MultiPolygon::new(polygons))
    }
}

fn multipoint<I>(points: I) -> geo::Geometry
where
    I: Iterator<Item = (f64, f64)>,
{
    geo::Geometry::MultiPoint(points.map(|(x, y)| geo::Point::new(x, y)).collect::<Vec<_>>().into())
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> serde_json::Value {
    let number = |n: f64| {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    };

    match value {
        DbaseFieldValue::Character(Some(s)) => serde_json::Value::String(s.trim().to_string()),
        DbaseFieldValue::Character(None) => serde_json::Value::Null,
        DbaseFieldValue::Numeric(Some(n)) => number(*n),
        DbaseFieldValue::Numeric(None) => serde_json::Value::Null,
        DbaseFieldValue::Logical(Some(b)) => serde_json::Value::Bool(*b),
        DbaseFieldValue::Logical(None) => serde_json::Value::Null,
        DbaseFieldValue::Float(Some(f)) => number(*f as f64),
        DbaseFieldValue::Float(None) => serde_json::Value::Null,
        DbaseFieldValue::Integer(i) => serde_json::Value::Number((*i).into()),
        DbaseFieldValue::Currency(c) => number(*c),
        DbaseFieldValue::Double(d) => number(*d),
        DbaseFieldValue::Memo(s) => serde_json::Value::String(s.clone()),
        DbaseFieldValue::Date(Some(date)) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        DbaseFieldValue::Date(None) => serde_json::Value::Null,
        DbaseFieldValue::DateTime(dt) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
    }
}
