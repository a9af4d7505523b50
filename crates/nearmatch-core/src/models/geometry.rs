//! Canonical geometry and CRS types used across all nearmatch crates.
//!
//! Geometries form a closed set of four kinds. Anything else a reader
//! encounters is rejected at load time instead of being carried along.

use crate::error::{NearmatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate Reference System, either an EPSG code or a raw definition
/// (PROJ string or WKT) that could not be resolved to a code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Crs {
    Epsg(u32),
    Definition(String),
}

impl Crs {
    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Crs::Epsg(4326)
    }

    /// A local engineering CRS with metre axes and no tie to the earth
    pub fn local(name: &str) -> Self {
        Crs::Definition(format!(
            r#"LOCAL_CS["{name}",LOCAL_DATUM["{name}",0],UNIT["metre",1],AXIS["X",EAST],AXIS["Y",NORTH]]"#
        ))
    }

    /// Whether this is an engineering (local, unit-only) CRS.
    ///
    /// Only WKT definitions rooted at `LOCAL_CS`, `ENGCRS` or
    /// `ENGINEERINGCRS` count. Every EPSG code is tied to the earth.
    pub fn is_engineering(&self) -> bool {
        match self {
            Crs::Epsg(_) => false,
            Crs::Definition(def) => {
                let upper = def.trim_start().to_uppercase();
                ["LOCAL_CS[", "ENGCRS[", "ENGINEERINGCRS["].iter().any(|root| upper.starts_with(root))
            }
        }
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Definition(_) => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Definition(def) => f.write_str(def),
        }
    }
}

impl FromStr for Crs {
    type Err = NearmatchError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(NearmatchError::ConfigInvalid {
                key: "crs".to_string(),
                reason: "CRS string is empty".to_string(),
            });
        }

        let upper = trimmed.to_uppercase();
        if upper == "URN:OGC:DEF:CRS:OGC:1.3:CRS84" || upper == "CRS84" {
            return Ok(Crs::wgs84());
        }

        let code = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:6.6:"))
            .unwrap_or(&upper);

        match code.parse::<u32>() {
            Ok(code) => Ok(Crs::Epsg(code)),
            Err(_) => Ok(Crs::Definition(trimmed.to_string())),
        }
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

impl TryFrom<String> for Crs {
    type Error = NearmatchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    /// All kinds, in tie-break order.
    pub const ALL: [GeometryType; 4] = [
        GeometryType::Point,
        GeometryType::LineString,
        GeometryType::Polygon,
        GeometryType::MultiPolygon,
    ];
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
        };
        f.write_str(name)
    }
}

/// Entity geometry backed by `geo` types
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(geo::Point),
    LineString(geo::LineString),
    Polygon(geo::Polygon),
    MultiPolygon(geo::MultiPolygon),
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(geo::Point::new(x, y))
    }

    /// Create a Polygon geometry from an exterior ring
    pub fn polygon(exterior: Vec<(f64, f64)>) -> Self {
        Geometry::Polygon(geo::Polygon::new(geo::LineString::from(exterior), vec![]))
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<(f64, f64)>) -> Self {
        Geometry::LineString(geo::LineString::from(coords))
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        }
    }

    pub fn as_point(&self) -> Option<geo::Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Convert from a `geo::Geometry`, rejecting kinds outside the closed set.
    ///
    /// Single-element multi-geometries are unwrapped; `feature` names the
    /// source feature in the error.
    pub fn from_geo(geometry: geo::Geometry, feature: &str) -> Result<Self> {
        let unsupported = |kind: &str| NearmatchError::UnsupportedGeometry {
            feature: feature.to_string(),
            geometry_type: kind.to_string(),
        };

        match geometry {
            geo::Geometry::Point(p) => Ok(Geometry::Point(p)),
            geo::Geometry::LineString(ls) => Ok(Geometry::LineString(ls)),
            geo::Geometry::Line(l) => Ok(Geometry::LineString(geo::LineString::from(vec![
                l.start, l.end,
            ]))),
            geo::Geometry::Polygon(p) => Ok(Geometry::Polygon(p)),
            geo::Geometry::Rect(r) => Ok(Geometry::Polygon(r.to_polygon())),
            geo::Geometry::Triangle(t) => Ok(Geometry::Polygon(t.to_polygon())),
            geo::Geometry::MultiPolygon(mp) => Ok(Geometry::MultiPolygon(mp)),
            geo::Geometry::MultiPoint(mut mp) if mp.0.len() == 1 => {
                Ok(Geometry::Point(mp.0.remove(0)))
            }
            geo::Geometry::MultiLineString(mut mls) if mls.0.len() == 1 => {
                Ok(Geometry::LineString(mls.0.remove(0)))
            }
            geo::Geometry::MultiPoint(_) => Err(unsupported("MultiPoint")),
            geo::Geometry::MultiLineString(_) => Err(unsupported("MultiLineString")),
            geo::Geometry::GeometryCollection(_) => Err(unsupported("GeometryCollection")),
        }
    }
}

impl From<Geometry> for geo::Geometry {
    fn from(geometry: Geometry) -> Self {
        match geometry {
            Geometry::Point(p) => geo::Geometry::Point(p),
            Geometry::LineString(ls) => geo::Geometry::LineString(ls),
            Geometry::Polygon(p) => geo::Geometry::Polygon(p),
            Geometry::MultiPolygon(mp) => geo::Geometry::MultiPolygon(mp),
        }
    }
}

impl From<geo::Point> for Geometry {
    fn from(point: geo::Point) -> Self {
        Geometry::Point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_parsing() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Epsg(4326));
        assert_eq!("epsg:32633".parse::<Crs>().unwrap(), Crs::Epsg(32633));
        assert_eq!("3857".parse::<Crs>().unwrap(), Crs::Epsg(3857));
        assert_eq!("urn:ogc:def:crs:EPSG::2154".parse::<Crs>().unwrap(), Crs::Epsg(2154));
        assert_eq!("urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(), Crs::wgs84());
        assert_eq!(
            "+proj=utm +zone=35 +datum=WGS84".parse::<Crs>().unwrap(),
            Crs::Definition("+proj=utm +zone=35 +datum=WGS84".to_string())
        );
        assert!("  ".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_is_engineering() {
        assert!(Crs::local("site grid").is_engineering());
        assert!(Crs::Definition(r#"ENGCRS["bench",EDATUM["bench"],CS[Cartesian,2]]"#.to_string()).is_engineering());
        assert!(!Crs::wgs84().is_engineering());
        assert!(!Crs::Epsg(3857).is_engineering());
        assert!(!Crs::Epsg(6318).is_engineering());
        assert!(!Crs::Definition("+proj=utm +zone=35 +datum=WGS84".to_string()).is_engineering());
        assert!(!Crs::Definition(r#"PROJCS["UTM 35N",GEOGCS["WGS 84"]]"#.to_string()).is_engineering());
    }

    #[test]
    fn test_local_crs_survives_parsing() {
        let crs = Crs::local("site grid");
        assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
    }

    #[test]
    fn test_crs_display_roundtrip() {
        let crs = Crs::Epsg(32635);
        assert_eq!(crs.to_string(), "EPSG:32635");
        assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
    }

    #[test]
    fn test_from_geo_unwraps_single_multipoint() {
        let mp = geo::MultiPoint::new(vec![geo::Point::new(1.0, 2.0)]);
        let geom = Geometry::from_geo(geo::Geometry::MultiPoint(mp), "f1").unwrap();
        assert_eq!(geom, Geometry::point(1.0, 2.0));
    }

    #[test]
    fn test_from_geo_rejects_multipoint() {
        let mp = geo::MultiPoint::new(vec![geo::Point::new(1.0, 2.0), geo::Point::new(3.0, 4.0)]);
        let err = Geometry::from_geo(geo::Geometry::MultiPoint(mp), "f7").unwrap_err();
        assert!(err.to_string().contains("f7"));
        assert!(err.to_string().contains("MultiPoint"));
    }

    #[test]
    fn test_geometry_type() {
        assert_eq!(Geometry::point(0.0, 0.0).geometry_type(), GeometryType::Point);
        let square = Geometry::polygon(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert_eq!(square.geometry_type(), GeometryType::Polygon);
        assert_eq!(GeometryType::MultiPolygon.to_string(), "MultiPolygon");
    }
}
