//! Distances between matched points
//!
//! Every earth-referenced table gets geodesic distances on the WGS 84
//! ellipsoid. Coordinates in any CRS other than EPSG:4326 are first
//! projected to lon/lat with PROJ. Only an engineering CRS (a local grid
//! with no tie to the earth) is measured in the plane, in its own units.
//! A table without a CRS, e.g. one read back from a CSV export, is taken
//! to be EPSG:4326.

use geo::{Distance, Euclidean, Geodesic, Point};
use nearmatch_core::models::{Crs, MatchTable};
use nearmatch_core::{NearmatchError, Result};
use proj::Proj;

/// Geodesic distance in meters between two lon/lat points (Karney 2013)
pub fn geodesic_distance(a: Point, b: Point) -> f64 {
    Geodesic.distance(a, b)
}

/// Planar distance in coordinate units
pub fn planar_distance(a: Point, b: Point) -> f64 {
    Euclidean.distance(a, b)
}

/// Whether distances for a table in `crs` are measured on the ellipsoid
pub fn uses_geodesic(crs: Option<&Crs>) -> bool {
    crs.map_or(true, |crs| !crs.is_engineering())
}

/// Fill `distance_in_meter` for every row
pub fn with_distances(mut table: MatchTable) -> Result<MatchTable> {
    let measure = Measure::for_crs(table.crs.as_ref())?;

    for (row, r) in table.rows.iter_mut().enumerate() {
        r.distance_in_meter = Some(measure.between(r.point_of_origin, r.nearest_point, row)?);
    }

    Ok(table)
}

enum Measure {
    Planar,
    /// Geodesic after an optional projection to EPSG:4326
    Geodesic(Option<Proj>),
}

impl Measure {
    fn for_crs(crs: Option<&Crs>) -> Result<Self> {
        match crs {
            Some(crs) if crs.is_engineering() => Ok(Measure::Planar),
            None => Ok(Measure::Geodesic(None)),
            Some(crs) if *crs == Crs::wgs84() => Ok(Measure::Geodesic(None)),
            Some(crs) => {
                let from = crs.to_string();
                let proj = Proj::new_known_crs(&from, "EPSG:4326", None).map_err(|e| {
                    NearmatchError::Projection { crs: from.clone(), reason: e.to_string() }
                })?;
                tracing::debug!("projecting {} to EPSG:4326 for geodesic distances", from);
                Ok(Measure::Geodesic(Some(proj)))
            }
        }
    }

    fn between(&self, a: Point, b: Point, row: usize) -> Result<f64> {
        match self {
            Measure::Planar => {
                check_finite(a, row)?;
                check_finite(b, row)?;
                Ok(planar_distance(a, b))
            }
            Measure::Geodesic(proj) => {
                let a = to_lon_lat(proj.as_ref(), a, row)?;
                let b = to_lon_lat(proj.as_ref(), b, row)?;
                Ok(geodesic_distance(a, b))
            }
        }
    }
}

fn to_lon_lat(proj: Option<&Proj>, point: Point, row: usize) -> Result<Point> {
    check_finite(point, row)?;

    let point = match proj {
        Some(proj) => {
            let (x, y) = proj.convert((point.x(), point.y())).map_err(|e| NearmatchError::InvalidCoordinate {
                row,
                reason: format!("projection of ({}, {}) failed: {}", point.x(), point.y(), e),
            })?;
            Point::new(x, y)
        }
        None => point,
    };

    check_lon_lat(point, row)?;
    Ok(point)
}

fn check_finite(point: Point, row: usize) -> Result<()> {
    if point.x().is_finite() && point.y().is_finite() {
        Ok(())
    } else {
        Err(NearmatchError::InvalidCoordinate {
            row,
            reason: format!("non-finite coordinate ({}, {})", point.x(), point.y()),
        })
    }
}

fn check_lon_lat(point: Point, row: usize) -> Result<()> {
    check_finite(point, row)?;

    if !(-90.0..=90.0).contains(&point.y()) {
        return Err(NearmatchError::InvalidCoordinate {
            row,
            reason: format!("latitude {} outside [-90, 90]", point.y()),
        });
    }
    if !(-180.0..=180.0).contains(&point.x()) {
        return Err(NearmatchError::InvalidCoordinate {
            row,
            reason: format!("longitude {} outside [-180, 180]", point.x()),
        });
    }
    Ok(())
}
