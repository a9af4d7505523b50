//! Nearest-match search for reference points

use nearmatch_core::models::{GeometryType, MatchRow, MatchTable, SpatialCollection};
use nearmatch_core::{NearmatchError, Result};

use crate::index::SpatialIndex;
use crate::validation::{require_geometry, GeometryTypeCounts};

/// Match every reference point to its closest candidate
///
/// The reference collection must consist of points; they are used as-is.
/// Rows come back in reference order and carry the reference CRS.
pub fn nearest_match(reference: &SpatialCollection, index: &dyn SpatialIndex) -> Result<MatchTable> {
    require_geometry(reference, "reference")?;

    if let Some((found, _)) = GeometryTypeCounts::of(reference).dominant() {
        if found != GeometryType::Point {
            return Err(NearmatchError::DominantGeometry {
                argument: "reference".to_string(),
                expected: GeometryType::Point,
                found,
            });
        }
    }

    if index.is_empty() && !reference.is_empty() {
        return Err(NearmatchError::EmptyCandidates);
    }

    let mut rows = Vec::with_capacity(reference.len());
    for (entity, e) in reference.iter().enumerate() {
        let geometry = e.geometry.as_ref().ok_or_else(|| NearmatchError::MissingGeometry {
            argument: "reference".to_string(),
            entity,
        })?;
        let origin = geometry.as_point().ok_or(NearmatchError::NonPointReference {
            entity,
            found: geometry.geometry_type(),
        })?;

        let nearest = index.nearest(origin).ok_or(NearmatchError::EmptyCandidates)?;
        rows.push(MatchRow::new(origin, nearest.point, nearest.entity));
    }

    Ok(MatchTable::new(reference.crs.clone(), rows))
}
