//! Reduction of candidate geometries to representative points

use geo::{Centroid, MultiPoint, Point};
use nearmatch_core::models::{Crs, Geometry, SpatialCollection, SpatialEntity};
use nearmatch_core::{NearmatchError, Result};

/// A candidate entity reduced to a single point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepresentativePoint {
    /// Row index of the source entity in the candidate collection
    pub entity: usize,
    pub point: Point,
}

/// All representative points of a candidate collection, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCandidates {
    pub crs: Option<Crs>,
    pub points: Vec<RepresentativePoint>,
}

impl CombinedCandidates {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepresentativePoint> {
        self.points.iter()
    }

    /// The combined point set as one geometry
    pub fn as_multi_point(&self) -> MultiPoint {
        self.points.iter().map(|p| p.point).collect::<Vec<_>>().into()
    }

    /// Whether `point` is exactly one of the representative points
    pub fn contains(&self, point: Point) -> bool {
        self.points.iter().any(|p| p.point == point)
    }
}

/// Points map to themselves, everything else to its centroid
pub fn representative_point(entity: &SpatialEntity, index: usize) -> Result<Point> {
    let geometry = entity.geometry.as_ref().ok_or_else(|| NearmatchError::MissingGeometry {
        argument: "comparison".to_string(),
        entity: index,
    })?;

    let centroid = match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::LineString(ls) => ls.centroid(),
        Geometry::Polygon(poly) => poly.centroid(),
        Geometry::MultiPolygon(mp) => mp.centroid(),
    };

    centroid.ok_or_else(|| NearmatchError::NotPointReducible {
        entity: index,
        geometry_type: geometry.geometry_type(),
    })
}

/// Reduce every entity of a candidate collection, keeping order and source
/// row index
pub fn combine_representative_points(collection: &SpatialCollection) -> Result<CombinedCandidates> {
    if collection.is_empty() {
        return Err(NearmatchError::EmptyCandidates);
    }

    let points = collection
        .iter()
        .enumerate()
        .map(|(entity, e)| {
            representative_point(e, entity).map(|point| RepresentativePoint { entity, point })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "reduced {} candidate entities of {} to representative points",
        points.len(),
        collection.name
    );

    Ok(CombinedCandidates { crs: collection.crs.clone(), points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearmatch_core::models::GeometryType;

    #[test]
    fn test_point_is_its_own_representative() {
        let entity = SpatialEntity::new(Geometry::point(3.0, 4.0));
        assert_eq!(representative_point(&entity, 0).unwrap(), Point::new(3.0, 4.0));
    }

    #[test]
    fn test_polygon_reduces_to_centroid() {
        let entity = SpatialEntity::new(Geometry::polygon(vec![
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]));
        assert_eq!(representative_point(&entity, 0).unwrap(), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_line_reduces_to_midpoint() {
        let entity = SpatialEntity::new(Geometry::line_string(vec![(0.0, 0.0), (4.0, 0.0)]));
        assert_eq!(representative_point(&entity, 0).unwrap(), Point::new(2.0, 0.0));
    }

    #[test]
    fn test_empty_line_is_not_reducible() {
        let entity = SpatialEntity::new(Geometry::line_string(vec![]));
        let err = representative_point(&entity, 7).unwrap_err();
        assert!(matches!(
            err,
            NearmatchError::NotPointReducible { entity: 7, geometry_type: GeometryType::LineString }
        ));
    }

    #[test]
    fn test_missing_geometry_names_entity() {
        let err = representative_point(&SpatialEntity::empty(), 2).unwrap_err();
        assert!(matches!(err, NearmatchError::MissingGeometry { entity: 2, .. }));
    }

    #[test]
    fn test_combine_preserves_order_and_crs() {
        let collection = SpatialCollection::new("mixed", Some(Crs::Epsg(32633))).with_entities(vec![
            SpatialEntity::new(Geometry::point(5.0, 5.0)),
            SpatialEntity::new(Geometry::polygon(vec![
                (0.0, 0.0),
                (2.0, 0.0),
                (2.0, 2.0),
                (0.0, 2.0),
                (0.0, 0.0),
            ])),
        ]);

        let combined = combine_representative_points(&collection).unwrap();

        assert_eq!(combined.crs, Some(Crs::Epsg(32633)));
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.points[1], RepresentativePoint { entity: 1, point: Point::new(1.0, 1.0) });
        assert_eq!(combined.as_multi_point().0.len(), 2);
        assert!(combined.contains(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_empty_candidates() {
        let collection = SpatialCollection::new("none", Some(Crs::wgs84()));
        assert!(matches!(
            combine_representative_points(&collection),
            Err(NearmatchError::EmptyCandidates)
        ));
    }
}
