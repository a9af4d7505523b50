//! Nearest-neighbor analysis between a reference and a comparison dataset
//!
//! Validation always runs to completion before any candidate is reduced or
//! indexed, so a failing run does no matching work.

use std::time::Instant;

use nearmatch_core::config::{IndexKind, LayeredConfig};
use nearmatch_core::models::{Crs, Dataset, MatchTable, SpatialCollection};
use nearmatch_core::{NearmatchError, Result};

use crate::distance::with_distances;
use crate::engine::nearest_match;
use crate::index::{build_index, SpatialIndex};
use crate::reduce::{combine_representative_points, CombinedCandidates};
use crate::validation::{missing_crs, require_geometry, require_spatial, GeometryTypeCounts};

/// Match every reference point to its nearest comparison entity using the
/// default index
pub fn analyze(reference: &Dataset, comparison: &Dataset, with_distance: bool) -> Result<MatchTable> {
    NearestNeighborAnalysis::new().with_distance(with_distance).run(reference, comparison)
}

/// Validate, reduce and index a comparison dataset once for many runs
pub fn prepare_candidates(comparison: &Dataset) -> Result<PreparedCandidates> {
    NearestNeighborAnalysis::new().prepare(comparison)
}

/// Configurable nearest-neighbor analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestNeighborAnalysis {
    index: IndexKind,
    with_distance: bool,
}

impl Default for NearestNeighborAnalysis {
    fn default() -> Self {
        Self { index: IndexKind::default(), with_distance: true }
    }
}

impl NearestNeighborAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analysis settings taken from a resolved configuration
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self { index: config.index.value, with_distance: config.with_distance.value }
    }

    pub fn index(mut self, kind: IndexKind) -> Self {
        self.index = kind;
        self
    }

    pub fn with_distance(mut self, with_distance: bool) -> Self {
        self.with_distance = with_distance;
        self
    }

    pub fn index_kind(&self) -> IndexKind {
        self.index
    }

    pub fn distances_enabled(&self) -> bool {
        self.with_distance
    }

    /// Run the full pipeline
    pub fn run(&self, reference: &Dataset, comparison: &Dataset) -> Result<MatchTable> {
        let reference_collection = validated_collection(reference, "reference")?;
        let comparison_collection = validated_collection(comparison, "comparison")?;
        check_crs_pair(reference_collection, comparison_collection.crs.as_ref())?;

        self.prepare_validated(comparison_collection)?
            .analyze_validated(reference_collection, self.with_distance)
    }

    /// Validate and index the comparison side; the result can be reused
    /// for any number of reference subsets
    pub fn prepare(&self, comparison: &Dataset) -> Result<PreparedCandidates> {
        let collection = validated_collection(comparison, "comparison")?;
        if collection.crs.is_none() {
            return Err(missing_crs("comparison"));
        }
        self.prepare_validated(collection)
    }

    fn prepare_validated(&self, comparison: &SpatialCollection) -> Result<PreparedCandidates> {
        warn_if_mixed(comparison, "comparison");

        let candidates = combine_representative_points(comparison)?;
        let index = build_index(self.index, &candidates);
        tracing::debug!(
            index = %self.index,
            candidates = candidates.len(),
            "indexed comparison collection {}",
            comparison.name
        );

        Ok(PreparedCandidates { name: comparison.name.clone(), candidates, index })
    }
}

/// A validated, reduced and indexed comparison collection
///
/// Immutable after construction; every `analyze` call borrows it.
pub struct PreparedCandidates {
    name: String,
    candidates: CombinedCandidates,
    index: Box<dyn SpatialIndex>,
}

impl PreparedCandidates {
    /// Name of the comparison dataset these candidates came from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.candidates.crs.as_ref()
    }

    pub fn candidates(&self) -> &CombinedCandidates {
        &self.candidates
    }

    /// Same checks and results as [`analyze`] against the prepared candidates
    pub fn analyze(&self, reference: &Dataset, with_distance: bool) -> Result<MatchTable> {
        let collection = validated_collection(reference, "reference")?;
        check_crs_pair(collection, self.crs())?;
        self.analyze_validated(collection, with_distance)
    }

    fn analyze_validated(&self, reference: &SpatialCollection, with_distance: bool) -> Result<MatchTable> {
        warn_if_mixed(reference, "reference");

        let started = Instant::now();
        let span = tracing::info_span!("nearest_neighbor", reference = %reference.name, comparison = %self.name);
        let _entered = span.enter();

        let table = nearest_match(reference, self.index.as_ref())?;
        let table = if with_distance { with_distances(table)? } else { table };

        tracing::info!(
            rows = table.len(),
            candidates = self.candidates.len(),
            with_distance,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "nearest-neighbor analysis finished"
        );
        Ok(table)
    }
}

fn validated_collection<'a>(dataset: &'a Dataset, argument: &str) -> Result<&'a SpatialCollection> {
    let collection = require_spatial(dataset, argument)?;
    require_geometry(collection, argument)?;
    Ok(collection)
}

/// Both sides must carry a CRS and it must be the same one
fn check_crs_pair(reference: &SpatialCollection, comparison: Option<&Crs>) -> Result<()> {
    let reference_crs = reference.crs.as_ref().ok_or_else(|| missing_crs("reference"))?;
    let comparison_crs = comparison.ok_or_else(|| missing_crs("comparison"))?;

    if reference_crs != comparison_crs {
        return Err(NearmatchError::CrsMismatch {
            reference: reference_crs.to_string(),
            comparison: comparison_crs.to_string(),
        });
    }
    Ok(())
}

fn warn_if_mixed(collection: &SpatialCollection, argument: &str) {
    let counts = GeometryTypeCounts::of(collection);
    if counts.is_mixed() {
        let summary: Vec<String> =
            counts.iter().map(|(kind, count)| format!("{} {}", count, kind)).collect();
        tracing::warn!("{} collection {} has mixed geometry: {}", argument, collection.name, summary.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use nearmatch_core::models::{Geometry, SpatialEntity, Table};
    use nearmatch_core::ErrorKind;

    fn site(points: &[(f64, f64)]) -> Dataset {
        SpatialCollection::from_points("site", Some(Crs::local("site grid")), points).into()
    }

    #[test]
    fn test_scenario_with_distances() {
        let reference = site(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        let comparison = site(&[(1.0, 0.0), (0.0, 9.0)]);

        let table = analyze(&reference, &comparison, true).unwrap();

        let distances: Vec<f64> = table.distances().collect();
        assert_eq!(distances, vec![1.0, 9.0, 1.0]);
        assert_eq!(table.rows[2].nearest_point, Point::new(0.0, 9.0));
    }

    #[test]
    fn test_scenario_without_distances() {
        let reference = site(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)]);
        let comparison = site(&[(1.0, 0.0), (0.0, 9.0)]);

        let table = NearestNeighborAnalysis::new()
            .index(IndexKind::BruteForce)
            .with_distance(false)
            .run(&reference, &comparison)
            .unwrap();

        assert_eq!(table.len(), 3);
        assert!(!table.has_distances());
        assert_eq!(table.columns(), vec!["point_of_origin", "nearest_point"]);
    }

    #[test]
    fn test_tabular_argument_rejected() {
        let table = Dataset::Tabular(Table { name: "income".to_string(), ..Default::default() });
        let err = analyze(&site(&[(0.0, 0.0)]), &table, true).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(matches!(
            err,
            NearmatchError::NotSpatial { ref argument, ref actual }
                if argument == "comparison" && actual == "tabular dataset"
        ));
    }

    #[test]
    fn test_crs_mismatch_reports_both() {
        let reference: Dataset =
            SpatialCollection::from_points("wgs", Some(Crs::wgs84()), &[(28.9, 41.0)]).into();
        let err = analyze(&reference, &site(&[(1.0, 0.0)]), true).unwrap_err();

        assert!(matches!(
            err,
            NearmatchError::CrsMismatch { ref reference, ref comparison }
                if reference == "EPSG:4326" && comparison.starts_with("LOCAL_CS[\"site grid\"")
        ));
    }

    #[test]
    fn test_missing_crs() {
        let reference: Dataset = SpatialCollection::from_points("bare", None, &[(0.0, 0.0)]).into();
        let err = analyze(&reference, &site(&[(1.0, 0.0)]), true).unwrap_err();
        assert!(matches!(err, NearmatchError::MissingCrs { ref argument } if argument == "reference"));
    }

    #[test]
    fn test_missing_geometry_checked_before_crs() {
        let mut collection = SpatialCollection::from_points("holes", None, &[(0.0, 0.0)]);
        collection.push(SpatialEntity::empty());
        let err = analyze(&site(&[(0.0, 0.0)]), &collection.into(), true).unwrap_err();
        assert!(matches!(
            err,
            NearmatchError::MissingGeometry { ref argument, entity: 1 } if argument == "comparison"
        ));
    }

    #[test]
    fn test_polygon_candidates_reduced_to_centroids() {
        let districts = SpatialCollection::new("districts", Some(Crs::local("site grid"))).with_entities(vec![
            SpatialEntity::new(Geometry::polygon(vec![
                (0.0, 0.0),
                (4.0, 0.0),
                (4.0, 4.0),
                (0.0, 4.0),
                (0.0, 0.0),
            ])),
            SpatialEntity::new(Geometry::polygon(vec![
                (10.0, 10.0),
                (12.0, 10.0),
                (12.0, 12.0),
                (10.0, 12.0),
                (10.0, 10.0),
            ])),
        ]);

        let table = analyze(&site(&[(0.0, 0.0), (12.0, 12.0)]), &districts.into(), true).unwrap();

        assert_eq!(table.rows[0].nearest_point, Point::new(2.0, 2.0));
        assert_eq!(table.rows[1].nearest_point, Point::new(11.0, 11.0));
        assert_eq!(table.rows[1].candidate, 1);
    }

    #[test]
    fn test_prepared_candidates_match_direct_analysis() {
        let comparison = site(&[(1.0, 0.0), (0.0, 9.0), (20.0, 20.0)]);
        let reference = site(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (19.0, 18.0)]);

        let prepared = prepare_candidates(&comparison).unwrap();
        assert_eq!(prepared.name(), "site");
        assert_eq!(prepared.candidates().len(), 3);

        let direct = analyze(&reference, &comparison, true).unwrap();
        assert_eq!(prepared.analyze(&reference, true).unwrap(), direct);
        assert_eq!(prepared.analyze(&reference, true).unwrap(), direct);
    }

    #[test]
    fn test_prepared_indexes_agree() {
        let comparison = site(&[(1.0, 0.0), (0.0, 9.0), (20.0, 20.0), (-5.0, 3.0)]);
        let reference = site(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (19.0, 18.0), (-4.0, 4.0)]);

        let rtree = NearestNeighborAnalysis::new().index(IndexKind::RTree).prepare(&comparison).unwrap();
        let brute = NearestNeighborAnalysis::new().index(IndexKind::BruteForce).prepare(&comparison).unwrap();

        assert_eq!(rtree.analyze(&reference, true).unwrap(), brute.analyze(&reference, true).unwrap());
    }

    #[test]
    fn test_prepare_requires_crs() {
        let comparison: Dataset = SpatialCollection::from_points("bare", None, &[(0.0, 0.0)]).into();
        assert!(matches!(prepare_candidates(&comparison), Err(NearmatchError::MissingCrs { .. })));
    }

    #[test]
    fn test_empty_comparison() {
        let comparison: Dataset = SpatialCollection::new("none", Some(Crs::local("site grid"))).into();
        let err = analyze(&site(&[(0.0, 0.0)]), &comparison, false).unwrap_err();
        assert!(matches!(err, NearmatchError::EmptyCandidates));
    }
}
