//! Nearest-point indexes over representative candidate points
//!
//! Both indexes answer the same question under planar Euclidean distance in
//! the coordinate space of the candidates. They differ only in cost and in
//! how exact ties are broken.

use geo::Point;
use nearmatch_core::config::IndexKind;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::reduce::{CombinedCandidates, RepresentativePoint};

/// Read-only nearest-point lookup, built once and queried many times
pub trait SpatialIndex: Send + Sync {
    /// Closest candidate to `query`, `None` only for an empty index
    fn nearest(&self, query: Point) -> Option<&RepresentativePoint>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Squared planar distance
pub(crate) fn distance_2(a: Point, b: Point) -> f64 {
    let dx = a.x() - b.x();
    let dy = a.y() - b.y();
    dx * dx + dy * dy
}

/// Linear scan over every candidate
///
/// On exact ties the candidate listed first wins.
pub struct BruteForceIndex {
    candidates: Vec<RepresentativePoint>,
}

impl BruteForceIndex {
    pub fn new(candidates: &CombinedCandidates) -> Self {
        Self { candidates: candidates.points.clone() }
    }
}

impl SpatialIndex for BruteForceIndex {
    fn nearest(&self, query: Point) -> Option<&RepresentativePoint> {
        let mut best: Option<(&RepresentativePoint, f64)> = None;
        for candidate in &self.candidates {
            let d = distance_2(candidate.point, query);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((candidate, d)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Representative point stored in the R-tree
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    candidate: RepresentativePoint,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.candidate.point.x(), self.candidate.point.y()])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        distance_2(self.candidate.point, Point::new(point[0], point[1]))
    }
}

/// Bulk-loaded R-tree, O(log m) per query
///
/// Which of several equidistant candidates is returned depends on the tree
/// layout and is not specified.
pub struct RTreeIndex {
    tree: RTree<IndexedPoint>,
}

impl RTreeIndex {
    pub fn new(candidates: &CombinedCandidates) -> Self {
        let indexed: Vec<IndexedPoint> =
            candidates.iter().map(|c| IndexedPoint { candidate: *c }).collect();
        Self { tree: RTree::bulk_load(indexed) }
    }
}

impl SpatialIndex for RTreeIndex {
    fn nearest(&self, query: Point) -> Option<&RepresentativePoint> {
        self.tree.nearest_neighbor(&[query.x(), query.y()]).map(|p| &p.candidate)
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Build the index selected by `kind`
pub fn build_index(kind: IndexKind, candidates: &CombinedCandidates) -> Box<dyn SpatialIndex> {
    tracing::debug!("building {} index over {} candidate points", kind, candidates.len());
    match kind {
        IndexKind::RTree => Box::new(RTreeIndex::new(candidates)),
        IndexKind::BruteForce => Box::new(BruteForceIndex::new(candidates)),
    }
}
