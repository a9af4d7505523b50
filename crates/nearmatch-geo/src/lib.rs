//! Nearmatch Geo - Validation, reduction, nearest-neighbor search and distances
//!
//! This crate holds the matching pipeline: datasets are validated, the
//! comparison side is reduced to representative points, an index answers
//! nearest-point queries for every reference point, and distances are added
//! on request.

pub mod analysis;
pub mod confirm;
pub mod distance;
pub mod engine;
pub mod index;
pub mod reduce;
pub mod slicing;
pub mod validation;

pub use analysis::{analyze, prepare_candidates, NearestNeighborAnalysis, PreparedCandidates};
pub use index::{build_index, BruteForceIndex, RTreeIndex, SpatialIndex};
pub use nearmatch_core::config::IndexKind;
pub use reduce::{CombinedCandidates, RepresentativePoint};
