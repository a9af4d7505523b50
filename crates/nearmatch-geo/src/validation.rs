//! Predicates over datasets
//!
//! Nothing here mutates its input. Predicates return a bool, or a typed error
//! when the question cannot be asked of the argument (e.g. the CRS of a
//! tabular dataset). Errors name the offending dataset.

use std::collections::BTreeMap;

use nearmatch_core::models::{Dataset, GeometryType, SpatialCollection};
use nearmatch_core::{NearmatchError, Result};

/// Frequency table of geometry kinds in a collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeometryTypeCounts {
    counts: BTreeMap<GeometryType, usize>,
}

impl GeometryTypeCounts {
    /// Count the kinds present in a collection; entities without geometry
    /// are skipped
    pub fn of(collection: &SpatialCollection) -> Self {
        let mut counts = BTreeMap::new();
        for geometry in collection.iter().filter_map(|e| e.geometry.as_ref()) {
            *counts.entry(geometry.geometry_type()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, kind: GeometryType) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Present kinds with their counts, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (GeometryType, usize)> + '_ {
        self.counts.iter().map(|(kind, count)| (*kind, *count))
    }

    /// More than one geometry kind present
    pub fn is_mixed(&self) -> bool {
        self.counts.len() > 1
    }

    /// Most frequent kind; ties go to the kind declared first
    pub fn dominant(&self) -> Option<(GeometryType, usize)> {
        GeometryType::ALL.iter().fold(None, |best, kind| {
            let count = self.get(*kind);
            match best {
                _ if count == 0 => best,
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((*kind, count)),
            }
        })
    }
}

pub fn is_spatial_collection(dataset: &Dataset) -> bool {
    matches!(dataset, Dataset::Spatial(_))
}

pub fn all_are_spatial_collections(datasets: &[Dataset]) -> bool {
    datasets.iter().all(is_spatial_collection)
}

/// Whether the collection carries a CRS
pub fn has_crs(dataset: &Dataset) -> Result<bool> {
    let collection = require_spatial(dataset, dataset.name())?;
    Ok(collection.crs.is_some())
}

pub fn all_have_crs(datasets: &[Dataset]) -> Result<bool> {
    for dataset in datasets {
        if !has_crs(dataset)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether every entity carries a geometry (vacuously true when empty)
pub fn has_geometry(dataset: &Dataset) -> Result<bool> {
    let collection = require_spatial(dataset, dataset.name())?;
    Ok(first_missing_geometry(collection).is_none())
}

pub fn all_have_geometry(datasets: &[Dataset]) -> Result<bool> {
    for dataset in datasets {
        if !has_geometry(dataset)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether both collections share the same CRS
///
/// Both must be spatial and both must carry a CRS; a missing CRS is an
/// error, not a mismatch.
pub fn crs_is_equal(first: &Dataset, second: &Dataset) -> Result<bool> {
    let a = require_spatial(first, first.name())?;
    let b = require_spatial(second, second.name())?;
    let crs_a = a.crs.as_ref().ok_or_else(|| missing_crs(first.name()))?;
    let crs_b = b.crs.as_ref().ok_or_else(|| missing_crs(second.name()))?;
    Ok(crs_a == crs_b)
}

pub fn geometry_type_counts(dataset: &Dataset) -> Result<GeometryTypeCounts> {
    let collection = require_spatial(dataset, dataset.name())?;
    require_geometry(collection, dataset.name())?;
    Ok(GeometryTypeCounts::of(collection))
}

/// Most frequent geometry kind, `None` for an empty collection
pub fn dominant_geometry_type(dataset: &Dataset) -> Result<Option<GeometryType>> {
    Ok(dominant_geometry_type_with_count(dataset)?.map(|(kind, _)| kind))
}

pub fn dominant_geometry_type_with_count(
    dataset: &Dataset,
) -> Result<Option<(GeometryType, usize)>> {
    Ok(geometry_type_counts(dataset)?.dominant())
}

/// The spatial collection inside `dataset`, or `NotSpatial` naming `argument`
pub(crate) fn require_spatial<'a>(
    dataset: &'a Dataset,
    argument: &str,
) -> Result<&'a SpatialCollection> {
    dataset.as_spatial().ok_or_else(|| NearmatchError::NotSpatial {
        argument: argument.to_string(),
        actual: dataset.kind_name().to_string(),
    })
}

/// `MissingGeometry` naming `argument` and the first entity without geometry
pub(crate) fn require_geometry(collection: &SpatialCollection, argument: &str) -> Result<()> {
    match first_missing_geometry(collection) {
        Some(entity) => {
            Err(NearmatchError::MissingGeometry { argument: argument.to_string(), entity })
        }
        None => Ok(()),
    }
}

pub(crate) fn missing_crs(argument: &str) -> NearmatchError {
    NearmatchError::MissingCrs { argument: argument.to_string() }
}

fn first_missing_geometry(collection: &SpatialCollection) -> Option<usize> {
    collection.iter().position(|e| e.geometry.is_none())
}
