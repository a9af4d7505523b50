//! Reference subsets: attribute filters, IQR outlier trimming and grouping
//!
//! Slicing is always explicit. The analysis never filters its inputs on its
//! own; callers build the subset here and pass it in.

use std::collections::BTreeMap;

use nearmatch_core::models::{SpatialCollection, SpatialEntity};
use nearmatch_core::{NearmatchError, Result};
use serde_json::Value;

/// Interquartile band of a numeric attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBand {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBand {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Entities whose `field` equals `value`
///
/// Numbers compare by value, so `5` matches `5.0`.
pub fn filter_by_attribute(collection: &SpatialCollection, field: &str, value: &Value) -> SpatialCollection {
    collection.filtered(|e| e.attribute(field).is_some_and(|v| values_equal(v, value)))
}

/// Q1/Q3 of `field` by linear interpolation, and the band
/// `[Q1 - k*IQR, Q3 + k*IQR]`
pub fn interquartile_band(collection: &SpatialCollection, field: &str, multiplier: f64) -> Result<IqrBand> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(NearmatchError::InvalidAttribute {
            field: field.to_string(),
            reason: format!("IQR multiplier must be non-negative, got {}", multiplier),
        });
    }

    let mut values = collection
        .iter()
        .enumerate()
        .map(|(idx, e)| numeric_attribute(e, field, idx))
        .collect::<Result<Vec<_>>>()?;

    if values.is_empty() {
        return Err(NearmatchError::InvalidAttribute {
            field: field.to_string(),
            reason: "no values to compute quartiles from".to_string(),
        });
    }

    values.sort_by(f64::total_cmp);
    let q1 = quantile(&values, 0.25);
    let q3 = quantile(&values, 0.75);
    let iqr = q3 - q1;

    Ok(IqrBand { q1, q3, iqr, lower: q1 - multiplier * iqr, upper: q3 + multiplier * iqr })
}

/// Entities whose `field` lies inside the interquartile band
pub fn trim_outliers(collection: &SpatialCollection, field: &str, multiplier: f64) -> Result<SpatialCollection> {
    let band = interquartile_band(collection, field, multiplier)?;

    let mut kept = Vec::new();
    for (idx, entity) in collection.iter().enumerate() {
        if band.contains(numeric_attribute(entity, field, idx)?) {
            kept.push(entity.clone());
        }
    }

    tracing::debug!(
        "trimmed {} of {} entities outside [{}, {}] on {}",
        collection.len() - kept.len(),
        collection.len(),
        band.lower,
        band.upper,
        field
    );

    Ok(SpatialCollection::new(collection.name.clone(), collection.crs.clone()).with_entities(kept))
}

/// Split a collection by the value of `field`
///
/// Entities without the attribute (or with null) belong to no group.
pub fn group_by(collection: &SpatialCollection, field: &str) -> BTreeMap<String, SpatialCollection> {
    let mut groups: BTreeMap<String, SpatialCollection> = BTreeMap::new();

    for entity in collection.iter() {
        let key = match entity.attribute(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        groups
            .entry(key)
            .or_insert_with_key(|key| {
                SpatialCollection::new(format!("{}[{}={}]", collection.name, field, key), collection.crs.clone())
            })
            .push(entity.clone());
    }

    groups
}

/// Value at quantile `q` of sorted `values`, interpolating linearly between
/// the closest ranks
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn numeric_attribute(entity: &SpatialEntity, field: &str, idx: usize) -> Result<f64> {
    let invalid = |reason: String| NearmatchError::InvalidAttribute { field: field.to_string(), reason };

    match entity.attribute(field) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("entity {} holds a number outside f64 range", idx))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("entity {} holds non-numeric value '{}'", idx, s))),
        Some(Value::Null) | None => Err(invalid(format!("entity {} has no value", idx))),
        Some(other) => Err(invalid(format!("entity {} holds non-numeric value {}", idx, other))),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
