//! Confirmation output for a finished analysis
//!
//! [`confirm`] renders a result table as a styled GeoJSON layer set that any
//! GIS viewer can open: links from origin to match, origins and matches.
//! [`audit`] checks the same table against the candidates by brute force.

use std::fmt;
use std::path::Path;

use geo::{Line, Point};
use nearmatch_core::models::{Crs, MatchTable, DISTANCE_COLUMN};
use nearmatch_core::{NearmatchError, Result};
use serde_json::{json, Map, Value};

use crate::index::distance_2;
use crate::reduce::CombinedCandidates;

pub const ORIGIN_COLOR: &str = "#1CB2FE";
pub const MATCH_COLOR: &str = "#F68C69";
pub const LINK_COLOR: &str = "#FFFFFF";

/// Segment from each origin to its match, in row order
pub fn links(table: &MatchTable) -> Vec<Line> {
    table.iter().map(|row| Line::new(row.point_of_origin, row.nearest_point)).collect()
}

/// Styled GeoJSON rendering of a result table
#[derive(Debug, Clone)]
pub struct ConfirmationFigure {
    crs: Crs,
    collection: ::geojson::FeatureCollection,
}

impl ConfirmationFigure {
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn feature_collection(&self) -> &::geojson::FeatureCollection {
        &self.collection
    }

    /// Number of features tagged with `layer`
    pub fn layer_len(&self, layer: &str) -> usize {
        self.collection
            .features
            .iter()
            .filter(|f| f.property("layer").and_then(Value::as_str) == Some(layer))
            .count()
    }

    pub fn to_geojson_string(&self) -> String {
        ::geojson::GeoJson::from(self.collection.clone()).to_string()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_geojson_string())?;
        tracing::info!("confirmation layers written to {}", path.display());
        Ok(())
    }
}

/// Render links, origins and matches as three layers
///
/// The table must carry a CRS so the layers can be placed.
pub fn confirm(table: &MatchTable) -> Result<ConfirmationFigure> {
    let crs = table.crs.clone().ok_or_else(|| NearmatchError::MissingCrs {
        argument: "result table".to_string(),
    })?;

    let mut features = Vec::with_capacity(table.len() * 3);

    for (row, line) in links(table).iter().enumerate() {
        features.push(feature(
            ::geojson::Value::LineString(vec![
                vec![line.start.x, line.start.y],
                vec![line.end.x, line.end.y],
            ]),
            json!({"layer": "link", "row": row, "stroke": LINK_COLOR, "stroke-width": 1}),
        ));
    }

    for (row, r) in table.iter().enumerate() {
        features.push(feature(
            point_value(r.point_of_origin),
            json!({"layer": "origin", "row": row, "marker-color": ORIGIN_COLOR, "marker-symbol": "circle"}),
        ));
    }

    for (row, r) in table.iter().enumerate() {
        let mut properties = json!({
            "layer": "match",
            "row": row,
            "candidate": r.candidate,
            "marker-color": MATCH_COLOR,
            "marker-symbol": "triangle",
        });
        if let Some(distance) = r.distance_in_meter {
            properties[DISTANCE_COLUMN] = json!(distance);
        }
        features.push(feature(point_value(r.nearest_point), properties));
    }

    let mut members = Map::new();
    members.insert(
        "crs".to_string(),
        json!({"type": "name", "properties": {"name": crs.to_string()}}),
    );

    Ok(ConfirmationFigure {
        crs,
        collection: ::geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(members),
        },
    })
}

fn point_value(point: Point) -> ::geojson::Value {
    ::geojson::Value::Point(vec![point.x(), point.y()])
}

fn feature(value: ::geojson::Value, properties: Value) -> ::geojson::Feature {
    let properties = match properties {
        Value::Object(map) => Some(map),
        _ => None,
    };
    ::geojson::Feature {
        bbox: None,
        geometry: Some(::geojson::Geometry::new(value)),
        id: None,
        properties,
        foreign_members: None,
    }
}

/// A row whose reported match is not the closest candidate
#[derive(Debug, Clone, PartialEq)]
pub enum AuditViolation {
    /// `nearest_point` is not one of the representative points
    UnknownMatch { row: usize, point: Point },

    /// Another candidate is closer than the reported match by more than the
    /// tolerance
    CloserCandidate { row: usize, candidate: usize, reported: f64, closest: f64 },
}

impl fmt::Display for AuditViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditViolation::UnknownMatch { row, point } => {
                write!(f, "row {}: match ({}, {}) is not a candidate point", row, point.x(), point.y())
            }
            AuditViolation::CloserCandidate { row, candidate, reported, closest } => write!(
                f,
                "row {}: candidate {} is at {} but the reported match is at {}",
                row, candidate, closest, reported
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    /// Rows checked
    pub checked: usize,
    pub violations: Vec<AuditViolation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every row against all candidates by brute force
///
/// Distances are planar in the table's coordinate space, the same metric
/// the search uses.
pub fn audit(table: &MatchTable, candidates: &CombinedCandidates, epsilon: f64) -> AuditReport {
    let mut report = AuditReport { checked: table.len(), violations: Vec::new() };

    for (row, r) in table.iter().enumerate() {
        if !candidates.contains(r.nearest_point) {
            report.violations.push(AuditViolation::UnknownMatch { row, point: r.nearest_point });
            continue;
        }

        let reported = distance_2(r.point_of_origin, r.nearest_point).sqrt();
        let closest = candidates
            .iter()
            .map(|c| (c.entity, distance_2(r.point_of_origin, c.point).sqrt()))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((candidate, closest)) = closest {
            if closest + epsilon < reported {
                report
                    .violations
                    .push(AuditViolation::CloserCandidate { row, candidate, reported, closest });
            }
        }
    }

    if !report.is_clean() {
        tracing::warn!("audit found {} violations in {} rows", report.violations.len(), report.checked);
    }
    report
}
