//! Nearest-neighbor result table.
//!
//! Each geometry column is its own named field on the row; plotting layers
//! such as origin/match links are derived from the table, never stored on it.

use super::geometry::Crs;
use geo::Point;

pub const ORIGIN_COLUMN: &str = "point_of_origin";
pub const NEAREST_POINT_COLUMN: &str = "nearest_point";
pub const DISTANCE_COLUMN: &str = "distance_in_meter";

/// One reference entity and its match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRow {
    /// The reference entity's own location, unreduced
    pub point_of_origin: Point,

    /// Representative point of the matched candidate
    pub nearest_point: Point,

    /// Row index of the matched candidate entity
    pub candidate: usize,

    pub distance_in_meter: Option<f64>,
}

impl MatchRow {
    pub fn new(point_of_origin: Point, nearest_point: Point, candidate: usize) -> Self {
        Self { point_of_origin, nearest_point, candidate, distance_in_meter: None }
    }
}

/// One row per reference entity, in reference order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchTable {
    pub crs: Option<Crs>,
    pub rows: Vec<MatchRow>,
}

impl MatchTable {
    pub fn new(crs: Option<Crs>, rows: Vec<MatchRow>) -> Self {
        Self { crs, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRow> {
        self.rows.iter()
    }

    /// True when every row carries a distance
    pub fn has_distances(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.distance_in_meter.is_some())
    }

    /// Column names present in this table
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![ORIGIN_COLUMN, NEAREST_POINT_COLUMN];
        if self.has_distances() {
            columns.push(DISTANCE_COLUMN);
        }
        columns
    }

    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(|r| r.distance_in_meter)
    }

    /// Drop the distance column
    pub fn without_distances(mut self) -> Self {
        for row in &mut self.rows {
            row.distance_in_meter = None;
        }
        self
    }
}
