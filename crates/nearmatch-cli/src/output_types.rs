use nearmatch_core::models::{GeometryType, MatchTable};
use serde::Serialize;
use tabled::Tabled;

/// Output for analyze command
#[derive(Debug, Serialize)]
pub struct AnalyzeOutput {
    pub reference: String,
    pub comparison: String,
    pub crs: String,
    pub index: String,
    pub with_distance: bool,
    pub runs: Vec<RunOutput>,
    pub output: Option<String>,
    pub confirm: Option<String>,
    pub audit: Option<AuditOutput>,
}

/// One analysis run (a single run, or one per group)
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub group: Option<String>,
    pub rows: usize,
    pub distance: Option<DistanceSummary>,
    pub preview: Vec<MatchPreview>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DistanceSummary {
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl DistanceSummary {
    /// `None` when the table carries no distances
    pub fn of(table: &MatchTable) -> Option<Self> {
        let mut distances: Vec<f64> = table.distances().collect();
        if distances.is_empty() {
            return None;
        }
        distances.sort_by(f64::total_cmp);

        let n = distances.len();
        let median = if n % 2 == 1 {
            distances[n / 2]
        } else {
            (distances[n / 2 - 1] + distances[n / 2]) / 2.0
        };

        Some(Self {
            min: distances[0],
            mean: distances.iter().sum::<f64>() / n as f64,
            median,
            max: distances[n - 1],
        })
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct MatchPreview {
    #[tabled(rename = "#")]
    pub row: usize,
    #[tabled(rename = "Origin")]
    pub point_of_origin: String,
    #[tabled(rename = "Nearest point")]
    pub nearest_point: String,
    #[tabled(rename = "Candidate")]
    pub candidate: usize,
    #[tabled(rename = "Distance (m)", display_with = "display_distance")]
    pub distance_in_meter: Option<f64>,
}

impl MatchPreview {
    pub fn rows(table: &MatchTable, limit: usize) -> Vec<Self> {
        table
            .iter()
            .take(limit)
            .enumerate()
            .map(|(row, r)| MatchPreview {
                row,
                point_of_origin: format!("({:.6}, {:.6})", r.point_of_origin.x(), r.point_of_origin.y()),
                nearest_point: format!("({:.6}, {:.6})", r.nearest_point.x(), r.nearest_point.y()),
                candidate: r.candidate,
                distance_in_meter: r.distance_in_meter,
            })
            .collect()
    }
}

fn display_distance(distance: &Option<f64>) -> String {
    distance.map(|d| format!("{:.2}", d)).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Serialize)]
pub struct AuditOutput {
    pub checked: usize,
    pub violations: Vec<String>,
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub name: String,
    pub format: String,
    pub kind: String,
    pub crs: Option<String>,
    pub count: usize,
    pub geometry_types: Vec<GeometryTypeCount>,
    pub dominant_geometry_type: Option<GeometryType>,
    pub columns: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct GeometryTypeCount {
    #[tabled(rename = "Geometry")]
    pub geometry_type: GeometryType,
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Output for distance command
#[derive(Debug, Serialize)]
pub struct DistanceOutput {
    pub results: String,
    pub crs: Option<String>,
    pub geodesic: bool,
    pub rows: usize,
    pub distance: Option<DistanceSummary>,
    pub output: Option<String>,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub values: Vec<ConfigValue>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct ConfigValue {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use nearmatch_core::models::MatchRow;

    fn table(distances: &[f64]) -> MatchTable {
        let rows = distances
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let mut row = MatchRow::new(Point::new(0.0, 0.0), Point::new(*d, 0.0), i);
                row.distance_in_meter = Some(*d);
                row
            })
            .collect();
        MatchTable::new(None, rows)
    }

    #[test]
    fn test_distance_summary() {
        let summary = DistanceSummary::of(&table(&[9.0, 1.0, 1.0])).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.median, 1.0);
        assert_eq!(summary.max, 9.0);
        assert!((summary.mean - 11.0 / 3.0).abs() < 1e-12);

        let even = DistanceSummary::of(&table(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(even.median, 2.5);
    }

    #[test]
    fn test_summary_without_distances() {
        assert!(DistanceSummary::of(&table(&[1.0]).without_distances()).is_none());
    }

    #[test]
    fn test_preview_respects_limit() {
        let preview = MatchPreview::rows(&table(&[1.0, 2.0, 3.0]), 2);
        assert_eq!(preview.len(), 2);
        assert_eq!(display_distance(&preview[1].distance_in_meter), "2.00");
        assert_eq!(display_distance(&None), "-");
    }
}
