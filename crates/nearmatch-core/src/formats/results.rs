//! Export and re-import of nearest-neighbor result tables
//!
//! Point columns are stored as WKT (`POINT(x y)`) so the CSV stays readable
//! by other GIS tools. The CRS is not part of the CSV and must be supplied on
//! read.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use wkt::{ToWkt, TryFromWkt};

use crate::error::{NearmatchError, Result};
use crate::models::{
    Crs, MatchRow, MatchTable, DISTANCE_COLUMN, NEAREST_POINT_COLUMN, ORIGIN_COLUMN,
};

pub const CANDIDATE_COLUMN: &str = "candidate";
/// Leading column of exports split by `--group-by`
pub const GROUP_COLUMN: &str = "group";

/// Write a result table as CSV to `path`
pub fn write_results_csv(table: &MatchTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_results_csv_to(table, file)
}

pub fn write_results_csv_to<W: Write>(table: &MatchTable, writer: W) -> Result<()> {
    write_csv_rows(&[(None, table)], false, writer)
}

/// Write per-group result tables to one CSV with a leading `group` column
pub fn write_grouped_results_csv(groups: &[(String, MatchTable)], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_grouped_results_csv_to(groups, file)
}

pub fn write_grouped_results_csv_to<W: Write>(groups: &[(String, MatchTable)], writer: W) -> Result<()> {
    let tables: Vec<(Option<&str>, &MatchTable)> =
        groups.iter().map(|(group, table)| (Some(group.as_str()), table)).collect();
    write_csv_rows(&tables, true, writer)
}

fn write_csv_rows<W: Write>(tables: &[(Option<&str>, &MatchTable)], grouped: bool, writer: W) -> Result<()> {
    let with_distance = tables.iter().any(|(_, table)| !table.is_empty())
        && tables.iter().all(|(_, table)| table.is_empty() || table.has_distances());
    let mut wtr = ::csv::Writer::from_writer(writer);

    let mut header = Vec::new();
    if grouped {
        header.push(GROUP_COLUMN);
    }
    header.extend([ORIGIN_COLUMN, NEAREST_POINT_COLUMN, CANDIDATE_COLUMN]);
    if with_distance {
        header.push(DISTANCE_COLUMN);
    }
    wtr.write_record(&header).map_err(csv_error)?;

    for (group, table) in tables {
        for row in table.iter() {
            let mut record = Vec::with_capacity(header.len());
            if grouped {
                record.push(group.unwrap_or_default().to_string());
            }
            record.extend([
                row.point_of_origin.wkt_string(),
                row.nearest_point.wkt_string(),
                row.candidate.to_string(),
            ]);
            if with_distance {
                record.push(row.distance_in_meter.map(|d| d.to_string()).unwrap_or_default());
            }
            wtr.write_record(&record).map_err(csv_error)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Read a result table written by [`write_results_csv`] (or any CSV with WKT
/// point columns named `point_of_origin` and `nearest_point`)
pub fn read_results_csv(path: &Path, crs: Option<Crs>) -> Result<MatchTable> {
    let file = File::open(path)?;
    read_results_csv_from(file, crs)
}

/// Tables without a `candidate` column use the row position in its place.
pub fn read_results_csv_from<R: Read>(reader: R, crs: Option<Crs>) -> Result<MatchTable> {
    let mut rdr = ::csv::ReaderBuilder::new().trim(::csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = [ORIGIN_COLUMN, NEAREST_POINT_COLUMN]
        .iter()
        .filter(|column| position(column).is_none())
        .map(|column| column.to_string())
        .collect();

    let (origin_idx, nearest_idx) = match (position(ORIGIN_COLUMN), position(NEAREST_POINT_COLUMN)) {
        (Some(origin), Some(nearest)) => (origin, nearest),
        _ => return Err(NearmatchError::Schema { missing }),
    };
    let candidate_idx = position(CANDIDATE_COLUMN);
    let distance_idx = position(DISTANCE_COLUMN);

    let mut rows = Vec::new();
    for (row_number, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let point_of_origin = parse_point(cell(origin_idx), row_number)?;
        let nearest_point = parse_point(cell(nearest_idx), row_number)?;

        let candidate = match candidate_idx {
            Some(idx) => cell(idx).parse::<usize>().map_err(|e| NearmatchError::FormatError {
                format: "CSV".to_string(),
                message: format!("Row {}: invalid {}: {}", row_number, CANDIDATE_COLUMN, e),
            })?,
            None => row_number,
        };

        let distance_in_meter = match distance_idx.map(cell) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<f64>().map_err(|e| {
                NearmatchError::InvalidCoordinate {
                    row: row_number,
                    reason: format!("invalid {}: {}", DISTANCE_COLUMN, e),
                }
            })?),
        };

        rows.push(MatchRow { point_of_origin, nearest_point, candidate, distance_in_meter });
    }

    Ok(MatchTable::new(crs, rows))
}

/// Write a result table as a GeoJSON FeatureCollection of origin points
pub fn write_results_geojson(table: &MatchTable, path: &Path) -> Result<()> {
    std::fs::write(path, ::geojson::GeoJson::from(results_to_geojson(table)).to_string())?;
    Ok(())
}

/// Write per-group result tables as one FeatureCollection; each feature
/// carries its group as a `group` property
pub fn write_grouped_results_geojson(groups: &[(String, MatchTable)], path: &Path) -> Result<()> {
    std::fs::write(path, ::geojson::GeoJson::from(grouped_results_to_geojson(groups)).to_string())?;
    Ok(())
}

/// Origins as features carrying the match and distance as properties
pub fn results_to_geojson(table: &MatchTable) -> ::geojson::FeatureCollection {
    let features = table.iter().map(|row| origin_feature(row, None)).collect();
    ::geojson::FeatureCollection { bbox: None, features, foreign_members: crs_member(table.crs.as_ref()) }
}

pub fn grouped_results_to_geojson(groups: &[(String, MatchTable)]) -> ::geojson::FeatureCollection {
    let features = groups
        .iter()
        .flat_map(|(group, table)| table.iter().map(move |row| origin_feature(row, Some(group.as_str()))))
        .collect();
    let crs = groups.first().and_then(|(_, table)| table.crs.as_ref());
    ::geojson::FeatureCollection { bbox: None, features, foreign_members: crs_member(crs) }
}

fn origin_feature(row: &MatchRow, group: Option<&str>) -> ::geojson::Feature {
    let mut properties = serde_json::Map::new();
    if let Some(group) = group {
        properties.insert(GROUP_COLUMN.to_string(), group.into());
    }
    properties.insert(
        NEAREST_POINT_COLUMN.to_string(),
        serde_json::json!([row.nearest_point.x(), row.nearest_point.y()]),
    );
    properties.insert(CANDIDATE_COLUMN.to_string(), row.candidate.into());
    if let Some(distance) = row.distance_in_meter {
        properties.insert(DISTANCE_COLUMN.to_string(), distance.into());
    }

    ::geojson::Feature {
        bbox: None,
        geometry: Some(::geojson::Geometry::new(::geojson::Value::Point(vec![
            row.point_of_origin.x(),
            row.point_of_origin.y(),
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Legacy named-CRS member, omitted for WGS 84 which is the GeoJSON default
pub(crate) fn crs_member(crs: Option<&Crs>) -> Option<serde_json::Map<String, serde_json::Value>> {
    match crs {
        Some(crs) if *crs != Crs::wgs84() => {
            let mut members = serde_json::Map::new();
            members.insert(
                "crs".to_string(),
                serde_json::json!({"type": "name", "properties": {"name": crs.to_string()}}),
            );
            Some(members)
        }
        _ => None,
    }
}

fn parse_point(text: &str, row: usize) -> Result<geo::Point> {
    <geo::Point as TryFromWkt<f64>>::try_from_wkt_str(text).map_err(|e| {
        NearmatchError::InvalidCoordinate { row, reason: format!("'{}' is not a WKT point: {}", text, e) }
    })
}

fn csv_error(e: ::csv::Error) -> NearmatchError {
    NearmatchError::FormatError { format: "CSV".to_string(), message: e.to_string() }
}
