//! Distance command implementation

use crate::cli::DistanceArgs;
use crate::config_loader::parse_crs_arg;
use crate::output::OutputWriter;
use crate::output_types::{DistanceOutput, DistanceSummary, MatchPreview};
use anyhow::{Context, Result};
use nearmatch_core::formats::results::{read_results_csv, write_results_csv};
use nearmatch_geo::distance::{uses_geodesic, with_distances};

/// Rows shown in the human-readable preview
const PREVIEW_ROWS: usize = 10;

pub fn execute(args: DistanceArgs, output: &OutputWriter) -> Result<()> {
    let crs = parse_crs_arg("--crs", args.crs.as_deref())?;

    let table = read_results_csv(&args.results, crs)
        .with_context(|| format!("Failed to read results table {}", args.results.display()))?;
    let geodesic = uses_geodesic(table.crs.as_ref());
    let table = with_distances(table).context("Cannot compute distances")?;

    let output_path = match &args.output {
        Some(path) => {
            write_results_csv(&table, path)
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let result = DistanceOutput {
        results: args.results.display().to_string(),
        crs: table.crs.as_ref().map(|c| c.to_string()),
        geodesic,
        rows: table.len(),
        distance: DistanceSummary::of(&table),
        output: output_path,
    };

    if output.is_json() {
        output.result(&result)?;
        return Ok(());
    }

    output.section("Distances");
    output.kv("Results", &result.results);
    output.kv("CRS", result.crs.as_deref().unwrap_or("none (treated as EPSG:4326)"));
    output.kv("Metric", if geodesic { "geodesic (WGS84 ellipsoid)" } else { "planar (engineering CRS units)" });
    output.kv("Rows", result.rows);
    if let Some(d) = result.distance {
        output.kv(
            "Distance (m)",
            format!("min {:.2}, mean {:.2}, median {:.2}, max {:.2}", d.min, d.mean, d.median, d.max),
        );
    }
    output.table(MatchPreview::rows(&table, PREVIEW_ROWS));

    if let Some(path) = &result.output {
        output.success(format!("Results written to {}", path));
    }
    Ok(())
}
