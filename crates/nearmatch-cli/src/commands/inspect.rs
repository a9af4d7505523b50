//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::config_loader::{load_config_with_overrides, parse_crs_arg};
use crate::output::OutputWriter;
use crate::output_types::{GeometryTypeCount, InspectOutput};
use anyhow::{Context, Result};
use nearmatch_core::config::CliConfigOverrides;
use nearmatch_core::formats::{FormatRegistry, ReadOptions};
use nearmatch_core::models::Dataset;
use nearmatch_geo::validation::GeometryTypeCounts;
use std::path::Path;

pub fn execute(args: InspectArgs, output: &OutputWriter, config_path: Option<&Path>) -> Result<()> {
    let overrides = CliConfigOverrides {
        csv_crs: parse_crs_arg("--csv-crs", args.csv_crs.as_deref())?,
        ..Default::default()
    };
    let config = load_config_with_overrides(config_path, overrides)?;
    let registry = FormatRegistry::with_defaults(ReadOptions::from(&config));

    let reader = registry.detect_format(&args.path)?;
    let validation = reader
        .validate(&args.path)
        .with_context(|| format!("Failed to validate {}", args.path.display()))?;
    let format = reader.format_name().to_string();

    let dataset = registry
        .read(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    let mut result = InspectOutput {
        name: dataset.name().to_string(),
        format,
        kind: dataset.kind_name().to_string(),
        crs: None,
        count: dataset.len(),
        geometry_types: Vec::new(),
        dominant_geometry_type: None,
        columns: Vec::new(),
        warnings: validation.warnings,
    };

    match &dataset {
        Dataset::Spatial(collection) => {
            let counts = GeometryTypeCounts::of(collection);
            result.crs = collection.crs.as_ref().map(|c| c.to_string());
            result.dominant_geometry_type = counts.dominant().map(|(kind, _)| kind);
            result.geometry_types = counts
                .iter()
                .map(|(geometry_type, count)| GeometryTypeCount { geometry_type, count })
                .collect();
        }
        Dataset::Tabular(table) => {
            result.columns = table.columns.clone();
        }
    }

    if output.is_json() {
        output.result(&result)?;
        return Ok(());
    }

    output.section(format!("Dataset {}", result.name));
    output.kv("Format", &result.format);
    output.kv("Kind", &result.kind);
    output.kv("Entries", result.count);

    match &dataset {
        Dataset::Spatial(_) => {
            output.kv("CRS", result.crs.as_deref().unwrap_or("missing"));
            if let Some(dominant) = result.dominant_geometry_type {
                output.kv("Dominant geometry", dominant);
            }
            output.table(result.geometry_types);
            if result.crs.is_none() {
                output.warning("No CRS: this dataset cannot be analyzed until one is assigned");
            }
        }
        Dataset::Tabular(_) => {
            output.kv("Columns", result.columns.join(", "));
            output.warning("Tabular datasets have no geometry and cannot be analyzed");
        }
    }

    Ok(())
}
