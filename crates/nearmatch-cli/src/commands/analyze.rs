//! Analyze command implementation

use crate::cli::AnalyzeArgs;
use crate::config_loader::{load_config_with_overrides, parse_crs_arg};
use crate::output::OutputWriter;
use crate::output_types::{AnalyzeOutput, AuditOutput, DistanceSummary, MatchPreview, RunOutput};
use anyhow::{anyhow, bail, Context, Result};
use nearmatch_core::config::{CliConfigOverrides, IndexKind};
use nearmatch_core::formats::results::{
    write_grouped_results_csv, write_grouped_results_geojson, write_results_csv, write_results_geojson,
};
use nearmatch_core::formats::{FormatRegistry, ReadOptions};
use nearmatch_core::models::{Dataset, MatchTable};
use nearmatch_geo::confirm::{audit, confirm};
use nearmatch_geo::slicing::{filter_by_attribute, group_by, trim_outliers};
use nearmatch_geo::NearestNeighborAnalysis;
use serde_json::Value;
use std::path::Path;

/// Slack allowed between a reported match and the brute-force optimum
const AUDIT_EPSILON: f64 = 1e-9;

pub fn execute(args: AnalyzeArgs, output: &OutputWriter, config_path: Option<&Path>) -> Result<()> {
    let overrides = CliConfigOverrides {
        index: args.index.map(IndexKind::from),
        with_distance: args.no_distance.then_some(false),
        csv_crs: parse_crs_arg("--csv-crs", args.csv_crs.as_deref())?,
        ..Default::default()
    };
    let config = load_config_with_overrides(config_path, overrides)?;
    let registry = FormatRegistry::with_defaults(ReadOptions::from(&config));

    let reference = read_dataset(&registry, &args.reference, "reference")?;
    let comparison = read_dataset(&registry, &args.comparison, "comparison")?;
    let reference_name = reference.name().to_string();

    let analysis = NearestNeighborAnalysis::from_config(&config);
    let prepared = analysis
        .prepare(&comparison)
        .with_context(|| format!("Cannot use {} as comparison dataset", args.comparison.display()))?;

    let subsets = slice_reference(&args, reference, config.iqr_multiplier.value)?;

    let mut runs = Vec::with_capacity(subsets.len());
    let mut combined = MatchTable::new(prepared.crs().cloned(), Vec::new());
    let mut groups: Vec<(String, MatchTable)> = Vec::new();
    for (group, subset) in &subsets {
        let table = prepared.analyze(subset, analysis.distances_enabled()).with_context(|| match group {
            Some(group) => format!("Analysis failed for group {}", group),
            None => "Analysis failed".to_string(),
        })?;

        if table.is_empty() {
            output.warning(format!("{} has no reference entities", subset.name()));
        }

        runs.push(RunOutput {
            group: group.clone(),
            rows: table.len(),
            distance: DistanceSummary::of(&table),
            preview: MatchPreview::rows(&table, args.limit),
        });
        combined.rows.extend(table.rows.iter().cloned());
        if let Some(group) = group {
            groups.push((group.clone(), table));
        }
    }

    let output_path = match &args.output {
        Some(path) => {
            write_results(&combined, &groups, path)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let confirm_path = match &args.confirm {
        Some(path) => {
            confirm(&combined)?
                .save(path)
                .with_context(|| format!("Failed to write confirmation layers to {}", path.display()))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let report = args.audit.then(|| audit(&combined, prepared.candidates(), AUDIT_EPSILON));
    let violations = report.as_ref().map_or(0, |r| r.violations.len());

    let result = AnalyzeOutput {
        reference: reference_name,
        comparison: prepared.name().to_string(),
        crs: combined.crs.as_ref().map_or_else(|| "missing".to_string(), |c| c.to_string()),
        index: analysis.index_kind().to_string(),
        with_distance: analysis.distances_enabled(),
        runs,
        output: output_path,
        confirm: confirm_path,
        audit: report.map(|r| AuditOutput {
            checked: r.checked,
            violations: r.violations.iter().map(|v| v.to_string()).collect(),
        }),
    };

    if output.is_json() {
        output.result(&result)?;
    } else {
        render(result, output);
    }

    if violations > 0 {
        bail!("Audit found {} violation(s)", violations);
    }
    Ok(())
}

fn read_dataset(registry: &FormatRegistry, path: &Path, role: &str) -> Result<Dataset> {
    let dataset = registry
        .read(path)
        .with_context(|| format!("Failed to read {} dataset {}", role, path.display()))?;
    tracing::debug!("loaded {} dataset {} ({} entries)", role, dataset.name(), dataset.len());
    Ok(dataset)
}

/// Apply `--where`, `--trim-outliers` and `--group-by` to the reference
/// dataset, in that order
fn slice_reference(args: &AnalyzeArgs, reference: Dataset, multiplier: f64) -> Result<Vec<(Option<String>, Dataset)>> {
    if args.filter.is_none() && args.trim_outliers.is_none() && args.group_by.is_none() {
        return Ok(vec![(None, reference)]);
    }

    let kind = reference.kind_name();
    let name = reference.name().to_string();
    let mut collection = reference
        .into_spatial()
        .ok_or_else(|| anyhow!("Reference dataset {} is a {} and cannot be sliced", name, kind))?;

    if let Some(filter) = &args.filter {
        let (field, value) = parse_filter(filter)?;
        collection = filter_by_attribute(&collection, field, &value);
        if collection.is_empty() {
            bail!("No reference entities match --where {}", filter);
        }
    }

    if let Some(field) = &args.trim_outliers {
        let before = collection.len();
        collection = trim_outliers(&collection, field, multiplier)
            .with_context(|| format!("Cannot trim outliers on '{}'", field))?;
        tracing::info!("kept {} of {} reference entities after trimming {}", collection.len(), before, field);
    }

    let Some(field) = &args.group_by else {
        return Ok(vec![(None, collection.into())]);
    };

    let mut groups = group_by(&collection, field);
    if !args.groups.is_empty() {
        for wanted in &args.groups {
            if !groups.contains_key(wanted) {
                tracing::warn!("no reference entities have {} = {}", field, wanted);
            }
        }
        groups.retain(|key, _| args.groups.contains(key));
    }
    if groups.is_empty() {
        bail!("No reference entities to group by '{}'", field);
    }

    Ok(groups.into_iter().map(|(key, group)| (Some(key), group.into())).collect())
}

/// `FIELD=VALUE`; numbers compare numerically, anything else as text
fn parse_filter(filter: &str) -> Result<(&str, Value)> {
    let (field, raw) = filter
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid --where '{}': expected FIELD=VALUE", filter))?;
    let field = field.trim();
    if field.is_empty() {
        bail!("Invalid --where '{}': field name is empty", filter);
    }

    let raw = raw.trim();
    let value = if let Ok(int) = raw.parse::<i64>() {
        Value::from(int)
    } else if let Some(number) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Value::Number(number)
    } else {
        Value::from(raw)
    };

    Ok((field, value))
}

/// Grouped runs are written with a leading `group` column or property
fn write_results(table: &MatchTable, groups: &[(String, MatchTable)], path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let written = match (extension.as_deref(), groups.is_empty()) {
        (Some("csv"), true) => write_results_csv(table, path),
        (Some("csv"), false) => write_grouped_results_csv(groups, path),
        (Some("geojson") | Some("json"), true) => write_results_geojson(table, path),
        (Some("geojson") | Some("json"), false) => write_grouped_results_geojson(groups, path),
        _ => bail!("Unsupported output format for {}: use .csv or .geojson", path.display()),
    };
    written.with_context(|| format!("Failed to write results to {}", path.display()))
}

fn render(result: AnalyzeOutput, output: &OutputWriter) {
    output.section("Nearest-neighbor analysis");
    output.kv("Reference", &result.reference);
    output.kv("Comparison", &result.comparison);
    output.kv("CRS", &result.crs);
    output.kv("Index", &result.index);

    for run in result.runs {
        if let Some(group) = &run.group {
            output.section(format!("Group {}", group));
        }
        output.kv("Rows", run.rows);
        if let Some(d) = run.distance {
            output.kv(
                "Distance (m)",
                format!("min {:.2}, mean {:.2}, median {:.2}, max {:.2}", d.min, d.mean, d.median, d.max),
            );
        }
        output.table(run.preview);
    }

    if let Some(path) = &result.output {
        output.success(format!("Results written to {}", path));
    }
    if let Some(path) = &result.confirm {
        output.success(format!("Confirmation layers written to {}", path));
    }
    if let Some(audit) = &result.audit {
        if audit.violations.is_empty() {
            output.success(format!("Audit checked {} rows, no violations", audit.checked));
        } else {
            for violation in &audit.violations {
                output.error(violation);
            }
        }
    }
}
