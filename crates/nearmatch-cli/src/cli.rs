use clap::{Parser, Subcommand, ValueEnum};
use nearmatch_core::config::IndexKind;
use std::path::PathBuf;

/// nearmatch - Nearest-neighbor matching between spatial datasets
#[derive(Parser, Debug)]
#[command(name = "nearmatch")]
#[command(about = "Nearest-neighbor matching between spatial datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./nearmatch.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match every reference point to its nearest comparison entity
    Analyze(AnalyzeArgs),

    /// Describe a dataset: kind, CRS and geometry types
    Inspect(InspectArgs),

    /// Recompute distances for an exported results table
    Distance(DistanceArgs),

    /// Show the resolved configuration and where each value came from
    Config,
}

/// Index implementation selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IndexChoice {
    /// R-tree, logarithmic queries (default)
    Rtree,
    /// Linear scan; exact ties go to the first candidate
    BruteForce,
}

impl From<IndexChoice> for IndexKind {
    fn from(choice: IndexChoice) -> Self {
        match choice {
            IndexChoice::Rtree => IndexKind::RTree,
            IndexChoice::BruteForce => IndexKind::BruteForce,
        }
    }
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Reference dataset of points (GeoJSON, Shapefile or CSV)
    pub reference: PathBuf,

    /// Comparison dataset; non-point geometries are reduced to centroids
    pub comparison: PathBuf,

    /// Skip the distance column
    #[arg(long)]
    pub no_distance: bool,

    /// Index used for the nearest-point search
    #[arg(long, value_enum)]
    pub index: Option<IndexChoice>,

    /// Keep only reference entities where FIELD equals VALUE
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filter: Option<String>,

    /// Drop reference entities outside the IQR band of FIELD
    #[arg(long, value_name = "FIELD")]
    pub trim_outliers: Option<String>,

    /// Run one analysis per value of FIELD
    #[arg(long, value_name = "FIELD")]
    pub group_by: Option<String>,

    /// Restrict --group-by to these values
    #[arg(long, value_delimiter = ',', requires = "group_by")]
    pub groups: Vec<String>,

    /// Write the result table (.csv or .geojson)
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write origin/match/link layers for visual confirmation
    #[arg(long, value_name = "FILE")]
    pub confirm: Option<PathBuf>,

    /// Double-check every match by brute force and fail on violations
    #[arg(long)]
    pub audit: bool,

    /// CRS of CSV inputs (e.g. EPSG:4326)
    #[arg(long, value_name = "CRS")]
    pub csv_crs: Option<String>,

    /// Rows shown in the preview table
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Dataset to describe
    pub path: PathBuf,

    /// CRS of CSV inputs (e.g. EPSG:4326)
    #[arg(long, value_name = "CRS")]
    pub csv_crs: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DistanceArgs {
    /// Results CSV written by `nearmatch analyze --output`
    pub results: PathBuf,

    /// CRS of the point columns (EPSG:4326 when omitted)
    #[arg(long, value_name = "CRS")]
    pub crs: Option<String>,

    /// Write the table with distances to FILE (.csv)
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}
