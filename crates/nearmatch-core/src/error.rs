//! Error types for nearmatch

use crate::models::GeometryType;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of [`NearmatchError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong kind of dataset or missing geometry.
    Type,
    /// Input-contract violation: CRS, geometry kind, coordinate range.
    Precondition,
    /// A result table is missing expected columns.
    Schema,
    /// A file could not be interpreted.
    Input,
    Config,
    Io,
}

#[derive(Debug, Error)]
pub enum NearmatchError {
    // Type/shape errors
    #[error("Argument {argument} should be a spatial collection. Got a {actual}")]
    NotSpatial { argument: String, actual: String },

    #[error("Argument {argument} does not have geometry information (entity {entity} has none)")]
    MissingGeometry { argument: String, entity: usize },

    // Precondition errors
    #[error("Argument {argument} is missing CRS information")]
    MissingCrs { argument: String },

    #[error("The arguments provided do not share the same CRS. Got {reference} and {comparison}")]
    CrsMismatch { reference: String, comparison: String },

    #[error("Geometry of {argument} should be composed of {expected}s. Most common type is {found}")]
    DominantGeometry {
        argument: String,
        expected: GeometryType,
        found: GeometryType,
    },

    #[error("Reference entity {entity} is a {found}, only points can originate a query")]
    NonPointReference { entity: usize, found: GeometryType },

    #[error("Entity {entity} ({geometry_type}) cannot be reduced to a representative point")]
    NotPointReducible {
        entity: usize,
        geometry_type: GeometryType,
    },

    #[error("Comparison collection has no entities to match against")]
    EmptyCandidates,

    #[error("Invalid coordinate in row {row}: {reason}")]
    InvalidCoordinate { row: usize, reason: String },

    #[error("Cannot project {crs} to EPSG:4326: {reason}")]
    Projection { crs: String, reason: String },

    #[error("Invalid attribute {field}: {reason}")]
    InvalidAttribute { field: String, reason: String },

    // Schema errors
    #[error("Result table does not contain the columns {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    // Input errors
    #[error("Unsupported geometry {geometry_type} at feature {feature}")]
    UnsupportedGeometry {
        feature: String,
        geometry_type: String,
    },

    #[error("Unsupported format: .{extension}. Supported formats: {}", supported.join(", "))]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl NearmatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NearmatchError::NotSpatial { .. } | NearmatchError::MissingGeometry { .. } => {
                ErrorKind::Type
            }
            NearmatchError::MissingCrs { .. }
            | NearmatchError::CrsMismatch { .. }
            | NearmatchError::DominantGeometry { .. }
            | NearmatchError::NonPointReference { .. }
            | NearmatchError::NotPointReducible { .. }
            | NearmatchError::EmptyCandidates
            | NearmatchError::InvalidCoordinate { .. }
            | NearmatchError::Projection { .. }
            | NearmatchError::InvalidAttribute { .. } => ErrorKind::Precondition,
            NearmatchError::Schema { .. } => ErrorKind::Schema,
            NearmatchError::UnsupportedGeometry { .. }
            | NearmatchError::UnsupportedFormat { .. }
            | NearmatchError::FormatError { .. }
            | NearmatchError::InvalidPath { .. } => ErrorKind::Input,
            NearmatchError::ConfigInvalid { .. } => ErrorKind::Config,
            NearmatchError::Io(_) | NearmatchError::Serialization(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, NearmatchError>;
