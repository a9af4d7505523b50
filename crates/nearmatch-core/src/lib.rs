//! nearmatch core - Domain models, configuration and dataset formats
//!
//! This crate contains the data model shared by the matching engine and the
//! command-line front end: geometries, spatial collections, result tables,
//! the error type, the layered configuration and the format adapters.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{ErrorKind, NearmatchError, Result};
