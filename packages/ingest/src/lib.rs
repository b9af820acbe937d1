#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input side of the deprivation overlay.
//!
//! Turns `GeoJSON` boundary files and a CSV attribute table into the
//! locality, subdivision and attribute types the overlay consumes. Field
//! and column names come from a TOML [`config::DatasetConfig`], so the same
//! code handles any boundary vintage.

pub mod attributes;
pub mod boundaries;
pub mod config;

use thiserror::Error;

pub use attributes::read_attributes;
pub use boundaries::{LoadedCollection, SkippedFeature, read_localities, read_subdivisions};
pub use config::{DatasetConfig, load_config};

/// Errors that can occur while reading overlay inputs.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A key occurs more than once in a keyed input.
    #[error("Duplicate key {key:?} in {collection}")]
    DuplicateKey {
        /// Which input contained the duplicate.
        collection: String,
        /// The repeated key.
        key: String,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
