//! TOML dataset configuration.
//!
//! Maps source field and column names onto the overlay data model and
//! carries the [`OverlayOptions`] for the run. A default configuration is
//! embedded at compile time; any table missing from a user file falls back
//! to it.

use std::path::Path;

use deprivation_overlay_models::OverlayOptions;
use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Everything needed to read one dataset and run the overlay on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub localities: LocalityFields,
    pub subdivisions: SubdivisionFields,
    pub attributes: AttributeColumns,
    pub overlay: OverlayOptions,
}

impl DatasetConfig {
    /// Returns the configuration embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse. It is a compile-time
    /// constant, so a failure is a development error caught by tests.
    #[must_use]
    pub fn embedded_default() -> Self {
        toml::from_str(DEFAULT_CONFIG)
            .unwrap_or_else(|e| panic!("Failed to parse embedded dataset config: {e}"))
    }
}

/// `GeoJSON` property names for the locality collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalityFields {
    /// Property holding the unique locality id. Falls back to the feature
    /// `id` member when the property is absent.
    pub id_field: String,
    /// Property holding the locality name.
    pub name_field: String,
    /// Drop localities whose name is missing or blank.
    pub drop_unnamed: bool,
}

impl Default for LocalityFields {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            name_field: "name".to_string(),
            drop_unnamed: true,
        }
    }
}

/// `GeoJSON` property names for the subdivision collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubdivisionFields {
    /// Property holding the unique subdivision key.
    pub key_field: String,
    /// Property holding the declared nominal area.
    pub area_field: String,
}

impl Default for SubdivisionFields {
    fn default() -> Self {
        Self {
            key_field: "key".to_string(),
            area_field: "area".to_string(),
        }
    }
}

/// CSV column names for the subdivision attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeColumns {
    pub key_column: String,
    pub score_column: String,
    pub decile_column: String,
    pub population_column: String,
    /// Single-byte field delimiter.
    pub delimiter: char,
}

impl Default for AttributeColumns {
    fn default() -> Self {
        Self {
            key_column: "key".to_string(),
            score_column: "deprivation_score".to_string(),
            decile_column: "deprivation_decile".to_string(),
            population_column: "urban_rural_population".to_string(),
            delimiter: ',',
        }
    }
}

/// Parses a dataset configuration from TOML text.
///
/// # Errors
///
/// Returns [`IngestError::Toml`] if the text is not a valid configuration.
pub fn parse_config(text: &str) -> Result<DatasetConfig, IngestError> {
    Ok(toml::from_str(text)?)
}

/// Reads a dataset configuration file.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<DatasetConfig, IngestError> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    log::info!("Loaded dataset config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_matches_code_defaults() {
        assert_eq!(DatasetConfig::embedded_default(), DatasetConfig::default());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config = parse_config(
            r#"
            [subdivisions]
            key_field = "SA1_CODE21"
            area_field = "AREA_SQ_KM"

            [overlay]
            area_unit_scale = 1000000.0
            "#,
        )
        .unwrap();

        assert_eq!(config.subdivisions.key_field, "SA1_CODE21");
        assert_eq!(config.subdivisions.area_field, "AREA_SQ_KM");
        assert_eq!(config.localities, LocalityFields::default());
        assert_eq!(config.attributes, AttributeColumns::default());
        assert!((config.overlay.area_unit_scale - 1_000_000.0).abs() < f64::EPSILON);
        assert!(config.overlay.is_high_deprivation(10));
    }

    #[test]
    fn rejects_unparseable_config() {
        assert!(matches!(
            parse_config("[overlay]\narea_unit_scale = \"lots\""),
            Err(IngestError::Toml(_))
        ));
    }
}
