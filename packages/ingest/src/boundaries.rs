//! Reads locality and subdivision boundaries from `GeoJSON`.
//!
//! Features without a usable key or polygonal geometry are skipped and
//! listed in [`LoadedCollection::skipped`] so callers can audit coverage.
//! Geometry validity itself is checked later by the geometry store.

use deprivation_overlay_models::{Locality, Subdivision};
use geo::MultiPolygon;
use geojson::{Feature, GeoJson, JsonObject, feature::Id};
use serde::{Deserialize, Serialize};

use crate::IngestError;
use crate::config::{LocalityFields, SubdivisionFields};

/// A feature that was not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFeature {
    /// Position of the feature in the source collection.
    pub position: usize,
    /// The feature's key, when one could be read.
    pub key: Option<String>,
    pub reason: String,
}

/// Records read from a source plus the features that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCollection<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedFeature>,
}

impl<T> Default for LoadedCollection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> LoadedCollection<T> {
    fn skip(&mut self, position: usize, key: Option<String>, reason: &str) {
        log::warn!(
            "Skipping feature {position} ({}): {reason}",
            key.as_deref().unwrap_or("no key")
        );
        self.skipped.push(SkippedFeature {
            position,
            key,
            reason: reason.to_string(),
        });
    }
}

/// Reads localities from `GeoJSON` text.
///
/// All feature properties are kept as the locality's attribute set.
///
/// # Errors
///
/// Returns [`IngestError`] if the text is not `GeoJSON` or holds a bare
/// geometry instead of features.
pub fn read_localities(
    geojson: &str,
    fields: &LocalityFields,
) -> Result<LoadedCollection<Locality>, IngestError> {
    let mut loaded = LoadedCollection::default();
    let mut unnamed = 0usize;

    for (position, feature) in parse_features(geojson)?.into_iter().enumerate() {
        let properties = feature.properties.clone().unwrap_or_default();

        let Some(id) = property_string(&properties, &fields.id_field)
            .or_else(|| feature.id.as_ref().map(id_string))
        else {
            loaded.skip(position, None, "missing locality id");
            continue;
        };

        let name = property_string(&properties, &fields.name_field);
        if name.is_none() && fields.drop_unnamed {
            log::debug!("Dropping unnamed locality {id}");
            unnamed += 1;
            continue;
        }

        let Some(geometry) = feature_multipolygon(feature) else {
            loaded.skip(position, Some(id), "missing or non-polygonal geometry");
            continue;
        };

        loaded.records.push(Locality {
            id,
            name,
            geometry,
            attributes: properties,
        });
    }

    log::info!(
        "Read {} localities ({} unnamed dropped, {} skipped)",
        loaded.records.len(),
        unnamed,
        loaded.skipped.len()
    );

    Ok(loaded)
}

/// Reads subdivisions from `GeoJSON` text.
///
/// A missing or non-numeric area property leaves the nominal area unset,
/// which makes the subdivision's overlap weights undefined.
///
/// # Errors
///
/// Returns [`IngestError`] if the text is not `GeoJSON` or holds a bare
/// geometry instead of features.
pub fn read_subdivisions(
    geojson: &str,
    fields: &SubdivisionFields,
) -> Result<LoadedCollection<Subdivision>, IngestError> {
    let mut loaded = LoadedCollection::default();

    for (position, feature) in parse_features(geojson)?.into_iter().enumerate() {
        let properties = feature.properties.clone().unwrap_or_default();

        let Some(key) = property_string(&properties, &fields.key_field)
            .or_else(|| feature.id.as_ref().map(id_string))
        else {
            loaded.skip(position, None, "missing subdivision key");
            continue;
        };

        let area = property_number(&properties, &fields.area_field);
        if area.is_none() {
            log::debug!("Subdivision {key} has no usable {}", fields.area_field);
        }

        let Some(geometry) = feature_multipolygon(feature) else {
            loaded.skip(position, Some(key), "missing or non-polygonal geometry");
            continue;
        };

        loaded.records.push(Subdivision {
            key,
            geometry,
            area,
        });
    }

    log::info!(
        "Read {} subdivisions ({} skipped)",
        loaded.records.len(),
        loaded.skipped.len()
    );

    Ok(loaded)
}

/// Parses `GeoJSON` text into its features.
fn parse_features(text: &str) -> Result<Vec<Feature>, IngestError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(IngestError::Conversion {
            message: "expected a FeatureCollection, found a bare geometry".to_string(),
        }),
    }
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_multipolygon(feature: Feature) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = feature.geometry?.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn id_string(id: &Id) -> String {
    match id {
        Id::String(s) => s.trim().to_string(),
        Id::Number(n) => number_key(n),
    }
}

/// Renders a numeric key the way attribute tables spell it: integral
/// floats such as `20601.0` lose their fraction.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_key(n: &serde_json::Number) -> String {
    if n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract() == 0.0
        && f.abs() < i64::MAX as f64
    {
        return (f as i64).to_string();
    }
    n.to_string()
}

/// Reads a property as a non-blank string. Numbers are stringified.
fn property_string(properties: &JsonObject, field: &str) -> Option<String> {
    match properties.get(field)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(number_key(n)),
        _ => None,
    }
}

/// Reads a property as a finite number. Numeric strings are accepted.
fn property_number(properties: &JsonObject, field: &str) -> Option<f64> {
    let value = match properties.get(field)? {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCALITIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "id": "L1", "name": "Northside", "state": "VIC" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]] }
            },
            {
                "type": "Feature",
                "id": 42,
                "properties": { "name": "Numbered" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[5,5],[6,5],[6,6],[5,6],[5,5]]], [[[7,7],[8,7],[8,8],[7,8],[7,7]]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "id": "L3", "name": "  " },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "id": "L4", "name": "Pointy" },
                "geometry": { "type": "Point", "coordinates": [1, 1] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Anonymous" },
                "geometry": null
            }
        ]
    }"#;

    const SUBDIVISIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "SA1": 20601, "AREA_SQ_KM": 4.0 },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "SA1": "20602", "AREA_SQ_KM": "1.5" },
                "geometry": { "type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1.5],[2,1.5],[2,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "SA1": "20603", "AREA_SQ_KM": null },
                "geometry": { "type": "Polygon", "coordinates": [[[3,0],[4,0],[4,1],[3,1],[3,0]]] }
            }
        ]
    }"#;

    #[test]
    fn reads_localities_and_skips_unusable_features() {
        let loaded = read_localities(LOCALITIES, &LocalityFields::default()).unwrap();

        let ids: Vec<&str> = loaded.records.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L1", "42"]);
        assert_eq!(loaded.records[0].name.as_deref(), Some("Northside"));
        assert_eq!(loaded.records[0].attributes["state"], "VIC");
        assert_eq!(loaded.records[1].geometry.0.len(), 2);

        let reasons: Vec<(Option<&str>, &str)> = loaded
            .skipped
            .iter()
            .map(|s| (s.key.as_deref(), s.reason.as_str()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (Some("L4"), "missing or non-polygonal geometry"),
                (None, "missing locality id"),
            ]
        );
    }

    #[test]
    fn keeps_unnamed_localities_when_configured() {
        let fields = LocalityFields {
            drop_unnamed: false,
            ..LocalityFields::default()
        };
        let loaded = read_localities(LOCALITIES, &fields).unwrap();
        assert!(loaded.records.iter().any(|l| l.id == "L3" && l.name.is_none()));
    }

    #[test]
    fn reads_subdivision_keys_and_areas() {
        let fields = SubdivisionFields {
            key_field: "SA1".to_string(),
            area_field: "AREA_SQ_KM".to_string(),
        };
        let loaded = read_subdivisions(SUBDIVISIONS, &fields).unwrap();

        let rows: Vec<(&str, Option<f64>)> = loaded
            .records
            .iter()
            .map(|s| (s.key.as_str(), s.area))
            .collect();
        assert_eq!(
            rows,
            vec![("20601", Some(4.0)), ("20602", Some(1.5)), ("20603", None)]
        );
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn integral_float_keys_match_attribute_keys() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "key": 20601.0, "area": 1 },
                    "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]] }
                },
                {
                    "type": "Feature",
                    "id": 7.0,
                    "properties": { "area": 1 },
                    "geometry": { "type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,1],[1,0]]] }
                },
                {
                    "type": "Feature",
                    "properties": { "key": 2.5, "area": 1 },
                    "geometry": { "type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,1],[2,0]]] }
                }
            ]
        }"#;
        let loaded = read_subdivisions(geojson, &SubdivisionFields::default()).unwrap();
        let keys: Vec<&str> = loaded.records.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["20601", "7", "2.5"]);
    }

    #[test]
    fn rejects_bare_geometry() {
        let result = read_subdivisions(
            r#"{ "type": "Point", "coordinates": [0, 0] }"#,
            &SubdivisionFields::default(),
        );
        assert!(matches!(result, Err(IngestError::Conversion { .. })));
    }

    #[test]
    fn rejects_malformed_json() {
        let result = read_localities("{ not geojson", &LocalityFields::default());
        assert!(matches!(result, Err(IngestError::GeoJson(_))));
    }
}
