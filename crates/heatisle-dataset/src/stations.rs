//! Weather station preprocessing
//!
//! Station observations arrive as point features with the station id, the
//! observed temperatures and a free-text note. Before aggregation, stations
//! without a target observation are dropped, repeated stations are reduced
//! to their first occurrence and the note is removed.

use std::collections::HashSet;

use heatisle_spatial::geojson::FeatureCollection;

use crate::DatasetError;

/// Default station id property.
pub const DEFAULT_ID_KEY: &str = "Station ID";

/// Free-text property removed from every station.
pub const NOTE_KEY: &str = "Note";

/// Cleans a station collection.
///
/// Stations whose id is missing are kept and never treated as duplicates.
///
/// # Errors
///
/// Returns [`DatasetError::Format`] if a target value is neither a number nor `null`.
///
/// # Examples
///
/// ```
/// use heatisle_dataset::stations::prepare_stations;
/// use heatisle_spatial::geojson::FeatureCollection;
///
/// let collection: FeatureCollection = serde_json::from_str(r#"{
///     "type": "FeatureCollection",
///     "features": [
///         {"type": "Feature", "geometry": null, "properties": {"Station ID": "A", "t": 51.0, "Note": "x"}},
///         {"type": "Feature", "geometry": null, "properties": {"Station ID": "A", "t": 52.0}},
///         {"type": "Feature", "geometry": null, "properties": {"Station ID": "B", "t": null}}
///     ]
/// }"#).unwrap();
/// let stations = prepare_stations(collection, "t", "Station ID").unwrap();
/// assert_eq!(stations.features.len(), 1);
/// assert_eq!(stations.features[0].property_f64("t").unwrap(), Some(51.0));
/// assert!(!stations.features[0].has_property("Note"));
/// ```
pub fn prepare_stations(
    collection: FeatureCollection,
    target_key: &str,
    id_key: &str,
) -> Result<FeatureCollection, DatasetError> {
    let total = collection.features.len();
    let mut seen = HashSet::new();
    let mut features = vec![];
    let (mut missing, mut duplicated) = (0, 0);

    for mut feature in collection.features {
        let target = feature
            .property_f64(target_key)
            .map_err(|e| DatasetError::Format {
                reason: e.to_string(),
            })?;
        if !target.is_some_and(f64::is_finite) {
            missing += 1;
            continue;
        }
        if let Some(id) = feature.property(id_key).filter(|id| !id.is_null())
            && !seen.insert(id.to_string())
        {
            duplicated += 1;
            continue;
        }
        if let Some(properties) = &mut feature.properties {
            properties.remove(NOTE_KEY);
        }
        features.push(feature);
    }

    if missing > 0 {
        log::warn!("Dropped {missing} stations without '{target_key}'");
    }
    if duplicated > 0 {
        log::warn!("Dropped {duplicated} duplicated stations");
    }
    log::debug!("Kept {} of {total} stations", features.len());
    Ok(FeatureCollection::new(features))
}
