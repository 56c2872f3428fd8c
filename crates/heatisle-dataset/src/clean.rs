//! Training table cleaning
//!
//! A hexagon feature table is a GeoJSON feature collection whose feature
//! properties hold the aggregated statistics and the observed target. Rows
//! with a missing value in any requested column are dropped. The cross
//! validated model search downstream needs at least [`MIN_ROWS`] rows.

use std::{io, path::Path};

use heatisle_spatial::geojson::{Feature, FeatureCollection};

use crate::DatasetError;

/// Default target column: the observed annual average temperature in °F.
pub const DEFAULT_TARGET: &str = "Ave temp annual_F";

/// Minimum number of rows left after cleaning.
pub const MIN_ROWS: usize = 9;

const EXTENSION: &str = "geojson";

/// Cleaned model input: one feature row and one target per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTable {
    feature_names: Vec<String>,
    target_name: String,
    features: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl TrainingTable {
    /// Builds a table from raw rows, dropping rows with a non-finite value.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Format`] if a row does not have one value per
    /// feature name, and [`DatasetError::InsufficientData`] if fewer than
    /// [`MIN_ROWS`] rows remain.
    pub fn from_rows<I>(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        rows: I,
    ) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (Vec<f64>, f64)>,
    {
        let mut features = vec![];
        let mut targets = vec![];
        let mut dropped = 0;
        for (index, (row, target)) in rows.into_iter().enumerate() {
            if row.len() != feature_names.len() {
                return Err(DatasetError::Format {
                    reason: format!(
                        "row {index} has {} values, expected {}",
                        row.len(),
                        feature_names.len()
                    ),
                });
            }
            if !target.is_finite() || row.iter().any(|v| !v.is_finite()) {
                dropped += 1;
                continue;
            }
            features.push(row);
            targets.push(target);
        }
        if dropped > 0 {
            log::info!("Dropped {dropped} rows with missing values");
        }
        if targets.len() < MIN_ROWS {
            return Err(DatasetError::InsufficientData {
                rows: targets.len(),
                min_rows: MIN_ROWS,
            });
        }
        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            features,
            targets,
        })
    }

    /// Selects `feature_keys` and `target_key` from the feature properties.
    ///
    /// `null`, missing and non-finite values mark a row as incomplete.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::Schema`] if a column is absent from every feature
    /// - [`DatasetError::Format`] if a value is neither a number nor `null`
    /// - [`DatasetError::InsufficientData`] if fewer than [`MIN_ROWS`] rows remain
    pub fn from_collection<S>(
        collection: &FeatureCollection,
        feature_keys: &[S],
        target_key: &str,
    ) -> Result<Self, DatasetError>
    where
        S: AsRef<str>,
    {
        let columns = feature_keys
            .iter()
            .map(|key| key.as_ref())
            .chain([target_key])
            .collect::<Vec<_>>();
        if let Some(column) = columns
            .iter()
            .find(|column| !collection.features.iter().any(|f| f.has_property(column)))
        {
            return Err(DatasetError::Schema {
                column: (*column).to_owned(),
            });
        }

        let rows = collection
            .features
            .iter()
            .map(|feature| {
                let mut row = read_row(feature, &columns)?;
                let target = row.pop().unwrap_or(f64::NAN);
                Ok((row, target))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        let feature_names = feature_keys.iter().map(|k| k.as_ref().to_owned()).collect();
        Self::from_rows(feature_names, target_key, rows)
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn read_row(feature: &Feature, columns: &[&str]) -> Result<Vec<f64>, DatasetError> {
    columns
        .iter()
        .map(|column| {
            feature
                .property_f64(column)
                .map(|value| value.unwrap_or(f64::NAN))
                .map_err(|e| DatasetError::Format {
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Loads a hexagon feature table and cleans it.
///
/// # Errors
///
/// - [`DatasetError::Format`] if `path` is not a `.geojson` file holding a
///   feature collection, or a value is neither a number nor `null`
/// - [`DatasetError::NotFound`] if `path` does not exist
/// - [`DatasetError::Schema`] if a requested column is absent
/// - [`DatasetError::InsufficientData`] if fewer than [`MIN_ROWS`] rows remain
pub fn clean_data<P, S>(
    path: P,
    feature_keys: &[S],
    target_key: &str,
) -> Result<TrainingTable, DatasetError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    let collection = read_geojson(path)?;
    let table = TrainingTable::from_collection(&collection, feature_keys, target_key)?;
    log::debug!(
        "Cleaned {}: {} of {} rows kept",
        path.display(),
        table.len(),
        collection.features.len()
    );
    Ok(table)
}

/// Reads a `.geojson` feature collection.
///
/// # Errors
///
/// Same as [`clean_data`], except for the column checks.
pub fn read_geojson(path: &Path) -> Result<FeatureCollection, DatasetError> {
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION));
    if !has_extension {
        return Err(DatasetError::Format {
            reason: format!("{} is not a .{EXTENSION} file", path.display()),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DatasetError::NotFound {
                path: path.to_owned(),
            }
        } else {
            DatasetError::Io {
                path: path.to_owned(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|e| DatasetError::Format {
        reason: format!("{} is not a feature collection: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;
    use crate::get_keys;

    fn row(i: u32) -> Value {
        let mut properties = get_keys()
            .into_iter()
            .zip(1_u32..)
            .map(|(key, k)| (key, json!(f64::from(i * 100 + k))))
            .collect::<serde_json::Map<_, _>>();
        properties.insert(DEFAULT_TARGET.to_owned(), json!(50.0 + f64::from(i)));
        properties.insert("Station ID".to_owned(), json!(format!("S{i}")));
        json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
            "properties": properties,
        })
    }

    fn write(dir: &TempDir, name: &str, features: Vec<Value>) -> PathBuf {
        let path = dir.path().join(name);
        let collection = json!({"type": "FeatureCollection", "features": features});
        std::fs::write(&path, collection.to_string()).unwrap();
        path
    }

    #[test]
    fn test_eight_rows_are_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "hex.geojson", (0..8).map(row).collect());
        let err = clean_data(&path, &get_keys(), DEFAULT_TARGET).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InsufficientData {
                rows: 8,
                min_rows: 9
            }
        ));
    }

    #[test]
    fn test_nine_rows_are_enough() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "hex.geojson", (0..9).map(row).collect());
        let table = clean_data(&path, &get_keys(), DEFAULT_TARGET).unwrap();
        assert_eq!(table.len(), 9);
        assert_eq!(table.feature_names(), get_keys());
        assert_eq!(table.target_name(), DEFAULT_TARGET);
        assert_eq!(table.features()[3][0], 301.0);
        assert_eq!(table.features()[3][10], 311.0);
        assert_eq!(table.targets()[3], 53.0);
    }

    #[test]
    fn test_rows_with_nulls_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut features = (0..12).map(row).collect::<Vec<_>>();
        features[2]["properties"]["centroid_stat_mean"] = Value::Null;
        features[5]["properties"][DEFAULT_TARGET] = Value::Null;
        features[7]["properties"]
            .as_object_mut()
            .unwrap()
            .remove("Lat");
        // unrelated columns may be null
        features[8]["properties"]["Station ID"] = Value::Null;
        let path = write(&dir, "hex.geojson", features);

        let table = clean_data(&path, &get_keys(), DEFAULT_TARGET).unwrap();
        assert_eq!(table.len(), 9);
        let expected = [0, 1, 3, 4, 6, 8, 9, 10, 11]
            .into_iter()
            .map(|i| 50.0 + f64::from(i))
            .collect::<Vec<_>>();
        assert_eq!(table.targets(), expected);
        // kept rows are unchanged
        assert_eq!(table.features()[2][2], 303.0);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "hex.geojson", (0..9).map(row).collect());
        let err = clean_data(&path, &["terrain_stat_mean"], DEFAULT_TARGET).unwrap_err();
        assert!(matches!(err, DatasetError::Schema { column } if column == "terrain_stat_mean"));

        let err = clean_data(&path, &get_keys(), "Max temp").unwrap_err();
        assert!(matches!(err, DatasetError::Schema { column } if column == "Max temp"));
    }

    #[test]
    fn test_format_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "hex.json", (0..9).map(row).collect());
        let err = clean_data(&path, &get_keys(), DEFAULT_TARGET).unwrap_err();
        assert!(matches!(err, DatasetError::Format { .. }));

        let path = dir.path().join("list.geojson");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = clean_data(&path, &get_keys(), DEFAULT_TARGET).unwrap_err();
        assert!(matches!(err, DatasetError::Format { .. }));

        let mut features = (0..9).map(row).collect::<Vec<_>>();
        features[0]["properties"]["Lat"] = json!("north");
        let path = write(&dir, "text.geojson", features);
        let err = clean_data(&path, &get_keys(), DEFAULT_TARGET).unwrap_err();
        assert!(matches!(err, DatasetError::Format { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = clean_data(dir.path().join("none.geojson"), &get_keys(), DEFAULT_TARGET)
            .unwrap_err();
        assert!(matches!(err, DatasetError::NotFound { .. }));
    }

    #[test]
    fn test_from_rows_checks_width() {
        let rows = (0..9).map(|i| (vec![f64::from(i)], f64::from(i)));
        let err = TrainingTable::from_rows(vec!["a".into(), "b".into()], "t", rows).unwrap_err();
        assert!(matches!(err, DatasetError::Format { .. }));
    }
}
