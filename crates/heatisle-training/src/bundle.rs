//! Model bundle persistence
//!
//! A bundle is a `.bin` file holding a JSON document with exactly two
//! members:
//!
//! ```text
//! {
//!   "model": {
//!     "format_version": 1,
//!     "trained_at": "...",
//!     "feature_names": [...],
//!     "test_rmse": ...,
//!     "regressor": {
//!       "family": "...", <hyperparameters>,
//!       "seed": ..., "train_x": [[...]], "train_y": [...]
//!     }
//!   },
//!   "scaler": { "mean": [...], "scale": [...] }
//! }
//! ```
//!
//! The regressor is refitted from its stored training rows on load, so a
//! corrupted bundle is rejected by the same checks as bad training data.
//! Files are never overwritten and a failed write never leaves a partial
//! file behind.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    TrainingError,
    regressor::{FittedModel, ModelFamily},
    scaler::StandardScaler,
};

/// Current bundle schema version.
pub const FORMAT_VERSION: u32 = 1;

/// Required bundle file extension.
pub const EXTENSION: &str = "bin";

const MODEL_MEMBER: &str = "model";
const SCALER_MEMBER: &str = "scaler";

/// A fitted regressor with the metadata needed to apply it.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    /// Model input columns, in order.
    pub feature_names: Vec<String>,
    pub test_rmse: f64,
    pub regressor: FittedModel,
}

impl TrainedModel {
    #[must_use]
    pub fn new(feature_names: Vec<String>, test_rmse: f64, regressor: FittedModel) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            feature_names,
            test_rmse,
            regressor,
        }
    }

    #[must_use]
    pub fn family(&self) -> ModelFamily {
        self.regressor.family()
    }
}

#[derive(Serialize)]
struct BundleRef<'a> {
    model: &'a TrainedModel,
    scaler: &'a StandardScaler,
}

/// Checks that `file_name` names a `.bin` file.
///
/// # Errors
///
/// Returns [`TrainingError::Format`] otherwise.
pub fn check_file_name(file_name: &str) -> Result<(), TrainingError> {
    let path = Path::new(file_name);
    let is_bin = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION));
    if !is_bin || path.file_stem().is_none() {
        return Err(TrainingError::Format {
            reason: format!("model file name must end with .{EXTENSION}, got '{file_name}'"),
        });
    }
    Ok(())
}

/// Saves `model` and `scaler` as `dir/file_name`.
///
/// An empty `dir` means the current directory. Returns the written path.
///
/// # Errors
///
/// - [`TrainingError::Format`] if `file_name` is not a `.bin` name
/// - [`TrainingError::OutputDirMissing`] if `dir` does not exist
/// - [`TrainingError::OutputExists`] if the file already exists; it is left untouched
/// - [`TrainingError::Io`] if writing fails; the partial file is removed
pub fn save_model(
    model: &TrainedModel,
    scaler: &StandardScaler,
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, TrainingError> {
    check_file_name(file_name)?;
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    if !dir.is_dir() {
        return Err(TrainingError::OutputDirMissing {
            path: dir.to_owned(),
        });
    }
    let path = dir.join(file_name);

    let bytes = serde_json::to_vec(&BundleRef { model, scaler }).map_err(|e| {
        TrainingError::Format {
            reason: format!("failed to serialize model: {e}"),
        }
    })?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(TrainingError::OutputExists { path });
        }
        Err(source) => return Err(TrainingError::Io { path, source }),
    };
    if let Err(source) = file.write_all(&bytes).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(e) = fs::remove_file(&path) {
            log::warn!("Failed to remove partial file {}: {e}", path.display());
        }
        return Err(TrainingError::Io { path, source });
    }
    log::debug!("Saved {} model to {}", model.family(), path.display());
    Ok(path)
}

fn schema_error(reason: impl Into<String>) -> TrainingError {
    TrainingError::Schema {
        reason: reason.into(),
    }
}

/// Loads a bundle written by [`save_model`].
///
/// # Errors
///
/// - [`TrainingError::NotFound`] if `path` does not exist
/// - [`TrainingError::Format`] if `path` is not a `.bin` file or not a JSON document
/// - [`TrainingError::Schema`] if the document does not hold exactly the
///   `model` and `scaler` members, or either member is malformed or of an
///   unknown version
pub fn load_model(path: &Path) -> Result<(TrainedModel, StandardScaler), TrainingError> {
    if !path.exists() {
        return Err(TrainingError::NotFound {
            path: path.to_owned(),
        });
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    check_file_name(&file_name)?;

    let bytes = fs::read(path).map_err(|source| TrainingError::Io {
        path: path.to_owned(),
        source,
    })?;
    let document: Value = serde_json::from_slice(&bytes).map_err(|e| TrainingError::Format {
        reason: format!("{} is not a model bundle: {e}", path.display()),
    })?;
    let Value::Object(mut members) = document else {
        return Err(schema_error("bundle must be an object"));
    };
    let model = members
        .remove(MODEL_MEMBER)
        .ok_or_else(|| schema_error(format!("missing '{MODEL_MEMBER}' member")))?;
    let scaler = members
        .remove(SCALER_MEMBER)
        .ok_or_else(|| schema_error(format!("missing '{SCALER_MEMBER}' member")))?;
    if let Some(extra) = members.keys().next() {
        return Err(schema_error(format!("unexpected member '{extra}'")));
    }

    let version = model.get("format_version").and_then(Value::as_u64);
    if version != Some(u64::from(FORMAT_VERSION)) {
        return Err(schema_error(format!(
            "unsupported format version {version:?}, expected {FORMAT_VERSION}"
        )));
    }
    let model: TrainedModel =
        serde_json::from_value(model).map_err(|e| schema_error(format!("invalid model: {e}")))?;
    let scaler: StandardScaler = serde_json::from_value(scaler)
        .map_err(|e| schema_error(format!("invalid scaler: {e}")))?;

    let widths = [
        model.feature_names.len(),
        model.regressor.n_features(),
        scaler.n_features(),
    ];
    if widths.iter().any(|w| *w != widths[0]) {
        return Err(schema_error(format!(
            "feature counts disagree: {} names, {} model inputs, {} scaler inputs",
            widths[0], widths[1], widths[2]
        )));
    }
    Ok((model, scaler))
}

/// Predicts the target of raw (unscaled) feature rows.
///
/// # Errors
///
/// Returns [`TrainingError::FeatureCountMismatch`] if a row does not have one
/// value per model feature.
pub fn predict(
    model: &TrainedModel,
    scaler: &StandardScaler,
    rows: &[Vec<f64>],
) -> Result<Vec<f64>, TrainingError> {
    let scaled = scaler.transform(rows)?;
    model.regressor.predict(&scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::{Hyperparams, Weighting};

    fn fitted(params: Hyperparams) -> (TrainedModel, StandardScaler) {
        let x = (0..12_u32)
            .map(|i| vec![f64::from(i), f64::from(i * i % 7), 0.5 * f64::from(i)])
            .collect::<Vec<_>>();
        let y = x
            .iter()
            .map(|r| r[0] * 1.5 - r[1] + 0.1)
            .collect::<Vec<_>>();
        let scaler = StandardScaler::fit(&x).unwrap();
        let scaled = scaler.transform(&x).unwrap();
        let regressor = params.fit(&scaled, &y, 3).unwrap();
        let names = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        (TrainedModel::new(names, 0.25, regressor), scaler)
    }

    fn queries() -> Vec<Vec<f64>> {
        vec![
            vec![0.3, 2.0, 0.15],
            vec![11.7, 6.0, 5.85],
            vec![-4.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn test_round_trip_reproduces_predictions() {
        let dir = tempfile::tempdir().unwrap();
        for (i, params) in [
            Hyperparams::Linear,
            Hyperparams::NearestNeighbor {
                k: 3,
                weighting: Weighting::Distance,
            },
            Hyperparams::RandomForest {
                n_estimators: 5,
                max_depth: 3,
            },
        ]
        .into_iter()
        .enumerate()
        {
            let (model, scaler) = fitted(params);
            let file_name = format!("m{i}.bin");
            let path = save_model(&model, &scaler, dir.path(), &file_name).unwrap();
            assert_eq!(path, dir.path().join(&file_name));

            let (loaded_model, loaded_scaler) = load_model(&path).unwrap();
            assert_eq!(loaded_model, model);
            assert_eq!(loaded_scaler, scaler);
            assert_eq!(
                predict(&loaded_model, &loaded_scaler, &queries()).unwrap(),
                predict(&model, &scaler, &queries()).unwrap()
            );
        }
    }

    #[test]
    fn test_existing_file_is_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        fs::write(&path, b"precious").unwrap();

        let (model, scaler) = fitted(Hyperparams::Linear);
        let err = save_model(&model, &scaler, dir.path(), "m.bin").unwrap_err();
        assert!(matches!(err, TrainingError::OutputExists { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"precious");
    }

    #[test]
    fn test_save_preconditions() {
        let dir = tempfile::tempdir().unwrap();
        let (model, scaler) = fitted(Hyperparams::Linear);

        let err = save_model(&model, &scaler, dir.path(), "m.pkl").unwrap_err();
        assert!(matches!(err, TrainingError::Format { .. }));

        let missing = dir.path().join("nested");
        let err = save_model(&model, &scaler, &missing, "m.bin").unwrap_err();
        assert!(matches!(err, TrainingError::OutputDirMissing { .. }));
        assert!(!missing.exists());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_model(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, TrainingError::NotFound { .. }));

        let path = dir.path().join("model.json");
        fs::write(&path, "{}").unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, TrainingError::Format { .. }));

        let path = dir.path().join("garbage.bin");
        fs::write(&path, [0xde, 0xad, 0xbe, 0xef]).unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, TrainingError::Format { .. }));

        let (model, scaler) = fitted(Hyperparams::Linear);
        let model_value = serde_json::to_value(&model).unwrap();
        let scaler_value = serde_json::to_value(&scaler).unwrap();
        let cases = [
            serde_json::json!({"model": model_value}),
            serde_json::json!({"scaler": scaler_value}),
            serde_json::json!({"model": model_value, "scaler": scaler_value, "extra": 1}),
            serde_json::json!([1, 2]),
        ];
        for (i, document) in cases.iter().enumerate() {
            let path = dir.path().join(format!("schema{i}.bin"));
            fs::write(&path, document.to_string()).unwrap();
            let err = load_model(&path).unwrap_err();
            assert!(matches!(err, TrainingError::Schema { .. }), "{i}: {err}");
        }

        let mut future = model_value.clone();
        future["format_version"] = 2.into();
        let path = dir.path().join("future.bin");
        let document = serde_json::json!({"model": future, "scaler": scaler_value});
        fs::write(&path, document.to_string()).unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, TrainingError::Schema { .. }));
    }

    fn write_bundle(dir: &Path, name: &str, model: &Value, scaler: &Value) -> PathBuf {
        let path = dir.join(name);
        let document = serde_json::json!({"model": model, "scaler": scaler});
        fs::write(&path, document.to_string()).unwrap();
        path
    }

    #[test]
    fn test_corrupted_regressor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (knn, scaler) = fitted(Hyperparams::NearestNeighbor {
            k: 3,
            weighting: Weighting::Uniform,
        });
        let (forest, _) = fitted(Hyperparams::RandomForest {
            n_estimators: 3,
            max_depth: 2,
        });
        let knn = serde_json::to_value(&knn).unwrap();
        let forest = serde_json::to_value(&forest).unwrap();
        let scaler = serde_json::to_value(&scaler).unwrap();

        let mut cases = vec![];
        let mut empty = knn.clone();
        empty["regressor"]["train_x"] = serde_json::json!([]);
        empty["regressor"]["train_y"] = serde_json::json!([]);
        cases.push(("empty training set", empty));
        let mut large_k = knn.clone();
        large_k["regressor"]["k"] = 100.into();
        cases.push(("k above row count", large_k));
        let mut zero_k = knn.clone();
        zero_k["regressor"]["k"] = 0.into();
        cases.push(("zero k", zero_k));
        let mut ragged = knn.clone();
        ragged["regressor"]["train_x"][4] = serde_json::json!([1.0]);
        cases.push(("ragged rows", ragged));
        let mut short_y = knn.clone();
        short_y["regressor"]["train_y"]
            .as_array_mut()
            .unwrap()
            .pop();
        cases.push(("missing target", short_y));
        let mut non_numeric = knn.clone();
        non_numeric["regressor"]["train_x"][0][0] = Value::Null;
        cases.push(("non-numeric feature", non_numeric));
        let mut no_trees = forest.clone();
        no_trees["regressor"]["n_estimators"] = 0.into();
        cases.push(("empty forest", no_trees));
        let mut no_depth = forest.clone();
        no_depth["regressor"]["max_depth"] = 0.into();
        cases.push(("zero depth", no_depth));
        let mut unknown = forest.clone();
        unknown["regressor"]["family"] = "gradient_boosting".into();
        cases.push(("unknown family", unknown));
        let mut narrow = knn.clone();
        narrow["regressor"]["train_x"] = serde_json::json!(vec![vec![0.5, 1.0]; 12]);
        cases.push(("model narrower than scaler", narrow));

        for (name, model) in cases {
            let path = write_bundle(dir.path(), "corrupt.bin", &model, &scaler);
            let err = load_model(&path).unwrap_err();
            assert!(matches!(err, TrainingError::Schema { .. }), "{name}: {err}");
            fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn test_corrupted_scaler_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (model, scaler) = fitted(Hyperparams::Linear);
        let model = serde_json::to_value(&model).unwrap();
        let scaler = serde_json::to_value(&scaler).unwrap();

        let mut cases = vec![];
        for bad in [Value::from(0.0), Value::from(-1.5), Value::Null] {
            let mut value = scaler.clone();
            value["scale"][1] = bad;
            cases.push(value);
        }
        let mut short = scaler.clone();
        short["mean"].as_array_mut().unwrap().pop();
        cases.push(short);
        let mut narrow = scaler.clone();
        narrow["mean"] = serde_json::json!([0.0]);
        narrow["scale"] = serde_json::json!([1.0]);
        cases.push(narrow);

        for (i, scaler) in cases.iter().enumerate() {
            let path = write_bundle(dir.path(), &format!("scaler{i}.bin"), &model, scaler);
            let err = load_model(&path).unwrap_err();
            assert!(matches!(err, TrainingError::Schema { .. }), "{i}: {err}");
        }
    }

    #[test]
    fn test_predict_checks_width() {
        let (model, scaler) = fitted(Hyperparams::Linear);
        let err = predict(&model, &scaler, &[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::FeatureCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
