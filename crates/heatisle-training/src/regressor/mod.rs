//! Regression model families
//!
//! The families are smartcore estimators behind the [`Regressor`] trait.
//! [`Hyperparams`] describes one configuration of a family and is what the
//! grid search enumerates; [`FittedModel`] is a fitted configuration and is
//! what gets persisted.
//!
//! A fitted model is persisted as its configuration, seed and training rows.
//! Deserializing refits it, so a stored model passes the same checks as a
//! freshly trained one and reproduces its predictions exactly.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use smartcore::{
    error::Failed,
    linalg::basic::{
        arrays::{Array2 as _, MutArray as _},
        matrix::DenseMatrix,
    },
};

pub use self::knn::Weighting;
use crate::TrainingError;

pub mod forest;
pub mod knn;
pub mod linear;

type Matrix = DenseMatrix<f64>;

/// Inference over standardized feature rows.
pub trait Regressor {
    fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<f64>, Failed>;
}

/// Candidate regressor families.
///
/// The declaration order ranks the families from simplest to most complex.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Linear,
    NearestNeighbor,
    RandomForest,
}

impl ModelFamily {
    pub const ALL: [Self; 3] = [Self::Linear, Self::NearestNeighbor, Self::RandomForest];

    /// Returns the fixed hyperparameter grid of the family, in search order.
    ///
    /// # Examples
    ///
    /// ```
    /// use heatisle_training::regressor::ModelFamily;
    ///
    /// assert_eq!(ModelFamily::Linear.grid().len(), 1);
    /// assert_eq!(ModelFamily::NearestNeighbor.grid().len(), 8);
    /// assert_eq!(ModelFamily::RandomForest.grid().len(), 12);
    /// ```
    #[must_use]
    pub fn grid(self) -> Vec<Hyperparams> {
        match self {
            Self::Linear => vec![Hyperparams::Linear],
            Self::NearestNeighbor => [3, 5, 7, 9]
                .into_iter()
                .flat_map(|k| {
                    [Weighting::Uniform, Weighting::Distance]
                        .map(|weighting| Hyperparams::NearestNeighbor { k, weighting })
                })
                .collect(),
            Self::RandomForest => [100, 150, 200]
                .into_iter()
                .flat_map(|n_estimators| {
                    [2, 5, 10, 20].map(|max_depth| Hyperparams::RandomForest {
                        n_estimators,
                        max_depth,
                    })
                })
                .collect(),
        }
    }
}

/// One configuration of a regressor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Hyperparams {
    NearestNeighbor { k: usize, weighting: Weighting },
    Linear,
    RandomForest { n_estimators: usize, max_depth: usize },
}

impl fmt::Display for Hyperparams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NearestNeighbor { k, weighting } => {
                write!(f, "NearestNeighbor(k={k}, weighting={weighting})")
            }
            Self::Linear => write!(f, "Linear"),
            Self::RandomForest {
                n_estimators,
                max_depth,
            } => write!(
                f,
                "RandomForest(n_estimators={n_estimators}, max_depth={max_depth})"
            ),
        }
    }
}

impl Hyperparams {
    #[must_use]
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::NearestNeighbor { .. } => ModelFamily::NearestNeighbor,
            Self::Linear => ModelFamily::Linear,
            Self::RandomForest { .. } => ModelFamily::RandomForest,
        }
    }

    /// Fits this configuration. `seed` drives the randomized families.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidArgument`] if the data cannot be fitted
    /// with this configuration, e.g. fewer rows than neighbors, and
    /// [`TrainingError::Model`] if the estimator itself fails.
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64], seed: u64) -> Result<FittedModel, TrainingError> {
        FittedModel::try_from(FitRecord {
            params: *self,
            seed,
            train_x: x.to_vec(),
            train_y: y.to_vec(),
        })
    }
}

/// Persisted form of a [`FittedModel`]: what it is rebuilt from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FitRecord {
    #[serde(flatten)]
    params: Hyperparams,
    seed: u64,
    train_x: Vec<Vec<f64>>,
    train_y: Vec<f64>,
}

/// A fitted regressor of any family.
///
/// Serializes as `{"family": ..., <hyperparameters>, "seed": ..., "train_x":
/// [...], "train_y": [...]}`.
#[derive(Deserialize)]
#[serde(try_from = "FitRecord")]
pub struct FittedModel {
    record: FitRecord,
    n_features: usize,
    estimator: Box<dyn Regressor>,
}

impl TryFrom<FitRecord> for FittedModel {
    type Error = TrainingError;

    fn try_from(record: FitRecord) -> Result<Self, Self::Error> {
        let FitRecord {
            params,
            seed,
            train_x,
            train_y,
        } = &record;
        let n_features = check_training_data(train_x, train_y)?;
        let x = to_matrix(train_x, n_features);
        let estimator: Box<dyn Regressor> = match *params {
            Hyperparams::NearestNeighbor { k, weighting } => {
                Box::new(knn::fit(&x, train_y, k, weighting)?)
            }
            Hyperparams::Linear => Box::new(linear::fit(&x, train_y)?),
            Hyperparams::RandomForest {
                n_estimators,
                max_depth,
            } => Box::new(forest::fit(
                &x,
                train_y,
                n_features,
                n_estimators,
                max_depth,
                *seed,
            )?),
        };
        Ok(Self {
            record,
            n_features,
            estimator,
        })
    }
}

impl Serialize for FittedModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl PartialEq for FittedModel {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedModel")
            .field("params", &self.record.params)
            .field("seed", &self.record.seed)
            .field("train_rows", &self.record.train_y.len())
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl FittedModel {
    #[must_use]
    pub fn family(&self) -> ModelFamily {
        self.record.params.family()
    }

    #[must_use]
    pub fn hyperparams(&self) -> Hyperparams {
        self.record.params
    }

    /// Number of input features the model was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Predicts the targets of standardized rows.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::FeatureCountMismatch`] if a row does not have
    /// one value per feature.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, TrainingError> {
        if let Some(row) = rows.iter().find(|row| row.len() != self.n_features) {
            return Err(TrainingError::FeatureCountMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let predictions = self.estimator.predict(&to_matrix(rows, self.n_features))?;
        Ok(predictions)
    }

    /// Predicts the target of one standardized row.
    ///
    /// # Errors
    ///
    /// Same as [`FittedModel::predict`].
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, TrainingError> {
        let predictions = self.predict(&[row.to_vec()])?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| TrainingError::invalid_argument("model returned no prediction"))
    }
}

/// Copies rectangular rows into a smartcore matrix.
fn to_matrix(rows: &[Vec<f64>], width: usize) -> Matrix {
    let mut matrix = Matrix::zeros(rows.len(), width);
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            matrix.set((i, j), *value);
        }
    }
    matrix
}

/// Checks that `x` and `y` describe a non-empty, rectangular and finite
/// training set.
///
/// Returns the number of features.
fn check_training_data(x: &[Vec<f64>], y: &[f64]) -> Result<usize, TrainingError> {
    if x.len() != y.len() {
        return Err(TrainingError::invalid_argument(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }
    let Some(first) = x.first() else {
        return Err(TrainingError::invalid_argument("no training rows"));
    };
    let width = first.len();
    if width == 0 {
        return Err(TrainingError::invalid_argument("training rows have no features"));
    }
    if x.iter().any(|row| row.len() != width) {
        return Err(TrainingError::invalid_argument("rows differ in width"));
    }
    if !x.iter().flatten().chain(y).all(|v| v.is_finite()) {
        return Err(TrainingError::invalid_argument(
            "training data holds a non-finite value",
        ));
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_order_is_simplicity() {
        let mut families = vec![
            ModelFamily::RandomForest,
            ModelFamily::Linear,
            ModelFamily::NearestNeighbor,
        ];
        families.sort();
        assert_eq!(families, ModelFamily::ALL);
    }

    #[test]
    fn test_grid_order() {
        let grid = ModelFamily::NearestNeighbor.grid();
        assert_eq!(
            grid[0],
            Hyperparams::NearestNeighbor {
                k: 3,
                weighting: Weighting::Uniform
            }
        );
        assert_eq!(
            grid[1],
            Hyperparams::NearestNeighbor {
                k: 3,
                weighting: Weighting::Distance
            }
        );
        let grid = ModelFamily::RandomForest.grid();
        assert_eq!(
            grid[11],
            Hyperparams::RandomForest {
                n_estimators: 200,
                max_depth: 20
            }
        );
        assert!(grid.iter().all(|h| h.family() == ModelFamily::RandomForest));
    }

    #[test]
    fn test_hyperparams_serialization() {
        let json = serde_json::to_value(Hyperparams::NearestNeighbor {
            k: 5,
            weighting: Weighting::Distance,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"family": "nearest_neighbor", "k": 5, "weighting": "distance"})
        );
        assert_eq!(
            serde_json::to_value(Hyperparams::Linear).unwrap(),
            serde_json::json!({"family": "linear"})
        );
    }

    #[test]
    fn test_fitted_model_serialization() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.5], vec![2.0, 0.0]];
        let y = vec![1.0, 2.0, 3.0];
        let model = Hyperparams::RandomForest {
            n_estimators: 4,
            max_depth: 2,
        }
        .fit(&x, &y, 9)
        .unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "family": "random_forest",
                "n_estimators": 4,
                "max_depth": 2,
                "seed": 9,
                "train_x": [[0.0, 1.0], [1.0, 0.5], [2.0, 0.0]],
                "train_y": [1.0, 2.0, 3.0],
            })
        );
        let restored: FittedModel = serde_json::from_value(json).unwrap();
        assert_eq!(restored, model);
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn test_invalid_training_data() {
        let cases: [(Vec<Vec<f64>>, Vec<f64>); 5] = [
            (vec![], vec![]),
            (vec![vec![1.0], vec![2.0]], vec![1.0]),
            (vec![vec![1.0], vec![2.0, 3.0]], vec![1.0, 2.0]),
            (vec![vec![], vec![]], vec![1.0, 2.0]),
            (vec![vec![1.0], vec![f64::NAN]], vec![1.0, 2.0]),
        ];
        for (i, (x, y)) in cases.iter().enumerate() {
            let err = Hyperparams::Linear.fit(x, y, 0).unwrap_err();
            assert!(matches!(err, TrainingError::InvalidArgument { .. }), "{i}: {err}");
        }
    }

    #[test]
    fn test_parse_family() {
        assert_eq!(
            "randomforest".parse::<ModelFamily>().unwrap(),
            ModelFamily::RandomForest
        );
    }

    #[test]
    fn test_fitted_model_delegates() {
        let x = (0..6).map(|i| vec![f64::from(i)]).collect::<Vec<_>>();
        let y = (0..6).map(|i| 2.0 * f64::from(i) + 1.0).collect::<Vec<_>>();
        let model = Hyperparams::Linear.fit(&x, &y, 0).unwrap();
        assert_eq!(model.family(), ModelFamily::Linear);
        assert_eq!(model.n_features(), 1);
        assert!((model.predict_row(&[10.0]).unwrap() - 21.0).abs() < 1e-8);
        assert!(matches!(
            model.predict(&[vec![1.0, 2.0]]).unwrap_err(),
            TrainingError::FeatureCountMismatch {
                expected: 1,
                actual: 2
            }
        ));
        assert_eq!(model.predict(&[]).unwrap(), Vec::<f64>::new());

        let err = Hyperparams::NearestNeighbor {
            k: 9,
            weighting: Weighting::Uniform,
        }
        .fit(&x, &y, 0)
        .unwrap_err();
        assert!(matches!(err, TrainingError::InvalidArgument { .. }));
    }
}
