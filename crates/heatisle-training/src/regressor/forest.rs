//! Random forest regression
//!
//! smartcore grows each regression tree on a bootstrap sample of the training
//! rows. Every feature is considered at every split and the forest predicts
//! the mean of its trees. The same data and seed always grow the same forest.

use smartcore::{
    ensemble::random_forest_regressor::{
        RandomForestRegressor, RandomForestRegressorParameters,
    },
    error::Failed,
};

use super::{Matrix, Regressor};
use crate::TrainingError;

pub(super) type ForestModel = RandomForestRegressor<f64, f64, Matrix, Vec<f64>>;

impl Regressor for ForestModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, Failed> {
        RandomForestRegressor::predict(self, x)
    }
}

/// Grows `n_estimators` trees of depth at most `max_depth`.
pub(super) fn fit(
    x: &Matrix,
    y: &[f64],
    n_features: usize,
    n_estimators: usize,
    max_depth: usize,
    seed: u64,
) -> Result<ForestModel, TrainingError> {
    if n_estimators == 0 {
        return Err(TrainingError::invalid_argument(
            "a forest needs at least one tree",
        ));
    }
    let max_depth = u16::try_from(max_depth)
        .ok()
        .filter(|depth| *depth > 0)
        .ok_or_else(|| {
            TrainingError::invalid_argument(format!("unsupported tree depth {max_depth}"))
        })?;
    let params = RandomForestRegressorParameters::default()
        .with_n_trees(n_estimators)
        .with_max_depth(max_depth)
        .with_m(n_features)
        .with_seed(seed);
    let model = RandomForestRegressor::fit(x, &y.to_vec(), params)?;
    Ok(model)
}
