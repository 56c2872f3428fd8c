//! k-nearest-neighbor regression
//!
//! Predicts the (weighted) average target of the `k` training rows closest to
//! the query in Euclidean distance, using smartcore's brute-force search.

use serde::{Deserialize, Serialize};
use smartcore::{
    algorithm::neighbour::KNNAlgorithmName,
    error::Failed,
    metrics::distance::euclidian::Euclidian,
    neighbors::{
        KNNWeightFunction,
        knn_regressor::{KNNRegressor, KNNRegressorParameters},
    },
};

use super::{Matrix, Regressor};
use crate::TrainingError;

/// How the neighbors' targets are averaged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Every neighbor counts the same.
    #[display("uniform")]
    Uniform,
    /// Neighbors count with the inverse of their distance. Training rows
    /// identical to the query take all the weight.
    #[display("distance")]
    Distance,
}

impl From<Weighting> for KNNWeightFunction {
    fn from(weighting: Weighting) -> Self {
        match weighting {
            Weighting::Uniform => Self::Uniform,
            Weighting::Distance => Self::Distance,
        }
    }
}

pub(super) type KnnModel = KNNRegressor<f64, f64, Matrix, Vec<f64>, Euclidian<f64>>;

impl Regressor for KnnModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, Failed> {
        KNNRegressor::predict(self, x)
    }
}

/// Memorizes the training set.
///
/// `k` must be between 2 and the number of training rows.
pub(super) fn fit(
    x: &Matrix,
    y: &[f64],
    k: usize,
    weighting: Weighting,
) -> Result<KnnModel, TrainingError> {
    if !(2..=y.len()).contains(&k) {
        return Err(TrainingError::invalid_argument(format!(
            "k={k} neighbors requested but {} training rows available",
            y.len()
        )));
    }
    let params = KNNRegressorParameters::default()
        .with_k(k)
        .with_weight(weighting.into())
        .with_algorithm(KNNAlgorithmName::LinearSearch);
    let model = KNNRegressor::fit(x, &y.to_vec(), params)?;
    Ok(model)
}
