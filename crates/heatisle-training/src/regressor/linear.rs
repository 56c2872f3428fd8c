//! Ordinary least squares regression with intercept
//!
//! Solved through smartcore's SVD solver, which zeroes the contribution of
//! vanishing singular values, so constant or collinear features still fit.

use smartcore::{
    error::Failed,
    linear::linear_regression::{
        LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
    },
};

use super::{Matrix, Regressor};
use crate::TrainingError;

pub(super) type LinearModel = LinearRegression<f64, f64, Matrix, Vec<f64>>;

impl Regressor for LinearModel {
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, Failed> {
        LinearRegression::predict(self, x)
    }
}

pub(super) fn fit(x: &Matrix, y: &[f64]) -> Result<LinearModel, TrainingError> {
    let params = LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
    let model = LinearRegression::fit(x, &y.to_vec(), params)?;
    Ok(model)
}
