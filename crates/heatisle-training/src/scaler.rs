//! Feature standardization
//!
//! The scaler is fitted once on the training rows and then applied, unchanged,
//! to the test rows and to every inference input.

use std::iter;

use serde::{Deserialize, Serialize};

use crate::TrainingError;

/// Per-feature standardization `(x - mean) / scale`.
///
/// `scale` is the population standard deviation of the feature, or `1` for a
/// constant feature so that it maps to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StandardScalerData")]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Serialized form of a [`StandardScaler`], validated on conversion.
#[derive(Deserialize)]
struct StandardScalerData {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl TryFrom<StandardScalerData> for StandardScaler {
    type Error = TrainingError;

    fn try_from(data: StandardScalerData) -> Result<Self, Self::Error> {
        Self::from_parts(data.mean, data.scale)
    }
}

impl StandardScaler {
    /// Fits the scaler on `rows`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidArgument`] if `rows` is empty or the
    /// rows differ in width.
    ///
    /// # Examples
    ///
    /// ```
    /// use heatisle_training::scaler::StandardScaler;
    ///
    /// let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
    /// let scaler = StandardScaler::fit(&rows).unwrap();
    /// assert_eq!(scaler.transform_row(&[3.0, 5.0]).unwrap(), vec![1.0, 0.0]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, TrainingError> {
        let Some(first) = rows.first() else {
            return Err(TrainingError::invalid_argument(
                "cannot fit a scaler on zero rows",
            ));
        };
        let width = first.len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(TrainingError::invalid_argument("rows differ in width"));
        }

        let n = rows.len() as f64;
        let mean = (0..width)
            .map(|j| rows.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect::<Vec<_>>();
        let scale = mean
            .iter()
            .enumerate()
            .map(|(j, m)| {
                let variance = rows.iter().map(|row| (row[j] - m).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                if std > 0.0 { std } else { 1.0 }
            })
            .collect();
        Ok(Self { mean, scale })
    }

    /// Creates a scaler from known parameters.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidArgument`] if there are no features,
    /// the lengths differ, a mean is not finite or a scale is not finite and
    /// strictly positive.
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, TrainingError> {
        if mean.len() != scale.len() {
            return Err(TrainingError::invalid_argument(format!(
                "scaler has {} means but {} scales",
                mean.len(),
                scale.len()
            )));
        }
        if mean.is_empty() {
            return Err(TrainingError::invalid_argument("scaler has no features"));
        }
        if !mean.iter().all(|m| m.is_finite()) {
            return Err(TrainingError::invalid_argument(
                "scaler means must be finite",
            ));
        }
        if scale.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(TrainingError::invalid_argument(
                "scaler scales must be positive",
            ));
        }
        Ok(Self { mean, scale })
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardizes one row.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::FeatureCountMismatch`] if the row width differs
    /// from the fitted width.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, TrainingError> {
        if row.len() != self.n_features() {
            return Err(TrainingError::FeatureCountMismatch {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(iter::zip(row, iter::zip(&self.mean, &self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Standardizes every row.
    ///
    /// # Errors
    ///
    /// Same as [`StandardScaler::transform_row`].
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TrainingError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
