use std::iter;

/// Mean of the squared differences between predictions and targets.
///
/// Returns `NaN` for empty input.
///
/// # Panics
///
/// Panics if `targets` and `predictions` differ in length.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean_squared_error(targets: &[f64], predictions: &[f64]) -> f64 {
    assert_eq!(targets.len(), predictions.len());
    let sum = iter::zip(targets, predictions)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>();
    sum / targets.len() as f64
}

/// Root mean squared error.
///
/// # Panics
///
/// Same as [`mean_squared_error`].
///
/// # Examples
///
/// ```
/// use heatisle_training::metrics::rmse;
///
/// assert_eq!(rmse(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
/// assert_eq!(rmse(&[0.0, 0.0], &[3.0, -3.0]), 3.0);
/// ```
#[must_use]
pub fn rmse(targets: &[f64], predictions: &[f64]) -> f64 {
    mean_squared_error(targets, predictions).sqrt()
}
