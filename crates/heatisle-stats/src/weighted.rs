//! Weighted statistics
//!
//! Every observation contributes to the result proportionally to its weight.
//! In heat island feature extraction the observations are building heights
//! and the weights are the building footprint areas.
//!
//! # Percentile Interpolation
//!
//! [`weighted_percentile`] sorts the `(value, weight)` pairs by value,
//! builds the cumulative weight sequence and linearly interpolates the value
//! at the cumulative weight `total * p / 100`:
//!
//! - cutoffs below the first cumulative weight return the smallest value
//! - cutoffs at or beyond the last cumulative weight return the largest value
//! - otherwise the value is interpolated between the two neighboring samples
//!
//! With strictly positive weights the 0th and 100th percentiles are the
//! literal extremes. A run of zero weights at the low end of the sorted
//! sample shifts the 0th percentile inwards: the result is a weighted
//! extreme, not a literal one.

use std::iter;

use crate::StatsError;

fn validate(data: &[f64], weights: &[f64]) -> Result<(), StatsError> {
    if data.len() != weights.len() {
        return Err(StatsError::LengthMismatch {
            data_len: data.len(),
            weights_len: weights.len(),
        });
    }
    if let Some((index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| w.is_nan() || **w < 0.0)
    {
        return Err(StatsError::NegativeWeight { index, weight });
    }
    Ok(())
}

fn total_weight(weights: &[f64]) -> Result<f64, StatsError> {
    let total = weights.iter().sum::<f64>();
    if total == 0.0 {
        return Err(StatsError::ZeroTotalWeight);
    }
    Ok(total)
}

/// Computes the weighted percentile of `data`.
///
/// # Arguments
///
/// * `data` - Observations
/// * `weights` - Non-negative weight per observation
/// * `percentile` - Percentile in `[0, 100]`
///
/// # Errors
///
/// - [`StatsError::LengthMismatch`] if the slices differ in length
/// - [`StatsError::NegativeWeight`] if a weight is negative or NaN
/// - [`StatsError::PercentileOutOfRange`] if `percentile` is outside `[0, 100]`
/// - [`StatsError::EmptySample`] if `data` is empty
/// - [`StatsError::ZeroTotalWeight`] if every weight is zero
///
/// # Examples
///
/// ```
/// use heatisle_stats::weighted::weighted_percentile;
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let weights = [1.0, 2.0, 3.0, 4.0, 5.0];
/// // cumulative weights: 1, 3, 6, 10, 15; cutoff 7.5 lies between 6 and 10
/// let p50 = weighted_percentile(&data, &weights, 50.0).unwrap();
/// assert_eq!(p50, 3.375);
/// assert_eq!(weighted_percentile(&data, &weights, 0.0).unwrap(), 1.0);
/// assert_eq!(weighted_percentile(&data, &weights, 100.0).unwrap(), 5.0);
/// ```
pub fn weighted_percentile(
    data: &[f64],
    weights: &[f64],
    percentile: f64,
) -> Result<f64, StatsError> {
    validate(data, weights)?;
    if !(0.0..=100.0).contains(&percentile) {
        return Err(StatsError::PercentileOutOfRange { percentile });
    }
    if data.is_empty() {
        return Err(StatsError::EmptySample);
    }
    total_weight(weights)?;

    let mut pairs = iter::zip(data.iter().copied(), weights.iter().copied()).collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let cumulative = pairs
        .iter()
        .scan(0.0, |acc, (_, w)| {
            *acc += w;
            Some(*acc)
        })
        .collect::<Vec<_>>();
    // the last cumulative weight is the total, summed in the same order
    let total = cumulative[cumulative.len() - 1];
    let cutoff = total * percentile / 100.0;

    Ok(interpolate(cutoff, &cumulative, |i| pairs[i].0))
}

/// Linear interpolation over a non-decreasing abscissa, clamped at both ends.
fn interpolate<F>(x: f64, xp: &[f64], fp: F) -> f64
where
    F: Fn(usize) -> f64,
{
    let last = xp.len() - 1;
    if x < xp[0] {
        return fp(0);
    }
    // largest index whose cumulative weight does not exceed x
    let j = xp.partition_point(|&c| c <= x) - 1;
    if j >= last {
        return fp(last);
    }
    let (x0, x1) = (xp[j], xp[j + 1]);
    let (y0, y1) = (fp(j), fp(j + 1));
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Computes the weighted median, i.e. the 50th weighted percentile.
///
/// # Errors
///
/// Same as [`weighted_percentile`].
pub fn weighted_median(data: &[f64], weights: &[f64]) -> Result<f64, StatsError> {
    weighted_percentile(data, weights, 50.0)
}

/// Computes the weighted arithmetic mean `Σ(wᵢdᵢ) / Σwᵢ`.
///
/// # Errors
///
/// - [`StatsError::LengthMismatch`] / [`StatsError::NegativeWeight`] on malformed input
/// - [`StatsError::ZeroTotalWeight`] if the weights sum to zero (including empty input)
///
/// # Examples
///
/// ```
/// use heatisle_stats::weighted::weighted_mean;
///
/// let mean = weighted_mean(&[1.0, 3.0], &[3.0, 1.0]).unwrap();
/// assert_eq!(mean, 1.5);
/// ```
pub fn weighted_mean(data: &[f64], weights: &[f64]) -> Result<f64, StatsError> {
    validate(data, weights)?;
    let total = total_weight(weights)?;
    let sum = iter::zip(data, weights).map(|(d, w)| d * w).sum::<f64>();
    Ok(sum / total)
}

/// Computes the weighted (population) standard deviation.
///
/// The variance is the weighted average of squared deviations from the
/// weighted mean.
///
/// # Errors
///
/// Same as [`weighted_mean`].
///
/// # Examples
///
/// ```
/// use heatisle_stats::weighted::weighted_std;
///
/// let std = weighted_std(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// assert!((std - 1.247_219_128_924_647).abs() < 1e-12);
/// ```
pub fn weighted_std(data: &[f64], weights: &[f64]) -> Result<f64, StatsError> {
    let mean = weighted_mean(data, weights)?;
    let total = total_weight(weights)?;
    let variance = iter::zip(data, weights)
        .map(|(d, w)| w * (d - mean).powi(2))
        .sum::<f64>()
        / total;
    Ok(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_median_matches_fiftieth_percentile() {
        let cases: &[(&[f64], &[f64])] = &[
            (&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 2.0, 3.0, 4.0, 5.0]),
            (&[5.0, 1.0, 3.0], &[0.2, 0.5, 0.3]),
            (&[7.0], &[2.0]),
            (&[2.0, 2.0, 9.0, -1.0], &[0.0, 1.0, 1.0, 4.0]),
        ];
        for (data, weights) in cases {
            assert_eq!(
                weighted_median(data, weights).unwrap(),
                weighted_percentile(data, weights, 50.0).unwrap()
            );
        }
    }

    #[test]
    fn test_percentile_is_monotonic() {
        let data = [12.0, 3.5, 8.0, 30.0, 3.5, 17.25];
        let weights = [4.0, 1.0, 0.5, 2.0, 3.0, 0.0];
        let mut previous = f64::NEG_INFINITY;
        for step in 0..=200 {
            let p = f64::from(step) * 0.5;
            let value = weighted_percentile(&data, &weights, p).unwrap();
            assert!(value >= previous, "p={p}: {value} < {previous}");
            previous = value;
        }
    }

    #[test]
    fn test_extremes_with_positive_weights() {
        let data = [4.0, 1.0, 9.0];
        let weights = [1.0, 2.0, 3.0];
        assert_eq!(weighted_percentile(&data, &weights, 0.0).unwrap(), 1.0);
        assert_eq!(weighted_percentile(&data, &weights, 100.0).unwrap(), 9.0);
    }

    #[test]
    fn test_zero_weight_shifts_minimum() {
        // the two smallest values carry no weight; the first zero-weight run
        // collapses onto its last member
        let data = [1.0, 5.0, 10.0];
        let weights = [0.0, 0.0, 1.0];
        assert_eq!(weighted_percentile(&data, &weights, 0.0).unwrap(), 5.0);
    }

    #[test]
    fn test_interpolation_between_samples() {
        let data = [10.0, 20.0];
        let weights = [1.0, 1.0];
        // cumulative 1, 2; cutoff 1.5 is halfway
        assert_abs_diff_eq!(weighted_percentile(&data, &weights, 75.0).unwrap(), 15.0);
        // cutoff 0.5 is below the first cumulative weight
        assert_eq!(weighted_percentile(&data, &weights, 25.0).unwrap(), 10.0);
    }

    #[test]
    fn test_equal_weights_mean_is_arithmetic_mean() {
        let data = [3.0, 6.0, 9.0, 12.0];
        let weights = [2.5; 4];
        assert_abs_diff_eq!(weighted_mean(&data, &weights).unwrap(), 7.5);
    }

    #[test]
    fn test_std_of_constant_is_zero() {
        let std = weighted_std(&[4.0, 4.0, 4.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(std, 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        let err = weighted_percentile(&[1.0, 2.0], &[1.0], 50.0).unwrap_err();
        assert_eq!(
            err,
            StatsError::LengthMismatch {
                data_len: 2,
                weights_len: 1
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = weighted_std(&[1.0, 2.0], &[1.0, -1.0]).unwrap_err();
        assert_eq!(
            err,
            StatsError::NegativeWeight {
                index: 1,
                weight: -1.0
            }
        );

        let err = weighted_percentile(&[1.0], &[1.0], 100.5).unwrap_err();
        assert_eq!(err, StatsError::PercentileOutOfRange { percentile: 100.5 });

        let err = weighted_percentile(&[], &[], 10.0).unwrap_err();
        assert_eq!(err, StatsError::EmptySample);
    }

    #[test]
    fn test_zero_total_weight() {
        let err = weighted_std(&[1.0, 2.0], &[0.0, 0.0]).unwrap_err();
        assert_eq!(err, StatsError::ZeroTotalWeight);
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);

        let err = weighted_percentile(&[1.0, 2.0], &[0.0, 0.0], 50.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);
    }
}
