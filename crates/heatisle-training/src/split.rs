//! Reproducible train/test split

use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg64;

use crate::TrainingError;

/// Default share of rows held out for testing.
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Default seed of the split permutation.
pub const DEFAULT_SEED: u64 = 0;

/// Rows and targets partitioned into a training and a test set.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train_x: Vec<Vec<f64>>,
    pub train_y: Vec<f64>,
    pub test_x: Vec<Vec<f64>>,
    pub test_y: Vec<f64>,
}

/// Number of test rows for `n` rows: `ceil(n * test_ratio)`.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn test_size(n: usize, test_ratio: f64) -> usize {
    (n as f64 * test_ratio).ceil() as usize
}

/// Shuffles the rows with a seeded permutation and splits them.
///
/// The first `ceil(n * test_ratio)` rows of the permutation form the test set.
/// The same input and seed always produce the same split.
///
/// # Errors
///
/// Returns [`TrainingError::InvalidArgument`] if `x` and `y` differ in length,
/// `test_ratio` is not in `(0, 1)`, or either side would be empty.
///
/// # Examples
///
/// ```
/// use heatisle_training::split::train_test_split;
///
/// let x = (0..10).map(|i| vec![f64::from(i)]).collect::<Vec<_>>();
/// let y = (0..10).map(f64::from).collect::<Vec<_>>();
/// let split = train_test_split(&x, &y, 0.2, 0).unwrap();
/// assert_eq!(split.train_x.len(), 8);
/// assert_eq!(split.test_y.len(), 2);
/// assert_eq!(split, train_test_split(&x, &y, 0.2, 0).unwrap());
/// ```
pub fn train_test_split(
    x: &[Vec<f64>],
    y: &[f64],
    test_ratio: f64,
    seed: u64,
) -> Result<TrainTestSplit, TrainingError> {
    if x.len() != y.len() {
        return Err(TrainingError::invalid_argument(format!(
            "{} feature rows but {} targets",
            x.len(),
            y.len()
        )));
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(TrainingError::invalid_argument(format!(
            "test ratio must be between 0 and 1, got {test_ratio}"
        )));
    }
    let n = y.len();
    let n_test = test_size(n, test_ratio);
    if n_test == 0 || n_test >= n {
        return Err(TrainingError::invalid_argument(format!(
            "cannot split {n} rows with test ratio {test_ratio}"
        )));
    }

    let mut indices = (0..n).collect::<Vec<_>>();
    let mut rng = Pcg64::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test, train) = indices.split_at(n_test);

    let rows = |idx: &[usize]| -> Vec<Vec<f64>> { idx.iter().map(|&i| x[i].clone()).collect() };
    let targets = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| y[i]).collect() };
    Ok(TrainTestSplit {
        train_x: rows(train),
        train_y: targets(train),
        test_x: rows(test),
        test_y: targets(test),
    })
}
