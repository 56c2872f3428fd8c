//! Cross-validated grid search
//!
//! Every configuration of a family's grid is scored by k-fold cross
//! validation on the training partition. The score is the mean negative mean
//! squared error over the folds, so higher is better. Folds are contiguous
//! and unshuffled; the first `n % k` folds hold one extra row.
//!
//! A configuration that cannot be fitted on some fold (for example more
//! neighbors than training rows) scores `-inf`. The best configuration is
//! refitted on the whole training partition.

use std::{num::NonZeroUsize, thread};

use smartcore::{
    linalg::basic::{arrays::Array2 as _, matrix::DenseMatrix},
    model_selection::{BaseKFold as _, KFold},
};

use crate::{
    TrainingError,
    metrics::mean_squared_error,
    regressor::{FittedModel, Hyperparams, ModelFamily},
};

/// Default number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// Outcome of the grid search of one family.
#[derive(Debug)]
pub struct SearchResult {
    pub family: ModelFamily,
    /// Every configuration with its cross-validation score, in grid order.
    pub scores: Vec<(Hyperparams, f64)>,
    pub best: Hyperparams,
    pub best_score: f64,
    /// The best configuration refitted on all training rows.
    pub model: FittedModel,
}

/// Returns the `(train, test)` row indices of `k` contiguous, unshuffled
/// folds over `n` rows.
///
/// # Examples
///
/// ```
/// use heatisle_training::search::fold_indices;
///
/// let folds = fold_indices(7, 3);
/// assert_eq!(folds[0], (vec![3, 4, 5, 6], vec![0, 1, 2]));
/// assert_eq!(folds[2], (vec![0, 1, 2, 3, 4], vec![5, 6]));
/// ```
#[must_use]
pub fn fold_indices(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    // only the row count of the matrix is read
    let rows = DenseMatrix::<f64>::zeros(n, 1);
    KFold::default()
        .with_n_splits(k)
        .with_shuffle(false)
        .split(&rows)
        .collect()
}

fn take_rows<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Scores one configuration by k-fold cross validation.
///
/// # Errors
///
/// Returns the fitting error of the first fold that cannot be fitted.
pub fn cross_val_score(
    params: &Hyperparams,
    x: &[Vec<f64>],
    y: &[f64],
    folds: usize,
    seed: u64,
) -> Result<f64, TrainingError> {
    if folds < 2 || folds > x.len() {
        return Err(TrainingError::invalid_argument(format!(
            "cannot run {folds}-fold cross validation on {} rows",
            x.len()
        )));
    }
    let mut total = 0.0;
    for (train, test) in fold_indices(x.len(), folds) {
        let model = params.fit(&take_rows(x, &train), &take_rows(y, &train), seed)?;
        let predictions = model.predict(&take_rows(x, &test))?;
        total -= mean_squared_error(&take_rows(y, &test), &predictions);
    }
    #[expect(clippy::cast_precision_loss)]
    let score = total / folds as f64;
    Ok(score)
}

/// Runs the grid search of `family` on the training rows.
///
/// Configurations are scored on a pool of worker threads. Ties go to the
/// configuration that comes first in grid order.
///
/// # Errors
///
/// Returns [`TrainingError::NoViableCandidate`] if no configuration can be
/// scored, and the fitting error if the best configuration cannot be refitted.
pub fn grid_search(
    family: ModelFamily,
    x: &[Vec<f64>],
    y: &[f64],
    folds: usize,
    seed: u64,
) -> Result<SearchResult, TrainingError> {
    let grid = family.grid();
    let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
    let chunk_size = grid.len().div_ceil(workers).max(1);

    let mut scores = vec![f64::NEG_INFINITY; grid.len()];
    thread::scope(|s| {
        for (params, slots) in grid.chunks(chunk_size).zip(scores.chunks_mut(chunk_size)) {
            s.spawn(move || {
                for (params, slot) in params.iter().zip(slots) {
                    match cross_val_score(params, x, y, folds, seed) {
                        Ok(score) => *slot = score,
                        Err(e) => log::warn!("Skipping {params}: {e}"),
                    }
                }
            });
        }
    });

    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.iter().copied().enumerate() {
        if score.is_finite() && best.is_none_or(|(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    let Some((best_index, best_score)) = best else {
        return Err(TrainingError::NoViableCandidate { family });
    };
    let best = grid[best_index];
    log::info!("Best {family} configuration: {best} (score {best_score:.4})");

    let model = best.fit(x, y, seed)?;
    Ok(SearchResult {
        family,
        scores: grid.into_iter().zip(scores).collect(),
        best,
        best_score,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regressor::Weighting;

    fn linear_data(n: u32) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x = (0..n)
            .map(|i| vec![f64::from(i), f64::from(i % 4)])
            .collect::<Vec<_>>();
        let y = x.iter().map(|r| 2.0 * r[0] - r[1] + 3.0).collect();
        (x, y)
    }

    #[test]
    fn test_folds_cover_all_rows() {
        let tests = |n, k| {
            fold_indices(n, k)
                .into_iter()
                .map(|(_, test)| test)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            tests(10, 5),
            [vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7], vec![8, 9]]
        );
        assert_eq!(
            tests(7, 5),
            [vec![0, 1], vec![2, 3], vec![4], vec![5], vec![6]]
        );
        for (train, test) in fold_indices(7, 5) {
            assert_eq!(train.len() + test.len(), 7);
            assert!(train.iter().all(|i| !test.contains(i)));
        }
    }

    #[test]
    fn test_linear_scores_perfectly_on_linear_data() {
        let (x, y) = linear_data(20);
        let score = cross_val_score(&Hyperparams::Linear, &x, &y, 5, 0).unwrap();
        assert!(score > -1e-12, "score = {score}");
    }

    #[test]
    fn test_unfittable_candidates_are_skipped() {
        // 7 rows: the training folds hold 5 or 6 rows, so k=7 and k=9 fail
        let (x, y) = linear_data(7);
        let result = grid_search(ModelFamily::NearestNeighbor, &x, &y, 5, 0).unwrap();
        assert_eq!(result.scores.len(), 8);
        for (params, score) in &result.scores {
            let Hyperparams::NearestNeighbor { k, .. } = params else {
                panic!("unexpected {params}");
            };
            assert_eq!(score.is_finite(), *k <= 5, "{params}: {score}");
        }
        assert!(matches!(
            result.best,
            Hyperparams::NearestNeighbor { k: 3 | 5, .. }
        ));
        assert_eq!(result.model.hyperparams(), result.best);
    }

    #[test]
    fn test_no_viable_candidate() {
        let (x, y) = linear_data(4);
        let err = grid_search(ModelFamily::NearestNeighbor, &x, &y, 2, 0).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::NoViableCandidate {
                family: ModelFamily::NearestNeighbor
            }
        ));
    }

    #[test]
    fn test_ties_go_to_grid_order() {
        // every row is identical, so every configuration predicts exactly zero
        let x = vec![vec![1.0]; 12];
        let y = vec![0.0; 12];
        let result = grid_search(ModelFamily::NearestNeighbor, &x, &y, 3, 0).unwrap();
        assert_eq!(
            result.best,
            Hyperparams::NearestNeighbor {
                k: 3,
                weighting: Weighting::Uniform
            }
        );
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = linear_data(15);
        let a = grid_search(ModelFamily::RandomForest, &x, &y, 3, 1).unwrap();
        let b = grid_search(ModelFamily::RandomForest, &x, &y, 3, 1).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.model, b.model);
    }
}
