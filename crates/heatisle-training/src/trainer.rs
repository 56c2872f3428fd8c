//! End-to-end model training
//!
//! [`train`] runs the whole pipeline on a cleaned hexagon feature table:
//!
//! 1. load and clean the table
//! 2. split it into a training and a test partition
//! 3. standardize the features with statistics of the training partition
//! 4. grid search every candidate family on the training partition
//! 5. evaluate each family's best configuration on the test partition
//! 6. persist the family with the lowest test RMSE together with the scaler
//!
//! Ties on the test RMSE go to the simplest family (see [`ModelFamily`]).

use std::path::{Path, PathBuf};

use heatisle_dataset::{DEFAULT_TARGET, clean_data, get_keys};

use crate::{
    TrainingError,
    bundle::{TrainedModel, check_file_name, save_model},
    metrics::rmse,
    regressor::{FittedModel, Hyperparams, ModelFamily},
    scaler::StandardScaler,
    search::{DEFAULT_FOLDS, grid_search},
    split::{DEFAULT_SEED, DEFAULT_TEST_RATIO, train_test_split},
};

/// Default model file name.
pub const DEFAULT_FILE_NAME: &str = "model.bin";

/// Training pipeline settings.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Feature columns, in model input order.
    pub feature_keys: Vec<String>,
    pub target: String,
    pub test_ratio: f64,
    pub folds: usize,
    pub seed: u64,
    /// Directory of the model file. Empty means the current directory.
    pub output_dir: PathBuf,
    pub file_name: String,
    /// Families to search.
    pub families: Vec<ModelFamily>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            feature_keys: get_keys(),
            target: DEFAULT_TARGET.to_owned(),
            test_ratio: DEFAULT_TEST_RATIO,
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_SEED,
            output_dir: PathBuf::new(),
            file_name: DEFAULT_FILE_NAME.to_owned(),
            families: ModelFamily::ALL.to_vec(),
        }
    }
}

/// Test-set performance of one family's best configuration.
#[derive(Debug, Clone)]
pub struct FamilyEvaluation {
    pub family: ModelFamily,
    pub best: Hyperparams,
    /// Mean negative MSE over the cross-validation folds.
    pub cv_score: f64,
    pub test_rmse: f64,
}

/// Summary of a training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Number of rows left after cleaning.
    pub rows: usize,
    /// One entry per family that could be fitted, in search order.
    pub evaluations: Vec<FamilyEvaluation>,
    pub selected: Hyperparams,
    pub test_rmse: f64,
    /// Path of the written model file.
    pub path: PathBuf,
}

/// Trains, selects and saves a model from the feature table at `input_path`.
///
/// # Errors
///
/// - [`TrainingError::Format`] if the model file name is not a `.bin` name;
///   checked before any work is done
/// - [`TrainingError::Dataset`] if the table cannot be loaded or has too few rows
/// - [`TrainingError::InvalidArgument`] if the options cannot split or fold the table
/// - [`TrainingError::NoViableCandidate`] if no family could be fitted
/// - any error of [`save_model`]
pub fn train(input_path: &Path, options: &TrainOptions) -> Result<TrainingReport, TrainingError> {
    check_file_name(&options.file_name)?;
    if options.families.is_empty() {
        return Err(TrainingError::invalid_argument("no model family to search"));
    }

    let table = clean_data(input_path, &options.feature_keys, &options.target)?;
    log::info!(
        "Training on {} rows with {} features",
        table.len(),
        table.feature_names().len()
    );

    let split = train_test_split(
        table.features(),
        table.targets(),
        options.test_ratio,
        options.seed,
    )?;
    let scaler = StandardScaler::fit(&split.train_x)?;
    let train_x = scaler.transform(&split.train_x)?;
    let test_x = scaler.transform(&split.test_x)?;

    let mut candidates: Vec<(FamilyEvaluation, FittedModel)> = vec![];
    for &family in &options.families {
        let result = match grid_search(family, &train_x, &split.train_y, options.folds, options.seed)
        {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Skipping {family}: {e}");
                continue;
            }
        };
        let predictions = match result.model.predict(&test_x) {
            Ok(predictions) => predictions,
            Err(e) => {
                log::warn!("Skipping {family}: {e}");
                continue;
            }
        };
        let test_rmse = rmse(&split.test_y, &predictions);
        log::info!("{family}: test RMSE {test_rmse:.4}");
        let evaluation = FamilyEvaluation {
            family,
            best: result.best,
            cv_score: result.best_score,
            test_rmse,
        };
        candidates.push((evaluation, result.model));
    }

    let Some(selected_index) = candidates
        .iter()
        .enumerate()
        .filter(|(_, (evaluation, _))| !evaluation.test_rmse.is_nan())
        .min_by(|(_, (a, _)), (_, (b, _))| {
            a.test_rmse
                .total_cmp(&b.test_rmse)
                .then(a.family.cmp(&b.family))
        })
        .map(|(i, _)| i)
    else {
        return Err(TrainingError::NoViableCandidate {
            family: options.families[0],
        });
    };
    let (evaluations, mut models): (Vec<_>, Vec<_>) = candidates.into_iter().unzip();
    let selected = evaluations[selected_index].clone();
    log::info!(
        "Selected {} with test RMSE {:.4}",
        selected.best,
        selected.test_rmse
    );

    let trained = TrainedModel::new(
        table.feature_names().to_vec(),
        selected.test_rmse,
        models.swap_remove(selected_index),
    );
    let path = save_model(&trained, &scaler, &options.output_dir, &options.file_name)?;
    log::info!("Model saved to {}", path.display());

    Ok(TrainingReport {
        rows: table.len(),
        evaluations,
        selected: selected.best,
        test_rmse: selected.test_rmse,
        path,
    })
}
