use std::path::PathBuf;

use anyhow::Context as _;
use heatisle_dataset::{DEFAULT_TARGET, FeatureSet};
use heatisle_training::{
    TrainOptions,
    regressor::ModelFamily,
    search::DEFAULT_FOLDS,
    split::{DEFAULT_SEED, DEFAULT_TEST_RATIO},
    train,
    trainer::DEFAULT_FILE_NAME,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Hexagon feature table (.geojson) produced by `aggregate`
    #[arg(long)]
    input: PathBuf,
    /// Target column
    #[arg(long, default_value = DEFAULT_TARGET)]
    target: String,
    /// Feature set (default or withterrain)
    #[arg(long, default_value = "default")]
    feature_set: FeatureSet,
    /// Share of rows held out for testing
    #[arg(long, default_value_t = DEFAULT_TEST_RATIO)]
    test_ratio: f64,
    /// Number of cross-validation folds
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    folds: usize,
    /// Seed of the split and of the randomized models
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Directory of the model file (current directory if omitted)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Model file name; must end with .bin and not exist yet
    #[arg(long, default_value = DEFAULT_FILE_NAME)]
    file_name: String,
    /// Model families to search (linear, nearestneighbor, randomforest); all if omitted
    #[arg(long = "family")]
    families: Vec<ModelFamily>,
}

impl TrainArg {
    fn options(&self) -> TrainOptions {
        let families = if self.families.is_empty() {
            ModelFamily::ALL.to_vec()
        } else {
            self.families.clone()
        };
        TrainOptions {
            feature_keys: self.feature_set.keys(),
            target: self.target.clone(),
            test_ratio: self.test_ratio,
            folds: self.folds,
            seed: self.seed,
            output_dir: self.output_dir.clone().unwrap_or_default(),
            file_name: self.file_name.clone(),
            families,
        }
    }
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let report = train(&arg.input, &arg.options())
        .with_context(|| format!("Failed to train on {}", arg.input.display()))?;

    eprintln!("Trained on {} rows", report.rows);
    for evaluation in &report.evaluations {
        eprintln!(
            "  {:<16} test RMSE {:>10.4}  (cv score {:.4}, {})",
            evaluation.family.to_string(),
            evaluation.test_rmse,
            evaluation.cv_score,
            evaluation.best
        );
    }
    eprintln!(
        "Selected {} with test RMSE {:.4}",
        report.selected, report.test_rmse
    );
    println!("{}", report.path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;
    use crate::command::{CommandArgs, Mode};

    fn parse(extra: &[&str]) -> TrainArg {
        let args = ["heatisle", "train", "--input", "table.geojson"]
            .into_iter()
            .chain(extra.iter().copied());
        let Mode::Train(arg) = CommandArgs::parse_from(args).mode else {
            panic!("expected train");
        };
        arg
    }

    #[test]
    fn test_default_options() {
        let options = parse(&[]).options();
        assert_eq!(options.feature_keys, FeatureSet::Default.keys());
        assert_eq!(options.target, DEFAULT_TARGET);
        assert_eq!(options.families, ModelFamily::ALL);
        assert_eq!(options.file_name, "model.bin");
        assert_eq!(options.output_dir, PathBuf::new());
    }

    #[test]
    fn test_family_and_feature_set_flags() {
        let options = parse(&[
            "--family",
            "linear",
            "--family",
            "randomforest",
            "--feature-set",
            "withterrain",
        ])
        .options();
        assert_eq!(
            options.families,
            [ModelFamily::Linear, ModelFamily::RandomForest]
        );
        assert_eq!(options.feature_keys, FeatureSet::WithTerrain.keys());
    }
}
