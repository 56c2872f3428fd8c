use std::{io, path::PathBuf};

use heatisle_dataset::DatasetError;
use smartcore::error::Failed;

use crate::regressor::ModelFamily;

/// Errors raised while training, persisting or applying a model.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrainingError {
    #[display("{source}")]
    Dataset { source: DatasetError },
    #[display("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[display("model error: {source}")]
    Model { source: Failed },
    #[display("no {family} configuration could be fitted")]
    NoViableCandidate { family: ModelFamily },
    #[display("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },
    #[display("model file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[display("invalid model file format: {reason}")]
    Format { reason: String },
    #[display("invalid model file schema: {reason}")]
    Schema { reason: String },
    #[display("output file already exists: {}", path.display())]
    OutputExists { path: PathBuf },
    #[display("output directory does not exist: {}", path.display())]
    OutputDirMissing { path: PathBuf },
    #[display("I/O error on {}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl From<DatasetError> for TrainingError {
    fn from(source: DatasetError) -> Self {
        Self::Dataset { source }
    }
}

impl From<Failed> for TrainingError {
    fn from(source: Failed) -> Self {
        Self::Model { source }
    }
}

impl TrainingError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
