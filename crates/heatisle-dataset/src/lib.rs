//! Training table assembly
//!
//! Joins per-location feature records with an observed target column and
//! cleans the result so that it can be fed to the model trainer.
//!
//! - [`keys`]: the feature key contract shared by training and prediction
//! - [`clean`]: loading and cleaning a hexagon feature table
//! - [`stations`]: weather station preprocessing

pub use self::{
    clean::{DEFAULT_TARGET, MIN_ROWS, TrainingTable, clean_data},
    error::DatasetError,
    keys::{FeatureSet, get_keys},
};

pub mod clean;
mod error;
pub mod keys;
pub mod stations;
