//! Regression model training and selection
//!
//! - [`split`]: reproducible train/test split
//! - [`scaler`]: feature standardization
//! - [`regressor`]: the candidate regressor families, built on smartcore
//! - [`search`]: cross-validated hyperparameter grid search
//! - [`metrics`]: error measures
//! - [`trainer`]: the end-to-end pipeline selecting the best family
//! - [`bundle`]: saving and loading the selected model with its scaler
//!
//! # Example
//!
//! ```
//! use heatisle_training::{regressor::Hyperparams, scaler::StandardScaler};
//!
//! let x = (0..10).map(|i| vec![f64::from(i)]).collect::<Vec<_>>();
//! let y = (0..10).map(|i| 3.0 * f64::from(i) + 1.0).collect::<Vec<_>>();
//!
//! let scaler = StandardScaler::fit(&x).unwrap();
//! let model = Hyperparams::Linear
//!     .fit(&scaler.transform(&x).unwrap(), &y, 0)
//!     .unwrap();
//! let predicted = model
//!     .predict_row(&scaler.transform_row(&[20.0]).unwrap())
//!     .unwrap();
//! assert!((predicted - 61.0).abs() < 1e-8);
//! ```

pub use self::{
    bundle::{TrainedModel, load_model, predict, save_model},
    error::TrainingError,
    trainer::{TrainOptions, TrainingReport, train},
};

pub mod bundle;
mod error;
pub mod metrics;
pub mod regressor;
pub mod scaler;
pub mod search;
pub mod split;
pub mod trainer;
