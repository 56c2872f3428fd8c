//! Statistical utilities for heat island feature extraction.
//!
//! This crate provides the numeric building blocks used when summarizing
//! buildings and terrain inside an area of interest:
//!
//! - **Weighted statistics**: weighted percentile / median / mean / standard
//!   deviation, where each observation counts proportionally to a weight
//!   (typically a building footprint area)
//! - **Descriptive statistics**: unweighted mean, median, variance, standard
//!   deviation and extremes
//! - **Percentiles**: linearly interpolated percentile lookup
//!
//! # Modules
//!
//! - [`weighted`]: Weighted statistics with argument validation
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentile computation and storage
//!
//! # Examples
//!
//! ## Weighted percentiles
//!
//! ```
//! use heatisle_stats::weighted;
//!
//! let heights = [10.0, 20.0, 30.0];
//! let areas = [1.0, 1.0, 2.0];
//! let median = weighted::weighted_median(&heights, &areas).unwrap();
//! assert_eq!(median, 20.0);
//! ```
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use heatisle_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing percentiles
//!
//! ```
//! use heatisle_stats::percentiles::Percentiles;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let percentiles = Percentiles::new(&values, &[25.0, 50.0, 75.0]);
//! assert_eq!(percentiles.get(50.0), Some(3.0));
//! ```

pub mod descriptive;
pub mod error;
pub mod percentiles;
pub mod weighted;

pub use self::error::{ErrorKind, StatsError};
