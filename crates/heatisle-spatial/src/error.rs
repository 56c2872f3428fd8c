use std::{io, path::PathBuf};

use heatisle_stats::StatsError;

/// Errors raised while reading spatial inputs or aggregating features.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SpatialError {
    #[display("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },
    #[display("invalid terrain grid: {reason}")]
    InvalidTerrainGrid { reason: String },
    #[display("invalid value for property '{property}': {reason}")]
    InvalidProperty {
        property: String,
        reason: String,
    },
    #[display("{source}")]
    Stats { source: StatsError },
    #[display("failed to read {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<StatsError> for SpatialError {
    fn from(source: StatsError) -> Self {
        Self::Stats { source }
    }
}

impl SpatialError {
    pub(crate) fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }
}
