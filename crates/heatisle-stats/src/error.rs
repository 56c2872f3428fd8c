/// Errors raised by the weighted statistics functions.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum StatsError {
    #[display("data and weights must have the same length (data: {data_len}, weights: {weights_len})")]
    LengthMismatch { data_len: usize, weights_len: usize },
    #[display("weights must be non-negative (weight {weight} at index {index})")]
    NegativeWeight { index: usize, weight: f64 },
    #[display("percentile must be between 0 and 100, got {percentile}")]
    PercentileOutOfRange { percentile: f64 },
    #[display("cannot compute a statistic of an empty sample")]
    EmptySample,
    #[display("weights sum to zero")]
    ZeroTotalWeight,
}

/// Coarse classification of [`StatsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorKind {
    /// Malformed input: mismatched lengths, negative weights, bad percentile.
    InvalidArgument,
    /// The weights sum to zero, so no weighted average exists.
    DivisionByZero,
}

impl StatsError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LengthMismatch { .. }
            | Self::NegativeWeight { .. }
            | Self::PercentileOutOfRange { .. }
            | Self::EmptySample => ErrorKind::InvalidArgument,
            Self::ZeroTotalWeight => ErrorKind::DivisionByZero,
        }
    }
}
