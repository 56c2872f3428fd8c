use std::{io, path::PathBuf};

/// Errors raised while assembling a training table.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("input file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[display("failed to read {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("invalid format: {reason}")]
    Format { reason: String },
    #[display("column '{column}' not found")]
    Schema { column: String },
    #[display("only {rows} rows left after cleaning, at least {min_rows} are required")]
    InsufficientData { rows: usize, min_rows: usize },
}
