use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the algebra engine, the trainer and the persistence layer can report.
///
/// There is no partial-success mode: any of these aborts the enclosing
/// training or inference call.
#[derive(Debug, Error)]
pub enum Error {
    /// Two shapes disagree: a literal of the wrong length, a `dot` with a
    /// mismatched inner dimension, or a stream header that does not match
    /// the expected type.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// An operation that needs at least one element was called on an empty container.
    #[error("{0} is not possible on an empty container")]
    EmptyContainer(&'static str),

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("invalid hyperparameter `{name}`: {reason}")]
    InvalidHyperparameter { name: &'static str, reason: String },

    #[error("record {record}: {message}")]
    Parse { record: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn dimension(expected: impl ToString, actual: impl ToString) -> Self {
        Error::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
