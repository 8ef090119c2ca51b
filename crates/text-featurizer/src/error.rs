//! Featurizer error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeaturizerError>;

/// Errors raised while configuring, fitting or applying a featurizer.
///
/// Per-document anomalies (empty text, out-of-vocabulary grams) are not
/// errors; they contribute zeros to the output vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeaturizerError {
    /// Invalid parameters, detected when the featurizer is constructed
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Operation not allowed in the featurizer's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Fitting was cancelled through a `CancellationToken`
    #[error("fitting was cancelled")]
    Cancelled,

    /// A document carries a different number of fields than configured columns
    #[error("document has {actual} fields but the featurizer expects {expected} columns")]
    ColumnMismatch { expected: usize, actual: usize },
}

impl FeaturizerError {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
