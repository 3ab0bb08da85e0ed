//! Error taxonomy for building, aggregating and encoding problem payloads

use thiserror::Error;

/// Raised when an `ErrorResponse` would violate its invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// Status code outside of `100..=599`
    #[error("Invalid HTTP status code: {0}")]
    InvalidStatus(i64),

    /// An extension member reuses one of the reserved member names
    #[error("The protected key '{0}' is not allowed in the extensions")]
    ReservedExtensionKey(String),
}

/// Errors produced by `MultiErrorAggregator`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AggregateError {
    /// A response of a different problem type was added to the batch
    #[error("All responses must be of the same type: {expected} (got {actual})")]
    TypeMismatch { expected: String, actual: String },

    /// `build` was called without any response in the batch
    #[error("Cannot build a combined response from an empty batch")]
    EmptyBatch,

    /// The combined response failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Encoding a problem payload (or one of its extension values) to JSON failed.
#[derive(Error, Debug)]
#[error("Failed to serialize problem details: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

/// Configuration section could not be extracted.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid problem details config: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}
