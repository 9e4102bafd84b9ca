//! Error types for tiling, aggregation and inference.

use livseg_data::DataError;
use thiserror::Error;

/// Errors raised by the inference pipeline.
///
/// Every variant is a usage error surfaced before any caller-visible state is
/// touched; nothing here is retried.
#[derive(Debug, Error)]
pub enum InferError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}
