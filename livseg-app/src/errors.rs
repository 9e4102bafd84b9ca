//! Error types for the livseg binary.

use livseg_data::DataError;
use livseg_infer::InferError;
use thiserror::Error;

/// Errors that can end a livseg run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inference error: {0}")]
    Infer(#[from] InferError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}
