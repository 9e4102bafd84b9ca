//! Error types for scan loading and preprocessing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while pairing or preparing scans.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path has no 'imagesTr' component: {0}")]
    MissingImagesDir(PathBuf),

    #[error("Found {images} images but {labels} label volumes")]
    UnpairedScans { images: usize, labels: usize },

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Sample index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}
