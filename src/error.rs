//! Error types for watermark embedding operations.
//!
//! All errors at this layer are fatal: there is no fallback strategy and no
//! degraded mode. Callers are expected to validate configuration before
//! construction so that training never fails mid-epoch.

use thiserror::Error;

/// Watermark-encoder errors.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Configuration rejected before any weight allocation.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// A tensor did not have the shape an operation requires.
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// A tensor operation failed in the numeric substrate.
    #[error("Tensor operation failed: {message}")]
    Tensor { message: String },

    /// Pretrained backbone or checkpoint could not be fetched or read.
    #[error("Failed to load pretrained model: {message}")]
    ModelLoad { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for watermark-encoder operations.
pub type WatermarkResult<T> = Result<T, WatermarkError>;
