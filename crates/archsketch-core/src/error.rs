//! Error types shared across the core.
//!
//! None of these reach the end user: callers degrade to a fallback value
//! (raw coordinates, an empty stroke list) and log.

use thiserror::Error;

/// Screen/canvas transform failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Transform is not invertible (zoom = {0})")]
    NotInvertible(f64),
    #[error("Transform produced a non-finite coordinate")]
    NonFinite,
    #[error("Transform unavailable: {0}")]
    Unavailable(String),
}

/// Stroke encoding/decoding failures.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a top-level array, found {0}")]
    NotAnArray(&'static str),
}
