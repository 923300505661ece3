//! Dump error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding a dump
#[derive(Debug, Error)]
pub enum DumpError {
    /// Serialization to JSON or binary format failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization from JSON or binary format failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}
