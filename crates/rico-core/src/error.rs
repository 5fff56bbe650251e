//! Error types for rico-core operations.
//!
//! Covers array construction, record assembly and the container codec.
//!
//! # Categories
//!
//! - **Shape errors**: [`ShapeMismatch`](CoreError::ShapeMismatch)
//! - **Record errors**: [`DuplicateBand`](CoreError::DuplicateBand)
//! - **Codec errors**: [`CorruptContainer`](CoreError::CorruptContainer),
//!   [`Compression`](CoreError::Compression)

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or (de)serializing tensors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Byte length does not match `product(shape) * element size`.
    #[error("shape mismatch: shape {shape:?} with {dtype} needs {expected} bytes, got {actual}")]
    ShapeMismatch {
        /// Requested shape.
        shape: Vec<usize>,
        /// Element type name.
        dtype: &'static str,
        /// Expected byte length.
        expected: usize,
        /// Provided byte length.
        actual: usize,
    },

    /// A band name appears twice inside one record.
    #[error("duplicate band name: {0}")]
    DuplicateBand(String),

    /// Container bytes could not be parsed.
    ///
    /// Raised by readers only; the pipeline never decodes.
    #[error("corrupt container: {reason}")]
    CorruptContainer {
        /// What was wrong with the bytes.
        reason: String,
    },

    /// The zstd backend failed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptContainer {
            reason: reason.into(),
        }
    }
}
