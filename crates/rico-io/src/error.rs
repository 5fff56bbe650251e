//! Error types for raster and discovery operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Decoding error.
    #[error("decode error in {path}: {message}")]
    DecodeError {
        /// Raster that failed to decode.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Sample layout the reader does not handle.
    #[error("unsupported raster in {path}: {message}")]
    Unsupported {
        /// Offending raster.
        path: PathBuf,
        /// What is unsupported.
        message: String,
    },

    /// Requested band does not exist.
    #[error("band {index} out of range, raster has {count} bands")]
    BandOutOfRange {
        /// 1-based band index.
        index: usize,
        /// Number of bands in the raster.
        count: usize,
    },

    /// Discovery pattern is not a valid regex.
    #[error("invalid discovery pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Walking the dataset root failed.
    #[error("cannot walk {root}: {message}")]
    Walk {
        /// Root being searched.
        root: PathBuf,
        /// walkdir message.
        message: String,
    },

    /// Array construction failed.
    #[error(transparent)]
    Core(#[from] rico_core::CoreError),
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
