//! Error types for conversion and verification.
//!
//! Every variant is fatal to a conversion run. Corrupt containers
//! ([`rico_core::CoreError::CorruptContainer`] inside [`ConvertError::Core`])
//! only surface while reading a store back.

use std::path::PathBuf;
use thiserror::Error;

/// Conversion error.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Discovery found no samples under a dataset root.
    #[error("no {dataset} samples found under {root}")]
    DiscoveryEmpty {
        /// Dataset being searched.
        dataset: &'static str,
        /// Root that was searched.
        root: PathBuf,
    },

    /// A band file expected by the band table does not exist.
    #[error("missing source file {path} for sample {sample}; the dataset is probably incomplete")]
    MissingSourceFile {
        /// Expected file.
        path: PathBuf,
        /// Sample being converted.
        sample: PathBuf,
    },

    /// A multi-band raster has fewer bands than the band table needs.
    #[error("{path} has {found} bands, sample {sample} needs {expected}")]
    IncompleteBandSet {
        /// Raster that was read.
        path: PathBuf,
        /// Sample being converted.
        sample: PathBuf,
        /// Bands required.
        expected: usize,
        /// Bands present.
        found: usize,
    },

    /// A key is already present in the store.
    #[error("key {key} from {path} already exists in the store; refusing to overwrite")]
    KeyCollision {
        /// Colliding key (lossy UTF-8).
        key: String,
        /// Source path that derived the key.
        path: PathBuf,
    },

    /// No key could be derived from a sample path.
    #[error("cannot derive a key from {0}")]
    InvalidSamplePath(PathBuf),

    /// Record or container codec failure, including corrupt containers.
    #[error(transparent)]
    Core(#[from] rico_core::CoreError),

    /// Raster read or discovery failure.
    #[error(transparent)]
    Raster(#[from] rico_io::IoError),

    /// LMDB failure.
    #[error("store error: {0}")]
    Store(#[from] heed::Error),

    /// Filesystem error outside of raster reads.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipeline already aborted and cannot run again.
    #[error("pipeline aborted by an earlier failure")]
    PipelineAborted,

    /// Worker pool could not be built.
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
