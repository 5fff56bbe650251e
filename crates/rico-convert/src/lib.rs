//! # rico-convert
//!
//! Converts remote-sensing datasets into LMDB stores of safetensors-style
//! containers, and checks two stores for reproducibility.
//!
//! - [`Dataset`] - closed set of supported datasets with their band tables
//! - [`Store`] - LMDB environment with no-overwrite chunk commits
//! - [`Pipeline`] - sorted, chunked, parallel encode with ordered commit
//! - [`verify`] - sampled digest reports and store comparison
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rico_convert::{ConvertOptions, Dataset, NoProgress, Pipeline, Store, discover_samples};
//!
//! let options = ConvertOptions::default();
//! let samples = discover_samples(Dataset::BigEarthNetS2, "/data/BigEarthNet-S2".as_ref())?;
//! let store = Store::create("/data/encoded", options.map_size)?;
//! let mut pipeline = Pipeline::new(&store, &options, &NoProgress)?;
//! pipeline.convert(Dataset::BigEarthNetS2, samples, options.compression.as_ref())?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod dataset;
pub mod error;
pub mod key;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod verify;

pub use dataset::{BandSpec, Dataset, SourceDescriptor, SourceFile, Strategy};
pub use error::{ConvertError, ConvertResult};
pub use key::{KeyRule, SampleKey};
pub use pipeline::{
    ConvertOptions, DEFAULT_CHUNK_SIZE, Pipeline, PipelineState, RunReport, discover_samples,
};
pub use progress::{NoProgress, Progress};
pub use store::{Store, StoreEntry};
pub use verify::{Comparison, InspectReport, SampleGroup, compare_stores, inspect_path, inspect_store};
