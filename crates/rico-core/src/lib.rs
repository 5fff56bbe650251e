//! # rico-core
//!
//! Tensor types and the container codec shared by every rico-hdl crate.
//!
//! - [`DataType`], [`Element`] - element types stored little-endian
//! - [`NdArray`] - one contiguous band
//! - [`Record`] - ordered band name to array mapping for one sample
//! - [`container`] - safetensors-compatible encode/decode of a record
//! - [`compression`] - optional shuffle + zstd frame around a container
//!
//! ## Crate Structure
//!
//! ```text
//! rico-core (this crate)
//!    ^
//!    |
//!    +-- rico-io (raster reading, discovery)
//!    +-- rico-convert (datasets, store, pipeline, verification)
//!    +-- rico-cli
//! ```
//!
//! Downstream readers only need [`container::decode`]; dataset band
//! tables live in `rico-convert`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod array;
pub mod compression;
pub mod container;
pub mod dtype;
pub mod error;
pub mod record;

pub use array::NdArray;
pub use compression::CompressionOptions;
pub use dtype::{DataType, Element};
pub use error::{CoreError, CoreResult};
pub use record::Record;
