//! # rico-io
//!
//! Filesystem boundary of rico-hdl.
//!
//! - [`raster`] - decode TIFF/GeoTIFF files into per-band [`rico_core::NdArray`]s
//! - [`discover`] - find sample files or directories by file-name regex
//!
//! Discovery results are unordered; the conversion pipeline sorts them.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod discover;
pub mod error;
pub mod raster;

pub use discover::{DiscoveryRule, EntryKind, discover};
pub use error::{IoError, IoResult};
pub use raster::{GeoReference, Raster, read_raster, write_raster};
