//! Element data types.
//!
//! Every array stores its elements as little-endian bytes. The [`Element`]
//! trait ties a Rust scalar to its [`DataType`] tag and handles the byte
//! order conversion, so containers are identical across hosts.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

/// Element type of an [`NdArray`](crate::NdArray).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    /// `u8`
    UInt8,
    /// `i8`
    Int8,
    /// `u16`
    UInt16,
    /// `i16`
    Int16,
    /// `u32`
    UInt32,
    /// `i32`
    Int32,
    /// `u64`
    UInt64,
    /// `i64`
    Int64,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
}

impl DataType {
    /// All supported types.
    pub const ALL: [DataType; 10] = [
        DataType::UInt8,
        DataType::Int8,
        DataType::UInt16,
        DataType::Int16,
        DataType::UInt32,
        DataType::Int32,
        DataType::UInt64,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
    ];

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 => 8,
        }
    }

    /// Tag written into container headers (safetensors naming).
    pub const fn tag(self) -> &'static str {
        match self {
            DataType::UInt8 => "U8",
            DataType::Int8 => "I8",
            DataType::UInt16 => "U16",
            DataType::Int16 => "I16",
            DataType::UInt32 => "U32",
            DataType::Int32 => "I32",
            DataType::UInt64 => "U64",
            DataType::Int64 => "I64",
            DataType::Float32 => "F32",
            DataType::Float64 => "F64",
        }
    }

    /// Parses a header tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dtype| dtype.tag() == tag)
    }

    /// Human readable name (numpy naming).
    pub const fn name(self) -> &'static str {
        match self {
            DataType::UInt8 => "uint8",
            DataType::Int8 => "int8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::UInt32 => "uint32",
            DataType::Int32 => "int32",
            DataType::UInt64 => "uint64",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// True for the two floating point types.
    pub const fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar that can live inside an [`NdArray`](crate::NdArray).
pub trait Element: Copy + Default + Send + Sync + 'static {
    /// Matching type tag.
    const DTYPE: DataType;

    /// Writes `src` into `dst` as little-endian bytes.
    ///
    /// `dst.len()` must equal `src.len() * Self::DTYPE.size()`.
    fn write_le(src: &[Self], dst: &mut [u8]);

    /// Reads little-endian bytes back into `dst`.
    fn read_le(src: &[u8], dst: &mut [Self]);

    /// Lossy widening used for summary statistics.
    fn to_f64(self) -> f64;
}

impl Element for u8 {
    const DTYPE: DataType = DataType::UInt8;

    fn write_le(src: &[Self], dst: &mut [u8]) {
        dst.copy_from_slice(src);
    }

    fn read_le(src: &[u8], dst: &mut [Self]) {
        dst.copy_from_slice(src);
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for i8 {
    const DTYPE: DataType = DataType::Int8;

    fn write_le(src: &[Self], dst: &mut [u8]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s.to_le_bytes()[0];
        }
    }

    fn read_le(src: &[u8], dst: &mut [Self]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = i8::from_le_bytes([*s]);
        }
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $write:ident, $read:ident) => {
        impl Element for $ty {
            const DTYPE: DataType = $dtype;

            fn write_le(src: &[Self], dst: &mut [u8]) {
                LittleEndian::$write(src, dst);
            }

            fn read_le(src: &[u8], dst: &mut [Self]) {
                LittleEndian::$read(src, dst);
            }

            #[allow(clippy::cast_precision_loss)]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_element!(u16, DataType::UInt16, write_u16_into, read_u16_into);
impl_element!(i16, DataType::Int16, write_i16_into, read_i16_into);
impl_element!(u32, DataType::UInt32, write_u32_into, read_u32_into);
impl_element!(i32, DataType::Int32, write_i32_into, read_i32_into);
impl_element!(u64, DataType::UInt64, write_u64_into, read_u64_into);
impl_element!(i64, DataType::Int64, write_i64_into, read_i64_into);
impl_element!(f32, DataType::Float32, write_f32_into, read_f32_into);
impl_element!(f64, DataType::Float64, write_f64_into, read_f64_into);
