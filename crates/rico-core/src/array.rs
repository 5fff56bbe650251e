//! Owned n-dimensional arrays.
//!
//! [`NdArray`] is the unit stored per band: a [`DataType`], a row-major
//! shape and the raw little-endian element bytes. It carries no strides;
//! every array is contiguous.
//!
//! # Example
//!
//! ```rust
//! use rico_core::{DataType, NdArray};
//!
//! let arr = NdArray::from_elements(vec![2, 2], &[1u16, 2, 3, 4]).unwrap();
//! assert_eq!(arr.dtype(), DataType::UInt16);
//! assert_eq!(arr.to_vec::<u16>(), Some(vec![1, 2, 3, 4]));
//! ```

use crate::{CoreError, CoreResult, DataType, Element};

/// A contiguous, row-major array of one element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdArray {
    dtype: DataType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NdArray {
    /// Wraps little-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ShapeMismatch`] if `data.len()` is not
    /// `product(shape) * dtype.size()`.
    pub fn from_bytes(dtype: DataType, shape: Vec<usize>, data: Vec<u8>) -> CoreResult<Self> {
        let expected = byte_len(dtype, &shape);
        if expected != Some(data.len()) {
            return Err(CoreError::ShapeMismatch {
                shape,
                dtype: dtype.name(),
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            });
        }
        Ok(Self { dtype, shape, data })
    }

    /// Builds an array from typed elements.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ShapeMismatch`] if the element count does not
    /// match the shape.
    pub fn from_elements<T: Element>(shape: Vec<usize>, elements: &[T]) -> CoreResult<Self> {
        let mut data = vec![0u8; elements.len() * T::DTYPE.size()];
        T::write_le(elements, &mut data);
        Self::from_bytes(T::DTYPE, shape, data)
    }

    /// Element type.
    #[inline]
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Row-major shape.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Raw little-endian bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the array and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.dtype.size()
    }

    /// True if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies the elements out as `T`, or `None` if `T` is the wrong type.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        (T::DTYPE == self.dtype).then(|| decode::<T>(&self.data))
    }

    /// Widens every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self.dtype {
            DataType::UInt8 => widen::<u8>(&self.data),
            DataType::Int8 => widen::<i8>(&self.data),
            DataType::UInt16 => widen::<u16>(&self.data),
            DataType::Int16 => widen::<i16>(&self.data),
            DataType::UInt32 => widen::<u32>(&self.data),
            DataType::Int32 => widen::<i32>(&self.data),
            DataType::UInt64 => widen::<u64>(&self.data),
            DataType::Int64 => widen::<i64>(&self.data),
            DataType::Float32 => widen::<f32>(&self.data),
            DataType::Float64 => widen::<f64>(&self.data),
        }
    }

    /// Exact integer sum, or `None` for float arrays.
    pub fn integer_sum(&self) -> Option<i128> {
        fn sum<T: Element + Into<i128>>(data: &[u8]) -> i128 {
            decode::<T>(data).into_iter().map(Into::into).sum()
        }
        Some(match self.dtype {
            DataType::UInt8 => sum::<u8>(&self.data),
            DataType::Int8 => sum::<i8>(&self.data),
            DataType::UInt16 => sum::<u16>(&self.data),
            DataType::Int16 => sum::<i16>(&self.data),
            DataType::UInt32 => sum::<u32>(&self.data),
            DataType::Int32 => sum::<i32>(&self.data),
            DataType::UInt64 => sum::<u64>(&self.data),
            DataType::Int64 => sum::<i64>(&self.data),
            DataType::Float32 | DataType::Float64 => return None,
        })
    }
}

/// `product(shape) * size`, `None` on overflow.
pub(crate) fn byte_len(dtype: DataType, shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .and_then(|n| n.checked_mul(dtype.size()))
}

fn decode<T: Element>(data: &[u8]) -> Vec<T> {
    let mut out = vec![T::default(); data.len() / T::DTYPE.size()];
    T::read_le(data, &mut out);
    out
}

fn widen<T: Element>(data: &[u8]) -> Vec<f64> {
    decode::<T>(data).into_iter().map(Element::to_f64).collect()
}
