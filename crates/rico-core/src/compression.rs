//! Whole-container compression transform.
//!
//! A byte shuffle groups the n-th byte of every element together, then
//! zstd compresses the result. The frame is:
//!
//! ```text
//! b"RICOZSTD" | u8 element size | u64 LE decoded length | zstd stream
//! ```
//!
//! The transform is opaque to the container header; [`decompress`] must
//! run before the header is parsed.

use byteorder::{ByteOrder, LittleEndian};

use crate::{CoreError, CoreResult};

/// Frame magic.
pub const MAGIC: &[u8; 8] = b"RICOZSTD";

const FRAME_HEADER_LEN: usize = MAGIC.len() + 1 + 8;

/// Largest decoded length a frame may declare (4 GiB).
pub const MAX_DECODED_LEN: u64 = 1 << 32;

/// Compression settings.
///
/// ```rust
/// use rico_core::CompressionOptions;
///
/// let opts = CompressionOptions::default().with_level(3);
/// assert_eq!(opts.element_size, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionOptions {
    /// zstd level.
    pub level: i32,
    /// Shuffle stride in bytes. 1 disables the shuffle.
    pub element_size: u8,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            level: 9,
            element_size: 2,
        }
    }
}

impl CompressionOptions {
    /// Sets the zstd level.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Sets the shuffle stride. Zero is treated as 1.
    pub fn with_element_size(mut self, element_size: u8) -> Self {
        self.element_size = element_size.max(1);
        self
    }
}

/// True if `data` starts with the compression frame magic.
pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(MAGIC)
}

/// Shuffles and compresses `data` into a framed buffer.
///
/// # Errors
///
/// Returns [`CoreError::Compression`] if zstd rejects the level.
pub fn compress(data: &[u8], opts: &CompressionOptions) -> CoreResult<Vec<u8>> {
    let element_size = opts.element_size.max(1);
    let shuffled = shuffle(data, usize::from(element_size));
    let body = zstd::bulk::compress(&shuffled, opts.level)?;

    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.push(element_size);
    let mut len = [0u8; 8];
    LittleEndian::write_u64(&mut len, data.len() as u64);
    out.extend_from_slice(&len);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Reverses [`compress`].
///
/// # Errors
///
/// Returns [`CoreError::CorruptContainer`] if the frame is truncated or
/// declares more than [`MAX_DECODED_LEN`] bytes, if the zstd stream is
/// damaged, or if the decoded length disagrees with the frame.
pub fn decompress(data: &[u8]) -> CoreResult<Vec<u8>> {
    if data.len() < FRAME_HEADER_LEN || !is_compressed(data) {
        return Err(CoreError::corrupt("truncated compression frame"));
    }
    let element_size = usize::from(data[MAGIC.len()]);
    if element_size == 0 {
        return Err(CoreError::corrupt("compression frame has zero element size"));
    }
    let expected = LittleEndian::read_u64(&data[MAGIC.len() + 1..FRAME_HEADER_LEN]);
    let capacity = usize::try_from(expected)
        .ok()
        .filter(|_| expected <= MAX_DECODED_LEN)
        .ok_or_else(|| {
            CoreError::corrupt(format!("compression frame declares {expected} bytes"))
        })?;

    // Output beyond `capacity` is an error, not a reallocation.
    let shuffled = zstd::bulk::decompress(&data[FRAME_HEADER_LEN..], capacity)
        .map_err(|e| CoreError::corrupt(format!("zstd: {e}")))?;
    if shuffled.len() as u64 != expected {
        return Err(CoreError::corrupt(format!(
            "decompressed {} bytes, frame says {expected}",
            shuffled.len()
        )));
    }
    Ok(unshuffle(&shuffled, element_size))
}

/// Byte shuffle over the largest prefix divisible by `element_size`.
fn shuffle(data: &[u8], element_size: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    if element_size <= 1 {
        return out;
    }
    let count = data.len() / element_size;
    for i in 0..count {
        let offset = i * element_size;
        for byte_index in 0..element_size {
            out[byte_index * count + i] = data[offset + byte_index];
        }
    }
    out
}

fn unshuffle(data: &[u8], element_size: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    if element_size <= 1 {
        return out;
    }
    let count = data.len() / element_size;
    for byte_index in 0..element_size {
        let offset = byte_index * count;
        for i in 0..count {
            out[i * element_size + byte_index] = data[offset + i];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffle_layout() {
        let data = [1u8, 2, 3, 4, 5, 6, 7];
        let shuffled = shuffle(&data, 2);
        // Trailing byte stays in place.
        assert_eq!(shuffled, [1, 3, 5, 2, 4, 6, 7]);
        assert_eq!(unshuffle(&shuffled, 2), data);
    }

    #[test]
    fn test_shuffle_wide_elements() {
        let data: Vec<u8> = (0..40).collect();
        for size in [1, 3, 4, 8] {
            assert_eq!(unshuffle(&shuffle(&data, size), size), data);
        }
    }

    #[test]
    fn test_frame() {
        let data = vec![0u8; 1000];
        let packed = compress(&data, &CompressionOptions::default()).unwrap();
        assert!(is_compressed(&packed));
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_damaged_frame() {
        let packed = compress(&[7u8; 64], &CompressionOptions::default()).unwrap();

        assert!(matches!(
            decompress(&packed[..10]),
            Err(CoreError::CorruptContainer { .. })
        ));

        let mut wrong_len = packed.clone();
        wrong_len[MAGIC.len() + 1] ^= 0xFF;
        assert!(matches!(
            decompress(&wrong_len),
            Err(CoreError::CorruptContainer { .. })
        ));

        let mut short_len = packed.clone();
        short_len[MAGIC.len() + 1..FRAME_HEADER_LEN].copy_from_slice(&16u64.to_le_bytes());
        assert!(matches!(
            decompress(&short_len),
            Err(CoreError::CorruptContainer { .. })
        ));

        let mut garbage = packed[..FRAME_HEADER_LEN].to_vec();
        garbage.extend_from_slice(b"not zstd at all");
        assert!(matches!(
            decompress(&garbage),
            Err(CoreError::CorruptContainer { .. })
        ));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut packed = compress(&[7u8; 64], &CompressionOptions::default()).unwrap();
        for declared in [MAX_DECODED_LEN + 1, u64::MAX] {
            packed[MAGIC.len() + 1..FRAME_HEADER_LEN].copy_from_slice(&declared.to_le_bytes());
            let err = decompress(&packed).unwrap_err();
            assert!(
                matches!(&err, CoreError::CorruptContainer { reason } if reason.contains("declares")),
                "{err}"
            );
        }
    }
}
