//! Self-describing serialized form of a [`Record`].
//!
//! The layout is safetensors-compatible:
//!
//! ```text
//! u64 LE header length N | N bytes JSON header | payload
//! ```
//!
//! The header is a JSON object with one entry per band, in record order:
//!
//! ```json
//! {"B02":{"dtype":"U16","shape":[120,120],"data_offsets":[0,28800]}, ...}
//! ```
//!
//! It is padded with spaces to a multiple of 8 bytes. Payload slices are
//! contiguous and appear in header order. An `__metadata__` entry is
//! tolerated on decode and ignored.
//!
//! Encoding is a pure function of the record: equal records give equal
//! bytes.
//!
//! # Example
//!
//! ```rust
//! use rico_core::{container, NdArray, Record};
//!
//! let mut rec = Record::new();
//! rec.push("A", NdArray::from_elements(vec![2, 2], &[1u16, 2, 3, 4]).unwrap()).unwrap();
//!
//! let bytes = container::encode(&rec);
//! assert_eq!(container::decode(&bytes).unwrap(), rec);
//! ```

use byteorder::{ByteOrder, LittleEndian};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::array::byte_len;
use crate::compression::{self, CompressionOptions};
use crate::{CoreError, CoreResult, DataType, NdArray, Record};

/// Upper bound on the JSON header size.
pub const MAX_HEADER_LEN: usize = 100_000_000;

const METADATA_KEY: &str = "__metadata__";

#[derive(Debug, Deserialize)]
struct TensorInfo {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

/// Encodes `record` without compression.
pub fn encode(record: &Record) -> Vec<u8> {
    let mut header = Map::new();
    let mut offset = 0usize;
    for (name, array) in record.iter() {
        let end = offset + array.as_bytes().len();
        let info = TensorInfo {
            dtype: array.dtype().tag().to_owned(),
            shape: array.shape().to_vec(),
            data_offsets: [offset, end],
        };
        header.insert(name.to_owned(), tensor_info_value(info));
        offset = end;
    }

    let mut json = Value::Object(header).to_string().into_bytes();
    let padded = json.len().next_multiple_of(8);
    json.resize(padded, b' ');

    let mut out = Vec::with_capacity(8 + json.len() + offset);
    let mut len = [0u8; 8];
    LittleEndian::write_u64(&mut len, json.len() as u64);
    out.extend_from_slice(&len);
    out.extend_from_slice(&json);
    for (_, array) in record.iter() {
        out.extend_from_slice(array.as_bytes());
    }
    out
}

/// Encodes `record`, optionally wrapping it in the compression frame.
///
/// # Errors
///
/// Returns [`CoreError::Compression`] if the compressor fails.
pub fn encode_with(record: &Record, compression: Option<&CompressionOptions>) -> CoreResult<Vec<u8>> {
    let plain = encode(record);
    match compression {
        Some(opts) => compression::compress(&plain, opts),
        None => Ok(plain),
    }
}

/// Decodes container bytes, undoing compression first if present.
///
/// # Errors
///
/// Returns [`CoreError::CorruptContainer`] for truncated buffers, malformed
/// headers, unknown dtype tags or offsets that do not tile the payload.
pub fn decode(data: &[u8]) -> CoreResult<Record> {
    if compression::is_compressed(data) {
        let plain = compression::decompress(data)?;
        return decode_plain(&plain);
    }
    decode_plain(data)
}

fn decode_plain(data: &[u8]) -> CoreResult<Record> {
    if data.len() < 8 {
        return Err(CoreError::corrupt(format!(
            "buffer of {} bytes is shorter than the length prefix",
            data.len()
        )));
    }
    let header_len = LittleEndian::read_u64(&data[..8]);
    let header_len = usize::try_from(header_len)
        .ok()
        .filter(|&n| n <= MAX_HEADER_LEN)
        .ok_or_else(|| CoreError::corrupt(format!("header length {header_len} too large")))?;
    let header_end = 8usize
        .checked_add(header_len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            CoreError::corrupt(format!(
                "header length {header_len} exceeds buffer of {} bytes",
                data.len()
            ))
        })?;

    let header = std::str::from_utf8(&data[8..header_end])
        .map_err(|e| CoreError::corrupt(format!("header is not utf-8: {e}")))?;
    let header: Map<String, Value> = serde_json::from_str(header)
        .map_err(|e| CoreError::corrupt(format!("header is not a json object: {e}")))?;
    let payload = &data[header_end..];

    let mut record = Record::with_capacity(header.len());
    let mut cursor = 0usize;
    for (name, value) in header {
        if name == METADATA_KEY {
            continue;
        }
        let info: TensorInfo = serde_json::from_value(value)
            .map_err(|e| CoreError::corrupt(format!("band {name}: {e}")))?;
        let dtype = DataType::from_tag(&info.dtype)
            .ok_or_else(|| CoreError::corrupt(format!("band {name}: unknown dtype {}", info.dtype)))?;

        let [begin, end] = info.data_offsets;
        if begin != cursor || end < begin {
            return Err(CoreError::corrupt(format!(
                "band {name}: offsets [{begin}, {end}] are not contiguous at {cursor}"
            )));
        }
        if byte_len(dtype, &info.shape) != Some(end - begin) {
            return Err(CoreError::corrupt(format!(
                "band {name}: {} bytes do not fit shape {:?} of {dtype}",
                end - begin,
                info.shape
            )));
        }
        let bytes = payload.get(begin..end).ok_or_else(|| {
            CoreError::corrupt(format!(
                "band {name}: offsets [{begin}, {end}] exceed payload of {} bytes",
                payload.len()
            ))
        })?;

        let array = NdArray::from_bytes(dtype, info.shape, bytes.to_vec())?;
        record
            .push(name, array)
            .map_err(|e| CoreError::corrupt(e.to_string()))?;
        cursor = end;
    }

    if cursor != payload.len() {
        return Err(CoreError::corrupt(format!(
            "payload has {} bytes, header covers {cursor}",
            payload.len()
        )));
    }
    Ok(record)
}

fn tensor_info_value(info: TensorInfo) -> Value {
    let mut map = Map::new();
    map.insert("dtype".into(), Value::from(info.dtype));
    map.insert(
        "shape".into(),
        Value::from(info.shape.into_iter().map(|d| d as u64).collect::<Vec<_>>()),
    );
    map.insert(
        "data_offsets".into(),
        Value::from(vec![info.data_offsets[0] as u64, info.data_offsets[1] as u64]),
    );
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut rec = Record::new();
        rec.push("B", NdArray::from_elements(vec![2, 3], &[1u16, 2, 3, 4, 5, 6]).unwrap())
            .unwrap();
        rec.push("A", NdArray::from_elements(vec![1, 2], &[-1.5f32, 8.0]).unwrap())
            .unwrap();
        rec
    }

    fn header_of(bytes: &[u8]) -> &str {
        let n = LittleEndian::read_u64(&bytes[..8]) as usize;
        std::str::from_utf8(&bytes[8..8 + n]).unwrap()
    }

    #[test]
    fn test_roundtrip_keeps_order() {
        let rec = sample();
        let back = decode(&encode(&rec)).unwrap();
        assert_eq!(back.names().collect::<Vec<_>>(), ["B", "A"]);
        assert_eq!(back, rec);
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample());
        let header = header_of(&bytes);
        assert_eq!(header.len() % 8, 0);
        assert!(header.starts_with(
            r#"{"B":{"dtype":"U16","shape":[2,3],"data_offsets":[0,12]},"A":{"dtype":"F32","shape":[1,2],"data_offsets":[12,20]}}"#
        ));
        assert_eq!(bytes.len(), 8 + header.len() + 20);
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode(&sample()), encode(&sample()));
    }

    #[test]
    fn test_empty_record() {
        let rec = Record::new();
        assert_eq!(decode(&encode(&rec)).unwrap(), rec);
    }

    #[test]
    fn test_metadata_ignored() {
        let json = br#"{"__metadata__":{"k":"v"},"X":{"dtype":"U8","shape":[2],"data_offsets":[0,2]}}"#;
        let mut bytes = (json.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(json);
        bytes.extend_from_slice(&[9, 10]);
        let rec = decode(&bytes).unwrap();
        assert_eq!(rec.names().collect::<Vec<_>>(), ["X"]);
    }

    #[test]
    fn test_rejects_corruption() {
        let good = encode(&sample());

        let cases: Vec<Vec<u8>> = vec![
            good[..4].to_vec(),
            // Truncated payload.
            good[..good.len() - 1].to_vec(),
            // Extra payload.
            [good.as_slice(), &[0]].concat(),
            // Header length past the end.
            {
                let mut b = good.clone();
                b[..8].copy_from_slice(&u64::MAX.to_le_bytes());
                b
            },
            // Not json.
            {
                let mut b = good.clone();
                b[8] = b'#';
                b
            },
        ];
        for bad in cases {
            assert!(
                matches!(decode(&bad), Err(CoreError::CorruptContainer { .. })),
                "accepted {} bytes",
                bad.len()
            );
        }
    }

    #[test]
    fn test_rejects_bad_entries() {
        for json in [
            r#"{"X":{"dtype":"BF16","shape":[1],"data_offsets":[0,2]}}"#,
            r#"{"X":{"dtype":"U8","shape":[3],"data_offsets":[0,2]}}"#,
            r#"{"X":{"dtype":"U8","shape":[1],"data_offsets":[1,2]}}"#,
            r#"{"X":{"dtype":"U8","shape":[1]}}"#,
        ] {
            let mut bytes = (json.len() as u64).to_le_bytes().to_vec();
            bytes.extend_from_slice(json.as_bytes());
            bytes.extend_from_slice(&[0, 0]);
            assert!(
                matches!(decode(&bytes), Err(CoreError::CorruptContainer { .. })),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn test_compressed_roundtrip() {
        let mut rec = Record::new();
        let values: Vec<u16> = (0..4096).map(|i| (i % 64) as u16).collect();
        rec.push("VV", NdArray::from_elements(vec![64, 64], &values).unwrap())
            .unwrap();

        let plain = encode_with(&rec, None).unwrap();
        let packed = encode_with(&rec, Some(&CompressionOptions::default())).unwrap();
        assert!(packed.len() < plain.len());
        assert_eq!(decode(&packed).unwrap(), decode(&plain).unwrap());
    }
}
