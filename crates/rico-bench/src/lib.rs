//! Benchmark inputs for rico-hdl.
//!
//! Run with: `cargo bench -p rico-bench`

use rico_core::{CoreResult, NdArray, Record};

/// Record shaped like a Sentinel-2 L2A patch: `bands` u16 bands of
/// `side x side` with smooth, compressible content.
pub fn synthetic_record(bands: usize, side: usize) -> CoreResult<Record> {
    let mut record = Record::with_capacity(bands);
    for b in 0..bands {
        let values: Vec<u16> = (0..side * side)
            .map(|i| {
                let (y, x) = (i / side, i % side);
                (1000 + b * 37 + (x * 7 + y * 3) % 512) as u16
            })
            .collect();
        let array = NdArray::from_elements(vec![side, side], &values)?;
        record.push(format!("B{b:02}"), array)?;
    }
    Ok(record)
}
