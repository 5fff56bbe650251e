//! Synthetic dataset trees written as real GeoTIFFs.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use rico_convert::dataset::{S2_L2A_BANDS, UC_MERCED_BANDS};
use rico_core::NdArray;
use rico_io::{GeoReference, write_raster};
use sha2::{Digest, Sha256};

/// Georeference attached to every fixture band.
pub const GEO: GeoReference = GeoReference {
    origin: [399_960.0, 5_900_040.0],
    pixel_size: [10.0, 10.0],
};

/// `height x width` u16 ramp offset by `seed`.
pub fn u16_band(height: usize, width: usize, seed: u16) -> NdArray {
    let values: Vec<u16> = (0..height * width)
        .map(|i| seed.wrapping_mul(31).wrapping_add(i as u16))
        .collect();
    NdArray::from_elements(vec![height, width], &values).unwrap()
}

/// `height x width` u8 ramp offset by `seed`.
pub fn u8_band(height: usize, width: usize, seed: u8) -> NdArray {
    let values: Vec<u8> = (0..height * width)
        .map(|i| seed.wrapping_mul(17).wrapping_add(i as u8))
        .collect();
    NdArray::from_elements(vec![height, width], &values).unwrap()
}

/// Writes one georeferenced single-band TIFF, creating parent directories.
pub fn write_band(path: &Path, band: &NdArray) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    write_raster(path, std::slice::from_ref(band), Some(&GEO)).unwrap();
}

/// Writes a multi-band TIFF.
pub fn write_bands(path: &Path, bands: &[NdArray], geo: Option<&GeoReference>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    write_raster(path, bands, geo).unwrap();
}

/// BigEarthNet-S1 patch: `<root>/tile/<name>/<name>_{VH,VV}.tif`.
pub fn bigearthnet_s1_patch(root: &Path, name: &str, seed: u16) -> PathBuf {
    bigearthnet_s1_patch_in(root, "tile", name, seed)
}

/// BigEarthNet-S1 patch under a chosen tile directory.
pub fn bigearthnet_s1_patch_in(root: &Path, tile: &str, name: &str, seed: u16) -> PathBuf {
    let dir = root.join(tile).join(name);
    for (i, band) in ["VH", "VV"].iter().enumerate() {
        write_band(&dir.join(format!("{name}_{band}.tif")), &u16_band(4, 4, seed + i as u16));
    }
    dir
}

/// BigEarthNet-S2 patch with the 12 L2A bands, all 4x4.
pub fn bigearthnet_s2_patch(root: &Path, name: &str, seed: u16) -> PathBuf {
    let dir = root.join("tile").join(name);
    for (i, band) in S2_L2A_BANDS.iter().enumerate() {
        write_band(&dir.join(format!("{name}_{band}.tif")), &u16_band(4, 4, seed + i as u16));
    }
    dir
}

/// UC Merced image: `<root>/<class>/<class><nn>.tif`, RGB8 without georeference.
pub fn uc_merced_image(root: &Path, class: &str, index: u8) -> PathBuf {
    let path = root.join(class).join(format!("{class}{index:02}.tif"));
    let bands: Vec<NdArray> = (0..UC_MERCED_BANDS.len() as u8)
        .map(|b| u8_band(8, 8, index * 3 + b))
        .collect();
    write_bands(&path, &bands, None);
    path
}

/// Hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> String {
    let mut file = fs::File::open(path).unwrap();
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    Sha256::digest(&buf)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
