//! TIFF / GeoTIFF band access.
//!
//! Reads a whole raster into memory and splits it into one [`NdArray`]
//! per band, each shaped `(height, width)`. Both chunky (interleaved) and
//! planar sample layouts are supported. Element types are kept as stored;
//! no scaling or conversion happens here.
//!
//! # Example
//!
//! ```rust,ignore
//! use rico_io::raster;
//!
//! let raster = raster::read_raster("S2A_..._B02.tif")?;
//! let b02 = raster.band(1)?;
//! assert_eq!(b02.shape(), &[120, 120]);
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::Path;

use rico_core::{DataType, Element, NdArray};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, TiffValue, colortype};
use tiff::tags::Tag;
use tracing::trace;

use crate::{IoError, IoResult};

/// GeoTIFF tags whose presence marks a raster as georeferenced.
const GEO_TAGS: [Tag; 3] = [
    Tag::ModelPixelScaleTag,
    Tag::ModelTiepointTag,
    Tag::ModelTransformationTag,
];

/// A decoded raster.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    bands: Vec<NdArray>,
    georeferenced: bool,
}

impl Raster {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bands (samples per pixel).
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// True if any GeoTIFF model tag is present.
    pub fn georeferenced(&self) -> bool {
        self.georeferenced
    }

    /// Band `index`, counted from 1 like GDAL.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::BandOutOfRange`] for 0 or indices past the last band.
    pub fn band(&self, index: usize) -> IoResult<&NdArray> {
        index
            .checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or(IoError::BandOutOfRange {
                index,
                count: self.bands.len(),
            })
    }

    /// Consumes the raster, returning its bands in file order.
    pub fn into_bands(self) -> Vec<NdArray> {
        self.bands
    }
}

/// Georeferencing written by [`write_raster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    /// Model coordinates of the upper-left pixel corner.
    pub origin: [f64; 2],
    /// Pixel size in model units.
    pub pixel_size: [f64; 2],
}

/// Reads every band of a TIFF file.
///
/// # Errors
///
/// Fails if the file cannot be opened or decoded, or if its sample type
/// has no [`DataType`] counterpart.
pub fn read_raster<P: AsRef<Path>>(path: P) -> IoResult<Raster> {
    let path = path.as_ref();
    let decode_err = |e: tiff::TiffError| IoError::DecodeError {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(decode_err)?;

    let (width, height) = decoder.dimensions().map_err(decode_err)?;
    let samples = match decoder.find_tag(Tag::SamplesPerPixel).map_err(decode_err)? {
        Some(value) => usize::from(value.into_u16().map_err(decode_err)?),
        None => 1,
    };
    // PlanarConfiguration 2 stores each band as its own plane.
    let planar = match decoder.find_tag(Tag::PlanarConfiguration).map_err(decode_err)? {
        Some(value) => value.into_u16().map_err(decode_err)? == 2,
        None => false,
    };
    let mut georeferenced = false;
    for tag in GEO_TAGS {
        georeferenced |= decoder.find_tag(tag).map_err(decode_err)?.is_some();
    }

    let layout = Layout {
        width: width as usize,
        height: height as usize,
        samples,
        planar,
    };
    let bands = match decoder.read_image().map_err(decode_err)? {
        DecodingResult::U8(buf) => layout.split(&buf),
        DecodingResult::U16(buf) => layout.split(&buf),
        DecodingResult::U32(buf) => layout.split(&buf),
        DecodingResult::U64(buf) => layout.split(&buf),
        DecodingResult::I8(buf) => layout.split(&buf),
        DecodingResult::I16(buf) => layout.split(&buf),
        DecodingResult::I32(buf) => layout.split(&buf),
        DecodingResult::I64(buf) => layout.split(&buf),
        DecodingResult::F32(buf) => layout.split(&buf),
        DecodingResult::F64(buf) => layout.split(&buf),
        #[allow(unreachable_patterns)]
        _ => None,
    }
    .ok_or_else(|| IoError::Unsupported {
        path: path.to_path_buf(),
        message: format!("sample type or layout ({samples} samples, planar: {planar})"),
    })?;

    trace!(path = %path.display(), width, height, samples, planar, georeferenced, "read raster");
    Ok(Raster {
        width,
        height,
        bands,
        georeferenced,
    })
}

struct Layout {
    width: usize,
    height: usize,
    samples: usize,
    planar: bool,
}

impl Layout {
    /// Splits the decoded buffer into bands, `None` if its size is off.
    fn split<T: Element>(&self, buf: &[T]) -> Option<Vec<NdArray>> {
        let pixels = self.width * self.height;
        if self.samples == 0 || buf.len() != pixels * self.samples {
            return None;
        }
        let shape = vec![self.height, self.width];
        (0..self.samples)
            .map(|b| {
                let values: Vec<T> = if self.planar {
                    buf[b * pixels..(b + 1) * pixels].to_vec()
                } else {
                    buf.iter().skip(b).step_by(self.samples).copied().collect()
                };
                NdArray::from_elements(shape.clone(), &values).ok()
            })
            .collect()
    }
}

/// Writes bands of equal shape and type as a chunky TIFF.
///
/// One band is written as grayscale of any supported type; three or four
/// `uint8`/`uint16` bands as RGB/RGBA. With `geo`, pixel scale and tie
/// point tags are added.
///
/// # Errors
///
/// Returns [`IoError::EncodeError`] for mixed or non 2-D bands and for
/// band count/type combinations TIFF cannot express.
pub fn write_raster<P: AsRef<Path>>(
    path: P,
    bands: &[NdArray],
    geo: Option<&GeoReference>,
) -> IoResult<()> {
    let first = bands
        .first()
        .ok_or_else(|| IoError::EncodeError("no bands to write".into()))?;
    let [height, width] = *first.shape() else {
        return Err(IoError::EncodeError(format!(
            "expected a 2-D band, got shape {:?}",
            first.shape()
        )));
    };
    if bands
        .iter()
        .any(|b| b.shape() != first.shape() || b.dtype() != first.dtype())
    {
        return Err(IoError::EncodeError("bands differ in shape or type".into()));
    }
    let width = u32::try_from(width).map_err(|e| IoError::EncodeError(e.to_string()))?;
    let height = u32::try_from(height).map_err(|e| IoError::EncodeError(e.to_string()))?;

    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file).map_err(encode_err)?;

    macro_rules! write_as {
        ($color:ty, $elem:ty) => {
            write_typed::<$color, _>(&mut encoder, width, height, &interleave::<$elem>(bands)?, geo)
        };
    }

    match (bands.len(), first.dtype()) {
        (1, DataType::UInt8) => write_as!(colortype::Gray8, u8),
        (1, DataType::UInt16) => write_as!(colortype::Gray16, u16),
        (1, DataType::UInt32) => write_as!(colortype::Gray32, u32),
        (1, DataType::UInt64) => write_as!(colortype::Gray64, u64),
        (1, DataType::Int8) => write_as!(colortype::GrayI8, i8),
        (1, DataType::Int16) => write_as!(colortype::GrayI16, i16),
        (1, DataType::Int32) => write_as!(colortype::GrayI32, i32),
        (1, DataType::Int64) => write_as!(colortype::GrayI64, i64),
        (1, DataType::Float32) => write_as!(colortype::Gray32Float, f32),
        (1, DataType::Float64) => write_as!(colortype::Gray64Float, f64),
        (3, DataType::UInt8) => write_as!(colortype::RGB8, u8),
        (3, DataType::UInt16) => write_as!(colortype::RGB16, u16),
        (4, DataType::UInt8) => write_as!(colortype::RGBA8, u8),
        (4, DataType::UInt16) => write_as!(colortype::RGBA16, u16),
        (n, dtype) => Err(IoError::EncodeError(format!(
            "cannot write {n} bands of {dtype}"
        ))),
    }
}

fn write_typed<C, W>(
    encoder: &mut TiffEncoder<W>,
    width: u32,
    height: u32,
    data: &[C::Inner],
    geo: Option<&GeoReference>,
) -> IoResult<()>
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder.new_image::<C>(width, height).map_err(encode_err)?;
    if let Some(geo) = geo {
        let scale = [geo.pixel_size[0], geo.pixel_size[1], 0.0];
        let tiepoint = [0.0, 0.0, 0.0, geo.origin[0], geo.origin[1], 0.0];
        let dir = image.encoder();
        dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])
            .map_err(encode_err)?;
        dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])
            .map_err(encode_err)?;
    }
    image.write_data(data).map_err(encode_err)
}

fn interleave<T: Element>(bands: &[NdArray]) -> IoResult<Vec<T>> {
    let planes = bands
        .iter()
        .map(|b| {
            b.to_vec::<T>()
                .ok_or_else(|| IoError::EncodeError(format!("band is not {}", T::DTYPE)))
        })
        .collect::<IoResult<Vec<_>>>()?;
    let pixels = planes.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(pixels * planes.len());
    for i in 0..pixels {
        out.extend(planes.iter().map(|p| p[i]));
    }
    Ok(out)
}

fn encode_err(e: tiff::TiffError) -> IoError {
    IoError::EncodeError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gray16_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("band.tif");
        let values: Vec<u16> = (0..12).map(|v| v * 1000).collect();
        let band = NdArray::from_elements(vec![3, 4], &values).unwrap();

        write_raster(&path, std::slice::from_ref(&band), None).unwrap();
        let raster = read_raster(&path).unwrap();

        assert_eq!((raster.width(), raster.height()), (4, 3));
        assert_eq!(raster.band_count(), 1);
        assert!(!raster.georeferenced());
        assert_eq!(raster.band(1).unwrap(), &band);
    }

    #[test]
    fn test_rgb_bands_split() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rgb.tif");
        let bands: Vec<NdArray> = [10u8, 20, 30]
            .iter()
            .map(|&v| NdArray::from_elements(vec![2, 2], &[v, v + 1, v + 2, v + 3]).unwrap())
            .collect();

        write_raster(&path, &bands, None).unwrap();
        let raster = read_raster(&path).unwrap();

        assert_eq!(raster.band_count(), 3);
        for (i, band) in bands.iter().enumerate() {
            assert_eq!(raster.band(i + 1).unwrap(), band);
        }
    }

    #[test]
    fn test_band_index_is_one_based() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("one.tif");
        let band = NdArray::from_elements(vec![1, 1], &[5.0f32]).unwrap();
        write_raster(&path, &[band], None).unwrap();

        let raster = read_raster(&path).unwrap();
        assert!(matches!(raster.band(0), Err(IoError::BandOutOfRange { index: 0, count: 1 })));
        assert!(matches!(raster.band(2), Err(IoError::BandOutOfRange { index: 2, count: 1 })));
    }

    #[test]
    fn test_georeference_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geo.tif");
        let band = NdArray::from_elements(vec![2, 2], &[1u16, 2, 3, 4]).unwrap();
        let geo = GeoReference {
            origin: [399960.0, 5000040.0],
            pixel_size: [10.0, 10.0],
        };
        write_raster(&path, &[band], Some(&geo)).unwrap();

        assert!(read_raster(&path).unwrap().georeferenced());
    }

    #[test]
    fn test_write_rejects_mixed_bands() {
        let dir = TempDir::new().unwrap();
        let a = NdArray::from_elements(vec![2, 2], &[0u8; 4]).unwrap();
        let b = NdArray::from_elements(vec![2, 2], &[0u16; 4]).unwrap();
        let err = write_raster(dir.path().join("x.tif"), &[a, b], None).unwrap_err();
        assert!(matches!(err, IoError::EncodeError(_)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_raster("/nonexistent/rico/band.tif"),
            Err(IoError::Io(_))
        ));
    }
}
