//! Dataset variants and band extraction.
//!
//! Every supported dataset is a [`Dataset`] variant that fixes three
//! things: how samples are discovered, how their keys are derived and
//! which bands are read from where ([`BandSpec`]). The band order of a
//! [`BandSpec`] is the order of the encoded record, independent of the
//! order files appear on disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use rico_convert::Dataset;
//!
//! let strategy = Dataset::BigEarthNetS1.strategy();
//! let record = strategy.extract(Path::new("/ben/S1A_IW_GRDH_..._70_48"))?;
//! assert_eq!(record.names().collect::<Vec<_>>(), ["VH", "VV"]);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use rico_core::Record;
use rico_io::{DiscoveryRule, Raster, read_raster};
use tracing::{trace, warn};

use crate::{ConvertError, ConvertResult, KeyRule, SampleKey};

/// BigEarthNet-S1 polarisations.
pub const BIGEARTHNET_S1_BANDS: [&str; 2] = ["VH", "VV"];

/// Sentinel-2 L2A order used by BigEarthNet-S2 and Major-TOM-Core: 10 m,
/// then 20 m, then 60 m bands.
pub const S2_L2A_BANDS: [&str; 12] = [
    "B02", "B03", "B04", "B08", "B05", "B06", "B07", "B8A", "B11", "B12", "B01", "B09",
];

/// Major-TOM-Core S1 RTC polarisations.
pub const MAJOR_TOM_S1_BANDS: [&str; 2] = ["vv", "vh"];

/// SSL4EO-S12 S1 polarisations.
pub const SSL4EO_S1_BANDS: [&str; 2] = ["VV", "VH"];

/// SSL4EO-S12 S2 L1C bands.
pub const SSL4EO_S2_L1C_BANDS: [&str; 13] = [
    "B2", "B3", "B4", "B8", "B5", "B6", "B7", "B8A", "B11", "B12", "B1", "B9", "B10",
];

/// SSL4EO-S12 S2 L2A bands (no cirrus band).
pub const SSL4EO_S2_L2A_BANDS: [&str; 12] = [
    "B2", "B3", "B4", "B8", "B5", "B6", "B7", "B8A", "B11", "B12", "B1", "B9",
];

/// HySpecNet-11k spectral band count.
pub const HYSPECNET_BAND_COUNT: usize = 224;

/// UC Merced RGB channels.
pub const UC_MERCED_BANDS: [&str; 3] = ["Red", "Green", "Blue"];

/// Hydro band order as stored in each patch.
pub const HYDRO_BANDS: [&str; 12] = [
    "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A", "B09", "B11", "B12",
];

/// EuroSAT multi-spectral band order as stored in each image.
pub const EUROSAT_MS_BANDS: [&str; 13] = [
    "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B09", "B10", "B11", "B12", "B08A",
];

/// Which file a band is read from, relative to the sample path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFile {
    /// The sample path itself is the raster.
    Sample,
    /// `<sample>/<name>`
    Named(String),
    /// `<sample>/<sample stem><suffix>`
    StemSuffixed(String),
}

impl SourceFile {
    /// Resolves the raster path for `sample`.
    pub fn resolve(&self, sample: &Path) -> ConvertResult<PathBuf> {
        match self {
            SourceFile::Sample => Ok(sample.to_path_buf()),
            SourceFile::Named(name) => Ok(sample.join(name)),
            SourceFile::StemSuffixed(suffix) => {
                let stem = sample
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .ok_or_else(|| ConvertError::InvalidSamplePath(sample.to_path_buf()))?;
                Ok(sample.join(format!("{stem}{suffix}")))
            }
        }
    }
}

/// Location of one band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Raster holding the band.
    pub file: SourceFile,
    /// 1-based band index inside `file`.
    pub band_index: usize,
    /// Whether `file` is expected to carry GeoTIFF tags.
    pub georeferenced: bool,
}

impl SourceDescriptor {
    /// First band of a dedicated, georeferenced file.
    pub fn file(file: SourceFile) -> Self {
        Self {
            file,
            band_index: 1,
            georeferenced: true,
        }
    }

    /// Band `band_index` of the sample raster itself.
    pub fn sample_band(band_index: usize) -> Self {
        Self {
            file: SourceFile::Sample,
            band_index,
            georeferenced: true,
        }
    }
}

/// Ordered band names and their sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandSpec {
    bands: Vec<(String, SourceDescriptor)>,
}

impl BandSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a band.
    pub fn band(mut self, name: impl Into<String>, source: SourceDescriptor) -> Self {
        self.bands.push((name.into(), source));
        self
    }

    /// One dedicated file per band, located by `file(name)`.
    pub fn file_per_band<S: AsRef<str>>(names: &[S], file: impl Fn(&str) -> SourceFile) -> Self {
        names.iter().fold(Self::new(), |spec, name| {
            let name = name.as_ref();
            spec.band(name, SourceDescriptor::file(file(name)))
        })
    }

    /// Bands `1..=names.len()` of the sample raster.
    pub fn multi_band<S: AsRef<str>>(names: &[S]) -> Self {
        names.iter().enumerate().fold(Self::new(), |spec, (i, name)| {
            spec.band(name.as_ref(), SourceDescriptor::sample_band(i + 1))
        })
    }

    /// Marks every source as lacking georeferencing, silencing the warning.
    pub fn not_georeferenced(mut self) -> Self {
        for (_, source) in &mut self.bands {
            source.georeferenced = false;
        }
        self
    }

    /// Band names in record order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, source)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceDescriptor)> {
        self.bands.iter().map(|(n, s)| (n.as_str(), s))
    }

    /// Number of bands.
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// True if no bands are listed.
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Reads every band of `sample` into a record in band-table order.
    ///
    /// Consecutive bands from the same raster reuse one decode.
    ///
    /// # Errors
    ///
    /// - [`ConvertError::MissingSourceFile`] if a raster does not exist
    /// - [`ConvertError::IncompleteBandSet`] if a raster has too few bands
    /// - [`ConvertError::Raster`] if a raster cannot be decoded
    pub fn extract(&self, sample: &Path) -> ConvertResult<Record> {
        let mut record = Record::with_capacity(self.bands.len());
        let mut cached: Option<(PathBuf, Raster)> = None;

        for (name, source) in &self.bands {
            let path = source.file.resolve(sample)?;
            let raster = match cached.take() {
                Some((cached_path, raster)) if cached_path == path => raster,
                _ => open_source(&path, sample, source.georeferenced)?,
            };

            if source.band_index == 0 || source.band_index > raster.band_count() {
                return Err(ConvertError::IncompleteBandSet {
                    expected: self.bands_needed(&source.file),
                    found: raster.band_count(),
                    path,
                    sample: sample.to_path_buf(),
                });
            }
            record.push(name.as_str(), raster.band(source.band_index)?.clone())?;
            cached = Some((path, raster));
        }
        Ok(record)
    }

    /// Highest band index read from `file`.
    fn bands_needed(&self, file: &SourceFile) -> usize {
        self.bands
            .iter()
            .filter(|(_, s)| &s.file == file)
            .map(|(_, s)| s.band_index)
            .max()
            .unwrap_or(0)
    }
}

fn open_source(path: &Path, sample: &Path, georeferenced: bool) -> ConvertResult<Raster> {
    if !path.is_file() {
        return Err(ConvertError::MissingSourceFile {
            path: path.to_path_buf(),
            sample: sample.to_path_buf(),
        });
    }
    let raster = read_raster(path)?;
    if !raster.georeferenced() {
        if georeferenced {
            warn!(path = %path.display(), "raster has no georeference");
        } else {
            trace!(path = %path.display(), "raster has no georeference (expected)");
        }
    }
    Ok(raster)
}

/// Supported datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// BigEarthNet v2 Sentinel-1 patches.
    BigEarthNetS1,
    /// BigEarthNet v2 Sentinel-2 patches.
    BigEarthNetS2,
    /// HySpecNet-11k EnMAP patches.
    HySpecNet11k,
    /// Major-TOM-Core S1 RTC products.
    MajorTomCoreS1,
    /// Major-TOM-Core S2 L2A products.
    MajorTomCoreS2,
    /// SSL4EO-S12 Sentinel-1 GRD.
    Ssl4eoS12S1,
    /// SSL4EO-S12 Sentinel-2 L1C.
    Ssl4eoS12S2L1c,
    /// SSL4EO-S12 Sentinel-2 L2A.
    Ssl4eoS12S2L2a,
    /// UC Merced Land Use (RGB, no georeference).
    UcMerced,
    /// Hydro Sentinel-2 patches.
    Hydro,
    /// EuroSAT multi-spectral.
    EurosatMs,
}

impl Dataset {
    /// All variants.
    pub const ALL: [Dataset; 11] = [
        Dataset::BigEarthNetS1,
        Dataset::BigEarthNetS2,
        Dataset::HySpecNet11k,
        Dataset::MajorTomCoreS1,
        Dataset::MajorTomCoreS2,
        Dataset::Ssl4eoS12S1,
        Dataset::Ssl4eoS12S2L1c,
        Dataset::Ssl4eoS12S2L2a,
        Dataset::UcMerced,
        Dataset::Hydro,
        Dataset::EurosatMs,
    ];

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Dataset::BigEarthNetS1 => "BigEarthNet-S1",
            Dataset::BigEarthNetS2 => "BigEarthNet-S2",
            Dataset::HySpecNet11k => "HySpecNet-11k",
            Dataset::MajorTomCoreS1 => "Major-TOM-Core-S1",
            Dataset::MajorTomCoreS2 => "Major-TOM-Core-S2",
            Dataset::Ssl4eoS12S1 => "SSL4EO-S12-S1",
            Dataset::Ssl4eoS12S2L1c => "SSL4EO-S12-S2-L1C",
            Dataset::Ssl4eoS12S2L2a => "SSL4EO-S12-S2-L2A",
            Dataset::UcMerced => "UC-Merced",
            Dataset::Hydro => "Hydro",
            Dataset::EurosatMs => "EuroSAT-MS",
        }
    }

    /// How samples are found under a dataset root.
    pub fn discovery_rule(self) -> DiscoveryRule {
        const SSL4EO_S2: &str = r"^\d{8}T\d{6}_\d{8}T\d{6}_T\w{5}$";
        match self {
            Dataset::BigEarthNetS1 => DiscoveryRule::directories(r"S1[AB]_IW_GRDH_.*_\d+_\d+$"),
            Dataset::BigEarthNetS2 => DiscoveryRule::directories(r"S2[AB]_MSIL2A_.*_\d+_\d+$"),
            Dataset::HySpecNet11k => DiscoveryRule::directories(r"ENMAP.*?_L2A.*-Y\d+_X\d+$"),
            Dataset::MajorTomCoreS1 => DiscoveryRule::directories(r"S1[AB]_IW_GRDH_.*_rtc$"),
            Dataset::MajorTomCoreS2 => DiscoveryRule::directories(r"S2[AB]_MSIL2A_.*$"),
            Dataset::Ssl4eoS12S1 => {
                DiscoveryRule::directories(r"S1[AB]_IW_GRDH_.*$").with_depth(2)
            }
            Dataset::Ssl4eoS12S2L1c | Dataset::Ssl4eoS12S2L2a => {
                DiscoveryRule::directories(SSL4EO_S2).with_depth(2)
            }
            Dataset::UcMerced => DiscoveryRule::files(r"^[a-z]+\d{2}\.tif$"),
            Dataset::Hydro => DiscoveryRule::files(r"^patch_\d+\.tif$"),
            Dataset::EurosatMs => DiscoveryRule::files(r"^[A-Za-z]+_\d+\.tif$"),
        }
    }

    /// How keys are derived from sample paths.
    pub const fn key_rule(self) -> KeyRule {
        match self {
            Dataset::BigEarthNetS1
            | Dataset::BigEarthNetS2
            | Dataset::HySpecNet11k
            | Dataset::UcMerced
            | Dataset::Hydro
            | Dataset::EurosatMs => KeyRule::LastComponent,
            Dataset::MajorTomCoreS1 | Dataset::MajorTomCoreS2 => KeyRule::ParentAndLast,
            Dataset::Ssl4eoS12S1 | Dataset::Ssl4eoS12S2L1c | Dataset::Ssl4eoS12S2L2a => {
                KeyRule::ThreeDeepest
            }
        }
    }

    /// Band table.
    pub fn band_spec(self) -> BandSpec {
        let stem_suffixed = |band: &str| SourceFile::StemSuffixed(format!("_{band}.tif"));
        let named = |band: &str| SourceFile::Named(format!("{band}.tif"));
        match self {
            Dataset::BigEarthNetS1 => BandSpec::file_per_band(&BIGEARTHNET_S1_BANDS, stem_suffixed),
            Dataset::BigEarthNetS2 => BandSpec::file_per_band(&S2_L2A_BANDS, stem_suffixed),
            Dataset::HySpecNet11k => (1..=HYSPECNET_BAND_COUNT).fold(BandSpec::new(), |spec, i| {
                spec.band(
                    format!("B{i}"),
                    SourceDescriptor {
                        file: SourceFile::StemSuffixed("-SPECTRAL_IMAGE.TIF".into()),
                        band_index: i,
                        georeferenced: true,
                    },
                )
            }),
            Dataset::MajorTomCoreS1 => BandSpec::file_per_band(&MAJOR_TOM_S1_BANDS, named),
            Dataset::MajorTomCoreS2 => BandSpec::file_per_band(&S2_L2A_BANDS, named),
            Dataset::Ssl4eoS12S1 => BandSpec::file_per_band(&SSL4EO_S1_BANDS, named),
            Dataset::Ssl4eoS12S2L1c => BandSpec::file_per_band(&SSL4EO_S2_L1C_BANDS, named),
            Dataset::Ssl4eoS12S2L2a => BandSpec::file_per_band(&SSL4EO_S2_L2A_BANDS, named),
            Dataset::UcMerced => BandSpec::multi_band(&UC_MERCED_BANDS).not_georeferenced(),
            Dataset::Hydro => BandSpec::multi_band(&HYDRO_BANDS),
            Dataset::EurosatMs => BandSpec::multi_band(&EUROSAT_MS_BANDS),
        }
    }

    /// Bundles key rule and band table for the pipeline.
    pub fn strategy(self) -> Strategy {
        Strategy {
            dataset: self,
            key_rule: self.key_rule(),
            bands: self.band_spec(),
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dataset's key rule and band table, built once per run.
#[derive(Debug, Clone)]
pub struct Strategy {
    dataset: Dataset,
    key_rule: KeyRule,
    bands: BandSpec,
}

impl Strategy {
    /// Dataset this strategy was built for.
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Band table.
    pub fn bands(&self) -> &BandSpec {
        &self.bands
    }

    /// Key of `sample`.
    pub fn key(&self, sample: &Path) -> ConvertResult<SampleKey> {
        self.key_rule.derive(sample)
    }

    /// Record of `sample` in band-table order.
    pub fn extract(&self, sample: &Path) -> ConvertResult<Record> {
        self.bands.extract(sample)
    }
}
