//! Reproducibility checks between stores.
//!
//! [`inspect_store`] decodes a deterministic sample of keys and buffers one
//! digest line per band group: a SHA-256 over the stacked band bytes plus
//! sum, mean and standard deviation. Two stores are considered identical
//! when their buffered lines match. This is a digest comparison, not an
//! element-wise one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rico_core::{DataType, NdArray, container};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{ConvertResult, Store};

/// Number of samples inspected per group by default.
pub const DEFAULT_NUM_SAMPLES: usize = 25;

/// Keys sharing a prefix, inspected up to `limit` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGroup {
    /// Key prefix.
    pub prefix: String,
    /// Maximum keys taken after sorting.
    pub limit: usize,
}

impl SampleGroup {
    /// Creates a group.
    pub fn new(prefix: impl Into<String>, limit: usize) -> Self {
        Self {
            prefix: prefix.into(),
            limit,
        }
    }

    /// `S1` with `num_samples` keys and `S2` with a third of that.
    pub fn defaults(num_samples: usize) -> Vec<Self> {
        vec![Self::new("S1", num_samples), Self::new("S2", num_samples / 3)]
    }
}

/// Buffered inspection output of one store.
#[derive(Debug, Clone)]
pub struct InspectReport {
    /// Store description, excluded from comparisons.
    pub header: String,
    /// One digest line per key and band group.
    pub lines: Vec<String>,
}

impl PartialEq for InspectReport {
    fn eq(&self, other: &Self) -> bool {
        self.lines == other.lines
    }
}

impl Eq for InspectReport {}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Outcome of [`compare_stores`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Every digest line matches.
    Identical,
    /// At least one line differs.
    Different,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Identical => f.write_str("Files are identical"),
            Comparison::Different => f.write_str("Files are different"),
        }
    }
}

/// Opens `path` read-only and inspects it.
///
/// # Errors
///
/// Fails if the store cannot be opened or read. Corrupt containers are
/// reported as lines, not errors.
pub fn inspect_path(path: &Path, groups: &[SampleGroup]) -> ConvertResult<InspectReport> {
    let store = Store::open_read_only(path)?;
    inspect_store(&store, groups)
}

/// Builds the digest report of an open store.
///
/// # Errors
///
/// Fails on LMDB read errors.
pub fn inspect_store(store: &Store, groups: &[SampleGroup]) -> ConvertResult<InspectReport> {
    let mut lines = Vec::new();
    for group in groups {
        let mut keys = store.keys_with_prefix(group.prefix.as_bytes())?;
        keys.sort();
        keys.truncate(group.limit);
        debug!(prefix = %group.prefix, keys = keys.len(), "inspecting group");

        for key in keys {
            let name = String::from_utf8_lossy(&key).into_owned();
            let Some(value) = store.get(&key)? else {
                continue;
            };
            match container::decode(&value) {
                Ok(record) => lines.extend(digest_lines(&name, record.iter())),
                Err(e) => {
                    warn!(key = %name, error = %e, "undecodable container");
                    lines.push(format!("{name}: {e}"));
                }
            }
        }
    }
    Ok(InspectReport {
        header: format!("LMDB file: {}", store.path().display()),
        lines,
    })
}

/// Inspects both stores and compares their lines.
///
/// # Errors
///
/// Fails if either store cannot be read.
pub fn compare_stores(
    a: &Path,
    b: &Path,
    groups: &[SampleGroup],
) -> ConvertResult<(Comparison, InspectReport, InspectReport)> {
    let first = inspect_path(a, groups)?;
    let second = inspect_path(b, groups)?;
    let outcome = if first == second {
        Comparison::Identical
    } else {
        Comparison::Different
    };
    Ok((outcome, first, second))
}

/// Bands grouped by `(rows, cols..., dtype)` in sorted-name order, largest
/// resolution first. A key with a single group gets no suffix.
fn digest_lines<'a>(key: &str, bands: impl Iterator<Item = (&'a str, &'a NdArray)>) -> Vec<String> {
    let mut sorted: Vec<(&str, &NdArray)> = bands.collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut groups: BTreeMap<(std::cmp::Reverse<Vec<usize>>, DataType), Vec<&NdArray>> =
        BTreeMap::new();
    for (_, array) in sorted {
        groups
            .entry((std::cmp::Reverse(array.shape().to_vec()), array.dtype()))
            .or_default()
            .push(array);
    }

    let single = groups.len() == 1;
    groups
        .into_iter()
        .map(|((std::cmp::Reverse(shape), _), arrays)| {
            let label = if single {
                key.to_owned()
            } else {
                format!("{key}_{}", shape.first().copied().unwrap_or(0))
            };
            format!("{label}: {}", Summary::of(&arrays))
        })
        .collect()
}

/// Hash plus summary statistics of stacked arrays.
struct Summary {
    sha256: String,
    sum: String,
    mean: f64,
    std: f64,
}

impl Summary {
    fn of(arrays: &[&NdArray]) -> Self {
        let mut hasher = Sha256::new();
        for array in arrays {
            hasher.update(array.as_bytes());
        }
        let sha256 = hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>();

        let values: Vec<f64> = arrays.iter().flat_map(|a| a.to_f64_vec()).collect();
        let count = values.len().max(1) as f64;
        let float_sum: f64 = values.iter().sum();
        let mean = float_sum / count;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        // Exact for integers; arrays in one group share a dtype.
        let sum = arrays
            .iter()
            .map(|a| a.integer_sum())
            .sum::<Option<i128>>()
            .map_or_else(|| float_sum.to_string(), |s| s.to_string());

        Self {
            sha256,
            sum,
            mean,
            std: var.sqrt(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:>15} {:.5} {:.5}", self.sha256, self.sum, self.mean, self.std)
    }
}
