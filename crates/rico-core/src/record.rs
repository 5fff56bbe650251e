//! Ordered band-name to array mappings.

use crate::{CoreError, CoreResult, NdArray};

/// One sample: named bands in a fixed order.
///
/// Insertion order is the serialization order. Bands may differ in shape
/// and element type (e.g. 10 m and 60 m Sentinel-2 bands in one record).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    bands: Vec<(String, NdArray)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record with room for `n` bands.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            bands: Vec::with_capacity(n),
        }
    }

    /// Appends a band.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateBand`] if `name` is already present.
    pub fn push(&mut self, name: impl Into<String>, array: NdArray) -> CoreResult<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(CoreError::DuplicateBand(name));
        }
        self.bands.push((name, array));
        Ok(())
    }

    /// Looks a band up by name.
    pub fn get(&self, name: &str) -> Option<&NdArray> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Band names in record order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, array)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NdArray)> {
        self.bands.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Number of bands.
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// True if the record has no bands.
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

impl IntoIterator for Record {
    type Item = (String, NdArray);
    type IntoIter = std::vec::IntoIter<(String, NdArray)>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_insertion_order() {
        let mut rec = Record::new();
        for name in ["B02", "B01", "VV"] {
            rec.push(name, NdArray::from_elements(vec![1], &[0u8]).unwrap())
                .unwrap();
        }
        assert_eq!(rec.names().collect::<Vec<_>>(), ["B02", "B01", "VV"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut rec = Record::new();
        let arr = NdArray::from_elements(vec![1], &[0u8]).unwrap();
        rec.push("A", arr.clone()).unwrap();
        assert!(matches!(rec.push("A", arr), Err(CoreError::DuplicateBand(n)) if n == "A"));
        assert_eq!(rec.len(), 1);
    }
}
