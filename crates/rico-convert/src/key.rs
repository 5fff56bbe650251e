//! Sample keys and the rules that derive them from source paths.

use std::fmt;
use std::path::{Component, Path};

use crate::{ConvertError, ConvertResult};

/// Store key of one sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleKey(Vec<u8>);

impl SampleKey {
    /// Wraps raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the key, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for SampleKey {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for SampleKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// How a key is built from a sample path.
///
/// Components are joined with `_`; the last component loses its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// `.../S2A_MSIL2A_..._75_43` -> `S2A_MSIL2A_..._75_43`
    LastComponent,
    /// `.../0U_199R/S1A_..._rtc` -> `0U_199R_S1A_..._rtc`
    ParentAndLast,
    /// `.../s1/0000200/S1A_...` -> `s1_0000200_S1A_...`
    ThreeDeepest,
}

impl KeyRule {
    fn depth(self) -> usize {
        match self {
            KeyRule::LastComponent => 1,
            KeyRule::ParentAndLast => 2,
            KeyRule::ThreeDeepest => 3,
        }
    }

    /// Derives the key of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidSamplePath`] if the path has too few
    /// components or is not valid UTF-8.
    pub fn derive(self, path: &Path) -> ConvertResult<SampleKey> {
        let invalid = || ConvertError::InvalidSamplePath(path.to_path_buf());

        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
        let parents: Vec<&str> = path
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_str()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
            })
            .unwrap_or(Some(Vec::new()))
            .ok_or_else(invalid)?;

        let needed = self.depth() - 1;
        if parents.len() < needed {
            return Err(invalid());
        }
        let mut parts = parents[parents.len() - needed..].to_vec();
        parts.push(stem);
        Ok(SampleKey::new(parts.join("_")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_component() {
        let key = KeyRule::LastComponent
            .derive(Path::new("/data/BEN/S2A_MSIL2A_20170613T101031_N9999_R022_T33UUP_75_43"))
            .unwrap();
        assert_eq!(key.to_string(), "S2A_MSIL2A_20170613T101031_N9999_R022_T33UUP_75_43");

        let key = KeyRule::LastComponent
            .derive(Path::new("/data/UCMerced/Images/airplane/airplane00.tif"))
            .unwrap();
        assert_eq!(key, SampleKey::from("airplane00"));
    }

    #[test]
    fn test_parent_and_last() {
        let key = KeyRule::ParentAndLast
            .derive(Path::new("/m/S1RTC/0U/0U_199R/S1A_IW_GRDH_1SDV_x_rtc"))
            .unwrap();
        assert_eq!(key.to_string(), "0U_199R_S1A_IW_GRDH_1SDV_x_rtc");
    }

    #[test]
    fn test_three_deepest() {
        let key = KeyRule::ThreeDeepest
            .derive(Path::new("/ssl/s2a/0000200/20200604T054639_20200604T054831_T43RCP"))
            .unwrap();
        assert_eq!(key.to_string(), "s2a_0000200_20200604T054639_20200604T054831_T43RCP");
    }

    #[test]
    fn test_too_shallow() {
        assert!(matches!(
            KeyRule::ThreeDeepest.derive(Path::new("/a/b")),
            Err(ConvertError::InvalidSamplePath(_))
        ));
        assert!(KeyRule::LastComponent.derive(Path::new("/")).is_err());
    }
}
