//! Sample discovery.
//!
//! Walks a dataset root and returns every entry whose file name matches a
//! regular expression. Results are absolute and unordered; callers sort.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::{IoError, IoResult};

/// Which filesystem entries a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular files.
    File,
    /// Directories.
    Directory,
}

/// Pattern plus entry filter for one dataset layout.
#[derive(Debug, Clone)]
pub struct DiscoveryRule {
    /// Regex matched against the entry's file name.
    pub pattern: String,
    /// Entry type to keep.
    pub kind: EntryKind,
    /// Exact depth below the root (1 = direct children), any depth if `None`.
    pub depth: Option<usize>,
}

impl DiscoveryRule {
    /// Rule matching directories at any depth.
    pub fn directories(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: EntryKind::Directory,
            depth: None,
        }
    }

    /// Rule matching files at any depth.
    pub fn files(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: EntryKind::File,
            depth: None,
        }
    }

    /// Restricts matches to exactly `depth` levels below the root.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }
}

/// Finds all entries under `root` matching `rule`.
///
/// The root itself is never returned.
///
/// # Errors
///
/// Returns [`IoError::Pattern`] for an invalid regex and [`IoError::Walk`]
/// if `root` cannot be read.
pub fn discover<P: AsRef<Path>>(root: P, rule: &DiscoveryRule) -> IoResult<Vec<PathBuf>> {
    let root = std::path::absolute(root.as_ref())?;
    let regex = Regex::new(&rule.pattern)?;

    let mut walker = WalkDir::new(&root).min_depth(1);
    if let Some(depth) = rule.depth {
        walker = walker.min_depth(depth).max_depth(depth);
    }

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| IoError::Walk {
            root: root.clone(),
            message: e.to_string(),
        })?;
        let kind_ok = match rule.kind {
            EntryKind::File => entry.file_type().is_file(),
            EntryKind::Directory => entry.file_type().is_dir(),
        };
        if kind_ok && entry.file_name().to_str().is_some_and(|n| regex.is_match(n)) {
            found.push(entry.into_path());
        }
    }

    debug!(root = %root.display(), pattern = %rule.pattern, found = found.len(), "discovery finished");
    Ok(found)
}
