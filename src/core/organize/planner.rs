//! Output tree layout.
//!
//! `<root>/<device>/<year>/<YYYY-MM-DD>/<file name>`

use crate::core::metadata::{MetadataResult, UNKNOWN_CAMERA};
use crate::error::OrganizeError;
use std::path::{Path, PathBuf};

/// Computes where a canonical file is linked in the output tree
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that holds links for this device and date
    pub fn target_dir(&self, metadata: &MetadataResult) -> PathBuf {
        self.root
            .join(path_segment(&metadata.device, UNKNOWN_CAMERA))
            .join(path_segment(&metadata.year, "0000"))
            .join(path_segment(&metadata.date, "0000-00-00"))
    }

    /// Full link path for `source`, named after its base name
    pub fn link_path(
        &self,
        source: &Path,
        metadata: &MetadataResult,
    ) -> Result<PathBuf, OrganizeError> {
        let name = source.file_name().ok_or_else(|| OrganizeError::NoFileName {
            path: source.to_path_buf(),
        })?;
        Ok(self.target_dir(metadata).join(name))
    }
}

/// Make a label safe to use as a single path component.
///
/// Separators and NUL become `_`; blank or dot-only labels use `fallback`.
pub fn path_segment(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        fallback.to_string()
    } else {
        cleaned
    }
}
