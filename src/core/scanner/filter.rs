//! File filtering logic for the scanner.

use super::MediaKind;
use std::path::{Path, PathBuf};

/// Decides which walked entries are candidate media files
pub struct MediaFilter {
    /// Whether dot-prefixed entries pass
    include_hidden: bool,
    /// Subtrees that are never descended into
    excluded: Vec<PathBuf>,
}

impl MediaFilter {
    /// Create a filter with the default extension allow-list.
    /// Hidden entries pass unless turned off with [`Self::with_hidden`].
    pub fn new() -> Self {
        Self {
            include_hidden: true,
            excluded: Vec::new(),
        }
    }

    /// Pass or drop entries whose name starts with `.`
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Prune these subtrees from the walk
    pub fn with_excluded(mut self, excluded: Vec<PathBuf>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Whether a directory entry (file or directory) should be descended into
    /// or considered at all
    pub fn should_enter(&self, path: &Path, is_root: bool) -> bool {
        if is_root {
            return true;
        }
        if self.excluded.iter().any(|ex| path.starts_with(ex)) {
            return false;
        }
        self.include_hidden || !is_hidden(path)
    }

    /// Classify a regular file, returning `None` if it is not a candidate
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        if !self.include_hidden && is_hidden(path) {
            return None;
        }
        MediaKind::from_path(path)
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
