//! Types for the organize module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How entries in the output tree point back at the originals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Symbolic link to the original path
    #[default]
    Symbolic,
    /// Hard link; falls back to a symbolic link across filesystems
    Hard,
}

/// What happened when a link was placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "link", rename_all = "snake_case")]
pub enum LinkOutcome {
    /// A new link was created at this path
    Created(PathBuf),
    /// The same content already occupied this path; left untouched
    AlreadyPresent(PathBuf),
    /// A different file already occupied this path; left untouched
    Conflict(PathBuf),
}

impl LinkOutcome {
    /// Path of the link in the output tree
    pub fn link(&self) -> &Path {
        match self {
            Self::Created(link) | Self::AlreadyPresent(link) | Self::Conflict(link) => link,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
