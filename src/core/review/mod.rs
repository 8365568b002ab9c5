//! # Review Module
//!
//! Support for picking "selects" out of an organized tree: list the linked
//! images, and link a chosen one into a selects directory.
//!
//! The image viewer itself lives outside this crate.

use crate::core::organize::{place_link, LinkMode, LinkOutcome};
use crate::core::scanner::MediaKind;
use crate::error::{OrganizeError, ScanError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Every image entry under `output_root`, sorted by path.
///
/// Links are listed as links; they are not followed.
pub fn list_organized(output_root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    if !output_root.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: output_root.to_path_buf(),
        });
    }

    let mut images: Vec<PathBuf> = WalkDir::new(output_root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| !entry.file_type().is_dir())
        .filter(|entry| MediaKind::from_path(entry.path()) == Some(MediaKind::Image))
        .map(|entry| entry.into_path())
        .collect();

    images.sort();
    debug!(count = images.len(), root = %output_root.display(), "listed organized images");
    Ok(images)
}

/// Link `file` into `selects_dir` under its own name.
///
/// Marking the same file twice is a no-op.
pub fn mark_select(file: &Path, selects_dir: &Path) -> Result<LinkOutcome, OrganizeError> {
    let name = file.file_name().ok_or_else(|| OrganizeError::NoFileName {
        path: file.to_path_buf(),
    })?;
    let link = selects_dir.join(name);

    fs::metadata(file).map_err(|source| OrganizeError::Link {
        link: link.clone(),
        target: file.to_path_buf(),
        source,
    })?;

    fs::create_dir_all(selects_dir).map_err(|source| OrganizeError::CreateDirectory {
        path: selects_dir.to_path_buf(),
        source,
    })?;

    place_link(file, &link, LinkMode::Symbolic)
}
