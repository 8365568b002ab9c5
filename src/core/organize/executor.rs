//! Materializes links in the output tree.

use super::planner::OutputLayout;
use super::types::{LinkMode, LinkOutcome};
use crate::core::dedup::FileRecord;
use crate::core::hasher::ContentHasher;
use crate::core::metadata::MetadataResult;
use crate::error::OrganizeError;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Places one link per canonical file under the output root.
///
/// Only ever adds entries: an occupied link name is left as it is, so
/// re-running over a growing source tree links only new files. An occupant
/// with different content is reported as [`LinkOutcome::Conflict`].
pub struct OutputOrganizer {
    layout: OutputLayout,
    mode: LinkMode,
    created_dirs: Mutex<HashSet<PathBuf>>,
}

impl OutputOrganizer {
    pub fn new(output_root: impl Into<PathBuf>, mode: LinkMode) -> Self {
        Self {
            layout: OutputLayout::new(output_root),
            mode,
            created_dirs: Mutex::new(HashSet::new()),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Link `canonical` into the directory for `metadata`.
    ///
    /// `metadata` must already carry the aliased device label.
    pub fn materialize(
        &self,
        canonical: &FileRecord,
        metadata: &MetadataResult,
    ) -> Result<LinkOutcome, OrganizeError> {
        let link = self.layout.link_path(&canonical.path, metadata)?;
        if let Some(dir) = link.parent() {
            self.ensure_dir(dir)?;
        }

        match place_link(&canonical.path, &link, self.mode)? {
            LinkOutcome::AlreadyPresent(link) if !holds_content_of(&link, canonical) => {
                warn!(
                    link = %link.display(),
                    target = %canonical.path.display(),
                    "link name taken by a different file"
                );
                Ok(LinkOutcome::Conflict(link))
            }
            outcome => Ok(outcome),
        }
    }

    fn ensure_dir(&self, dir: &Path) -> Result<(), OrganizeError> {
        let mut created = self
            .created_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if created.contains(dir) {
            return Ok(());
        }

        fs::create_dir_all(dir).map_err(|source| OrganizeError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        created.insert(dir.to_path_buf());
        Ok(())
    }
}

/// Create `link` pointing at `target` unless something is already there.
///
/// The existence check does not follow links, so a dangling link still
/// counts as present. Losing a creation race to another worker is reported
/// as `AlreadyPresent`.
pub fn place_link(target: &Path, link: &Path, mode: LinkMode) -> Result<LinkOutcome, OrganizeError> {
    if fs::symlink_metadata(link).is_ok() {
        return Ok(LinkOutcome::AlreadyPresent(link.to_path_buf()));
    }

    let target = absolute_target(target).map_err(|source| OrganizeError::Link {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })?;

    let created = match mode {
        LinkMode::Symbolic => symlink(&target, link),
        LinkMode::Hard => match fs::hard_link(&target, link) {
            Err(e) if is_cross_device(&e) => {
                debug!(link = %link.display(), "hard link crosses filesystems, using symlink");
                symlink(&target, link)
            }
            other => other,
        },
    };

    match created {
        Ok(()) => Ok(LinkOutcome::Created(link.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Ok(LinkOutcome::AlreadyPresent(link.to_path_buf()))
        }
        Err(source) => Err(OrganizeError::Link {
            link: link.to_path_buf(),
            target,
            source,
        }),
    }
}

/// Whether the entry at `link` already stands for `canonical`'s content.
///
/// Checked cheapest first: symlink target, then file identity, then a
/// content hash of whatever the entry resolves to.
fn holds_content_of(link: &Path, canonical: &FileRecord) -> bool {
    if let (Ok(existing), Ok(target)) = (fs::read_link(link), absolute_target(&canonical.path)) {
        if existing == target {
            return true;
        }
    }
    if let (Ok(existing), Ok(target)) = (fs::metadata(link), fs::metadata(&canonical.path)) {
        if same_file(&existing, &target) {
            return true;
        }
    }
    match ContentHasher::new().hash_file(link) {
        Ok(hash) => hash == canonical.hash,
        Err(e) => {
            debug!(link = %link.display(), error = %e, "existing entry is unreadable");
            false
        }
    }
}

#[cfg(unix)]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(_a: &fs::Metadata, _b: &fs::Metadata) -> bool {
    false
}

/// Symlinks must not depend on the working directory
fn absolute_target(target: &Path) -> io::Result<PathBuf> {
    if target.is_absolute() {
        Ok(target.to_path_buf())
    } else {
        std::path::absolute(target)
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(e: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    e.raw_os_error() == Some(17)
}
