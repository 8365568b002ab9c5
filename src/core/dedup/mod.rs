//! # Dedup Module
//!
//! Groups hashed files by content and picks one canonical file per group.
//!
//! ## Canonical Rule
//! The member with the earliest modification time is canonical: the oldest
//! copy is taken to be the original. Equal timestamps are broken by path
//! ordering, so the choice never depends on scan order.

use crate::core::hasher::ContentHash;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

/// A scanned file together with its content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path
    pub path: PathBuf,
    /// Content hash
    pub hash: ContentHash,
    /// Modification time seen by the scan
    pub modified: SystemTime,
}

impl FileRecord {
    pub fn new(path: impl Into<PathBuf>, hash: ContentHash, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            hash,
            modified,
        }
    }

    /// Oldest first, then by path
    pub fn canonical_cmp(&self, other: &FileRecord) -> Ordering {
        self.modified
            .cmp(&other.modified)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Files sharing one content hash.
///
/// Never empty; members are kept in canonical order so the first one is
/// the canonical file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    hash: ContentHash,
    members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Build a group. Returns `None` if `members` is empty or any member
    /// carries a different hash.
    pub fn new(hash: ContentHash, mut members: Vec<FileRecord>) -> Option<Self> {
        if members.is_empty() || members.iter().any(|m| m.hash != hash) {
            return None;
        }
        members.sort_by(FileRecord::canonical_cmp);
        Some(Self { hash, members })
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// The file that gets linked into the output tree
    pub fn canonical(&self) -> &FileRecord {
        &self.members[0]
    }

    /// Every member except the canonical one
    pub fn duplicates(&self) -> &[FileRecord] {
        &self.members[1..]
    }

    /// All members, canonical first
    pub fn members(&self) -> &[FileRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of duplicates (excluding the canonical file)
    pub fn duplicate_count(&self) -> usize {
        self.members.len() - 1
    }
}

/// Groups file records by content hash
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Group a completed scan. Groups come back ordered by hash.
    pub fn group(&self, records: Vec<FileRecord>) -> Vec<DuplicateGroup> {
        let mut by_hash: BTreeMap<ContentHash, Vec<FileRecord>> = BTreeMap::new();
        for record in records {
            by_hash.entry(record.hash.clone()).or_default().push(record);
        }

        by_hash
            .into_iter()
            .filter_map(|(hash, members)| DuplicateGroup::new(hash, members))
            .collect()
    }
}
