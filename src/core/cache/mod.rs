//! # Cache Module
//!
//! Memoizes metadata extraction by content hash.
//!
//! The cache is a pure optimization: a warm cache must lead to the same
//! organizing decisions as a cold one. Entries are created on first
//! extraction, replaced only by an explicit re-store (upsert) and never
//! deleted by the pipeline.
//!
//! ## Backends
//! - `SqliteCache` - Persistent storage using SQLite
//! - `InMemoryCache` - For testing, and for runs where the database
//!   cannot be opened

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryCache;
pub use sqlite::SqliteCache;
pub use traits::CacheBackend;

use crate::core::hasher::ContentHash;
use crate::core::metadata::MetadataResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A cached extraction result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content hash the result belongs to
    pub hash: ContentHash,
    /// File the result was extracted from
    pub path: PathBuf,
    /// The extracted (un-aliased) metadata
    pub metadata: MetadataResult,
}

impl CacheEntry {
    pub fn new(hash: ContentHash, path: impl Into<PathBuf>, metadata: MetadataResult) -> Self {
        Self {
            hash,
            path: path.into(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn entry_keeps_source_path() {
        let entry = CacheEntry::new(
            ContentHash::from_hex("ab"),
            "/dump/a.jpg",
            MetadataResult::new("Acme_X1", NaiveDate::from_ymd_opt(2021, 5, 4).unwrap()),
        );
        assert_eq!(entry.path, PathBuf::from("/dump/a.jpg"));
        assert_eq!(entry.metadata.date, "2021-05-04");
    }
}
