//! In-memory cache backend.

use super::{CacheBackend, CacheEntry};
use crate::core::hasher::ContentHash;
use crate::error::CacheError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// In-memory cache backend
///
/// Concurrent lookups share a read lock; stores take the write lock.
pub struct InMemoryCache {
    entries: RwLock<HashMap<ContentHash, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> CacheError {
        CacheError::Corrupted {
            path: PathBuf::from("memory"),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryCache {
    fn lookup(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(hash).cloned())
    }

    fn store(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(entry.hash.clone(), entry.clone());
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.len())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.clear();
        Ok(())
    }
}
