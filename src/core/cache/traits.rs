//! Cache backend trait definition.

use super::CacheEntry;
use crate::core::hasher::ContentHash;
use crate::error::CacheError;

/// Trait for cache backends.
///
/// Implementations must tolerate concurrent calls from worker threads;
/// writes are serialized internally.
pub trait CacheBackend: Send + Sync {
    /// Look up the entry for a content hash
    fn lookup(&self, hash: &ContentHash) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert an entry, replacing any prior entry for the same hash
    fn store(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Store several entries.
    ///
    /// Backends with transactions should override this.
    fn store_batch(&self, entries: &[CacheEntry]) -> Result<(), CacheError> {
        for entry in entries {
            self.store(entry)?;
        }
        Ok(())
    }

    /// Number of entries
    fn len(&self) -> Result<usize, CacheError>;

    /// Whether the cache has no entries
    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Clear all cached entries
    fn clear(&self) -> Result<(), CacheError>;
}
