//! # Hasher Module
//!
//! Computes content-identity digests for media files.
//!
//! Files are streamed through BLAKE3 in fixed-size chunks, so memory use
//! does not grow with file size. Identical bytes always produce the same
//! digest regardless of name, location or timestamps.
//!
//! ## Example
//! ```rust,ignore
//! use photo_flow::core::hasher::ContentHasher;
//!
//! let hash = ContentHasher::new().hash_file(&path)?;
//! println!("{hash}");
//! ```

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default read chunk size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex BLAKE3 digest of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already-computed hex digest (e.g. read back from the cache)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First characters of the digest, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }
}

/// Streams files through BLAKE3
#[derive(Debug, Clone)]
pub struct ContentHasher {
    chunk_size: usize,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the read chunk size. Zero is treated as one byte.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Hash the file at `path`
    pub fn hash_file(&self, path: &Path) -> Result<ContentHash, HashError> {
        let file = File::open(path).map_err(|source| HashError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.hash_reader(file, path)
    }

    /// Hash everything readable from `reader`.
    ///
    /// A read error at any point fails the whole digest; a partial digest is
    /// never returned. `path` is only used for error context.
    pub fn hash_reader<R: Read>(&self, mut reader: R, path: &Path) -> Result<ContentHash, HashError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut bytes_read = 0u64;

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                    bytes_read += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(HashError::Read {
                        path: path.to_path_buf(),
                        bytes_read,
                        source,
                    })
                }
            }
        }

        Ok(hasher.finalize().into())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
