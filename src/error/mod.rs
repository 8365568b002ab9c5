//! # Error Module
//!
//! Error types for the photo-flow pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Degrade per file** - most errors skip one file, not the run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoFlowError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Organize error: {0}")]
    Organize(#[from] OrganizeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while walking the source tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run was cancelled")]
    Cancelled,
}

/// Errors that occur while computing a content hash
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read of {path} failed after {bytes_read} bytes: {source}")]
    Read {
        path: PathBuf,
        bytes_read: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons embedded capture metadata could not be used.
///
/// Most select the modification-time fallback and never reach callers of
/// the extractor. `ModifiedTimeOutOfRange` is returned when that fallback
/// has no date to give either.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Could not read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("No capture metadata block in {path}")]
    NoMetadata { path: PathBuf },

    #[error("Unparseable capture date {value:?} in {path}")]
    UnparseableDate { path: PathBuf, value: String },

    #[error("Unsupported container for {path}")]
    UnsupportedContainer { path: PathBuf },

    #[error("Malformed container structure in {path}: {reason}")]
    MalformedContainer { path: PathBuf, reason: String },

    #[error("No usable date for {path}: modification time is outside years 1-9999")]
    ModifiedTimeOutOfRange { path: PathBuf },
}

/// Errors that occur with the metadata cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open cache database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Cache corruption detected at {path}. Delete this file and try again.")]
    Corrupted { path: PathBuf },
}

/// Errors that occur while materializing the output tree
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to link {link} -> {target}: {source}")]
    Link {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file has no file name: {path}")]
    NoFileName { path: PathBuf },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/dump"),
        };
        assert!(error.to_string().contains("/photos/dump"));
    }

    #[test]
    fn hash_error_reports_partial_progress() {
        let error = HashError::Read {
            path: PathBuf::from("/photos/clip.mov"),
            bytes_read: 65536,
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "disk went away"),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/clip.mov"));
        assert!(message.contains("65536"));
    }

    #[test]
    fn cache_error_suggests_recovery() {
        let error = CacheError::Corrupted {
            path: PathBuf::from("/cache/metadata.db"),
        };
        assert!(error.to_string().contains("Delete this file"));
    }

    #[test]
    fn out_of_range_mtime_names_the_file() {
        let error: PhotoFlowError = MetadataError::ModifiedTimeOutOfRange {
            path: PathBuf::from("/dev/shm/odd.jpg"),
        }
        .into();
        assert!(matches!(error, PhotoFlowError::Metadata(_)));
        assert!(error.to_string().contains("/dev/shm/odd.jpg"));
    }

    #[test]
    fn organize_error_converts_into_top_level() {
        let error: PhotoFlowError = OrganizeError::NoFileName {
            path: PathBuf::from("/"),
        }
        .into();
        assert!(matches!(error, PhotoFlowError::Organize(_)));
    }
}
