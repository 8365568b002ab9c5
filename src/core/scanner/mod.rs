//! # Scanner Module
//!
//! Discovers photo and video files under a source root.
//!
//! ## Rules
//! - Extensions are matched case-insensitively after trimming whitespace
//! - Symbolic links are never yielded, so re-running over a tree that
//!   contains earlier output is stable
//! - Excluded paths (normally the output root) are pruned from the walk
//! - Dot-prefixed files and directories are skipped unless configured
//!
//! ## Example
//! ```rust,ignore
//! use photo_flow::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let result = scanner.scan(Path::new("/mnt/dump"))?;
//! ```

mod filter;
mod walker;

pub use filter::MediaFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Recognized still-image extensions (lowercase, no dot)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpeg", "jpg", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif", "svg", "raw",
    "cr2", "nef", "arw", "dng",
];

/// Recognized video extensions (lowercase, no dot)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "3gp", "mpeg", "mpg", "mts", "m2ts",
];

/// Capability class of a media file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify an extension (without the leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().to_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Classify a path by its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// A media file discovered by the scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Image or video
    pub kind: MediaKind,
    /// File size in bytes
    pub size: u64,
    /// Last modified time
    pub modified: SystemTime,
}

/// Result of a scan operation
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Successfully discovered media files
    pub files: Vec<MediaFile>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for media scanners
///
/// Implement this trait to feed the pipeline from something other than
/// a directory walk (e.g. a fixed list in tests).
pub trait MediaScanner: Send + Sync {
    /// Scan a source root and return discovered media files
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}
