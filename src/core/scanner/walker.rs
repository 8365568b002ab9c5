//! Directory walking implementation using walkdir.

use super::{filter::MediaFilter, MediaFile, MediaScanner, ScanResult};
use crate::core::pipeline::CancellationToken;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether dot-prefixed files and directories are yielded
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Subtrees to skip, typically the output root
    pub exclude: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_hidden: true,
            max_depth: None,
            exclude: Vec::new(),
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
    cancel: Option<CancellationToken>,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let excluded = config.exclude.iter().map(|p| resolve_path(p)).collect();
        let filter = MediaFilter::new()
            .with_hidden(config.include_hidden)
            .with_excluded(excluded);

        Self {
            config,
            filter,
            cancel: None,
        }
    }

    /// Stop yielding entries once the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Lazily walk `root`, yielding candidate media files.
    ///
    /// Directory-level problems surface as `Err` items; the walk carries on
    /// past them.
    pub fn walk<'a>(
        &'a self,
        root: &Path,
    ) -> Result<impl Iterator<Item = Result<MediaFile, ScanError>> + 'a, ScanError> {
        let root = resolve_root(root)?;

        let mut walker = WalkDir::new(&root).follow_links(false);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let filter = &self.filter;
        let entries = walker
            .into_iter()
            .filter_entry(move |entry| filter.should_enter(entry.path(), entry.depth() == 0))
            .filter_map(move |entry| self.to_media_file(entry));

        Ok(entries)
    }

    fn to_media_file(
        &self,
        entry: Result<DirEntry, walkdir::Error>,
    ) -> Option<Result<MediaFile, ScanError>> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(convert_walk_error(e))),
        };

        // Symlinks report their own file type because links are not followed,
        // so links left by an earlier run fall out here.
        if !entry.file_type().is_file() {
            return None;
        }

        let path = entry.path();
        let kind = self.filter.classify(path)?;

        match entry.metadata() {
            Ok(metadata) => Some(Ok(MediaFile {
                path: path.to_path_buf(),
                kind,
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
            })),
            Err(e) => Some(Err(convert_walk_error(e))),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

impl MediaScanner for WalkDirScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &crate::events::null_sender())
    }

    fn scan_with_events(&self, root: &Path, events: &EventSender) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut result = ScanResult::default();

        let entries = match self.walk(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "source root is not scannable");
                events.send(Event::Scan(ScanEvent::Error {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                }));
                result.errors.push(e);
                events.send(Event::Scan(ScanEvent::Completed { total_files: 0 }));
                return Ok(result);
            }
        };

        for entry in entries {
            if self.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            match entry {
                Ok(file) => {
                    events.send(Event::Scan(ScanEvent::FileFound {
                        path: file.path.clone(),
                    }));
                    result.files.push(file);
                }
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    events.send(Event::Scan(ScanEvent::Error {
                        path: error_path(&e),
                        message: e.to_string(),
                    }));
                    result.errors.push(e);
                }
            }
        }

        debug!(files = result.files.len(), errors = result.errors.len(), "scan finished");
        events.send(Event::Scan(ScanEvent::Completed {
            total_files: result.files.len(),
        }));

        Ok(result)
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    fs::canonicalize(root).map_err(|source| ScanError::ReadDirectory {
        path: root.to_path_buf(),
        source,
    })
}

/// Canonical form when the path exists, absolute form otherwise
fn resolve_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn convert_walk_error(e: walkdir::Error) -> ScanError {
    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

    if e.io_error().map(|io| io.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::ReadDirectory {
            path,
            source: std::io::Error::other(e.to_string()),
        }
    }
}

fn error_path(error: &ScanError) -> PathBuf {
    match error {
        ScanError::DirectoryNotFound { path }
        | ScanError::PermissionDenied { path }
        | ScanError::ReadDirectory { path, .. } => path.clone(),
        ScanError::Cancelled => PathBuf::new(),
    }
}
