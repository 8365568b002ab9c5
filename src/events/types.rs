//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the organize pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Hashing phase events
    Hash(HashEvent),
    /// Organize phase events
    Organize(OrganizeEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A candidate media file was found
    FileFound { path: PathBuf },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_files: usize },
}

/// Events during the hashing phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started { total_files: usize },
    /// Progress update during hashing
    Progress(HashProgress),
    /// A file could not be hashed and was skipped
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed { total_hashed: usize },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of files hashed so far
    pub completed: usize,
    /// Total number of files to hash
    pub total: usize,
    /// File that was just hashed
    pub current_path: PathBuf,
}

/// Events during the organize phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrganizeEvent {
    /// Organizing has started
    Started { total_groups: usize },
    /// Metadata for a content hash was served from the cache
    CacheHit { hash: String },
    /// A link was created in the output tree
    Linked { link: PathBuf, target: PathBuf },
    /// The link already existed and was left alone
    AlreadyPresent { link: PathBuf },
    /// The link name holds a different file, so `target` stays unlinked
    Collision { link: PathBuf, target: PathBuf },
    /// A group could not be materialized
    Error { path: PathBuf, message: String },
    /// Organizing completed
    Completed { links_created: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline stopped at a clean stop point
    Cancelled,
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Hashing,
    Grouping,
    Organizing,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Media files found by the scan
    pub files_scanned: usize,
    /// Distinct content hashes
    pub duplicate_groups: usize,
    /// Files that share content with an earlier canonical file
    pub duplicates: usize,
    /// Links created by this run
    pub links_created: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Hashing => write!(f, "Hashing"),
            PipelinePhase::Grouping => write!(f, "Grouping"),
            PipelinePhase::Organizing => write!(f, "Organizing"),
        }
    }
}
