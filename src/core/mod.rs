//! # Core Module
//!
//! The GUI-agnostic organize engine.
//!
//! ## Modules
//! - `scanner` - Finds media files under the source root
//! - `hasher` - Computes content hashes
//! - `metadata` - Resolves device label and capture date
//! - `cache` - Persists metadata by content hash across runs
//! - `dedup` - Groups identical files and picks the canonical one
//! - `organize` - Links canonical files into the output tree
//! - `pipeline` - Orchestrates the full workflow
//! - `review` - Lists organized images and marks selects

pub mod cache;
pub mod dedup;
pub mod hasher;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod review;
pub mod scanner;

// Re-export commonly used types
pub use dedup::{DuplicateGroup, FileRecord};
pub use hasher::ContentHash;
pub use metadata::{DeviceAliases, MetadataResult};
pub use organize::{LinkMode, LinkOutcome};
pub use scanner::{MediaFile, MediaKind};
