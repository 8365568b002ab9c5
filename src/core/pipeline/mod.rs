//! # Pipeline Module
//!
//! Orchestrates a full organize run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Find media files under the source root
//! 2. **Hash** - Content hash every file (parallel)
//! 3. **Group** - Group by hash and pick each group's canonical file
//! 4. **Organize** - Resolve metadata (with caching), alias the device and
//!    link the canonical file into the output tree (parallel)
//!
//! Grouping needs the complete set of hashes, so organizing never starts
//! before hashing has finished. Cancellation is honoured between stages and
//! before new per-file work is started; work already running is allowed to
//! finish.
//!
//! ## Parallelism
//! Uses a dedicated rayon pool sized by [`PipelineBuilder::threads`].

mod executor;

pub use executor::{
    CancellationToken, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult,
};
