//! # Photo Flow
//!
//! Turns an unsorted dump of photos and videos into a tree organized by
//! capturing device and capture date, without touching the originals.
//!
//! ## Core Philosophy
//! - **Never modify the dump** - the output tree holds links, not copies
//! - **One entry per picture** - byte-identical files are linked once
//! - **Safe to re-run** - existing links are left alone; only new files appear
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - Scanning, hashing, metadata, dedup and the output tree
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Typed error enums
//!
//! The `photo-flow` binary adds the command-line interface.

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{PhotoFlowError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug` over
/// `warn` for this crate. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "photo_flow=debug"
    } else {
        "photo_flow=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
