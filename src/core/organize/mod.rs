//! # Organize Module
//!
//! Builds the output tree: one link per canonical file at
//! `<output_root>/<device>/<year>/<YYYY-MM-DD>/<file name>`.
//!
//! Directory and link creation are idempotent. Existing entries are never
//! overwritten or removed.

mod executor;
mod planner;
mod types;

pub use executor::{place_link, OutputOrganizer};
pub use planner::{path_segment, OutputLayout};
pub use types::{LinkMode, LinkOutcome};
