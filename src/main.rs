//! # photo-flow CLI
//!
//! Command-line interface for organizing a photo/video dump.
//!
//! ## Usage
//! ```bash
//! photo-flow organize ~/Dump ~/Organized
//! photo-flow organize ~/Dump ~/Organized --hard-links --output json
//! photo-flow selects list ~/Organized
//! ```

mod cli;

use photo_flow::Result;

fn main() -> Result<()> {
    cli::run()
}
