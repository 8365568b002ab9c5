//! # CLI Module
//!
//! Command-line interface for photo-flow.
//!
//! ## Usage
//! ```bash
//! # Organize a dump into <output>/<device>/<year>/<date>/
//! photo-flow organize ~/Dump ~/Organized
//!
//! # Hard links, four workers, JSON summary
//! photo-flow organize ~/Dump ~/Organized --hard-links --threads 4 --output json
//!
//! # Skip the persistent cache
//! photo-flow organize ~/Dump ~/Organized --no-cache
//!
//! # Picking selects
//! photo-flow selects list ~/Organized
//! photo-flow selects mark ~/Organized/5D4/2021/2021-05-04/IMG_0001.JPG ~/Selects
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_flow::core::cache::{CacheBackend, InMemoryCache, SqliteCache};
use photo_flow::core::organize::{LinkMode, LinkOutcome};
use photo_flow::core::pipeline::{Pipeline, PipelineResult};
use photo_flow::core::review;
use photo_flow::error::Result;
use photo_flow::events::{
    Event, EventChannel, HashEvent, OrganizeEvent, PipelineEvent, ScanEvent,
};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::warn;

/// Photo Flow - organize a photo dump by device and date
#[derive(Parser, Debug)]
#[command(name = "photo-flow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Link every unique photo and video into a device/date tree
    Organize {
        /// Directory holding the unsorted dump
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Root of the organized tree
        #[arg(value_name = "OUTPUT")]
        output_root: PathBuf,

        /// Cache database path
        #[arg(long, conflicts_with = "no_cache")]
        cache: Option<PathBuf>,

        /// Do not read or write the persistent cache
        #[arg(long)]
        no_cache: bool,

        /// Worker threads (default: one per core)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Use hard links instead of symbolic links
        #[arg(long)]
        hard_links: bool,

        /// Skip files and directories whose name starts with a dot
        #[arg(long)]
        skip_hidden: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Output format
        #[arg(short, long = "output", value_name = "FORMAT", default_value = "pretty")]
        format: OutputFormat,
    },

    /// Review an organized tree and mark selects
    Selects {
        #[command(subcommand)]
        action: SelectsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SelectsCommand {
    /// List organized images in review order
    List {
        /// Root of the organized tree
        output_root: PathBuf,
    },
    /// Link one image into the selects directory
    Mark {
        /// Image to mark
        file: PathBuf,
        /// Directory collecting selects
        selects_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Options for one organize run
struct OrganizeArgs {
    source: PathBuf,
    output_root: PathBuf,
    cache: Option<PathBuf>,
    no_cache: bool,
    threads: Option<usize>,
    hard_links: bool,
    skip_hidden: bool,
    verbose: bool,
    format: OutputFormat,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize {
            source,
            output_root,
            cache,
            no_cache,
            threads,
            hard_links,
            skip_hidden,
            verbose,
            format,
        } => {
            photo_flow::init_tracing(verbose);
            run_organize(OrganizeArgs {
                source,
                output_root,
                cache,
                no_cache,
                threads,
                hard_links,
                skip_hidden,
                verbose,
                format,
            })
        }
        Commands::Selects { action } => {
            photo_flow::init_tracing(false);
            match action {
                SelectsCommand::List { output_root } => run_selects_list(&output_root),
                SelectsCommand::Mark { file, selects_dir } => run_selects_mark(&file, &selects_dir),
            }
        }
    }
}

fn run_organize(args: OrganizeArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(args.format, OutputFormat::Pretty);

    // Print header
    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Photo Flow").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let cache = open_cache(args.cache, args.no_cache, &term, pretty);

    // Build pipeline
    let mut builder = Pipeline::builder()
        .source(&args.source)
        .output(&args.output_root)
        .include_hidden(!args.skip_hidden)
        .link_mode(if args.hard_links {
            LinkMode::Hard
        } else {
            LinkMode::Symbolic
        })
        .cache(cache);
    if let Some(threads) = args.threads {
        builder = builder.threads(threads);
    }
    let pipeline = builder.build();

    // Set up event handling
    let (sender, receiver) = EventChannel::new();

    // Progress bar for pretty output
    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Organize(OrganizeEvent::Started { total_groups }) => {
                    pb.set_length(total_groups as u64);
                    pb.set_position(0);
                }
                Event::Organize(OrganizeEvent::Linked { link, .. }) => {
                    pb.inc(1);
                    if verbose {
                        pb.println(format!("  {} {}", style("+").green(), link.display()));
                    }
                }
                Event::Organize(OrganizeEvent::AlreadyPresent { .. }) => pb.inc(1),
                Event::Organize(OrganizeEvent::Collision { link, target }) => {
                    pb.inc(1);
                    pb.println(format!(
                        "  {} {} is taken; {} left unlinked",
                        style("!").yellow(),
                        link.display(),
                        target.display()
                    ));
                }
                Event::Organize(OrganizeEvent::Error { path, message }) => {
                    pb.inc(1);
                    pb.println(format!(
                        "  {} {}: {}",
                        style("!").red(),
                        path.display(),
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. })
                | Event::Pipeline(PipelineEvent::Cancelled) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let result = result?;

    // Output results
    match args.format {
        OutputFormat::Pretty => print_pretty_results(&term, &result, args.verbose),
        OutputFormat::Json => print_json_results(&result),
    }

    Ok(())
}

/// Persistent cache if it opens, otherwise an in-memory one for this run
fn open_cache(
    path: Option<PathBuf>,
    disabled: bool,
    term: &Term,
    pretty: bool,
) -> Box<dyn CacheBackend> {
    if disabled {
        return Box::new(InMemoryCache::new());
    }

    let path = path.unwrap_or_else(default_cache_path);
    match SqliteCache::open(&path) {
        Ok(cache) => Box::new(cache),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache unavailable, continuing without it");
            if pretty {
                term.write_line(&format!(
                    "{} {}",
                    style("Warning:").yellow().bold(),
                    style(format!("{e}; metadata will not be cached")).dim()
                ))
                .ok();
            }
            Box::new(InMemoryCache::new())
        }
    }
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-flow")
        .join("metadata.db")
}

/// Error lines for the pretty summary.
///
/// A run that organized nothing always lists its errors, since they are
/// usually why (a missing source root, unreadable files).
fn error_lines(result: &PipelineResult, verbose: bool) -> Vec<String> {
    if !verbose && !result.nothing_to_organize() {
        return Vec::new();
    }
    result.errors.iter().map(|error| format!("    ○ {error}")).collect()
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    if result.nothing_to_organize() {
        term.write_line(&format!(
            "  {} No files needed organizing.",
            style("✓").green()
        ))
        .ok();
        for line in error_lines(result, verbose) {
            term.write_line(&style(line).yellow().to_string()).ok();
        }
        return;
    }

    term.write_line("").ok();
    term.write_line(&format!("{} Organize Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} files scanned in {:.1}s",
        style(result.files_scanned).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    term.write_line(&format!(
        "  {} unique files, {} duplicates",
        style(result.duplicate_groups).cyan(),
        style(result.duplicates).cyan()
    ))
    .ok();

    term.write_line(&format!(
        "  {} links created",
        style(result.links_created).green()
    ))
    .ok();

    if result.links_existing > 0 {
        term.write_line(&format!(
            "  {} already organized",
            style(result.links_existing).dim()
        ))
        .ok();
    }

    if result.cache_hits > 0 {
        term.write_line(&format!(
            "  {} cache hits",
            style(result.cache_hits).dim()
        ))
        .ok();
    }

    if result.collisions > 0 {
        term.write_line(&format!(
            "  {} left unlinked, name taken by a different file",
            style(result.collisions).yellow()
        ))
        .ok();
    }

    if !result.errors.is_empty() {
        term.write_line(&format!(
            "  {} files skipped",
            style(result.errors.len()).yellow()
        ))
        .ok();
        for line in error_lines(result, verbose) {
            term.write_line(&style(line).dim().to_string()).ok();
        }
    }

    term.write_line("").ok();

    // Footer
    term.write_line(&format!(
        "{}",
        style("Originals were not modified.").dim()
    ))
    .ok();
}

fn print_json_results(result: &PipelineResult) {
    let rendered = serde_json::to_value(result).and_then(|mut output| {
        output["nothing_to_organize"] = serde_json::Value::Bool(result.nothing_to_organize());
        serde_json::to_string_pretty(&output)
    });

    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => warn!(error = %e, "could not render JSON summary"),
    }
}

fn run_selects_list(output_root: &Path) -> Result<()> {
    for path in review::list_organized(output_root)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_selects_mark(file: &Path, selects_dir: &Path) -> Result<()> {
    let term = Term::stderr();
    match review::mark_select(file, selects_dir)? {
        LinkOutcome::Created(link) => {
            term.write_line(&format!("{} {}", style("★").green(), link.display()))
                .ok();
        }
        LinkOutcome::AlreadyPresent(link) => {
            term.write_line(&format!(
                "{} {} (already selected)",
                style("★").dim(),
                link.display()
            ))
            .ok();
        }
        LinkOutcome::Conflict(link) => {
            term.write_line(&format!(
                "{} {} holds a different file",
                style("!").yellow(),
                link.display()
            ))
            .ok();
        }
    }
    Ok(())
}
