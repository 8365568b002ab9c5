//! Pipeline execution implementation.

use crate::core::cache::{CacheBackend, CacheEntry, InMemoryCache};
use crate::core::dedup::{Deduplicator, DuplicateGroup, FileRecord};
use crate::core::hasher::ContentHasher;
use crate::core::metadata::{self, DeviceAliases, MetadataExtractor, MetadataResult};
use crate::core::organize::{LinkMode, LinkOutcome, OutputLayout, OutputOrganizer};
use crate::core::scanner::{MediaFile, MediaScanner, ScanConfig, WalkDirScanner};
use crate::error::{HashError, MetadataError, OrganizeError, PhotoFlowError, ScanError};
use crate::events::{
    null_sender, Event, EventSender, HashEvent, HashProgress, OrganizeEvent, PipelineEvent,
    PipelinePhase, PipelineSummary,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cooperative stop signal shared between the caller and a running pipeline
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next clean stop point
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of pipeline execution
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineResult {
    /// Media files found by the scan
    pub files_scanned: usize,
    /// Distinct content hashes
    pub duplicate_groups: usize,
    /// Files sharing content with their group's canonical file
    pub duplicates: usize,
    /// Links created by this run
    pub links_created: usize,
    /// Links that were already in place
    pub links_existing: usize,
    /// Canonical files left unlinked because their link name holds a
    /// different file
    pub collisions: usize,
    /// Groups whose metadata came from the cache
    pub cache_hits: usize,
    /// Non-fatal errors, one per skipped file or group
    pub errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    /// True when no file made it through hashing, so no group was formed
    pub fn nothing_to_organize(&self) -> bool {
        self.duplicate_groups == 0
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            files_scanned: self.files_scanned,
            duplicate_groups: self.duplicate_groups,
            duplicates: self.duplicates,
            links_created: self.links_created,
            duration_ms: self.duration_ms,
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the unsorted dump
    pub source: PathBuf,
    /// Root of the organized tree
    pub output: PathBuf,
    /// Worker threads (None = one per core)
    pub threads: Option<usize>,
    /// How output entries point at originals
    pub link_mode: LinkMode,
    /// Whether dot-prefixed files and directories are scanned
    pub include_hidden: bool,
    /// Device label aliases, applied after extraction
    pub aliases: DeviceAliases,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            output: PathBuf::new(),
            threads: None,
            link_mode: LinkMode::default(),
            include_hidden: true,
            aliases: DeviceAliases::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    cache: Option<Box<dyn CacheBackend>>,
    cancel: Option<CancellationToken>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            cache: None,
            cancel: None,
        }
    }

    /// Set the directory to organize
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    /// Set the output root
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.config.output = output.into();
        self
    }

    /// Bound the worker pool
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = Some(threads);
        self
    }

    pub fn link_mode(mut self, mode: LinkMode) -> Self {
        self.config.link_mode = mode;
        self
    }

    /// Scan dot-prefixed entries (the default) or skip them
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// Replace the device alias table
    pub fn aliases(mut self, aliases: DeviceAliases) -> Self {
        self.config.aliases = aliases;
        self
    }

    /// Set the cache backend
    pub fn cache(mut self, cache: Box<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            cache: self.cache.unwrap_or_else(|| Box::new(InMemoryCache::new())),
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A canonical file with its resolved metadata and link path
struct Placement<'a> {
    canonical: &'a FileRecord,
    metadata: MetadataResult,
    link: PathBuf,
    cache_hit: bool,
}

/// Per-group result of the organize phase
struct GroupOutcome {
    canonical: PathBuf,
    link: Result<LinkOutcome, PhotoFlowError>,
}

/// The organize pipeline
pub struct Pipeline {
    config: PipelineConfig,
    cache: Box<dyn CacheBackend>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token that stops this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, PhotoFlowError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<PipelineResult, PhotoFlowError> {
        if self.config.source.as_os_str().is_empty() {
            return Err(PhotoFlowError::Config("no source directory set".into()));
        }
        if self.config.output.as_os_str().is_empty() {
            return Err(PhotoFlowError::Config("no output directory set".into()));
        }

        // The scanner can only exclude the output subtree once it resolves.
        fs::create_dir_all(&self.config.output).map_err(|source| {
            OrganizeError::CreateDirectory {
                path: self.config.output.clone(),
                source,
            }
        })?;

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.threads {
            pool = pool.num_threads(threads);
        }
        let pool = pool
            .build()
            .map_err(|e| PhotoFlowError::Config(format!("cannot start worker pool: {e}")))?;

        let result = pool.install(|| self.execute(events));
        if matches!(result, Err(PhotoFlowError::Scan(ScanError::Cancelled))) {
            info!("run cancelled");
            events.send(Event::Pipeline(PipelineEvent::Cancelled));
        }
        result
    }

    fn execute(&self, events: &EventSender) -> Result<PipelineResult, PhotoFlowError> {
        let start_time = Instant::now();
        let mut result = PipelineResult::default();

        events.send(Event::Pipeline(PipelineEvent::Started));
        info!(
            source = %self.config.source.display(),
            output = %self.config.output.display(),
            "organize run started"
        );

        // Phase 1: Scanning
        self.enter_phase(PipelinePhase::Scanning, events);
        let scanner = WalkDirScanner::new(ScanConfig {
            include_hidden: self.config.include_hidden,
            max_depth: None,
            exclude: vec![self.config.output.clone()],
        })
        .with_cancellation(self.cancel.clone());
        let scan_result = scanner.scan_with_events(&self.config.source, events)?;

        result
            .errors
            .extend(scan_result.errors.iter().map(ToString::to_string));
        result.files_scanned = scan_result.files.len();

        if scan_result.files.is_empty() {
            return Ok(self.finish(result, start_time, events));
        }
        self.checkpoint()?;

        // Phase 2: Hashing
        self.enter_phase(PipelinePhase::Hashing, events);
        let (records, hash_errors) = self.hash_files(&scan_result.files, events);
        for error in hash_errors {
            result.errors.push(error.to_string());
        }
        self.checkpoint()?;

        // Phase 3: Grouping
        self.enter_phase(PipelinePhase::Grouping, events);
        let groups = Deduplicator::new().group(records);
        result.duplicate_groups = groups.len();
        result.duplicates = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        debug!(
            groups = result.duplicate_groups,
            duplicates = result.duplicates,
            "grouped by content"
        );
        self.checkpoint()?;

        // Phase 4: Organizing
        self.enter_phase(PipelinePhase::Organizing, events);
        events.send(Event::Organize(OrganizeEvent::Started {
            total_groups: groups.len(),
        }));

        let organizer = OutputOrganizer::new(&self.config.output, self.config.link_mode);
        let planned: Vec<(&FileRecord, Result<Placement<'_>, PhotoFlowError>)> = groups
            .par_iter()
            .filter_map(|group| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                Some((group.canonical(), self.plan_group(group, organizer.layout(), events)))
            })
            .collect();
        self.checkpoint()?;

        // Groups that claim the same link name are placed one at a time,
        // oldest canonical first, so the same file wins on every run.
        let mut claims: BTreeMap<PathBuf, Vec<Placement<'_>>> = BTreeMap::new();
        for (canonical, plan) in planned {
            match plan {
                Ok(placement) => {
                    if placement.cache_hit {
                        result.cache_hits += 1;
                    }
                    claims.entry(placement.link.clone()).or_default().push(placement);
                }
                Err(e) => {
                    self.report_failure(&canonical.path, &e, events);
                    result.errors.push(format!("{}: {e}", canonical.path.display()));
                }
            }
        }

        let outcomes: Vec<GroupOutcome> = claims
            .into_par_iter()
            .flat_map_iter(|(_, mut claimants)| {
                claimants.sort_by(|a, b| a.canonical.canonical_cmp(b.canonical));
                claimants
                    .into_iter()
                    .filter(|_| !self.cancel.is_cancelled())
                    .map(|placement| self.place_group(placement, &organizer, events))
                    .collect::<Vec<_>>()
            })
            .collect();

        for outcome in outcomes {
            match outcome.link {
                Ok(LinkOutcome::Created(_)) => result.links_created += 1,
                Ok(LinkOutcome::AlreadyPresent(_)) => result.links_existing += 1,
                Ok(LinkOutcome::Conflict(link)) => {
                    result.collisions += 1;
                    result.errors.push(format!(
                        "{}: {} is taken by a different file",
                        outcome.canonical.display(),
                        link.display()
                    ));
                }
                Err(e) => result
                    .errors
                    .push(format!("{}: {e}", outcome.canonical.display())),
            }
        }
        self.checkpoint()?;

        events.send(Event::Organize(OrganizeEvent::Completed {
            links_created: result.links_created,
        }));

        Ok(self.finish(result, start_time, events))
    }

    fn hash_files(
        &self,
        files: &[MediaFile],
        events: &EventSender,
    ) -> (Vec<FileRecord>, Vec<HashError>) {
        let total = files.len();
        events.send(Event::Hash(HashEvent::Started { total_files: total }));

        let hasher = ContentHasher::new();
        let completed = AtomicUsize::new(0);

        let hashed: Vec<Result<FileRecord, HashError>> = files
            .par_iter()
            .filter_map(|file| {
                if self.cancel.is_cancelled() {
                    return None;
                }

                let outcome = hasher
                    .hash_file(&file.path)
                    .map(|hash| FileRecord::new(&file.path, hash, file.modified));

                match &outcome {
                    Ok(_) => {
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        events.send(Event::Hash(HashEvent::Progress(HashProgress {
                            completed: done,
                            total,
                            current_path: file.path.clone(),
                        })));
                    }
                    Err(e) => {
                        warn!(path = %file.path.display(), error = %e, "skipping unreadable file");
                        events.send(Event::Hash(HashEvent::Error {
                            path: file.path.clone(),
                            message: e.to_string(),
                        }));
                    }
                }
                Some(outcome)
            })
            .collect();

        let mut records = Vec::with_capacity(hashed.len());
        let mut errors = Vec::new();
        for entry in hashed {
            match entry {
                Ok(record) => records.push(record),
                Err(e) => errors.push(e),
            }
        }

        events.send(Event::Hash(HashEvent::Completed {
            total_hashed: records.len(),
        }));
        (records, errors)
    }

    /// Resolve a group's metadata and the link it should get
    fn plan_group<'a>(
        &self,
        group: &'a DuplicateGroup,
        layout: &OutputLayout,
        events: &EventSender,
    ) -> Result<Placement<'a>, PhotoFlowError> {
        let canonical = group.canonical();
        let (raw, cache_hit) = self.resolve_metadata(canonical, events)?;
        let metadata = MetadataResult {
            device: self.config.aliases.resolve(&raw.device).to_string(),
            ..raw
        };
        let link = layout.link_path(&canonical.path, &metadata)?;

        Ok(Placement {
            canonical,
            metadata,
            link,
            cache_hit,
        })
    }

    fn place_group(
        &self,
        placement: Placement<'_>,
        organizer: &OutputOrganizer,
        events: &EventSender,
    ) -> GroupOutcome {
        let canonical = placement.canonical;
        let link = organizer
            .materialize(canonical, &placement.metadata)
            .map_err(PhotoFlowError::from);

        match &link {
            Ok(LinkOutcome::Created(path)) => {
                debug!(link = %path.display(), target = %canonical.path.display(), "linked");
                events.send(Event::Organize(OrganizeEvent::Linked {
                    link: path.clone(),
                    target: canonical.path.clone(),
                }));
            }
            Ok(LinkOutcome::AlreadyPresent(path)) => {
                events.send(Event::Organize(OrganizeEvent::AlreadyPresent { link: path.clone() }));
            }
            Ok(LinkOutcome::Conflict(path)) => {
                events.send(Event::Organize(OrganizeEvent::Collision {
                    link: path.clone(),
                    target: canonical.path.clone(),
                }));
            }
            Err(e) => self.report_failure(&canonical.path, e, events),
        }

        GroupOutcome {
            canonical: canonical.path.clone(),
            link,
        }
    }

    fn report_failure(&self, path: &Path, error: &PhotoFlowError, events: &EventSender) {
        warn!(path = %path.display(), %error, "could not organize file");
        events.send(Event::Organize(OrganizeEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        }));
    }

    /// Un-aliased metadata for a canonical file, and whether it was cached
    fn resolve_metadata(
        &self,
        canonical: &FileRecord,
        events: &EventSender,
    ) -> Result<(MetadataResult, bool), MetadataError> {
        match self.cache.lookup(&canonical.hash) {
            Ok(Some(entry)) => {
                debug!(hash = %canonical.hash.short(), "metadata served from cache");
                events.send(Event::Organize(OrganizeEvent::CacheHit {
                    hash: canonical.hash.to_string(),
                }));
                return Ok((entry.metadata, true));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(hash = %canonical.hash.short(), error = %e, "cache lookup failed, extracting");
            }
        }

        let Some(extractor) = MetadataExtractor::for_path(&canonical.path) else {
            let result = metadata::fallback(canonical.modified).ok_or_else(|| {
                MetadataError::ModifiedTimeOutOfRange {
                    path: canonical.path.clone(),
                }
            })?;
            return Ok((result, false));
        };
        let extraction = extractor.extract(&canonical.path, canonical.modified)?;

        // Results that depend on the modification time are not keyed by content alone.
        if extraction.is_content_derived() {
            let entry = CacheEntry::new(
                canonical.hash.clone(),
                &canonical.path,
                extraction.result.clone(),
            );
            if let Err(e) = self.cache.store(&entry) {
                warn!(hash = %canonical.hash.short(), error = %e, "could not cache metadata");
            }
        }

        Ok((extraction.result, false))
    }

    fn enter_phase(&self, phase: PipelinePhase, events: &EventSender) {
        info!(%phase, "entering phase");
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
    }

    fn checkpoint(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn finish(&self, mut result: PipelineResult, start_time: Instant, events: &EventSender) -> PipelineResult {
        result.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            files_scanned = result.files_scanned,
            duplicate_groups = result.duplicate_groups,
            duplicates = result.duplicates,
            links_created = result.links_created,
            links_existing = result.links_existing,
            collisions = result.collisions,
            cache_hits = result.cache_hits,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "organize run finished"
        );

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: result.summary(),
        }));
        result
    }
}
