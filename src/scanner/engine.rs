//! The incremental scan engine.
//!
//! # Overview
//!
//! A [`Scan`] owns the live [`FileMap`] and the [`GroupingIndex`] derived
//! from it. [`Scan::run`] brings the map up to date with the filesystem in
//! four cooperating roles:
//!
//! 1. **Cleaner** (single-threaded, first): drops descriptors whose file no
//!    longer exists.
//! 2. **Enumerator** (the calling thread): walks every root and sends one
//!    [`FileJob`] per regular file down an unbounded dispatch queue, counting
//!    what it sends. When the walk is done it closes the queue and announces
//!    the total on a one-shot channel.
//! 3. **Workers** (exactly `workers` threads): build a fresh descriptor per
//!    job and either inherit the cached digest (size and mtime unchanged) or
//!    hash the file. Every job yields exactly one outcome, failures included.
//!    The previous descriptor is looked up by key first and by absolute path
//!    second, so a map written from another working directory still hits.
//! 4. **Collector**: buffers outcomes until the number received equals the
//!    announced total.
//!
//! Workers only read the previous map; nothing writes it while they run. The
//! buffered descriptors are merged by key after every thread has joined, and
//! the index is rebuilt from scratch. A merged descriptor replaces any older
//! entry for the same absolute path stored under a different key.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::scanner::{Scan, ScanConfig};
//!
//! let mut scan = Scan::new(ScanConfig::default());
//! scan.add_root("./music");
//! let first = scan.run();
//! let second = scan.run();
//! assert_eq!(second.hashed, 0); // nothing changed, every digest reused
//! # let _ = first;
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use super::descriptor::{FileDescriptor, FileMap};
use super::hasher::DigestAlgorithm;
use super::walker::{FileJob, Walker};
use super::{HashError, ScanError};
use crate::duplicates::{GroupingIndex, SortKey, SortOrder};
use crate::progress::ScanProgress;

/// What to do about files that disappear between the walk and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VanishedPolicy {
    /// Log a warning and drop the file
    #[default]
    Warn,
    /// Drop the file, logging at debug level only
    Ignore,
    /// Fail the scan (see [`Scan::run_checked`])
    Fatal,
}

/// Configuration for a scan session.
///
/// # Example
///
/// ```
/// use dupefinder::duplicates::SortKey;
/// use dupefinder::scanner::{DigestAlgorithm, ScanConfig};
///
/// let config = ScanConfig::default()
///     .with_workers(8)
///     .with_algorithm(DigestAlgorithm::Sha256)
///     .with_sort(SortKey::Size)
///     .with_reverse(true);
/// assert_eq!(config.workers(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    workers: usize,
    algorithm: DigestAlgorithm,
    order: SortOrder,
    vanished: VanishedPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            algorithm: DigestAlgorithm::default(),
            order: SortOrder::default(),
            vanished: VanishedPolicy::default(),
        }
    }
}

impl ScanConfig {
    /// Set the number of hashing workers (clamped to at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the content digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the sort key used inside each digest bucket.
    #[must_use]
    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.order.key = key;
        self
    }

    /// Invert the bucket ordering.
    #[must_use]
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.order.reverse = reverse;
        self
    }

    /// Set the handling of files that vanish before they are hashed.
    #[must_use]
    pub fn with_vanished(mut self, policy: VanishedPolicy) -> Self {
        self.vanished = policy;
        self
    }

    /// Number of hashing workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Active digest algorithm.
    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Bucket ordering.
    #[must_use]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Vanished-file policy.
    #[must_use]
    pub fn vanished(&self) -> VanishedPolicy {
        self.vanished
    }
}

/// A file that was dispatched but could not be hashed.
#[derive(Debug)]
pub struct HashFailure {
    /// Path of the file
    pub path: PathBuf,
    /// What went wrong
    pub error: HashError,
}

/// What a call to [`Scan::run`] did.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Descriptors dropped by the cleaner because their file vanished
    pub removed: Vec<Arc<FileDescriptor>>,
    /// Files handed to the worker pool
    pub dispatched: u64,
    /// Files whose content was read and hashed (cache misses)
    pub hashed: u64,
    /// Files that inherited a cached digest (cache hits)
    pub reused: u64,
    /// Files dropped because hashing failed
    pub failures: Vec<HashFailure>,
    /// Files that disappeared after the walk found them
    pub vanished: Vec<PathBuf>,
    /// Directories or files the walk could not read
    pub walk_errors: u64,
    /// Wall-clock time of the whole run
    pub duration: Duration,
}

impl ScanReport {
    /// Number of files that failed to hash.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    /// Fail under [`VanishedPolicy::Fatal`] if any file vanished.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Vanished`] naming the first vanished file.
    pub fn check_vanished(&self, policy: VanishedPolicy) -> Result<(), ScanError> {
        match (policy, self.vanished.first()) {
            (VanishedPolicy::Fatal, Some(path)) => Err(ScanError::Vanished(path.clone())),
            _ => Ok(()),
        }
    }
}

/// Result of processing one dispatched file.
enum Outcome {
    Hashed(FileDescriptor),
    Reused(FileDescriptor),
    Vanished(PathBuf),
    Failed { path: PathBuf, error: HashError },
}

impl Outcome {
    fn path(&self) -> &Path {
        match self {
            Self::Hashed(desc) | Self::Reused(desc) => &desc.key,
            Self::Vanished(path) | Self::Failed { path, .. } => path,
        }
    }
}

/// Everything the collector buffered.
#[derive(Default)]
struct Collected {
    descriptors: Vec<FileDescriptor>,
    hashed: u64,
    reused: u64,
    failures: Vec<HashFailure>,
    vanished: Vec<PathBuf>,
}

impl Collected {
    fn record(&mut self, outcome: Outcome, policy: VanishedPolicy) {
        match outcome {
            Outcome::Hashed(desc) => {
                self.hashed += 1;
                self.descriptors.push(desc);
            }
            Outcome::Reused(desc) => {
                self.reused += 1;
                self.descriptors.push(desc);
            }
            Outcome::Vanished(path) => {
                match policy {
                    VanishedPolicy::Warn => {
                        log::warn!("File vanished before it could be hashed: {}", path.display());
                    }
                    VanishedPolicy::Ignore => {
                        log::debug!("File vanished before it could be hashed: {}", path.display());
                    }
                    VanishedPolicy::Fatal => {
                        log::error!("File vanished before it could be hashed: {}", path.display());
                    }
                }
                self.vanished.push(path);
            }
            Outcome::Failed { path, error } => {
                log::warn!("Failed to hash {}: {}", path.display(), error);
                self.failures.push(HashFailure { path, error });
            }
        }
    }
}

/// Read-only view of the previous file set used for cache lookups.
struct Cache<'a> {
    by_key: &'a FileMap,
    by_absolute: HashMap<&'a Path, &'a FileDescriptor>,
}

impl<'a> Cache<'a> {
    /// Index `files` by key and absolute path. `dropped` holds descriptors
    /// the cleaner removed; they can still match by absolute path.
    fn new(files: &'a FileMap, dropped: &'a [Arc<FileDescriptor>]) -> Self {
        let by_absolute = dropped
            .iter()
            .chain(files.values())
            .filter(|desc| !desc.absolute_path.as_os_str().is_empty())
            .map(|desc| (desc.absolute_path.as_path(), desc.as_ref()))
            .collect();
        Self {
            by_key: files,
            by_absolute,
        }
    }

    /// Previous descriptor for `desc`: same key, else same absolute path.
    fn lookup(&self, desc: &FileDescriptor) -> Option<&'a FileDescriptor> {
        match self.by_key.get(&desc.key) {
            Some(old) => Some(old.as_ref()),
            None => self.by_absolute.get(desc.absolute_path.as_path()).copied(),
        }
    }
}

/// A scan session: the live file set plus its grouping index.
pub struct Scan {
    roots: Vec<PathBuf>,
    files: FileMap,
    index: GroupingIndex,
    config: ScanConfig,
    progress: Option<Arc<dyn ScanProgress>>,
}

impl Scan {
    /// Create an empty session.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self::with_files(config, FileMap::new())
    }

    /// Create a session seeded with previously known descriptors.
    ///
    /// The grouping index is built immediately, so a seeded session can be
    /// classified without running a walk.
    #[must_use]
    pub fn with_files(config: ScanConfig, files: FileMap) -> Self {
        let index = GroupingIndex::build(&files, config.order());
        Self {
            roots: Vec::new(),
            files,
            index,
            config,
            progress: None,
        }
    }

    /// Attach a progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ScanProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Add a root directory to walk.
    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    /// Roots walked by [`run`](Self::run).
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The live file set.
    #[must_use]
    pub fn files(&self) -> &FileMap {
        &self.files
    }

    /// Consume the session, returning the file set.
    #[must_use]
    pub fn into_files(self) -> FileMap {
        self.files
    }

    /// Look up a descriptor by key.
    #[must_use]
    pub fn get(&self, key: &Path) -> Option<&Arc<FileDescriptor>> {
        self.files.get(key)
    }

    /// Number of known files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// `true` if no files are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Current grouping index.
    #[must_use]
    pub fn index(&self) -> &GroupingIndex {
        &self.index
    }

    /// Change the bucket ordering and rebuild the index.
    pub fn set_order(&mut self, order: SortOrder) {
        self.config.order = order;
        self.rebuild_index();
    }

    /// Recompute the grouping index from the current file set.
    pub fn rebuild_index(&mut self) {
        self.index = GroupingIndex::build(&self.files, self.config.order());
    }

    /// Remove descriptors whose file no longer exists, returning them.
    ///
    /// Rebuilds the index when anything was removed.
    pub fn clean(&mut self) -> Vec<Arc<FileDescriptor>> {
        let stale: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(_, desc)| !desc.exists())
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for key in stale {
            if let Some(desc) = self.files.remove(&key) {
                log::debug!("Removed vanished file: {}", key.display());
                removed.push(desc);
            }
        }

        if !removed.is_empty() {
            self.rebuild_index();
        }
        removed
    }

    /// Run a full scan: clean, walk, hash, merge, rebuild the index.
    ///
    /// Blocks until every dispatched file is accounted for. Per-file walk and
    /// hash errors are logged and counted in the report; they never abort the
    /// scan.
    pub fn run(&mut self) -> ScanReport {
        let start = Instant::now();
        let removed = self.clean();

        let walker = Walker::new(&self.roots);
        let workers = self.config.workers().max(1);
        let algorithm = self.config.algorithm();
        let policy = self.config.vanished();
        let cache = Cache::new(&self.files, &removed);
        let previous = &cache;
        let progress = self.progress.as_deref();

        log::info!(
            "Scanning {} root(s) with {} worker(s) using {}",
            self.roots.len(),
            workers,
            algorithm
        );

        let (job_tx, job_rx) = unbounded::<FileJob>();
        let (outcome_tx, outcome_rx) = unbounded::<Outcome>();
        let (total_tx, total_rx) = bounded::<u64>(1);

        let (collected, dispatched, walk_errors) = thread::scope(|scope| {
            let mut pool = Vec::with_capacity(workers);
            for id in 0..workers {
                let jobs = job_rx.clone();
                let outcomes = outcome_tx.clone();
                pool.push(scope.spawn(move || {
                    worker_loop(id, &jobs, &outcomes, previous, algorithm);
                }));
            }
            drop(job_rx);
            drop(outcome_tx);

            let collector =
                scope.spawn(move || collect(&outcome_rx, &total_rx, progress, policy));

            let mut dispatched = 0u64;
            let mut walk_errors = 0u64;
            for entry in walker.walk() {
                match entry {
                    Ok(job) => {
                        if let Some(progress) = progress {
                            progress.on_file_dispatched(&job.path.to_string_lossy());
                        }
                        if job_tx.send(job).is_err() {
                            log::error!("All hashing workers exited; stopping the walk");
                            break;
                        }
                        dispatched += 1;
                    }
                    Err(_) => walk_errors += 1,
                }
            }
            drop(job_tx);

            log::debug!("Walk finished: {} file(s) dispatched", dispatched);
            if let Some(progress) = progress {
                progress.on_walk_finished(dispatched);
            }
            if total_tx.send(dispatched).is_err() {
                log::debug!("Collector exited before the dispatch total was announced");
            }
            drop(total_tx);

            for worker in pool {
                if let Err(panic) = worker.join() {
                    std::panic::resume_unwind(panic);
                }
            }
            let collected = match collector.join() {
                Ok(collected) => collected,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            (collected, dispatched, walk_errors)
        });

        drop(cache);
        let hashed = collected.hashed;
        let reused = collected.reused;
        let failures = collected.failures;
        let vanished = collected.vanished;
        self.merge(collected.descriptors);

        if let Some(progress) = self.progress.as_deref() {
            progress.on_scan_finished();
        }

        let report = ScanReport {
            removed,
            dispatched,
            hashed,
            reused,
            failures,
            vanished,
            walk_errors,
            duration: start.elapsed(),
        };
        log::info!(
            "Scan complete: {} file(s), {} hashed, {} reused, {} failed in {:.2?}",
            self.files.len(),
            report.hashed,
            report.reused,
            report.failed(),
            report.duration
        );
        report
    }

    /// Re-read metadata for the files an action just touched.
    ///
    /// `touched` holds action paths (see [`FileDescriptor::action_path`]).
    /// Files that are gone are dropped. Files that still exist take their new
    /// storage identity and mtime but keep their digest, since an action never
    /// changes content.
    pub fn refresh_after_action(&mut self, touched: &[PathBuf]) {
        if touched.is_empty() {
            return;
        }
        let targets: HashSet<&Path> = touched.iter().map(PathBuf::as_path).collect();
        let keys: Vec<PathBuf> = self
            .files
            .values()
            .filter(|desc| targets.contains(desc.action_path()))
            .map(|desc| desc.key.clone())
            .collect();

        for key in keys {
            let refreshed = match fs::symlink_metadata(&key) {
                Ok(metadata) if metadata.is_file() => self.files.get(&key).map(|old| {
                    let mut desc = FileDescriptor::from_metadata(key.clone(), &metadata);
                    desc.inherit_digest(old);
                    if !old.absolute_path.as_os_str().is_empty() {
                        desc.absolute_path.clone_from(&old.absolute_path);
                    }
                    desc
                }),
                _ => None,
            };
            match refreshed {
                Some(desc) => {
                    self.files.insert(key, Arc::new(desc));
                }
                None => {
                    log::debug!("Dropped {} after action", key.display());
                    self.files.remove(&key);
                }
            }
        }
        self.rebuild_index();
    }

    /// [`run`](Self::run), failing if a file vanished under
    /// [`VanishedPolicy::Fatal`].
    ///
    /// The session is updated either way; the error only tells the caller to
    /// stop before acting on the result.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Vanished`] naming the first vanished file.
    pub fn run_checked(&mut self) -> Result<ScanReport, ScanError> {
        let report = self.run();
        report.check_vanished(self.config.vanished())?;
        Ok(report)
    }

    /// Move the session onto a background thread and start [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(mut self) -> io::Result<ScanHandle> {
        let handle = thread::Builder::new()
            .name("dupefinder-scan".to_string())
            .spawn(move || {
                let report = self.run();
                (self, report)
            })?;
        Ok(ScanHandle { handle })
    }

    /// Upsert collected descriptors by key and rebuild the index.
    ///
    /// An existing entry for the same absolute path under another key is
    /// removed, so each file is known under one key only.
    fn merge(&mut self, descriptors: Vec<FileDescriptor>) {
        let superseded: HashMap<PathBuf, PathBuf> = {
            let fresh: HashSet<&Path> = descriptors.iter().map(|d| d.key.as_path()).collect();
            self.files
                .values()
                .filter(|d| !d.absolute_path.as_os_str().is_empty())
                .filter(|d| !fresh.contains(d.key.as_path()))
                .map(|d| (d.absolute_path.clone(), d.key.clone()))
                .collect()
        };

        self.files.reserve(descriptors.len());
        for desc in descriptors {
            if let Some(old_key) = superseded.get(&desc.absolute_path) {
                if self.files.remove(old_key).is_some() {
                    log::debug!("{} is now known as {}", old_key.display(), desc.key.display());
                }
            }
            self.files.insert(desc.key.clone(), Arc::new(desc));
        }
        self.rebuild_index();
    }
}

/// Handle to a scan running on a background thread.
#[derive(Debug)]
pub struct ScanHandle {
    handle: JoinHandle<(Scan, ScanReport)>,
}

impl ScanHandle {
    /// `true` once the scan thread has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the scan completes and take back the session.
    ///
    /// A panic on the scan thread is propagated to the caller.
    pub fn join(self) -> (Scan, ScanReport) {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl std::fmt::Debug for Scan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scan")
            .field("roots", &self.roots)
            .field("files", &self.files.len())
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

/// Consume jobs until the dispatch queue is closed and drained.
fn worker_loop(
    id: usize,
    jobs: &Receiver<FileJob>,
    outcomes: &Sender<Outcome>,
    previous: &Cache<'_>,
    algorithm: DigestAlgorithm,
) {
    let mut processed = 0usize;
    for job in jobs {
        let outcome = process_job(job, previous, algorithm);
        if outcomes.send(outcome).is_err() {
            break;
        }
        processed += 1;
    }
    log::trace!("Worker {} finished after {} file(s)", id, processed);
}

/// Build the descriptor for one job, reusing the cached digest when possible.
fn process_job(job: FileJob, previous: &Cache<'_>, algorithm: DigestAlgorithm) -> Outcome {
    let mut desc = FileDescriptor::from_metadata(job.path, &job.metadata);

    if let Some(old) = previous.lookup(&desc) {
        if old.is_hashed() && desc.looks_identical(old) {
            desc.inherit_digest(old);
            log::trace!("Cache hit: {}", desc.key.display());
            return Outcome::Reused(desc);
        }
    }

    log::trace!("Hashing: {}", desc.key.display());
    match desc.compute_digest(algorithm) {
        Ok(()) => Outcome::Hashed(desc),
        Err(HashError::NotFound(_)) => Outcome::Vanished(desc.key),
        Err(error) => Outcome::Failed {
            path: desc.key,
            error,
        },
    }
}

/// Receive outcomes until the count matches the announced total.
///
/// Also stops if every worker has exited and no more outcomes can arrive,
/// which only happens when a worker panicked or the enumerator died.
fn collect(
    outcomes: &Receiver<Outcome>,
    total: &Receiver<u64>,
    progress: Option<&dyn ScanProgress>,
    policy: VanishedPolicy,
) -> Collected {
    let mut collected = Collected::default();
    let mut received = 0u64;
    let mut expected: Option<u64> = None;
    let mut workers_done = false;
    let mut announcer_gone = false;

    let no_outcomes = never::<Outcome>();
    let no_total = never::<u64>();

    loop {
        if expected == Some(received) {
            break;
        }
        if workers_done && (expected.is_some() || announcer_gone) {
            log::warn!(
                "Collected {} of {:?} results before the worker pool shut down",
                received,
                expected
            );
            break;
        }

        let outcome_source = if workers_done { &no_outcomes } else { outcomes };
        let total_source = if expected.is_some() || announcer_gone {
            &no_total
        } else {
            total
        };

        select! {
            recv(outcome_source) -> message => match message {
                Ok(outcome) => {
                    received += 1;
                    if let Some(progress) = progress {
                        progress.on_file_completed(received, &outcome.path().to_string_lossy());
                    }
                    collected.record(outcome, policy);
                }
                Err(_) => workers_done = true,
            },
            recv(total_source) -> message => match message {
                Ok(count) => expected = Some(count),
                Err(_) => announcer_gone = true,
            },
        }
    }

    collected
}
