//! The scan pipeline: walk, fingerprint, classify, relocate, log.
//!
//! Candidates come off the walker in bounded batches. A batch is hashed on a
//! rayon pool, then classified and relocated one file at a time in traversal
//! order, so the registry and the quarantine directory only ever see a
//! single writer.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::{HumanBytes, HumanCount, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::audit::{AuditLog, LOG_FILE_NAME, TransactionRecord};
use crate::config::ScanOptions;
use crate::duplicates::{Classification, Registry};
use crate::error::{Result, ScanError};
use crate::exclusion::ExclusionSet;
use crate::fingerprint::{ContentIdentity, fingerprint_file};
use crate::relocate::{QUARANTINE_DIR_NAME, Relocator};
use crate::utils::format_elapsed;
use crate::walker::{ScanFilter, Walker};

/// Files hashed per batch, per worker.
const BATCH_PER_THREAD: usize = 8;

/// Roots with a scan currently running in this process.
static ACTIVE_SCANS: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Original,
    Relocated(TransactionRecord),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Files successfully fingerprinted.
    pub files_scanned: u64,
    pub originals: u64,
    /// Duplicates moved, or reported in a dry run. Failed moves count
    /// under `errors` only.
    pub duplicates: u64,
    pub errors: u64,
    pub duplicate_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub quarantine_dir: PathBuf,
    pub log_path: PathBuf,
    pub dry_run: bool,
    pub started_at: String,
    pub records: Vec<TransactionRecord>,
    pub stats: ScanStats,
    /// Set when an abort request stopped the scan early. The records and
    /// the audit log then cover only the files processed before the stop.
    pub interrupted: bool,
    #[serde(skip)]
    pub log_error: Option<ScanError>,
}

impl ScanReport {
    pub fn log_written(&self) -> bool {
        self.log_error.is_none()
    }

    pub fn moved(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r, TransactionRecord::Moved { .. }))
    }

    pub fn errors(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.records.iter().filter(|r| r.is_error())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize scan report")
    }
}

/// Scans `root_folder`, quarantining duplicates unless `dry_run` is set.
///
/// The returned records are also written to `<root>/duplicates_log.txt`.
pub fn scan(root_folder: &Path, exclude_folders: &[PathBuf], dry_run: bool) -> Result<ScanReport> {
    let options = ScanOptions::new()
        .exclude(exclude_folders.iter().cloned())
        .dry_run(dry_run);
    scan_with_options(root_folder, &options)
}

pub fn scan_with_options(root_folder: &Path, options: &ScanOptions) -> Result<ScanReport> {
    let start_time = Instant::now();
    let started_at = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc3339)
        .unwrap_or_default();

    let root = resolve_root(root_folder)?;
    let _guard = ScanGuard::acquire(&root)?;
    let exclusions = ExclusionSet::resolve(&options.exclude)?;
    if !exclusions.is_empty() {
        debug!("Excluding {:?}", exclusions.iter().collect::<Vec<_>>());
    }

    let quarantine_dir = root.join(QUARANTINE_DIR_NAME);
    let log_path = root.join(LOG_FILE_NAME);
    let filter = ScanFilter::new(exclusions, quarantine_dir.clone(), log_path.clone());

    info!(
        "Scanning {}{}",
        root.display(),
        if options.dry_run { " (dry run)" } else { "" }
    );

    let mut pipeline = Pipeline::new(Relocator::new(quarantine_dir.clone(), options.dry_run));
    let hasher = BatchHasher::new(options.effective_threads());
    let progress = progress_bar(options.progress);

    let mut candidates = Walker::new(&root, &filter).candidates();
    let mut interrupted = false;
    'walk: loop {
        if options.abort_requested() {
            interrupted = true;
            break;
        }
        let batch: Vec<_> = candidates.by_ref().take(hasher.batch_size()).collect();
        if batch.is_empty() {
            break;
        }
        for item in hasher.fingerprint(batch) {
            if options.abort_requested() {
                interrupted = true;
                break 'walk;
            }
            pipeline.handle(item);
            progress.set_message(format!(
                "{} files scanned, {} duplicates",
                HumanCount(pipeline.stats.files_scanned),
                HumanCount(pipeline.stats.duplicates)
            ));
        }
    }
    progress.finish_and_clear();

    if interrupted {
        warn!("Scan aborted, audit log covers only the files processed so far");
    }

    let log_error = pipeline.log.persist(&log_path).err();
    if let Some(e) = &log_error {
        warn!("{}", e);
    }

    let stats = pipeline.stats;
    debug!("{} distinct contents", pipeline.registry.len());
    info!(
        "Scanned {} files: {} originals, {} duplicates ({}), {} errors in {}",
        HumanCount(stats.files_scanned),
        HumanCount(stats.originals),
        HumanCount(stats.duplicates),
        HumanBytes(stats.duplicate_bytes),
        HumanCount(stats.errors),
        format_elapsed(start_time.elapsed())
    );

    Ok(ScanReport {
        root,
        quarantine_dir,
        log_path,
        dry_run: options.dry_run,
        started_at,
        records: pipeline.log.into_records(),
        stats,
        interrupted,
        log_error,
    })
}

/// Canonical form of `root`, or `InvalidRoot` if it is not a readable directory.
fn resolve_root(root: &Path) -> Result<PathBuf> {
    let invalid = |source| ScanError::InvalidRoot {
        path: root.to_path_buf(),
        source,
    };

    let canonical = root.canonicalize().map_err(invalid)?;
    if !canonical.is_dir() {
        return Err(invalid(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }
    fs::read_dir(&canonical).map_err(invalid)?;
    Ok(canonical)
}

/// Marks a root as busy for the lifetime of the guard.
struct ScanGuard {
    root: PathBuf,
}

impl ScanGuard {
    fn acquire(root: &Path) -> Result<Self> {
        let mut active = ACTIVE_SCANS.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(root.to_path_buf()) {
            return Err(ScanError::ScanInProgress(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        ACTIVE_SCANS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.root);
    }
}

type Fingerprint = Result<(PathBuf, ContentIdentity)>;

/// Hashes batches of candidates, in parallel when more than one worker is
/// configured. Output order always matches input order.
struct BatchHasher {
    pool: Option<rayon::ThreadPool>,
    batch_size: usize,
}

impl BatchHasher {
    fn new(threads: usize) -> Self {
        let pool = if threads > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Failed to start {} hashing threads ({}), hashing sequentially", threads, e);
                    None
                }
            }
        } else {
            None
        };
        let workers = pool.as_ref().map_or(1, rayon::ThreadPool::current_num_threads);
        debug!("Fingerprinting with {} worker(s)", workers);

        Self {
            pool,
            batch_size: workers * BATCH_PER_THREAD,
        }
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn fingerprint(&self, batch: Vec<Result<PathBuf>>) -> Vec<Fingerprint> {
        fn hash(candidate: Result<PathBuf>) -> Fingerprint {
            let path = candidate?;
            let identity = fingerprint_file(&path)?;
            Ok((path, identity))
        }

        match &self.pool {
            Some(pool) => pool.install(|| batch.into_par_iter().map(hash).collect::<Vec<_>>()),
            None => batch.into_iter().map(hash).collect(),
        }
    }
}

struct Pipeline {
    registry: Registry,
    relocator: Relocator,
    log: AuditLog,
    stats: ScanStats,
}

impl Pipeline {
    fn new(relocator: Relocator) -> Self {
        Self {
            registry: Registry::new(),
            relocator,
            log: AuditLog::new(),
            stats: ScanStats::default(),
        }
    }

    fn handle(&mut self, item: Fingerprint) {
        let outcome = item.and_then(|(path, identity)| self.process(&path, identity));
        match outcome {
            Ok(FileOutcome::Original) => {}
            Ok(FileOutcome::Relocated(record)) => self.log.push(record),
            Err(e) => {
                warn!("{}", e);
                self.stats.errors += 1;
                self.log.push(TransactionRecord::error(&e));
            }
        }
    }

    fn process(&mut self, path: &Path, identity: ContentIdentity) -> Result<FileOutcome> {
        self.stats.files_scanned += 1;
        match self.registry.classify(path, identity) {
            Classification::Original => {
                self.stats.originals += 1;
                Ok(FileOutcome::Original)
            }
            Classification::Duplicate { original } => {
                let record = self.relocator.relocate(path, &original)?;
                self.stats.duplicates += 1;
                self.stats.duplicate_bytes += identity.size;
                Ok(FileOutcome::Relocated(record))
            }
        }
    }
}

fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Scanning files...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
