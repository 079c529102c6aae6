use crate::config::{self, AppConfig};
use crate::error::Error;
use crate::hasher::{Blake3Hasher, ContentHasher};
use crate::progress::ProgressReporter;
use crate::scanner::Walker;
use crate::storage::models::{CreateOutcome, NewFileRecord};
use crate::storage::Database;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Incremental catalog pass: walk, hash what is new, insert.
///
/// Existing records are never touched, so repeated or concurrent passes over
/// the same tree converge on one record per path.
pub struct ScanEngine<'a> {
    db: &'a Database,
    hasher: Box<dyn ContentHasher>,
    ignore_patterns: Vec<String>,
    follow_links: bool,
    cancel_token: Arc<AtomicBool>,
}

#[derive(Debug, Default, Clone)]
pub struct ScanResult {
    pub files_seen: usize,
    pub created: usize,
    pub already_cataloged: usize,
    /// Files whose metadata or content could not be read. They are still
    /// cataloged, without a fingerprint.
    pub unreadable: usize,
    /// Directories or entries the walk had to skip, including files whose
    /// path is not valid UTF-8.
    pub walk_errors: usize,
    pub duration: Duration,
    /// The cancel token stopped the pass early. The counts cover the files
    /// handled before it did.
    pub cancelled: bool,
}

impl ScanResult {
    fn absorb(&mut self, other: ScanResult) {
        self.files_seen += other.files_seen;
        self.created += other.created;
        self.already_cataloged += other.already_cataloged;
        self.unreadable += other.unreadable;
        self.walk_errors += other.walk_errors;
        self.duration += other.duration;
        self.cancelled |= other.cancelled;
    }
}

impl<'a> ScanEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            hasher: Box::new(Blake3Hasher::default()),
            ignore_patterns: Vec::new(),
            follow_links: false,
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(db: &'a Database, config: &AppConfig) -> Self {
        Self::new(db)
            .with_hasher(Blake3Hasher::new(config.hash_chunk_size))
            .with_ignore_patterns(config.ignore_patterns.clone())
            .with_follow_links(config.follow_links)
    }

    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Setting the token stops the pass before the next file.
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_token = token;
        self
    }

    /// Scan several roots, skipping any root nested inside another. Roots are
    /// resolved first so that aliases of one directory are walked once. A
    /// cancelled root ends the run with the totals gathered so far.
    pub fn scan_all(
        &self,
        roots: &[PathBuf],
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        // Unresolvable roots are kept as given so `scan` reports them.
        let resolved: Vec<PathBuf> = roots
            .iter()
            .map(|root| fs::canonicalize(root).unwrap_or_else(|_| root.clone()))
            .collect();
        let roots = config::non_overlapping_directories(&resolved);
        info!("Processing directories: {:?}", roots);

        let mut total = ScanResult::default();
        for root in &roots {
            total.absorb(self.scan(root, reporter)?);
            if total.cancelled {
                break;
            }
        }
        Ok(total)
    }

    pub fn scan(&self, root: &Path, reporter: &dyn ProgressReporter) -> Result<ScanResult, Error> {
        let walker = Walker::new(root)
            .with_ignore_patterns(&self.ignore_patterns)
            .with_follow_links(self.follow_links);
        let mut files = walker.walk().map_err(|e| {
            warn!("Cannot scan {}: {}", root.display(), e);
            Error::InvalidRoot(root.to_path_buf())
        })?;

        info!("Scanning {}", root.display());
        reporter.on_scan_start(root);
        let start = Instant::now();
        let mut result = ScanResult::default();

        for path in files.by_ref() {
            if self.cancel_token.load(Ordering::Relaxed) {
                result.cancelled = true;
                break;
            }

            result.files_seen += 1;
            reporter.on_file_visited(result.files_seen, &path);

            if self.catalog_file(&path, &mut result)? {
                reporter.on_file_cataloged(result.created, &path);
            }
        }

        result.walk_errors += files.skipped();
        result.duration = start.elapsed();
        reporter.on_scan_complete(
            result.created,
            result.files_seen,
            result.duration.as_secs_f64(),
        );
        info!(
            "Scan of {} {} in {:.2}s: {} seen, {} new, {} already cataloged, {} unreadable, {} walk errors",
            root.display(),
            if result.cancelled { "cancelled" } else { "completed" },
            result.duration.as_secs_f64(),
            result.files_seen,
            result.created,
            result.already_cataloged,
            result.unreadable,
            result.walk_errors,
        );

        Ok(result)
    }

    /// Returns `true` when a new record was inserted. Read failures are
    /// absorbed into `result`; store failures propagate.
    fn catalog_file(&self, path: &Path, result: &mut ScanResult) -> Result<bool, Error> {
        let Some(mut record) = NewFileRecord::from_path(path, 0, None) else {
            warn!("Skipping {}: path is not valid UTF-8", path.display());
            result.walk_errors += 1;
            return Ok(false);
        };
        if self.db.exists(&record.path)? {
            result.already_cataloged += 1;
            return Ok(false);
        }

        let (size, fingerprint) = match fs::metadata(path) {
            Ok(metadata) => match self.hasher.fingerprint(path) {
                Ok(fingerprint) => (metadata.len(), Some(fingerprint)),
                Err(e) => {
                    warn!("Could not hash {}: {}", path.display(), e);
                    result.unreadable += 1;
                    (metadata.len(), None)
                }
            },
            Err(e) => {
                warn!("Could not read metadata for {}: {}", path.display(), e);
                result.unreadable += 1;
                (0, None)
            }
        };

        record.size_bytes = size as i64;
        record.fingerprint = fingerprint;
        match self.db.try_create(&record)? {
            CreateOutcome::Created(id) => {
                debug!("Cataloged {} (id {})", path.display(), id);
                result.created += 1;
                Ok(true)
            }
            CreateOutcome::AlreadyExists => {
                debug!("{} was cataloged concurrently, skipping", path.display());
                result.already_cataloged += 1;
                Ok(false)
            }
        }
    }
}
