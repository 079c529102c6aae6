use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use walkdir::{DirEntry, FilterEntry, IntoIter, WalkDir};

type EntryFilter = Box<dyn FnMut(&DirEntry) -> bool + Send>;

/// Recursive enumeration of regular files under one root.
///
/// Each call to [`Walker::walk`] is an independent traversal; nothing is
/// remembered between walks.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    ignore_patterns: Vec<Pattern>,
    follow_links: bool,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_patterns: Vec::new(),
            follow_links: false,
        }
    }

    /// Glob patterns matched against absolute paths. A matching directory is
    /// pruned with everything under it. Invalid globs are logged and dropped.
    pub fn with_ignore_patterns(mut self, globs: &[String]) -> Self {
        self.ignore_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Start a fresh traversal. Fails only if the root itself is not a
    /// readable directory; problems below the root become warnings.
    pub fn walk(&self) -> io::Result<WalkIter> {
        let root = fs::canonicalize(&self.root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }

        let patterns = self.ignore_patterns.clone();
        let filter: EntryFilter = Box::new(move |entry: &DirEntry| {
            entry.depth() == 0 || !is_ignored(entry.path(), &patterns)
        });

        let inner = WalkDir::new(root)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(filter);

        Ok(WalkIter { inner, skipped: 0 })
    }
}

fn is_ignored(path: &Path, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(path))
}

/// Lazy sequence of absolute regular-file paths.
pub struct WalkIter {
    inner: FilterEntry<IntoIter, EntryFilter>,
    skipped: usize,
}

impl WalkIter {
    /// Entries skipped so far: denied directories, symlink loops, files
    /// removed mid-walk, and files whose path is not valid UTF-8.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for WalkIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if entry.path().to_str().is_none() {
                        self.skipped += 1;
                        warn!("Skipping {}: path is not valid UTF-8", entry.path().display());
                        continue;
                    }
                    return Some(entry.into_path());
                }
                Err(err) => {
                    self.skipped += 1;
                    match (err.loop_ancestor(), err.path()) {
                        (Some(ancestor), Some(path)) => warn!(
                            "Skipping symlink loop at {} (points back to {})",
                            path.display(),
                            ancestor.display()
                        ),
                        _ => warn!("Skipping unreadable entry: {}", err),
                    }
                }
            }
        }
    }
}
