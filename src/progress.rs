use std::path::Path;

/// Trait for reporting scan progress.
///
/// The CLI implements it with an indicatif spinner. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &Path) {}
    fn on_file_visited(&self, _files_seen: usize, _current_path: &Path) {}
    fn on_file_cataloged(&self, _created: usize, _current_path: &Path) {}
    fn on_scan_complete(&self, _created: usize, _files_seen: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
