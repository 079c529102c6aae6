use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use media_catalog::ProgressReporter;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Spinner per scanned root; the file count is unknown until the walk ends.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &Path) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(format!("Scanning {}...", root.display()));
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_file_visited(&self, files_seen: usize, _current_path: &Path) {
        if files_seen % 64 == 0 {
            self.with_bar(|pb| pb.set_message(format!("Scanning... {} files seen", files_seen)));
        }
    }

    fn on_file_cataloged(&self, created: usize, current_path: &Path) {
        self.with_bar(|pb| {
            pb.set_message(format!("{} new: {}", created, current_path.display()))
        });
    }

    fn on_scan_complete(&self, created: usize, files_seen: usize, duration_secs: f64) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        eprintln!(
            "  {} Scan complete: {} new of {} files in {:.2}s",
            "✓".green(),
            created,
            files_seen,
            duration_secs
        );
    }
}
