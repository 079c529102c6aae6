use indicatif::HumanBytes;
use serde::Serialize;
use std::fmt;

use crate::storage::models::FileStatus;

/// Read-only rollup over the whole catalog.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total: i64,
    pub total_bytes: i64,
    pub not_started: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub distinct_extensions: i64,
}

impl CatalogStats {
    pub fn count_for(&self, status: FileStatus) -> i64 {
        match status {
            FileStatus::NotStarted => self.not_started,
            FileStatus::InProgress => self.in_progress,
            FileStatus::Completed => self.completed,
        }
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} files, {} total, {} distinct extensions",
            self.total,
            HumanBytes(self.total_bytes.max(0) as u64),
            self.distinct_extensions
        )?;
        for status in FileStatus::ALL {
            writeln!(f, "  {:<12} {}", status.as_str(), self.count_for(status))?;
        }
        write!(f, "  {:.1}% complete", self.percent_complete())
    }
}
