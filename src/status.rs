use crate::error::Error;
use crate::stats::CatalogStats;
use crate::storage::models::{FileRecord, FileStatus, TransitionOutcome};
use crate::storage::Database;
use tracing::{debug, info};

/// Surface used by pipeline stages (audio extraction, transcription,
/// translation) to claim work and report completion.
///
/// A stage claims a record by moving it `NotStarted -> InProgress` and
/// finishes it with `InProgress -> Completed`. Rejections come back as
/// [`TransitionOutcome`] values so the stage can pick other work; only store
/// failures are errors.
pub struct StatusApi<'a> {
    db: &'a Database,
}

impl<'a> StatusApi<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn claim(&self, path: &str) -> Result<TransitionOutcome, Error> {
        self.transition(path, FileStatus::NotStarted, FileStatus::InProgress)
    }

    pub fn complete(&self, path: &str) -> Result<TransitionOutcome, Error> {
        self.transition(path, FileStatus::InProgress, FileStatus::Completed)
    }

    pub fn transition(
        &self,
        path: &str,
        from: FileStatus,
        to: FileStatus,
    ) -> Result<TransitionOutcome, Error> {
        let outcome = self.db.transition_status(path, from, to)?;
        if let TransitionOutcome::InvalidTransition { current } = outcome {
            debug!(
                "Rejected {} -> {} for {} (currently {})",
                from, to, path, current
            );
        }
        Ok(outcome)
    }

    /// Give up a claim after a failed stage run so the record can be picked
    /// up again. Never happens implicitly.
    pub fn release(&self, path: &str) -> Result<TransitionOutcome, Error> {
        let outcome = self.db.release_claim(path)?;
        if outcome.is_updated() {
            info!("Released claim on {}", path);
        }
        Ok(outcome)
    }

    /// Claim the first unclaimed record in path order. Records taken by a
    /// competing worker between the listing and the claim are passed over.
    pub fn claim_next(&self) -> Result<Option<FileRecord>, Error> {
        for record in self.db.list_by_status(FileStatus::NotStarted)? {
            if self.claim(&record.path)?.is_updated() {
                return Ok(self.db.get(&record.path)?);
            }
        }
        Ok(None)
    }

    pub fn list(&self, status: FileStatus) -> Result<Vec<FileRecord>, Error> {
        Ok(self.db.list_by_status(status)?)
    }

    pub fn get(&self, path: &str) -> Result<Option<FileRecord>, Error> {
        Ok(self.db.get(path)?)
    }

    pub fn summary(&self) -> Result<CatalogStats, Error> {
        Ok(self.db.aggregate()?)
    }
}
