use super::models::*;
use super::sqlite::Database;
use crate::stats::CatalogStats;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::{debug, trace};

const RECORD_COLUMNS: &str =
    "id, path, name, extension, size_bytes, fingerprint, status, created_at, updated_at";

fn record_from_row(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        name: row.get(2)?,
        extension: row.get(3)?,
        size_bytes: row.get(4)?,
        fingerprint: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl Database {
    // ── Creation ─────────────────────────────────────────────────

    /// Insert a record for `record.path` unless one already exists.
    ///
    /// Uniqueness is decided by the `UNIQUE(path)` constraint inside a single
    /// statement, so racing scanners cannot both create the same path.
    pub fn try_create(&self, record: &NewFileRecord) -> Result<CreateOutcome> {
        let now = Utc::now();
        let inserted = self.connection().execute(
            "INSERT INTO file_record \
             (path, name, extension, size_bytes, fingerprint, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             ON CONFLICT(path) DO NOTHING",
            params![
                record.path,
                record.name,
                record.extension,
                record.size_bytes,
                record.fingerprint,
                FileStatus::NotStarted,
                now,
            ],
        )?;

        if inserted == 1 {
            let id = self.connection().last_insert_rowid();
            trace!("Cataloged {} as record {}", record.path, id);
            Ok(CreateOutcome::Created(id))
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    /// Cheap probe used to skip hashing for known paths. `try_create` remains
    /// the authority on uniqueness.
    pub fn exists(&self, path: &str) -> Result<bool> {
        self.connection().query_row(
            "SELECT EXISTS(SELECT 1 FROM file_record WHERE path = ?1)",
            params![path],
            |row| row.get(0),
        )
    }

    // ── Status transitions ───────────────────────────────────────

    /// Compare-and-swap on `status`: writes only when the row currently holds
    /// `from` and `to` lies ahead of it.
    pub fn transition_status(
        &self,
        path: &str,
        from: FileStatus,
        to: FileStatus,
    ) -> Result<TransitionOutcome> {
        if from.can_advance_to(to) && self.swap_status(path, from, to)? {
            debug!("{}: {} -> {}", path, from, to);
            return Ok(TransitionOutcome::Updated);
        }
        self.rejected_outcome(path)
    }

    /// Put a claimed record back to `NotStarted`. This is the only backward
    /// move the store performs and callers must ask for it explicitly.
    pub fn release_claim(&self, path: &str) -> Result<TransitionOutcome> {
        if self.swap_status(path, FileStatus::InProgress, FileStatus::NotStarted)? {
            debug!("{}: claim released", path);
            return Ok(TransitionOutcome::Updated);
        }
        self.rejected_outcome(path)
    }

    fn swap_status(&self, path: &str, from: FileStatus, to: FileStatus) -> Result<bool> {
        let changed = self.connection().execute(
            "UPDATE file_record SET status = ?1, updated_at = ?2 \
             WHERE path = ?3 AND status = ?4",
            params![to, Utc::now(), path, from],
        )?;
        Ok(changed == 1)
    }

    fn rejected_outcome(&self, path: &str) -> Result<TransitionOutcome> {
        let current: Option<FileStatus> = self
            .connection()
            .query_row(
                "SELECT status FROM file_record WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match current {
            Some(current) => TransitionOutcome::InvalidTransition { current },
            None => TransitionOutcome::NotFound,
        })
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM file_record WHERE path = ?1", RECORD_COLUMNS),
                params![path],
                record_from_row,
            )
            .optional()
    }

    /// All records in `status`, ordered by path.
    pub fn list_by_status(&self, status: FileStatus) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM file_record WHERE status = ?1 ORDER BY path",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![status], record_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Every record sharing a content fingerprint, ordered by path.
    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<FileRecord>> {
        let mut stmt = self.connection().prepare_cached(&format!(
            "SELECT {} FROM file_record WHERE fingerprint = ?1 ORDER BY path",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![fingerprint], record_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    // ── Aggregates ───────────────────────────────────────────────

    /// Rollup computed by one SELECT, so all figures come from the same snapshot.
    pub fn aggregate(&self) -> Result<CatalogStats> {
        self.connection().query_row(
            "SELECT COUNT(*), \
                    COALESCE(SUM(size_bytes), 0), \
                    COUNT(CASE WHEN status = ?1 THEN 1 END), \
                    COUNT(CASE WHEN status = ?2 THEN 1 END), \
                    COUNT(CASE WHEN status = ?3 THEN 1 END), \
                    COUNT(DISTINCT extension) \
             FROM file_record",
            params![
                FileStatus::NotStarted,
                FileStatus::InProgress,
                FileStatus::Completed
            ],
            |row| {
                Ok(CatalogStats {
                    total: row.get(0)?,
                    total_bytes: row.get(1)?,
                    not_started: row.get(2)?,
                    in_progress: row.get(3)?,
                    completed: row.get(4)?,
                    distinct_extensions: row.get(5)?,
                })
            },
        )
    }

    pub fn count_by_extension(&self) -> Result<Vec<ExtensionCount>> {
        let mut stmt = self.connection().prepare(
            "SELECT extension, COUNT(*), COALESCE(SUM(size_bytes), 0) \
             FROM file_record GROUP BY extension \
             ORDER BY COUNT(*) DESC, extension",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok(ExtensionCount {
                    extension: row.get(0)?,
                    files: row.get(1)?,
                    total_bytes: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(counts)
    }
}
