use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::Error;

/// Processing status of a cataloged file. Variants are declared in pipeline
/// order, so `Ord` is the forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FileStatus {
    #[serde(rename = "Not started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl FileStatus {
    pub const ALL: [FileStatus; 3] = [
        FileStatus::NotStarted,
        FileStatus::InProgress,
        FileStatus::Completed,
    ];

    /// The string persisted in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::NotStarted => "Not started",
            FileStatus::InProgress => "In Progress",
            FileStatus::Completed => "Completed",
        }
    }

    pub fn can_advance_to(self, to: FileStatus) -> bool {
        to > self
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileStatus {
    type Err = Error;

    /// Accepts the persisted form ("In Progress") as well as CLI spellings
    /// such as `in-progress` or `not_started`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "notstarted" => Ok(FileStatus::NotStarted),
            "inprogress" => Ok(FileStatus::InProgress),
            "completed" => Ok(FileStatus::Completed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

impl ToSql for FileStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FileStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// One catalog row. Exactly one exists per distinct `path`.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub extension: String,
    pub size_bytes: i64,
    pub fingerprint: Option<String>,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values supplied by the scanner when cataloging a newly discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileRecord {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub size_bytes: i64,
    pub fingerprint: Option<String>,
}

impl NewFileRecord {
    /// Derive `name` and `extension` from `path`. The extension keeps its
    /// leading dot and is lower-cased; files without one get `""`.
    ///
    /// Returns `None` for paths that are not valid UTF-8. Catalog keys are
    /// stored as text and a lossy conversion would map distinct files onto
    /// one key.
    pub fn from_path(path: &Path, size_bytes: u64, fingerprint: Option<String>) -> Option<Self> {
        let path_str = path.to_str()?;
        let name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or_default()
            .to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();

        Some(Self {
            path: path_str.to_string(),
            name,
            extension,
            size_bytes: size_bytes as i64,
            fingerprint,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(i64),
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Updated,
    NotFound,
    /// The record exists but was not in the expected state, or the requested
    /// move is not forward. Nothing was written.
    InvalidTransition { current: FileStatus },
}

impl TransitionOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, TransitionOutcome::Updated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub files: i64,
    pub total_bytes: i64,
}
