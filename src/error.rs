use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Catalog store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    #[error("Scan root is not a readable directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Unknown status '{0}'")]
    InvalidStatus(String),
}
