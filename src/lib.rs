pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod scanner;
pub mod stats;
pub mod status;
pub mod storage;

pub use config::AppConfig;
pub use engine::{ScanEngine, ScanResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use stats::CatalogStats;
pub use status::StatusApi;
pub use storage::models::{CreateOutcome, FileRecord, FileStatus, TransitionOutcome};
pub use storage::Database;
