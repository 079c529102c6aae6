use clap::{Parser, Subcommand};
use media_catalog::FileStatus;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-catalog")]
#[command(about = "Catalog media files and track their pipeline status", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Catalog new files under the given roots (defaults to configured root_paths)
    Scan {
        roots: Vec<PathBuf>,
    },
    /// List records in a given status, ordered by path
    List {
        #[arg(short, long, default_value = "not-started")]
        status: FileStatus,
        /// Write CSV to stdout instead of one path per line
        #[arg(long)]
        csv: bool,
    },
    /// Claim a record for processing (Not started -> In Progress)
    Claim { path: String },
    /// Mark a claimed record as done (In Progress -> Completed)
    Complete { path: String },
    /// Give up a claim (In Progress -> Not started)
    Release { path: String },
    /// Show one record
    Show { path: String },
    /// List records sharing a content fingerprint
    Dupes { fingerprint: String },
    /// Print catalog statistics
    Stats,
    /// Print configuration values
    PrintConfig,
}
