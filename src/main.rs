mod cli;
mod logging;
mod reporter;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use media_catalog::config::{load_configuration, AppConfig};
use media_catalog::{Database, FileRecord, ScanEngine, StatusApi, TransitionOutcome};
use reporter::CliReporter;
use tracing::{error, info, warn};

/// Exit status for a rejected claim/complete/release, so shell-driven stages
/// can tell "pick other work" apart from a failure.
const EXIT_REJECTED: u8 = 2;

// Every path returns through `main` so the file-log guard is dropped and its
// buffer flushed before the process exits.
fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<ExitCode> {
    let config = load_configuration().context("Error loading configuration")?;

    match args.command {
        Some(Commands::Scan { roots }) => return run_scan(&config, roots),
        Some(Commands::List { status, csv }) => {
            let db = open_catalog(&config)?;
            let records = StatusApi::new(&db).list(status)?;
            if csv {
                write_csv(&records)?;
            } else {
                for record in &records {
                    println!("{}", record.path);
                }
                info!("{} records {}", records.len(), status);
            }
        }
        Some(Commands::Claim { path }) => {
            let db = open_catalog(&config)?;
            return Ok(report_transition(&path, StatusApi::new(&db).claim(&path)?));
        }
        Some(Commands::Complete { path }) => {
            let db = open_catalog(&config)?;
            return Ok(report_transition(&path, StatusApi::new(&db).complete(&path)?));
        }
        Some(Commands::Release { path }) => {
            let db = open_catalog(&config)?;
            return Ok(report_transition(&path, StatusApi::new(&db).release(&path)?));
        }
        Some(Commands::Show { path }) => {
            let db = open_catalog(&config)?;
            match StatusApi::new(&db).get(&path)? {
                Some(record) => print_record(&record),
                None => {
                    warn!("Not cataloged: {}", path);
                    return Ok(ExitCode::from(EXIT_REJECTED));
                }
            }
        }
        Some(Commands::Dupes { fingerprint }) => {
            let db = open_catalog(&config)?;
            for record in db.find_by_fingerprint(&fingerprint)? {
                println!("{}\t{}", record.status, record.path);
            }
        }
        Some(Commands::Stats) => {
            let db = open_catalog(&config)?;
            let stats = StatusApi::new(&db).summary()?;
            println!("{}", stats);
            for ext in db.count_by_extension()? {
                let label = if ext.extension.is_empty() {
                    "(none)"
                } else {
                    ext.extension.as_str()
                };
                println!(
                    "  {:<10} {:>8} files {:>12}",
                    label.cyan(),
                    ext.files,
                    indicatif::HumanBytes(ext.total_bytes.max(0) as u64)
                );
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_catalog(config: &AppConfig) -> Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("Error opening catalog {}", config.database_path))
}

fn run_scan(config: &AppConfig, roots: Vec<PathBuf>) -> Result<ExitCode> {
    let roots = if roots.is_empty() {
        config.root_paths.iter().map(PathBuf::from).collect()
    } else {
        roots
    };
    if roots.is_empty() {
        error!("No roots given and no root_paths configured");
        return Ok(ExitCode::FAILURE);
    }

    let db = open_catalog(config)?;
    let engine = ScanEngine::from_config(&db, config);
    let result = engine.scan_all(&roots, &CliReporter::new())?;

    info!(
        "{} new records, {} already cataloged, {} unreadable, {} walk errors in {}",
        format!("{}", result.created).green(),
        format!("{}", result.already_cataloged).cyan(),
        format!("{}", result.unreadable).red(),
        format!("{}", result.walk_errors).red(),
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    if result.cancelled {
        warn!("Scan was cancelled before every root was walked");
    }
    Ok(ExitCode::SUCCESS)
}

fn report_transition(path: &str, outcome: TransitionOutcome) -> ExitCode {
    match outcome {
        TransitionOutcome::Updated => println!("{} {}", "updated".green(), path),
        TransitionOutcome::NotFound => warn!("Not cataloged: {}", path),
        TransitionOutcome::InvalidTransition { current } => {
            warn!("Rejected: {} is {}", path, current)
        }
    }
    ExitCode::from(transition_status_code(&outcome))
}

fn transition_status_code(outcome: &TransitionOutcome) -> u8 {
    if outcome.is_updated() {
        0
    } else {
        EXIT_REJECTED
    }
}

fn print_record(record: &FileRecord) {
    println!("{:<12} {}", "path".bold(), record.path);
    println!("{:<12} {}", "name".bold(), record.name);
    println!("{:<12} {}", "extension".bold(), record.extension);
    println!(
        "{:<12} {}",
        "size".bold(),
        indicatif::HumanBytes(record.size_bytes.max(0) as u64)
    );
    println!(
        "{:<12} {}",
        "fingerprint".bold(),
        record.fingerprint.as_deref().unwrap_or("-")
    );
    println!("{:<12} {}", "status".bold(), record.status);
    println!("{:<12} {}", "created".bold(), record.created_at.to_rfc3339());
    println!("{:<12} {}", "updated".bold(), record.updated_at.to_rfc3339());
}

fn write_csv(records: &[FileRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
