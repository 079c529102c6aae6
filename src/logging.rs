use std::env;
use std::io;
use std::path::PathBuf;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "./logs/media-catalog.log";

/// Logging destinations resolved from `TRACING_LEVEL` and `LOG_FILE_PATH`.
#[derive(Debug, PartialEq)]
struct LogSettings {
    filter: String,
    /// `None` when `LOG_FILE_PATH` is set but empty.
    file: Option<PathBuf>,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_vars(env::var("TRACING_LEVEL").ok(), env::var("LOG_FILE_PATH").ok())
    }

    fn from_vars(level: Option<String>, file: Option<String>) -> Self {
        let filter = level
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let file = match file {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };
        Self { filter, file }
    }

    /// Falls back to the default filter; the subscriber is not up yet, so a
    /// bad directive is reported on stderr directly.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|err| {
            eprintln!("Ignoring TRACING_LEVEL '{}': {}", self.filter, err);
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

/// Plain stderr output, keeping stdout free for `list` and `dupes`, plus an
/// optional non-blocking file log. Keep the returned guard alive until exit
/// or buffered file output is lost.
pub fn init_logger() -> Option<WorkerGuard> {
    let settings = LogSettings::from_env();

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let appender = tracing_appender::rolling::never(".", path);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(file_layer)
        .init();

    debug!("Logging configured: {:?}", settings);

    guard
}
