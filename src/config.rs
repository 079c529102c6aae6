use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

use crate::hasher::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub root_paths: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub hash_chunk_size: usize,
    #[serde(default)]
    pub follow_links: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            hash_chunk_size: default_chunk_size(),
            follow_links: false,
        }
    }
}

fn default_database_path() -> String {
    "media_catalog.db".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Loads `Config.toml` (optional) and then `CATALOG_*` environment overrides,
/// e.g. `CATALOG_DATABASE_PATH` or `CATALOG_ROOT_PATHS=/a,/b`.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("CATALOG")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("root_paths")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Drop roots nested inside another root so no subtree is walked twice.
pub fn non_overlapping_directories(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::new();

    for root in roots {
        if kept.iter().any(|k| root.starts_with(k)) {
            continue;
        }
        kept.retain(|k| !k.starts_with(root));
        kept.push(root.clone());
    }

    kept
}
