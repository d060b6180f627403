//! YAML configuration file loading, with precedence: CLI flag > config
//! file > env var > default.

use std::path::Path;

use serde::Deserialize;

use crate::error::CliError;

/// Shape of `tasklib.yaml`. Every section is optional — an absent section
/// simply leaves those values to CLI flags, env vars, or defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub worker: WorkerSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub tasks: TasksSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSection {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerSection {
    pub id: Option<String>,
    pub concurrency: Option<usize>,
    pub poll_interval_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<i32>,
    pub base_delay_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TasksSection {
    #[serde(default)]
    pub modules: Vec<String>,
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| CliError::ConfigNotFound(path.display().to_string()))?;
    serde_yaml::from_str(&text).map_err(|e| CliError::InvalidConfig(e.to_string()))
}

/// Resolve the database URL: an explicit `--db-url` (which clap has already
/// merged with `DATABASE_URL` via its `env` attribute) wins; otherwise fall
/// back to the config file.
pub fn resolve_db_url(cli_value: Option<String>, config: &ConfigFile) -> Result<String, CliError> {
    cli_value
        .or_else(|| config.database.url.clone())
        .ok_or(CliError::MissingDatabaseUrl)
}
