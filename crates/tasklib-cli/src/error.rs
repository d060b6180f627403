use thiserror::Error;

/// CLI-surface errors. Each maps to a non-zero exit code at the `main`
/// boundary; success is exit code 0.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config file: {0}")]
    InvalidConfig(String),

    #[error("DATABASE_URL not provided. Use --db-url or the DATABASE_URL environment variable")]
    MissingDatabaseUrl,

    #[error("no task modules provided; use --task-module to specify at least one")]
    NoTaskModules,

    #[error("invalid argument format: '{0}'. Use key=value")]
    InvalidArgFormat(String),

    #[error("the 'tasks' table already exists; rerun with --force to reinitialize")]
    AlreadyInitialized,

    #[error(transparent)]
    Init(#[from] tasklib_core::InitError),

    #[error(transparent)]
    Submit(#[from] tasklib_core::SubmitError),

    #[error(transparent)]
    Store(#[from] tasklib_core::StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
