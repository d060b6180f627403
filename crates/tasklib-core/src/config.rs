//! Runtime configuration shared by the submit path and the worker loop.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Default max retries for tasks that don't override it.
    pub max_retries: i32,

    /// Base delay for exponential backoff.
    pub base_retry_delay_seconds: f64,

    /// Exponential backoff multiplier (5s -> 10s -> 20s -> ...).
    pub retry_backoff_multiplier: f64,

    /// How long a worker can hold a claimed row before it's considered
    /// abandoned and eligible for re-claim.
    pub lock_timeout_seconds: i64,

    /// Default per-task execution timeout; `None` means no timeout.
    pub default_task_timeout_seconds: Option<i64>,

    /// Worker identity used for the claim lease. Auto-generated if unset.
    pub worker_id: Option<String>,

    /// Number of concurrent handler invocations per worker process.
    pub concurrency: usize,

    /// Interval between claim-scan rounds.
    pub poll_interval_seconds: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_retries: 3,
            base_retry_delay_seconds: 5.0,
            retry_backoff_multiplier: 2.0,
            lock_timeout_seconds: 600,
            default_task_timeout_seconds: None,
            worker_id: None,
            concurrency: 1,
            poll_interval_seconds: 1.0,
        }
    }
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}
