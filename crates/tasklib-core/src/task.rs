//! The persistent [`Task`] entity.
//!
//! One row per submission; every coordination path in the system is a read
//! or write of this row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The lifecycle state of a task.
///
/// `Failed` is deliberately not terminal on its own — a row with
/// `state = Failed && retry_count < max_retries` is re-eligible for claim
/// once `scheduled_at` has passed. This reuses `failed` for "waiting to
/// retry" rather than introducing a distinct `retry_scheduled` state, since
/// the claim predicate already treats both as claimable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskState::Pending),
            "running" => Ok(TaskState::Running),
            "completed" => Ok(TaskState::Completed),
            "failed" => Ok(TaskState::Failed),
            other => Err(format!("'{other}' is not a valid TaskState")),
        }
    }
}

/// A fully persisted task, as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub args: serde_json::Value,
    pub kwargs: serde_json::Value,
    pub state: TaskState,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub worker_id: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
    pub timeout_seconds: Option<i64>,
    pub priority: i32,
    pub tags: serde_json::Value,
}

/// The fields a fresh submission writes; everything else (`id`,
/// `created_at`, lifecycle fields) is assigned by the store on insert.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub kwargs: serde_json::Value,
    pub scheduled_at: DateTime<Utc>,
    pub max_retries: i32,
    pub timeout_seconds: Option<i64>,
    pub priority: i32,
    pub tags: serde_json::Value,
}

/// Filter predicate for [`crate::store::TaskStore::list`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub state: Option<TaskState>,
    pub name: Option<String>,
}

/// What to record on the row after a handler invocation fails.
///
/// Computed by the retry policy (`tasklib-worker`) from the row's current
/// `retry_count`/`max_retries`; the store applies it verbatim.
#[derive(Debug, Clone)]
pub enum FailureOutcome {
    /// Retries remain: advance `scheduled_at`, bump `retry_count`, stay in
    /// `Failed` (not terminal).
    Retry {
        retry_count: i32,
        next_retry_at: DateTime<Utc>,
    },
    /// Retries exhausted: terminal `Failed`, `completed_at` set.
    Terminal,
}
