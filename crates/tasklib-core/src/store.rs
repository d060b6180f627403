//! The [`TaskStore`] contract.
//!
//! The store is the single source of truth and the only medium for
//! inter-worker coordination — no in-memory queues, no broker. A small
//! async trait with one concrete implementation
//! (`tasklib-postgres::PgTaskStore`).

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::error::StoreError;
use crate::task::{FailureOutcome, NewTask, Task, TaskFilter};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new `pending` row. Returns its identifier.
    async fn insert(&self, task: NewTask) -> Result<Uuid, StoreError>;

    /// Atomically claim at most one due task for `worker_id`. Returns
    /// `None` if nothing is claimable right now.
    async fn claim_one(
        &self,
        worker_id: &str,
        lock_duration: Duration,
    ) -> Result<Option<Task>, StoreError>;

    /// Read-only lookup by id.
    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Read-only, filtered, limited listing.
    async fn list(&self, filter: TaskFilter, limit: i64) -> Result<Vec<Task>, StoreError>;

    /// Mark a claimed task `completed`. `result` is the handler's return
    /// value already wrapped as `{"value": ...}`, or `None`.
    async fn mark_completed(
        &self,
        id: Uuid,
        result: Option<serde_json::Value>,
    ) -> Result<(), StoreError>;

    /// Record a failed attempt and apply the retry policy's outcome.
    async fn record_failure(
        &self,
        id: Uuid,
        error_text: &str,
        outcome: FailureOutcome,
    ) -> Result<(), StoreError>;
}
