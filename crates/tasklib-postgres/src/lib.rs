//! PostgreSQL implementation of the tasklib task store.
//!
//! This crate provides the sole [`TaskStore`] implementation backing the
//! core runtime: the persistent `tasks` table, idempotent schema creation,
//! and the atomic claim protocol.
//!
//! # Features
//!
//! - `FOR UPDATE SKIP LOCKED` claim query — lets N workers concurrently
//!   scan the same ready set without blocking on each other.
//! - Lock expiry as implicit dead-worker recovery — no heartbeat channel,
//!   no separate reaper process.
//! - Exponential backoff retry bookkeeping, applied by the worker's retry
//!   policy and persisted verbatim here.
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     args JSONB NOT NULL,
//!     kwargs JSONB NOT NULL,
//!     state TEXT NOT NULL,
//!     result JSONB,
//!     error TEXT,
//!     retry_count INTEGER NOT NULL,
//!     max_retries INTEGER NOT NULL,
//!     next_retry_at TIMESTAMPTZ,
//!     scheduled_at TIMESTAMPTZ NOT NULL,
//!     started_at TIMESTAMPTZ,
//!     completed_at TIMESTAMPTZ,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     worker_id TEXT,
//!     locked_until TIMESTAMPTZ,
//!     timeout_seconds BIGINT,
//!     priority INTEGER NOT NULL,
//!     tags JSONB NOT NULL
//! );
//!
//! CREATE INDEX idx_tasks_state ON tasks (state);
//! CREATE INDEX idx_tasks_scheduled_at ON tasks (scheduled_at);
//! CREATE INDEX idx_tasks_locked_until ON tasks (locked_until);
//! CREATE INDEX idx_tasks_priority ON tasks (priority);
//! CREATE INDEX idx_tasks_name ON tasks (name);
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use tasklib_postgres::PgTaskStore;
//!
//! let store = PgTaskStore::connect("postgres://localhost/tasklib").await?;
//! store.ensure_schema().await?;
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tasklib_core::{FailureOutcome, NewTask, StoreError, Task, TaskFilter, TaskState, TaskStore};
use uuid::Uuid;

/// PostgreSQL-backed task store.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    /// Connect to `database_url`, building a pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Wrap an already-built pool (e.g. one shared with other components).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Idempotent schema creation, invoked by `tasklib init` and by library
    /// callers who want a store ready to use with no separate migration
    /// step.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                args JSONB NOT NULL DEFAULT '{}'::jsonb,
                kwargs JSONB NOT NULL DEFAULT '{}'::jsonb,
                state TEXT NOT NULL DEFAULT 'pending',
                result JSONB,
                error TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                next_retry_at TIMESTAMPTZ,
                scheduled_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                started_at TIMESTAMPTZ,
                completed_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                worker_id TEXT,
                locked_until TIMESTAMPTZ,
                timeout_seconds BIGINT,
                priority INTEGER NOT NULL DEFAULT 0,
                tags JSONB NOT NULL DEFAULT '{}'::jsonb
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        for (name, column) in [
            ("idx_tasks_state", "state"),
            ("idx_tasks_scheduled_at", "scheduled_at"),
            ("idx_tasks_locked_until", "locked_until"),
            ("idx_tasks_priority", "priority"),
            ("idx_tasks_name", "name"),
        ] {
            let stmt = format!("CREATE INDEX IF NOT EXISTS {name} ON tasks ({column})");
            sqlx::query(&stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(())
    }

    /// Whether the `tasks` table already exists — used by `tasklib init`
    /// to refuse re-initialization without `--force`.
    pub async fn tasks_table_exists(&self) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = 'tasks'
            ) AS present
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(row.get::<bool, _>("present"))
    }

    /// Aggregate counts per state, for the read-only dashboard.
    pub async fn stats(&self) -> Result<QueueStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE state = 'pending') as pending,
                COUNT(*) FILTER (WHERE state = 'running') as running,
                COUNT(*) FILTER (WHERE state = 'completed') as completed,
                COUNT(*) FILTER (WHERE state = 'failed' AND retry_count < max_retries) as failed_retrying,
                COUNT(*) FILTER (WHERE state = 'failed' AND retry_count >= max_retries) as failed_permanent
            FROM tasks
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(QueueStats {
            pending: row.get("pending"),
            running: row.get("running"),
            completed: row.get("completed"),
            failed_retrying: row.get("failed_retrying"),
            failed_permanent: row.get("failed_permanent"),
        })
    }

    /// Per-worker lease snapshot, for the read-only dashboard.
    pub async fn worker_stats(&self) -> Result<Vec<WorkerStats>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                worker_id,
                COUNT(*) as locked_tasks,
                MIN(locked_until) as earliest_lock_expires
            FROM tasks
            WHERE state = 'running' AND worker_id IS NOT NULL
            GROUP BY worker_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| WorkerStats {
                worker_id: row.get("worker_id"),
                locked_tasks: row.get("locked_tasks"),
                earliest_lock_expires: row.get("earliest_lock_expires"),
            })
            .collect())
    }
}

fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, StoreError> {
    let state_str: String = row.get("state");
    let state = TaskState::from_str(&state_str)
        .map_err(|e| StoreError::Database(format!("invalid state in row: {e}")))?;

    Ok(Task {
        id: row.get("id"),
        name: row.get("name"),
        args: row.get("args"),
        kwargs: row.get("kwargs"),
        state,
        result: row.get("result"),
        error: row.get("error"),
        retry_count: row.get("retry_count"),
        max_retries: row.get("max_retries"),
        next_retry_at: row.get("next_retry_at"),
        scheduled_at: row.get("scheduled_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        created_at: row.get("created_at"),
        worker_id: row.get("worker_id"),
        locked_until: row.get("locked_until"),
        timeout_seconds: row.get("timeout_seconds"),
        priority: row.get("priority"),
        tags: row.get("tags"),
    })
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, task: NewTask) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO tasks
                (id, name, args, kwargs, state, retry_count, max_retries,
                 scheduled_at, created_at, timeout_seconds, priority, tags)
            VALUES
                ($1, $2, '{}'::jsonb, $3, 'pending', 0, $4, $5, NOW(), $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&task.name)
        .bind(&task.kwargs)
        .bind(task.max_retries)
        .bind(task.scheduled_at)
        .bind(task.timeout_seconds)
        .bind(task.priority)
        .bind(&task.tags)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(id)
    }

    /// Claim at most one due task, atomically.
    ///
    /// `state IN ('pending','failed')` makes a retried row re-eligible
    /// without ever moving back to `pending`. The `running` branch with an
    /// expired `locked_until` is what actually implements lock expiry as
    /// implicit worker-death recovery — a crashed worker's row becomes
    /// claimable once its lease expires, with no separate reaper.
    /// `FOR UPDATE SKIP LOCKED` is what lets N workers scan concurrently
    /// without lock contention.
    async fn claim_one(
        &self,
        worker_id: &str,
        lock_duration: Duration,
    ) -> Result<Option<Task>, StoreError> {
        let now = Utc::now();
        let locked_until = now + lock_duration;

        let row = sqlx::query(
            r#"
            WITH claimable AS (
                SELECT id
                FROM tasks
                WHERE (state IN ('pending', 'failed')
                       OR (state = 'running' AND locked_until < $1))
                  AND scheduled_at <= $1
                  AND (locked_until IS NULL OR locked_until < $1)
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE tasks
            SET state = 'running',
                worker_id = $2,
                locked_until = $3,
                started_at = $1
            WHERE id IN (SELECT id FROM claimable)
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(worker_id)
        .bind(locked_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn list(&self, filter: TaskFilter, limit: i64) -> Result<Vec<Task>, StoreError> {
        let mut query = "SELECT * FROM tasks WHERE 1 = 1".to_string();
        let mut binds: Vec<String> = Vec::new();

        if let Some(state) = filter.state {
            binds.push(state.as_str().to_string());
            query.push_str(&format!(" AND state = ${}", binds.len()));
        }
        if let Some(name) = &filter.name {
            binds.push(name.clone());
            query.push_str(&format!(" AND name = ${}", binds.len()));
        }
        query.push_str(&format!(" ORDER BY created_at DESC LIMIT ${}", binds.len() + 1));

        let mut q = sqlx::query(&query);
        for bind in &binds {
            q = q.bind(bind);
        }
        q = q.bind(limit);

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(row_to_task).collect()
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        result: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET state = 'completed',
                result = $2,
                error = NULL,
                completed_at = NOW(),
                worker_id = NULL,
                locked_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Apply the retry policy's decision. `Retry` advances
    /// `scheduled_at`/`next_retry_at` and leaves the row in `failed` —
    /// non-terminal, claimable again once due. `Terminal` sets
    /// `completed_at`, making the row terminal.
    async fn record_failure(
        &self,
        id: Uuid,
        error_text: &str,
        outcome: FailureOutcome,
    ) -> Result<(), StoreError> {
        match outcome {
            FailureOutcome::Retry {
                retry_count,
                next_retry_at,
            } => {
                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET state = 'failed',
                        retry_count = $2,
                        next_retry_at = $3,
                        scheduled_at = $3,
                        error = $4,
                        worker_id = NULL,
                        locked_until = NULL
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(retry_count)
                .bind(next_retry_at)
                .bind(error_text)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            }
            FailureOutcome::Terminal => {
                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET state = 'failed',
                        error = $2,
                        completed_at = NOW(),
                        worker_id = NULL,
                        locked_until = NULL
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(error_text)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }

        Ok(())
    }
}

/// Task queue statistics, for the read-only dashboard.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed_retrying: i64,
    pub failed_permanent: i64,
}

/// Per-worker lease snapshot, for the read-only dashboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WorkerStats {
    pub worker_id: String,
    pub locked_tasks: i64,
    pub earliest_lock_expires: Option<DateTime<Utc>>,
}
