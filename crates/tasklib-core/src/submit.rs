//! The Submit API: validate arguments against a handler's declared schema,
//! resolve per-task overrides, and insert a `pending` row.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::error::SubmitError;
use crate::registry::HandlerRegistry;
use crate::store::TaskStore;
use crate::task::NewTask;

/// Per-submission overrides. All optional.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub delay_seconds: i64,
    pub priority: i32,
    pub tags: serde_json::Value,
    pub max_retries: Option<i32>,
    pub timeout_seconds: Option<i64>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            delay_seconds: 0,
            priority: 0,
            tags: serde_json::json!({}),
            max_retries: None,
            timeout_seconds: None,
        }
    }
}

/// Validate arguments against the registered handler's schema, resolve
/// overrides, and insert a `pending` row. Never blocks on workers — this is
/// a pure database insert after validation.
pub async fn submit_task(
    registry: &HandlerRegistry,
    store: &dyn TaskStore,
    config: &Config,
    name: &str,
    kwargs: serde_json::Value,
    options: SubmitOptions,
) -> Result<Uuid, SubmitError> {
    let entry = registry
        .lookup(name)
        .ok_or_else(|| SubmitError::NotRegistered(name.to_string()))?;

    let validated_kwargs = entry.handler.validate(&kwargs).map_err(|e| SubmitError::InvalidArguments {
        name: name.to_string(),
        details: e.0,
    })?;

    // Precedence: submit override -> registration override -> global default.
    let max_retries = options
        .max_retries
        .or(entry.overrides.max_retries)
        .unwrap_or(config.max_retries);
    let timeout_seconds = options
        .timeout_seconds
        .or(entry.overrides.timeout_seconds)
        .or(config.default_task_timeout_seconds);

    let scheduled_at = Utc::now() + Duration::seconds(options.delay_seconds);

    let new_task = NewTask {
        name: name.to_string(),
        kwargs: validated_kwargs,
        scheduled_at,
        max_retries,
        timeout_seconds,
        priority: options.priority,
        tags: options.tags,
    };

    let id = store.insert(new_task).await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskOverrides;
    use crate::task::{FailureOutcome, Task, TaskFilter};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStore {
        inserted: Mutex<Vec<NewTask>>,
    }

    #[async_trait]
    impl TaskStore for InMemoryStore {
        async fn insert(&self, task: NewTask) -> Result<Uuid, crate::error::StoreError> {
            let id = Uuid::new_v4();
            self.inserted.lock().unwrap().push(task);
            Ok(id)
        }
        async fn claim_one(
            &self,
            _worker_id: &str,
            _lock_duration: Duration,
        ) -> Result<Option<Task>, crate::error::StoreError> {
            Ok(None)
        }
        async fn get(&self, _id: Uuid) -> Result<Option<Task>, crate::error::StoreError> {
            Ok(None)
        }
        async fn list(
            &self,
            _filter: TaskFilter,
            _limit: i64,
        ) -> Result<Vec<Task>, crate::error::StoreError> {
            Ok(vec![])
        }
        async fn mark_completed(
            &self,
            _id: Uuid,
            _result: Option<serde_json::Value>,
        ) -> Result<(), crate::error::StoreError> {
            Ok(())
        }
        async fn record_failure(
            &self,
            _id: Uuid,
            _error_text: &str,
            _outcome: FailureOutcome,
        ) -> Result<(), crate::error::StoreError> {
            Ok(())
        }
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    fn add(args: AddArgs) -> Result<i64, anyhow::Error> {
        Ok(args.a + args.b)
    }

    #[tokio::test]
    async fn unknown_task_is_rejected_before_any_row_is_written() {
        let registry = HandlerRegistry::new();
        let store = InMemoryStore::default();
        let config = Config::default();

        let err = submit_task(
            &registry,
            &store,
            &config,
            "does_not_exist",
            serde_json::json!({}),
            SubmitOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SubmitError::NotRegistered(name) if name == "does_not_exist"));
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_before_any_row_is_written() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(
                "add",
                |args: AddArgs| Ok::<i64, anyhow::Error>(args.a + args.b),
                TaskOverrides::default(),
            )
            .unwrap();
        let store = InMemoryStore::default();
        let config = Config::default();

        let err = submit_task(
            &registry,
            &store,
            &config,
            "add",
            serde_json::json!({"a": "not-an-int", "b": 3}),
            SubmitOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SubmitError::InvalidArguments { .. }));
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn overrides_resolve_in_precedence_order() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_fn(
                "add",
                add,
                TaskOverrides {
                    max_retries: Some(7),
                    timeout_seconds: Some(42),
                },
            )
            .unwrap();
        let store = InMemoryStore::default();
        let config = Config {
            max_retries: 3,
            ..Default::default()
        };

        // No submit-time override: registration override wins.
        submit_task(
            &registry,
            &store,
            &config,
            "add",
            serde_json::json!({"a": 1, "b": 2}),
            SubmitOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(store.inserted.lock().unwrap()[0].max_retries, 7);

        // Submit-time override wins over registration override.
        submit_task(
            &registry,
            &store,
            &config,
            "add",
            serde_json::json!({"a": 1, "b": 2}),
            SubmitOptions {
                max_retries: Some(11),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(store.inserted.lock().unwrap()[1].max_retries, 11);
    }
}
