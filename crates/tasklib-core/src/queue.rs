//! [`TaskQueue`]: the owned runtime instance tying config, registry, and
//! store together. Deliberately an explicit object rather than ambient
//! global state.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{InitError, StoreError, SubmitError};
use crate::registry::{HandlerRegistry, TaskOverrides};
use crate::store::TaskStore;
use crate::submit::{submit_task, SubmitOptions};
use crate::task::{Task, TaskFilter};

pub struct TaskQueue {
    config: Config,
    registry: HandlerRegistry,
    store: Arc<dyn TaskStore>,
}

impl TaskQueue {
    /// Wire together an already-initialized store (schema created,
    /// connection pool live) with configuration. The store's own
    /// construction (e.g. `PgTaskStore::connect` + `ensure_schema`) lives
    /// in `tasklib-postgres`; `TaskQueue` itself has no database-specific
    /// knowledge.
    pub fn new(config: Config, store: Arc<dyn TaskStore>) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
            store,
        }
    }

    /// Register a task handler. Fails with
    /// [`InitError::AlreadyRegistered`] on duplicate name.
    pub fn register_fn<F, Args, Ret>(
        &mut self,
        name: impl Into<String>,
        func: F,
        overrides: TaskOverrides,
    ) -> Result<(), InitError>
    where
        F: Fn(Args) -> Result<Ret, anyhow::Error> + Send + Sync + 'static,
        Args: DeserializeOwned + Serialize + Send + Sync + 'static,
        Ret: Serialize + 'static,
    {
        self.registry.register_fn(name, func, overrides)
    }

    pub async fn submit(
        &self,
        name: &str,
        kwargs: serde_json::Value,
        options: SubmitOptions,
    ) -> Result<Uuid, SubmitError> {
        submit_task(
            &self.registry,
            self.store.as_ref(),
            &self.config,
            name,
            kwargs,
            options,
        )
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.store.get(id).await
    }

    pub async fn list(&self, filter: TaskFilter, limit: i64) -> Result<Vec<Task>, StoreError> {
        self.store.list(filter, limit).await
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn store(&self) -> Arc<dyn TaskStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Unwrap into the owned registry, discarding config and the store
    /// handle. Used by the worker binary, which needs only the registry
    /// (registration happens once, through the same [`TaskQueue`] API the
    /// submit side uses) and already holds its own store handle.
    pub fn into_registry(self) -> HandlerRegistry {
        self.registry
    }
}
