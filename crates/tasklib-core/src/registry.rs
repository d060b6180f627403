//! The Handler Registry: the process-local `name -> (callable, overrides)`
//! mapping consulted by both submit (validation) and the worker (dispatch).
//!
//! Process-owned, not global — two [`TaskQueue`](crate::queue::TaskQueue)
//! instances in one process each get their own registry, rather than
//! relying on `lazy_static`/`once_cell` ambient state.
//!
//! Each handler's argument type is a concrete `Deserialize + Serialize`
//! struct, and the validator is simply `serde_json::from_value` followed by
//! re-serializing the *parsed* value — which fills in any
//! `#[serde(default)]` fields before persisting, so the stored `kwargs` is
//! self-describing without any reflection.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{InitError, ValidationError};

/// A registered unit of work. Handlers are treated as synchronous, blocking
/// user code — the worker is responsible for running them off its
/// scheduling thread.
pub trait Handler: Send + Sync {
    /// Validate and normalize raw `kwargs`, filling in declared defaults.
    /// Used by both submit (to validate before insert) and the worker (to
    /// re-validate lazily is unnecessary — the stored `kwargs` is already
    /// normalized, so the worker calls `invoke` directly).
    fn validate(&self, kwargs: &serde_json::Value) -> Result<serde_json::Value, ValidationError>;

    /// Run the handler against already-validated `kwargs`.
    fn invoke(&self, kwargs: serde_json::Value) -> Result<serde_json::Value, anyhow::Error>;
}

/// Adapts a plain Rust function `Fn(Args) -> Result<Ret, anyhow::Error>`
/// into a [`Handler`], where `Args`/`Ret` are JSON-serializable. `Args`
/// doubles as the declared parameter schema.
struct FnHandler<F, Args, Ret> {
    func: F,
    _marker: std::marker::PhantomData<fn(Args) -> Ret>,
}

impl<F, Args, Ret> Handler for FnHandler<F, Args, Ret>
where
    F: Fn(Args) -> Result<Ret, anyhow::Error> + Send + Sync,
    Args: DeserializeOwned + Serialize + Send + Sync,
    Ret: Serialize,
{
    fn validate(&self, kwargs: &serde_json::Value) -> Result<serde_json::Value, ValidationError> {
        let parsed: Args =
            serde_json::from_value(kwargs.clone()).map_err(|e| ValidationError(e.to_string()))?;
        serde_json::to_value(&parsed).map_err(|e| ValidationError(e.to_string()))
    }

    fn invoke(&self, kwargs: serde_json::Value) -> Result<serde_json::Value, anyhow::Error> {
        let parsed: Args = serde_json::from_value(kwargs)?;
        let ret = (self.func)(parsed)?;
        Ok(serde_json::to_value(ret)?)
    }
}

/// Per-task defaults set at registration time, overridable at submit time
/// (submit override → registration override → global default).
#[derive(Debug, Clone, Default)]
pub struct TaskOverrides {
    pub max_retries: Option<i32>,
    pub timeout_seconds: Option<i64>,
}

pub struct RegisteredHandler {
    pub handler: Arc<dyn Handler>,
    pub overrides: TaskOverrides,
}

/// Process-local mapping from task name to `(callable, overrides)`.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, RegisteredHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-built [`Handler`]. Fails if `name` is already taken —
    /// a name may be registered at most once per process.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
        overrides: TaskOverrides,
    ) -> Result<(), InitError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(InitError::AlreadyRegistered(name));
        }
        self.handlers
            .insert(name, RegisteredHandler { handler, overrides });
        Ok(())
    }

    /// Register a plain function as a handler. Most tasks go through this.
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
        let handler = Arc::new(FnHandler {
            func,
            _marker: std::marker::PhantomData,
        });
        self.register(name, handler, overrides)
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredHandler> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|s| s.as_str())
    }
}
