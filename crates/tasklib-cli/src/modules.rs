//! The compiled-in task module registry.
//!
//! Rust has no dynamic module import, so `--task-module` cannot load
//! arbitrary code the way a reflective language can. Instead, every task
//! module this binary knows about is linked in at compile time and named
//! here; `--task-module` selects among these compiled-in modules by name.
//! A name that doesn't match any entry below is a configuration error, not
//! a "module not found on disk" one.

use tasklib_core::{InitError, TaskQueue};

/// One compiled-in task module: a stable name plus the function that
/// registers its handlers against a [`TaskQueue`].
pub struct KnownModule {
    pub name: &'static str,
    pub register: fn(&mut TaskQueue) -> Result<(), InitError>,
}

/// Every task module this binary was built with.
pub fn known_modules() -> Vec<KnownModule> {
    vec![KnownModule {
        name: tasklib_example_tasks::MODULE_NAME,
        register: tasklib_example_tasks::register_tasks,
    }]
}

/// Register every module named in `requested` against `queue`, in order.
/// Fails fast on the first name with no matching compiled-in module.
pub fn register_requested(queue: &mut TaskQueue, requested: &[String]) -> anyhow::Result<()> {
    let available = known_modules();
    for name in requested {
        let module = available
            .iter()
            .find(|m| m.name == name.as_str())
            .ok_or_else(|| {
                let known: Vec<&str> = available.iter().map(|m| m.name).collect();
                anyhow::anyhow!(
                    "task module '{name}' is not compiled into this binary; available: {}",
                    known.join(", ")
                )
            })?;
        (module.register)(queue)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasklib_core::Config;

    struct NullStore;

    #[tasklib_core::async_trait]
    impl tasklib_core::TaskStore for NullStore {
        async fn insert(&self, _task: tasklib_core::NewTask) -> Result<uuid::Uuid, tasklib_core::StoreError> {
            unimplemented!()
        }
        async fn claim_one(
            &self,
            _worker_id: &str,
            _lock_duration: chrono::Duration,
        ) -> Result<Option<tasklib_core::Task>, tasklib_core::StoreError> {
            unimplemented!()
        }
        async fn get(&self, _id: uuid::Uuid) -> Result<Option<tasklib_core::Task>, tasklib_core::StoreError> {
            unimplemented!()
        }
        async fn list(
            &self,
            _filter: tasklib_core::TaskFilter,
            _limit: i64,
        ) -> Result<Vec<tasklib_core::Task>, tasklib_core::StoreError> {
            unimplemented!()
        }
        async fn mark_completed(
            &self,
            _id: uuid::Uuid,
            _result: Option<serde_json::Value>,
        ) -> Result<(), tasklib_core::StoreError> {
            unimplemented!()
        }
        async fn record_failure(
            &self,
            _id: uuid::Uuid,
            _error_text: &str,
            _outcome: tasklib_core::FailureOutcome,
        ) -> Result<(), tasklib_core::StoreError> {
            unimplemented!()
        }
    }

    #[test]
    fn known_module_registers_successfully() {
        let mut queue = TaskQueue::new(Config::default(), std::sync::Arc::new(NullStore));
        register_requested(&mut queue, &["example_tasks".to_string()]).unwrap();
        assert!(queue.registry().contains("add"));
    }

    #[test]
    fn unknown_module_is_a_configuration_error() {
        let mut queue = TaskQueue::new(Config::default(), std::sync::Arc::new(NullStore));
        let err = register_requested(&mut queue, &["does_not_exist".to_string()]).unwrap_err();
        assert!(err.to_string().contains("not compiled into this binary"));
    }
}
