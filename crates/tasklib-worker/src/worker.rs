//! The Worker Loop: claims due tasks up to a concurrency cap, dispatches
//! each handler on a background thread with an optional timeout, and
//! persists the outcome.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration as ChronoDuration;
use tasklib_core::{Config, FailureOutcome, HandlerRegistry, Task, TaskStore};
use tokio::task::JoinSet;

use crate::error::{format_error, not_registered, panicked, timed_out};
use crate::retry::{next_outcome, RetryConfig};

/// Worker loop configuration, resolved once from [`Config`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub concurrency: usize,
    pub poll_interval: StdDuration,
    pub lock_duration: ChronoDuration,
    pub retry: RetryConfig,
}

impl WorkerConfig {
    /// Resolve from shared config, generating a worker id if none was set.
    pub fn from_config(config: &Config) -> Self {
        let worker_id = config
            .worker_id
            .clone()
            .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));

        Self {
            worker_id,
            concurrency: config.concurrency.max(1),
            poll_interval: StdDuration::from_secs_f64(config.poll_interval_seconds.max(0.0)),
            lock_duration: ChronoDuration::seconds(config.lock_timeout_seconds),
            retry: RetryConfig {
                base_delay_seconds: config.base_retry_delay_seconds,
                backoff_multiplier: config.retry_backoff_multiplier,
            },
        }
    }
}

/// The long-lived claim-and-dispatch loop. One instance corresponds to one
/// OS process in the deployment model; multiple instances coordinate only
/// through the store.
pub struct Worker {
    store: Arc<dyn TaskStore>,
    registry: Arc<HandlerRegistry>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(store: Arc<dyn TaskStore>, registry: Arc<HandlerRegistry>, config: WorkerConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// Run until a shutdown signal (SIGINT/SIGTERM) is observed, then wait
    /// for in-flight executions to finish before returning. Never re-claims
    /// in-flight rows on exit — a hard kill relies on lease expiry for
    /// recovery.
    pub async fn run(&self) {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves. Exposed separately so tests and
    /// embedders can supply their own shutdown trigger instead of the
    /// process-wide signal handlers.
    pub async fn run_until(&self, shutdown: impl std::future::Future<Output = ()>) {
        tracing::info!(worker_id = %self.config.worker_id, concurrency = self.config.concurrency, "worker loop starting");

        let mut in_flight: JoinSet<()> = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            loop {
                reap_finished(&mut in_flight);
                if in_flight.len() >= self.config.concurrency {
                    break;
                }
                match self.store.claim_one(&self.config.worker_id, self.config.lock_duration).await {
                    Ok(Some(task)) => {
                        in_flight.spawn(self.execute(task));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "claim failed, will retry next poll");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = &mut shutdown => {
                    tracing::info!(worker_id = %self.config.worker_id, "shutdown signal received, draining in-flight tasks");
                    break;
                }
            }
        }

        while let Some(res) = in_flight.join_next().await {
            if let Err(e) = res {
                tracing::error!(error = %e, "execution task panicked during shutdown drain");
            }
        }
        tracing::info!(worker_id = %self.config.worker_id, "worker loop stopped");
    }

    fn execute(&self, task: Task) -> impl std::future::Future<Output = ()> + Send + 'static {
        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        let retry = self.config.retry;
        async move { execute_claimed(store, registry, task, retry).await }
    }
}

fn reap_finished(in_flight: &mut JoinSet<()>) {
    while let Some(res) = in_flight.try_join_next() {
        if let Err(e) = res {
            tracing::error!(error = %e, "execution task panicked");
        }
    }
}

/// Execute one claimed task: dispatch the handler on a blocking thread,
/// enforce the optional timeout, and persist the outcome.
async fn execute_claimed(
    store: Arc<dyn TaskStore>,
    registry: Arc<HandlerRegistry>,
    task: Task,
    retry: RetryConfig,
) {
    let outcome = dispatch(&registry, &task).await;

    match outcome {
        Ok(value) => {
            let result = if value.is_null() {
                None
            } else {
                Some(serde_json::json!({ "value": value }))
            };
            if let Err(e) = store.mark_completed(task.id, result).await {
                tracing::error!(task_id = %task.id, error = %e, "failed to persist completion");
            }
        }
        Err(err) => {
            let error_text = format_error(&err);
            tracing::warn!(task_id = %task.id, name = %task.name, error = %error_text, "task execution failed");

            let decision = next_outcome(task.retry_count, task.max_retries, retry);
            if matches!(decision, FailureOutcome::Terminal) {
                tracing::error!(task_id = %task.id, name = %task.name, "task permanently failed");
            }
            if let Err(e) = store.record_failure(task.id, &error_text, decision).await {
                tracing::error!(task_id = %task.id, error = %e, "failed to persist failure");
            }
        }
    }
}

/// Dispatch the handler off the scheduling thread — handlers are treated as
/// synchronous, blocking user code. The timeout abandons *waiting*, not the
/// thread itself — a timed-out handler may still run to completion in the
/// background; at most one outcome is ever observed and recorded per claim.
async fn dispatch(registry: &HandlerRegistry, task: &Task) -> Result<serde_json::Value, anyhow::Error> {
    let Some(entry) = registry.lookup(&task.name) else {
        return Err(not_registered(&task.name));
    };
    let handler = Arc::clone(&entry.handler);
    let kwargs = task.kwargs.clone();
    let join = tokio::task::spawn_blocking(move || handler.invoke(kwargs));

    match task.timeout_seconds {
        Some(secs) => match tokio::time::timeout(StdDuration::from_secs_f64(secs.max(0) as f64), join).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(panicked(&join_err)),
            Err(_) => Err(timed_out(secs)),
        },
        None => match join.await {
            Ok(result) => result,
            Err(join_err) => Err(panicked(&join_err)),
        },
    }
}

/// Resolve when SIGINT or (on unix) SIGTERM is observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
