//! Execution-time error formatting.
//!
//! Execution errors never propagate out of the worker loop — they are
//! materialized into the row's `error` column as a formatted string
//! containing the failure's chain of causes and, when available, a
//! backtrace.

/// Render an error the way it will be stored on the row: anyhow's
/// alternate `Debug` output already includes the causal chain and a
/// backtrace when `RUST_BACKTRACE` is set, which covers the "class name,
/// message, stack trace" shape without hand-rolling one.
pub fn format_error(err: &anyhow::Error) -> String {
    format!("{err:?}")
}

pub fn not_registered(name: &str) -> anyhow::Error {
    anyhow::anyhow!("task '{name}' is not registered in this worker process")
}

pub fn timed_out(timeout_seconds: i64) -> anyhow::Error {
    anyhow::anyhow!("handler timeout after {timeout_seconds}s exceeded")
}

pub fn panicked(join_error: &tokio::task::JoinError) -> anyhow::Error {
    anyhow::anyhow!("handler panicked: {join_error}")
}
