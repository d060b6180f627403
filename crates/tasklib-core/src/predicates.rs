//! Pure predicate helpers over a [`Task`] snapshot, kept as free functions
//! rather than methods so callers can import just the ones they need.

use crate::task::{Task, TaskState};

pub fn is_pending(task: &Task) -> bool {
    task.state == TaskState::Pending
}

pub fn is_running(task: &Task) -> bool {
    task.state == TaskState::Running
}

pub fn is_completed(task: &Task) -> bool {
    task.state == TaskState::Completed
}

pub fn is_failed(task: &Task) -> bool {
    task.state == TaskState::Failed
}

pub fn has_result(task: &Task) -> bool {
    task.result.is_some()
}

pub fn has_error(task: &Task) -> bool {
    task.error.is_some()
}

/// A terminal row will never change again: either completed, or failed
/// with retries exhausted.
pub fn is_terminal(task: &Task) -> bool {
    match task.state {
        TaskState::Completed => true,
        TaskState::Failed => task.retry_count >= task.max_retries,
        TaskState::Pending | TaskState::Running => false,
    }
}
