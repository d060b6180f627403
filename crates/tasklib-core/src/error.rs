//! Error taxonomy for the task queue core, split by the boundary each error
//! crosses: configuration errors stop the process before it starts,
//! submission errors propagate to the caller, execution/infrastructure
//! errors never leave the worker loop.

use thiserror::Error;

/// Raised by [`crate::registry::HandlerRegistry::register`] and
/// [`crate::queue::TaskQueue::init`]. Surfaced immediately; the process does
/// not start.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("task '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raised by [`crate::submit::submit_task`]. Propagates to the caller; no
/// row is ever written when this is returned.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("task '{0}' not registered")]
    NotRegistered(String),

    #[error("invalid arguments for task '{name}': {details}")]
    InvalidArguments { name: String, details: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raised by a handler's argument validator. Wrapped into
/// [`SubmitError::InvalidArguments`] at the submit boundary.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Infrastructure-level failure talking to the backing store. Never
/// propagates out of the worker loop — the poll loop logs it and continues.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("record not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
