//! # tasklib-core
//!
//! The persistent task model, handler registry, and submit API of a
//! durable, at-least-once task queue backed by a relational database with
//! row-level locking. The database is the single source of truth — this
//! crate defines the [`TaskStore`] contract but ships no implementation;
//! see `tasklib-postgres` for the PostgreSQL backend and `tasklib-worker`
//! for the claiming/dispatch loop.
//!
//! ## Core Concepts
//!
//! - [`Task`] = the one entity, persisted one row per submission.
//! - [`HandlerRegistry`] = process-local `name -> (callable, schema,
//!   overrides)` mapping, populated at process start.
//! - [`submit_task`] = validate arguments, resolve overrides, insert a
//!   `pending` row.
//! - [`TaskQueue`] = an owned runtime instance tying the above together,
//!   used by both submit-side callers and (indirectly, via its registry and
//!   store) the worker loop.
//!
//! Data flow: `submit -> row(pending) -> claim -> row(running) -> handler
//! -> row(completed|failed)`. Workers never talk to each other directly;
//! all coordination happens through mutations of this one table.

mod config;
mod error;
mod predicates;
mod queue;
mod registry;
mod store;
mod submit;
mod task;

pub use config::Config;
pub use error::{InitError, StoreError, SubmitError, ValidationError};
pub use predicates::{
    has_error, has_result, is_completed, is_failed, is_pending, is_running, is_terminal,
};
pub use queue::TaskQueue;
pub use registry::{Handler, HandlerRegistry, RegisteredHandler, TaskOverrides};
pub use store::TaskStore;
pub use submit::{submit_task, SubmitOptions};
pub use task::{FailureOutcome, NewTask, Task, TaskFilter, TaskState};

pub use async_trait::async_trait;
