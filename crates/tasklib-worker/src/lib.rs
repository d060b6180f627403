//! # tasklib-worker
//!
//! The claim-and-dispatch loop that turns `pending`/retry-eligible rows
//! into `completed`/`failed` ones. Depends only on the [`tasklib_core`]
//! contracts (`TaskStore`, `HandlerRegistry`) — any store implementation
//! can be driven by this crate.

mod error;
mod retry;
mod worker;

pub use error::format_error;
pub use retry::{next_outcome, RetryConfig};
pub use worker::{Worker, WorkerConfig};
