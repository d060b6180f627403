//! # tasklib-dashboard
//!
//! A read-only HTTP view over the task store: per-task lookup, filtered
//! listing, queue-wide counts, and per-worker lease snapshots. Observers
//! only ever read; nothing here mutates a row.

mod handlers;

use std::sync::Arc;

use axum::{routing, Router};
use tasklib_postgres::PgTaskStore;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<PgTaskStore>,
}

/// Build the route table. Kept separate from `main` so integration tests
/// can mount it on a router of their own.
pub fn add_routes(router: Router, state: DashboardState) -> Router {
    router
        .route("/_liveness", routing::get(handlers::liveness))
        .route("/_readiness", routing::get(handlers::readiness))
        .route("/tasks", routing::get(handlers::list_tasks))
        .route("/tasks/:id", routing::get(handlers::get_task))
        .route("/stats", routing::get(handlers::stats))
        .route("/workers", routing::get(handlers::workers))
        .with_state(state)
}
