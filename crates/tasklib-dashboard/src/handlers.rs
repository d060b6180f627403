//! Route handlers. Every handler reads; none mutates a task row.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tasklib_core::{Task, TaskFilter, TaskState};
use uuid::Uuid;

use crate::DashboardState;

pub async fn liveness() -> &'static str {
    "tasklib-dashboard"
}

pub async fn readiness(State(state): State<DashboardState>) -> Result<&'static str, ErrorResponse> {
    state
        .store
        .tasks_table_exists()
        .await
        .map_err(|e| ErrorResponse::internal(e.to_string()))?;
    Ok("ready")
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub state: Option<String>,
    pub name: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_tasks(
    State(state): State<DashboardState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, ErrorResponse> {
    let task_state = query
        .state
        .as_deref()
        .map(|s| s.parse::<TaskState>().map_err(ErrorResponse::bad_request))
        .transpose()?;

    let tasks = state
        .store
        .list(
            TaskFilter {
                state: task_state,
                name: query.name,
            },
            query.limit,
        )
        .await
        .map_err(|e| ErrorResponse::internal(e.to_string()))?;

    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<DashboardState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ErrorResponse> {
    let task = state
        .store
        .get(id)
        .await
        .map_err(|e| ErrorResponse::internal(e.to_string()))?
        .ok_or_else(|| ErrorResponse::not_found(format!("task '{id}' not found")))?;

    Ok(Json(task))
}

pub async fn stats(
    State(state): State<DashboardState>,
) -> Result<Json<tasklib_postgres::QueueStats>, ErrorResponse> {
    let stats = state
        .store
        .stats()
        .await
        .map_err(|e| ErrorResponse::internal(e.to_string()))?;
    Ok(Json(stats))
}

pub async fn workers(
    State(state): State<DashboardState>,
) -> Result<Json<Vec<tasklib_postgres::WorkerStats>>, ErrorResponse> {
    let workers = state
        .store
        .worker_stats()
        .await
        .map_err(|e| ErrorResponse::internal(e.to_string()))?;
    Ok(Json(workers))
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ErrorResponse {
    fn internal(error: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
        }
    }

    fn not_found(error: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error,
        }
    }

    fn bad_request(error: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl axum::response::IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tasklib_postgres::PgTaskStore;
    use tower::ServiceExt;

    #[sqlx::test]
    async fn liveness_reports_ok(pool: sqlx::PgPool) {
        let store = PgTaskStore::from_pool(pool);
        store.ensure_schema().await.unwrap();

        let state = DashboardState {
            store: std::sync::Arc::new(store),
        };
        let app = crate::add_routes(axum::Router::new(), state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/_liveness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test]
    async fn get_task_404s_for_unknown_id(pool: sqlx::PgPool) {
        let store = PgTaskStore::from_pool(pool);
        store.ensure_schema().await.unwrap();

        let state = DashboardState {
            store: std::sync::Arc::new(store),
        };
        let app = crate::add_routes(axum::Router::new(), state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/tasks/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
