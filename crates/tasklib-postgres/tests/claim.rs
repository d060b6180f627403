//! Integration tests against a real PostgreSQL instance, in the style of
//! `hook-common::pgqueue`'s `#[sqlx::test]` suite — no mocked database.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use tasklib_core::{FailureOutcome, NewTask, TaskFilter, TaskState, TaskStore};
use tasklib_postgres::PgTaskStore;

async fn store(pool: PgPool) -> PgTaskStore {
    let store = PgTaskStore::from_pool(pool);
    store.ensure_schema().await.unwrap();
    store
}

fn new_task(name: &str) -> NewTask {
    NewTask {
        name: name.to_string(),
        kwargs: json!({}),
        scheduled_at: Utc::now(),
        max_retries: 3,
        timeout_seconds: None,
        priority: 0,
        tags: json!({}),
    }
}

#[sqlx::test]
async fn claim_one_returns_none_when_nothing_due(pool: PgPool) {
    let store = store(pool).await;
    let claimed = store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap();
    assert!(claimed.is_none());
}

#[sqlx::test]
async fn claim_one_picks_up_a_pending_task(pool: PgPool) {
    let store = store(pool).await;
    let id = store.insert(new_task("hello_world")).await.unwrap();

    let claimed = store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap()
        .expect("a pending task should be claimable");

    assert_eq!(claimed.id, id);
    assert_eq!(claimed.state, TaskState::Running);
    assert_eq!(claimed.worker_id.as_deref(), Some("worker-1"));
    assert!(claimed.locked_until.is_some());
    assert!(claimed.started_at.is_some());
}

#[sqlx::test]
async fn claim_one_skips_tasks_not_yet_due(pool: PgPool) {
    let store = store(pool).await;
    let mut future_task = new_task("hello_world");
    future_task.scheduled_at = Utc::now() + Duration::seconds(3600);
    store.insert(future_task).await.unwrap();

    let claimed = store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap();
    assert!(claimed.is_none());
}

#[sqlx::test]
async fn claim_one_skips_rows_locked_by_another_transaction(pool: PgPool) {
    let store = store(pool).await;
    store.insert(new_task("hello_world")).await.unwrap();

    // Simulate exclusivity by claiming twice in sequence: the second call
    // must not see the row the first call already claimed (it's now
    // `running` with a live lease), mirroring concurrent workers racing on
    // the same ready set.
    let first = store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = store
        .claim_one("worker-2", Duration::seconds(60))
        .await
        .unwrap();
    assert!(second.is_none());
}

#[sqlx::test]
async fn claim_one_reclaims_a_row_whose_lease_has_expired(pool: PgPool) {
    let store = store(pool).await;
    let id = store.insert(new_task("hello_world")).await.unwrap();

    // Claim with a lease that's already in the past.
    store
        .claim_one("dead-worker", Duration::seconds(-1))
        .await
        .unwrap()
        .expect("initial claim should succeed");

    let reclaimed = store
        .claim_one("live-worker", Duration::seconds(60))
        .await
        .unwrap()
        .expect("expired lease should make the row claimable again");

    assert_eq!(reclaimed.id, id);
    assert_eq!(reclaimed.worker_id.as_deref(), Some("live-worker"));
}

#[sqlx::test]
async fn claim_one_prefers_higher_priority(pool: PgPool) {
    let store = store(pool).await;
    let mut low = new_task("low");
    low.priority = 0;
    let mut high = new_task("high");
    high.priority = 10;

    store.insert(low).await.unwrap();
    let high_id = store.insert(high).await.unwrap();

    let claimed = store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(claimed.id, high_id);
}

#[sqlx::test]
async fn record_failure_retry_keeps_row_claimable_once_due(pool: PgPool) {
    let store = store(pool).await;
    let id = store.insert(new_task("unreliable")).await.unwrap();
    store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap();

    let next_retry_at = Utc::now() - Duration::seconds(1);
    store
        .record_failure(
            id,
            "boom",
            FailureOutcome::Retry {
                retry_count: 1,
                next_retry_at,
            },
        )
        .await
        .unwrap();

    let task = store.get(id).await.unwrap().unwrap();
    assert_eq!(task.state, TaskState::Failed);
    assert_eq!(task.retry_count, 1);
    assert_eq!(task.error.as_deref(), Some("boom"));

    let reclaimed = store
        .claim_one("worker-2", Duration::seconds(60))
        .await
        .unwrap()
        .expect("retry-eligible row should be claimable once due");
    assert_eq!(reclaimed.id, id);
}

#[sqlx::test]
async fn record_failure_terminal_leaves_row_unclaimable(pool: PgPool) {
    let store = store(pool).await;
    let id = store.insert(new_task("always_fails")).await.unwrap();
    store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap();

    store
        .record_failure(id, "exhausted", FailureOutcome::Terminal)
        .await
        .unwrap();

    let task = store.get(id).await.unwrap().unwrap();
    assert_eq!(task.state, TaskState::Failed);
    assert!(task.completed_at.is_some());

    let claimed = store
        .claim_one("worker-2", Duration::seconds(60))
        .await
        .unwrap();
    assert!(claimed.is_none(), "terminal failure must not be reclaimed");
}

#[sqlx::test]
async fn mark_completed_stores_result_and_clears_lease(pool: PgPool) {
    let store = store(pool).await;
    let id = store.insert(new_task("hello_world")).await.unwrap();
    store
        .claim_one("worker-1", Duration::seconds(60))
        .await
        .unwrap();

    store
        .mark_completed(id, Some(json!({"greeting": "hi"})))
        .await
        .unwrap();

    let task = store.get(id).await.unwrap().unwrap();
    assert_eq!(task.state, TaskState::Completed);
    assert_eq!(task.result, Some(json!({"greeting": "hi"})));
    assert!(task.worker_id.is_none());
    assert!(task.locked_until.is_none());
    assert!(task.completed_at.is_some());
}

#[sqlx::test]
async fn list_filters_by_state_and_name(pool: PgPool) {
    let store = store(pool).await;
    store.insert(new_task("a")).await.unwrap();
    let b_id = store.insert(new_task("b")).await.unwrap();
    store.claim_one("worker-1", Duration::seconds(60)).await.unwrap();

    let running = store
        .list(
            TaskFilter {
                state: Some(TaskState::Running),
                name: None,
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(running.len(), 1);

    let by_name = store
        .list(
            TaskFilter {
                state: None,
                name: Some("b".to_string()),
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, b_id);
}

#[sqlx::test]
async fn kwargs_round_trip_through_storage_unchanged(pool: PgPool) {
    let store = store(pool).await;
    let mut task = new_task("process_text");
    task.kwargs = json!({"text": "hello", "count": 3, "nested": {"a": [1, 2, 3]}});
    let id = store.insert(task).await.unwrap();

    let fetched = store.get(id).await.unwrap().unwrap();
    assert_eq!(
        fetched.kwargs,
        json!({"text": "hello", "count": 3, "nested": {"a": [1, 2, 3]}})
    );
}
