use std::sync::Arc;

use axum::Router;
use tasklib_dashboard::{add_routes, DashboardState};
use tasklib_postgres::PgTaskStore;

async fn listen(app: Router, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let bind = std::env::var("TASKLIB_DASHBOARD_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let store = PgTaskStore::connect(&database_url)
        .await
        .expect("failed to connect to database");

    let state = DashboardState {
        store: Arc::new(store),
    };
    let app = add_routes(Router::new(), state);

    if let Err(e) = listen(app, &bind).await {
        tracing::error!("tasklib-dashboard server failed: {e}");
    }
}
