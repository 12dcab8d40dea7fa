//! HTTP server setup and top-level routes.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::llm::{OpenAiClient, RetryConfig};
use crate::persistence::create_persistence;
use crate::planner::LlmSubtaskGenerator;
use crate::store::{SharedTaskStore, TaskStats, TaskStore};

use super::settings;
use super::tasks;
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedTaskStore,
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let persistence = create_persistence(config.store_backend, config.data_dir.clone())
        .await
        .map_err(anyhow::Error::msg)?;
    tracing::info!(
        "Using {} storage at {}",
        config.store_backend,
        config.data_dir.display()
    );

    let client = OpenAiClient::with_retry_config(
        config.llm.api_url.clone(),
        config.llm.timeout,
        RetryConfig::with_max_retries(config.llm.max_retries),
    )?;
    let generator = Arc::new(LlmSubtaskGenerator::new(
        Arc::new(client),
        config.llm.model.clone(),
    ));

    let store = TaskStore::open(persistence, generator, config.store_key.clone()).await?;
    let store = Arc::new(store);

    // The environment credential only fills an empty slot; a saved one wins.
    if let Some(api_key) = &config.openai_api_key {
        if !store.has_api_key().await {
            store.set_api_key(Some(api_key.clone())).await?;
            tracing::info!("API key seeded from OPENAI_API_KEY");
        }
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
    });
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the application router around `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/stats", get(get_stats))
        .nest("/api/tasks", tasks::routes())
        .nest("/api/settings", settings::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.config.store_backend.to_string(),
        persistent: state.store.is_persistent(),
    })
}

/// Get task statistics.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<TaskStats> {
    Json(state.store.stats().await)
}
