//! API endpoints for the completion credential.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};

use crate::store::StoreError;

use super::routes::AppState;
use super::types::*;

/// Create the settings API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_settings))
        .route("/api-key", put(set_api_key))
        .route("/api-key/test", post(test_api_key))
}

/// GET /api/settings
async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        has_api_key: state.store.has_api_key().await,
    })
}

/// PUT /api/settings/api-key - Store the credential, or clear it with a blank value.
async fn set_api_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetApiKeyRequest>,
) -> Result<Json<SettingsResponse>, (StatusCode, String)> {
    state
        .store
        .set_api_key(req.api_key)
        .await
        .map_err(store_error)?;

    let has_api_key = state.store.has_api_key().await;
    tracing::info!("API key {}", if has_api_key { "updated" } else { "cleared" });
    Ok(Json(SettingsResponse { has_api_key }))
}

/// POST /api/settings/api-key/test
///
/// A provider rejection is reported in the body rather than as an HTTP error.
async fn test_api_key(
    State(state): State<Arc<AppState>>,
    body: Option<Json<TestConnectionRequest>>,
) -> Result<Json<TestConnectionResponse>, (StatusCode, String)> {
    let api_key = body.and_then(|Json(req)| req.api_key);

    match state.store.test_connection(api_key.as_deref()).await {
        Ok(()) => Ok(Json(TestConnectionResponse {
            success: true,
            error: None,
        })),
        Err(StoreError::Integration(message)) => {
            tracing::warn!("Connection test failed: {}", message);
            Ok(Json(TestConnectionResponse {
                success: false,
                error: Some(message),
            }))
        }
        Err(e) => Err(store_error(e)),
    }
}
