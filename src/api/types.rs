//! API request and response types.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;
use crate::task::Subtask;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Persistence backend in use
    pub storage: String,
    /// Whether tasks survive a restart
    pub persistent: bool,
}

/// Request to create a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
}

/// Request to add a subtask by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubtaskRequest {
    pub text: String,
}

/// Request to generate subtasks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateSubtasksRequest {
    /// Description sent to the generator; the task's own text when absent
    #[serde(default)]
    pub description: Option<String>,
}

/// Subtasks appended by a generation call, in order.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateSubtasksResponse {
    pub subtasks: Vec<Subtask>,
}

/// Response after clearing all tasks.
#[derive(Debug, Clone, Serialize)]
pub struct ClearTasksResponse {
    pub removed: usize,
}

/// Settings as exposed over HTTP. The credential itself is never returned.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    pub has_api_key: bool,
}

/// Request to store or clear the credential.
#[derive(Debug, Clone, Deserialize)]
pub struct SetApiKeyRequest {
    /// Blank or null clears the stored credential
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,
}

/// Request to test a credential.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestConnectionRequest {
    /// Credential to test; the stored one when absent
    #[serde(default, alias = "apiKey")]
    pub api_key: Option<String>,
}

/// Outcome of a connection test.
#[derive(Debug, Clone, Serialize)]
pub struct TestConnectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Map a store error to an HTTP status and message.
pub fn store_error(err: StoreError) -> (StatusCode, String) {
    let status = match &err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
        StoreError::Integration(_) => StatusCode::BAD_GATEWAY,
        StoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
