//! HTTP API for the task service.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/stats` - Task and subtask counts
//! - `GET /api/tasks` - List tasks in insertion order
//! - `POST /api/tasks` - Create a task
//! - `DELETE /api/tasks` - Remove every task
//! - `GET /api/tasks/{id}` - Get one task
//! - `PATCH /api/tasks/{id}` - Change text and/or completion
//! - `DELETE /api/tasks/{id}` - Delete a task and its subtasks
//! - `POST /api/tasks/{id}/subtasks` - Add a subtask
//! - `POST /api/tasks/{id}/subtasks/generate` - Generate subtasks
//! - `PATCH /api/tasks/{id}/subtasks/{subtask_id}` - Change a subtask
//! - `DELETE /api/tasks/{id}/subtasks/{subtask_id}` - Delete a subtask
//! - `GET /api/settings` - Whether a credential is stored
//! - `PUT /api/settings/api-key` - Store or clear the credential
//! - `POST /api/settings/api-key/test` - Test a credential

mod routes;
mod settings;
mod tasks;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
