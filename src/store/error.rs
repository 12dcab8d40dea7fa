//! Store error taxonomy.

use crate::task::TaskError;

/// Errors returned by `TaskStore` operations and the reducer.
///
/// Every failing operation leaves the committed collection untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// User input was rejected (blank text).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A task or subtask id does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A required setting (the API credential) is missing.
    #[error("Not configured: {0}")]
    Configuration(String),

    /// The completion-generation collaborator failed or answered badly.
    #[error("Integration failed: {0}")]
    Integration(String),

    /// The persistence collaborator could not save the new state.
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl StoreError {
    pub(crate) fn task_not_found(id: impl std::fmt::Display) -> Self {
        StoreError::NotFound(format!("Task {} not found", id))
    }
}

impl From<TaskError> for StoreError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::EmptyText => StoreError::Validation(err.to_string()),
            TaskError::SubtaskNotFound(_) => StoreError::NotFound(err.to_string()),
        }
    }
}
