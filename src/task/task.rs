//! Core Task type and the completion-consistency rule.
//!
//! # Invariants
//! - `id` is assigned at creation and never reassigned
//! - `text` is trimmed and non-empty
//! - Setting `completed` directly propagates to every subtask
//! - A subtask set to `false` forces the task to `false`; a subtask set to
//!   `true` that leaves every subtask complete forces the task to `true`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subtask::{deserialize_subtasks, Subtask, SubtaskId, SubtaskUpdate};

/// Trim user-supplied text, rejecting it when nothing is left.
pub fn normalize_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Unique identifier for a task.
///
/// # Properties
/// - Unique within a collection
/// - Immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new unique task ID.
    ///
    /// # Postcondition
    /// Returns a fresh ID that has never been used before in this process.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A top-level unit of work with an ordered list of subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for this task
    id: TaskId,

    /// What the user wants to get done
    text: String,

    completed: bool,

    /// Subtasks in creation order
    #[serde(default, deserialize_with = "deserialize_subtasks")]
    subtasks: Vec<Subtask>,

    /// Milliseconds since the epoch, issued by `Clock`
    created_at: i64,
}

impl Task {
    /// Create a new task.
    ///
    /// # Postconditions
    /// - `completed == false`, no subtasks
    /// - `task.id` is a fresh unique identifier
    ///
    /// # Errors
    /// `TaskError::EmptyText` if `text` is blank after trimming.
    pub fn new(text: &str, created_at: i64) -> Result<Self, TaskError> {
        Ok(Self {
            id: TaskId::new(),
            text: normalize_text(text)?,
            completed: false,
            subtasks: Vec::new(),
            created_at,
        })
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Completed and total subtask counts.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.is_completed()).count();
        (done, self.subtasks.len())
    }

    /// Latest timestamp carried by this task or any of its subtasks.
    pub fn latest_timestamp(&self) -> i64 {
        self.subtasks
            .iter()
            .map(Subtask::created_at)
            .fold(self.created_at, i64::max)
    }

    /// Apply a partial update.
    ///
    /// Text is validated before anything changes. When `completed` differs
    /// from the current value, every subtask takes the new value.
    pub fn apply(&mut self, update: TaskUpdate) -> Result<(), TaskError> {
        let text = update.text.as_deref().map(normalize_text).transpose()?;

        if let Some(text) = text {
            self.text = text;
        }
        if let Some(completed) = update.completed {
            if completed != self.completed {
                for subtask in &mut self.subtasks {
                    subtask.set_completed(completed);
                }
            }
            self.completed = completed;
        }
        Ok(())
    }

    /// Append a subtask. The task's own flag is left as it is.
    pub fn push_subtask(&mut self, subtask: Subtask) {
        self.subtasks.push(subtask);
    }

    /// Apply a partial update to one subtask and re-evaluate this task's flag.
    pub fn update_subtask(
        &mut self,
        subtask_id: &SubtaskId,
        update: SubtaskUpdate,
    ) -> Result<(), TaskError> {
        let index = self
            .subtasks
            .iter()
            .position(|s| s.id() == subtask_id)
            .ok_or_else(|| TaskError::SubtaskNotFound(subtask_id.clone()))?;
        let text = update.text.as_deref().map(normalize_text).transpose()?;

        let subtask = &mut self.subtasks[index];
        if let Some(text) = text {
            subtask.set_text(text);
        }
        if let Some(completed) = update.completed {
            subtask.set_completed(completed);
            if !completed {
                self.completed = false;
            } else if self.subtasks.iter().all(Subtask::is_completed) {
                self.completed = true;
            }
        }
        Ok(())
    }

    /// Remove one subtask. The task's own flag is not re-evaluated.
    pub fn remove_subtask(&mut self, subtask_id: &SubtaskId) -> Result<Subtask, TaskError> {
        let index = self
            .subtasks
            .iter()
            .position(|s| s.id() == subtask_id)
            .ok_or_else(|| TaskError::SubtaskNotFound(subtask_id.clone()))?;
        Ok(self.subtasks.remove(index))
    }
}

/// Partial update for a task. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            completed: None,
        }
    }
}

/// Errors that can occur during task operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Text cannot be empty")]
    EmptyText,

    #[error("Subtask {0} not found")]
    SubtaskNotFound(SubtaskId),
}
