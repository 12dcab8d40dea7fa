//! Subtask definitions.
//!
//! A subtask belongs to exactly one task. Its completion flag feeds the
//! parent's flag; see `Task::update_subtask` for the propagation rule.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{normalize_text, TaskError};

/// Unique identifier for a subtask within its parent task.
///
/// Serialized as a plain string so stored blobs written by other clients
/// (which may use numeric-looking ids) load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(String);

impl SubtaskId {
    /// Create a new unique subtask ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SubtaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SubtaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SubtaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A child unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    id: SubtaskId,
    #[serde(default, deserialize_with = "text_or_empty")]
    text: String,
    #[serde(default)]
    completed: bool,
    created_at: i64,
}

/// Missing or null `text` loads as empty; see `deserialize_subtasks`.
fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Load a stored subtask list, dropping entries without usable text.
///
/// Generated subtasks were stored unchecked by earlier clients, so an entry
/// may lack `text`. Dropping it keeps the rest of the collection loadable.
pub(super) fn deserialize_subtasks<'de, D>(deserializer: D) -> Result<Vec<Subtask>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let stored = Vec::<Subtask>::deserialize(deserializer)?;
    let total = stored.len();
    let subtasks: Vec<Subtask> = stored
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    if subtasks.len() < total {
        tracing::warn!(
            "Dropped {} stored subtasks without text",
            total - subtasks.len()
        );
    }
    Ok(subtasks)
}

impl Subtask {
    /// Create a new, incomplete subtask.
    ///
    /// # Errors
    /// `TaskError::EmptyText` if `text` is blank after trimming.
    pub fn new(text: &str, created_at: i64) -> Result<Self, TaskError> {
        Ok(Self {
            id: SubtaskId::new(),
            text: normalize_text(text)?,
            completed: false,
            created_at,
        })
    }

    pub fn id(&self) -> &SubtaskId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub(super) fn set_text(&mut self, text: String) {
        self.text = text;
    }

    pub(super) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }
}

/// Partial update for a subtask. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl SubtaskUpdate {
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
