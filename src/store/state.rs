//! The persisted collection root.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// Everything the store persists, saved and loaded as one blob.
///
/// Field names follow the camelCase shape `{ "tasks": [...], "apiKey": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    /// Tasks in creation order
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Credential for the completion-generation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AppData {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub(crate) fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    /// Latest creation timestamp anywhere in the collection (0 when empty).
    pub fn latest_timestamp(&self) -> i64 {
        self.tasks
            .iter()
            .map(Task::latest_timestamp)
            .max()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> TaskStats {
        let mut stats = TaskStats {
            tasks: self.tasks.len(),
            ..TaskStats::default()
        };
        for task in &self.tasks {
            if task.is_completed() {
                stats.completed_tasks += 1;
            }
            let (done, total) = task.progress();
            stats.completed_subtasks += done;
            stats.subtasks += total;
        }
        stats
    }
}

/// Aggregate counts over the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub tasks: usize,
    pub completed_tasks: usize,
    pub subtasks: usize,
    pub completed_subtasks: usize,
}
