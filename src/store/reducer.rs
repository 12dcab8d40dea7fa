//! Pure state transitions: `(current state, command) -> new state`.
//!
//! Commands carry fully built entities (ids and timestamps already assigned),
//! so `reduce` has no side effects and no clock. It never mutates its input;
//! on error the caller still holds the untouched previous state.

use super::error::StoreError;
use super::state::AppData;
use crate::task::{Subtask, SubtaskId, SubtaskUpdate, Task, TaskId, TaskUpdate};

/// A single mutation of the collection.
#[derive(Debug, Clone)]
pub enum Command {
    AddTask(Task),
    UpdateTask {
        task_id: TaskId,
        update: TaskUpdate,
    },
    DeleteTask {
        task_id: TaskId,
    },
    AddSubtask {
        task_id: TaskId,
        subtask: Subtask,
    },
    /// Append several subtasks in order, all or none.
    AppendSubtasks {
        task_id: TaskId,
        subtasks: Vec<Subtask>,
    },
    UpdateSubtask {
        task_id: TaskId,
        subtask_id: SubtaskId,
        update: SubtaskUpdate,
    },
    DeleteSubtask {
        task_id: TaskId,
        subtask_id: SubtaskId,
    },
    /// Remove every task; the credential stays.
    ClearTasks,
    SetApiKey(Option<String>),
}

impl Command {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::AddTask(_) => "add_task",
            Command::UpdateTask { .. } => "update_task",
            Command::DeleteTask { .. } => "delete_task",
            Command::AddSubtask { .. } => "add_subtask",
            Command::AppendSubtasks { .. } => "append_subtasks",
            Command::UpdateSubtask { .. } => "update_subtask",
            Command::DeleteSubtask { .. } => "delete_subtask",
            Command::ClearTasks => "clear_tasks",
            Command::SetApiKey(_) => "set_api_key",
        }
    }
}

/// Apply `command` to a copy of `state`.
pub fn reduce(state: &AppData, command: Command) -> Result<AppData, StoreError> {
    let mut next = state.clone();

    match command {
        Command::AddTask(task) => {
            next.tasks.push(task);
        }
        Command::UpdateTask { task_id, update } => {
            let task = next
                .task_mut(&task_id)
                .ok_or_else(|| StoreError::task_not_found(&task_id))?;
            task.apply(update)?;
        }
        Command::DeleteTask { task_id } => {
            let before = next.tasks.len();
            next.tasks.retain(|t| t.id() != &task_id);
            if next.tasks.len() == before {
                return Err(StoreError::task_not_found(&task_id));
            }
        }
        Command::AddSubtask { task_id, subtask } => {
            let task = next
                .task_mut(&task_id)
                .ok_or_else(|| StoreError::task_not_found(&task_id))?;
            task.push_subtask(subtask);
        }
        Command::AppendSubtasks { task_id, subtasks } => {
            let task = next
                .task_mut(&task_id)
                .ok_or_else(|| StoreError::task_not_found(&task_id))?;
            for subtask in subtasks {
                task.push_subtask(subtask);
            }
        }
        Command::UpdateSubtask {
            task_id,
            subtask_id,
            update,
        } => {
            let task = next
                .task_mut(&task_id)
                .ok_or_else(|| StoreError::task_not_found(&task_id))?;
            task.update_subtask(&subtask_id, update)?;
        }
        Command::DeleteSubtask {
            task_id,
            subtask_id,
        } => {
            let task = next
                .task_mut(&task_id)
                .ok_or_else(|| StoreError::task_not_found(&task_id))?;
            task.remove_subtask(&subtask_id)?;
        }
        Command::ClearTasks => {
            next.tasks.clear();
        }
        Command::SetApiKey(api_key) => {
            next.api_key = api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty());
        }
    }

    Ok(next)
}
