//! Task module - defines tasks, subtasks, and the completion-consistency rule.
//!
//! This module is designed so the consistency rule lives in the types:
//! - Fields are private and only change through explicit transitions
//! - Text is validated (trimmed, non-empty) in constructors and updates
//! - Pure functions are separated from IO operations (see `crate::store`)

mod clock;
mod subtask;
pub mod task;

pub use clock::Clock;
pub use subtask::{Subtask, SubtaskId, SubtaskUpdate};
pub use task::{normalize_text, Task, TaskError, TaskId, TaskUpdate};
