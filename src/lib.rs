//! # Smart Tasks
//!
//! Task manager with nested subtasks and model-generated task breakdowns.
//!
//! This library provides:
//! - A task store that is the single mutation path for tasks and subtasks
//! - Pluggable key-value persistence (memory, JSON file, SQLite)
//! - Subtask generation through an OpenAI-compatible chat-completions API
//! - An HTTP API over the store
//!
//! ## Mutation Flow
//! 1. Validate the request and build a `Command`
//! 2. Reduce the current state into a new one
//! 3. Save the new state, then swap it in
//!
//! Generation awaits the model without holding the store lock and commits its
//! subtasks against whatever state is current when the model answers.
//!
//! ## Modules
//! - `task`: Task and subtask types, completion rules
//! - `store`: `TaskStore`, reducer and error taxonomy
//! - `persistence`: Storage backends
//! - `planner`: Subtask generation
//! - `llm`: Chat-completions client
//! - `api`: HTTP routes

pub mod api;
pub mod config;
pub mod llm;
pub mod persistence;
pub mod planner;
pub mod store;
pub mod task;

pub use config::Config;
pub use store::{SharedTaskStore, StoreError, TaskStore};
