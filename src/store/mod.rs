//! Task store - owns the task collection and is the only mutation path.
//!
//! # Commit path
//! Every mutation takes the write lock, runs the pure `reduce` on the current
//! state, saves the result through the persistence backend, and only then
//! swaps it in. A reducer error or a failed save leaves the committed state
//! as it was.
//!
//! Subtask generation awaits the collaborator without holding any lock and
//! then commits against the latest state, so mutations made meanwhile are
//! kept.

mod error;
mod reducer;
mod state;

pub use error::StoreError;
pub use reducer::{reduce, Command};
pub use state::{AppData, TaskStats};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::persistence::Persistence;
use crate::planner::SubtaskGenerator;
use crate::task::{
    normalize_text, Clock, Subtask, SubtaskId, SubtaskUpdate, Task, TaskId, TaskUpdate,
};

/// Shared task store handle.
pub type SharedTaskStore = Arc<TaskStore>;

pub struct TaskStore {
    state: RwLock<AppData>,
    persistence: Arc<dyn Persistence>,
    generator: Arc<dyn SubtaskGenerator>,
    key: String,
    clock: Clock,
}

impl TaskStore {
    /// Open the store, loading the blob saved under `key`.
    ///
    /// A missing blob starts an empty collection. A blob that does not parse
    /// is first copied to `{key}.corrupt-{millis}` and the store starts
    /// empty; the original is overwritten by the next commit.
    ///
    /// # Errors
    /// `Persistence` when the backend cannot be read, or when an unreadable
    /// blob cannot be backed up. Nothing is written in either case.
    pub async fn open(
        persistence: Arc<dyn Persistence>,
        generator: Arc<dyn SubtaskGenerator>,
        key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let key = key.into();
        let blob = persistence.load(&key).await.map_err(|e| {
            tracing::error!("Failed to load stored data '{}': {}", key, e);
            StoreError::Persistence(format!("Failed to load '{}': {}", key, e))
        })?;

        let data = match blob {
            Some(blob) => match serde_json::from_str::<AppData>(&blob) {
                Ok(data) => {
                    tracing::info!("Loaded {} tasks from '{}'", data.tasks.len(), key);
                    data
                }
                Err(e) => {
                    let backup_key = backup_corrupt_blob(persistence.as_ref(), &key, &blob).await?;
                    tracing::warn!(
                        "Stored data '{}' is unreadable ({}), copied to '{}', starting empty",
                        key,
                        e,
                        backup_key
                    );
                    AppData::default()
                }
            },
            None => {
                tracing::info!("No stored data under '{}', starting empty", key);
                AppData::default()
            }
        };

        Ok(Self::with_state(data, persistence, generator, key))
    }

    /// Build a store around an existing collection without loading anything.
    pub fn with_state(
        data: AppData,
        persistence: Arc<dyn Persistence>,
        generator: Arc<dyn SubtaskGenerator>,
        key: impl Into<String>,
    ) -> Self {
        let clock = Clock::starting_after(data.latest_timestamp());
        Self {
            state: RwLock::new(data),
            persistence,
            generator,
            key: key.into(),
            clock,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_persistent()
    }

    /// Reduce, save, then swap in the new state. Returns the state it replaced.
    async fn commit(&self, command: Command) -> Result<AppData, StoreError> {
        let name = command.name();
        let mut state = self.state.write().await;
        let next = reduce(&state, command)?;

        let blob = serde_json::to_string(&next)
            .map_err(|e| StoreError::Persistence(format!("Failed to serialize tasks: {}", e)))?;
        self.persistence
            .save(&self.key, &blob)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to save after {}: {}", name, e);
                StoreError::Persistence(e)
            })?;

        let previous = std::mem::replace(&mut *state, next);
        tracing::debug!(command = name, tasks = state.tasks.len(), "Committed");
        Ok(previous)
    }

    // Reads

    /// Copy of the whole collection, credential included.
    pub async fn snapshot(&self) -> AppData {
        self.state.read().await.clone()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.clone()
    }

    pub async fn get_task(&self, task_id: &TaskId) -> Result<Task, StoreError> {
        self.state
            .read()
            .await
            .task(task_id)
            .cloned()
            .ok_or_else(|| StoreError::task_not_found(task_id))
    }

    pub async fn stats(&self) -> TaskStats {
        self.state.read().await.stats()
    }

    pub async fn has_api_key(&self) -> bool {
        self.state.read().await.api_key.is_some()
    }

    // Task mutations

    pub async fn add_task(&self, text: &str) -> Result<Task, StoreError> {
        let task = Task::new(text, self.clock.tick())?;
        self.commit(Command::AddTask(task.clone())).await?;
        tracing::info!("Added task {}", task.id());
        Ok(task)
    }

    pub async fn update_task(
        &self,
        task_id: &TaskId,
        update: TaskUpdate,
    ) -> Result<(), StoreError> {
        self.commit(Command::UpdateTask {
            task_id: task_id.clone(),
            update,
        })
        .await?;
        Ok(())
    }

    pub async fn delete_task(&self, task_id: &TaskId) -> Result<(), StoreError> {
        self.commit(Command::DeleteTask {
            task_id: task_id.clone(),
        })
        .await?;
        tracing::info!("Deleted task {}", task_id);
        Ok(())
    }

    /// Remove every task. Returns how many were removed.
    pub async fn clear_tasks(&self) -> Result<usize, StoreError> {
        let previous = self.commit(Command::ClearTasks).await?;
        let count = previous.tasks.len();
        tracing::info!("Cleared {} tasks", count);
        Ok(count)
    }

    // Subtask mutations

    pub async fn add_subtask(&self, task_id: &TaskId, text: &str) -> Result<Subtask, StoreError> {
        let subtask = Subtask::new(text, self.clock.tick())?;
        self.commit(Command::AddSubtask {
            task_id: task_id.clone(),
            subtask: subtask.clone(),
        })
        .await?;
        Ok(subtask)
    }

    pub async fn update_subtask(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
        update: SubtaskUpdate,
    ) -> Result<(), StoreError> {
        self.commit(Command::UpdateSubtask {
            task_id: task_id.clone(),
            subtask_id: subtask_id.clone(),
            update,
        })
        .await?;
        Ok(())
    }

    pub async fn delete_subtask(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
    ) -> Result<(), StoreError> {
        self.commit(Command::DeleteSubtask {
            task_id: task_id.clone(),
            subtask_id: subtask_id.clone(),
        })
        .await?;
        Ok(())
    }

    /// Ask the generator for subtasks of `task_id` and append all of them.
    ///
    /// # Errors
    /// - `Configuration` when no credential is stored
    /// - `Validation` when `description` is blank
    /// - `NotFound` when the task is missing before the call or was deleted
    ///   while it was pending
    /// - `Integration` for any generator failure
    ///
    /// On error nothing is appended.
    pub async fn generate_subtasks_for(
        &self,
        task_id: &TaskId,
        description: &str,
    ) -> Result<Vec<Subtask>, StoreError> {
        let api_key = {
            let state = self.state.read().await;
            let api_key = state.api_key.clone().ok_or_else(|| {
                StoreError::Configuration(
                    "API key not configured. Add it in settings.".to_string(),
                )
            })?;
            if state.task(task_id).is_none() {
                return Err(StoreError::task_not_found(task_id));
            }
            api_key
        };
        let description = normalize_text(description)?;

        tracing::info!("Generating subtasks for task {}", task_id);
        let suggestions = self
            .generator
            .generate_subtasks(&api_key, &description)
            .await
            .map_err(|e| {
                tracing::error!("Subtask generation for task {} failed: {}", task_id, e);
                StoreError::Integration(e.to_string())
            })?;

        let subtasks = suggestions
            .iter()
            .map(|text| Subtask::new(text, self.clock.tick()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Integration(format!("Unusable suggestion: {}", e)))?;

        self.commit(Command::AppendSubtasks {
            task_id: task_id.clone(),
            subtasks: subtasks.clone(),
        })
        .await?;
        tracing::info!("Appended {} generated subtasks to task {}", subtasks.len(), task_id);
        Ok(subtasks)
    }

    // Settings

    /// Store the credential. Blank input clears it.
    pub async fn set_api_key(&self, api_key: Option<String>) -> Result<(), StoreError> {
        self.commit(Command::SetApiKey(api_key)).await?;
        Ok(())
    }

    /// Check a credential against the provider without changing state.
    ///
    /// Uses `api_key` when given, otherwise the stored credential.
    pub async fn test_connection(&self, api_key: Option<&str>) -> Result<(), StoreError> {
        let api_key = match api_key {
            Some(key) => normalize_text(key)
                .map_err(|_| StoreError::Validation("API key cannot be empty".to_string()))?,
            None => self.state.read().await.api_key.clone().ok_or_else(|| {
                StoreError::Configuration("API key not configured".to_string())
            })?,
        };

        self.generator
            .verify_credential(&api_key)
            .await
            .map_err(|e| StoreError::Integration(e.to_string()))
    }
}

/// Copy an unreadable blob aside so the next commit cannot destroy it.
async fn backup_corrupt_blob(
    persistence: &dyn Persistence,
    key: &str,
    blob: &str,
) -> Result<String, StoreError> {
    let backup_key = format!("{}.corrupt-{}", key, Utc::now().timestamp_millis());
    persistence.save(&backup_key, blob).await.map_err(|e| {
        StoreError::Persistence(format!("Failed to back up unreadable '{}': {}", key, e))
    })?;
    Ok(backup_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::persistence::InMemoryPersistence;
    use crate::planner::testing::StaticGenerator;
    use crate::planner::GenerationError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    const KEY: &str = "task-manager-data";

    fn store_with(generator: StaticGenerator) -> (TaskStore, InMemoryPersistence) {
        let persistence = InMemoryPersistence::new();
        let store = TaskStore::with_state(
            AppData::default(),
            Arc::new(persistence.clone()),
            Arc::new(generator),
            KEY,
        );
        (store, persistence)
    }

    fn store() -> TaskStore {
        store_with(StaticGenerator::ok(&[])).0
    }

    /// In-memory persistence whose loads and saves can be switched to fail.
    #[derive(Default)]
    struct FlakyPersistence {
        inner: InMemoryPersistence,
        fail_load: AtomicBool,
        fail_save: AtomicBool,
        saved_keys: std::sync::Mutex<Vec<String>>,
    }

    impl FlakyPersistence {
        async fn holding(blob: &str) -> Arc<Self> {
            let persistence = Self::default();
            persistence.inner.save(KEY, blob).await.unwrap();
            Arc::new(persistence)
        }

        fn saved(&self) -> Vec<String> {
            self.saved_keys.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Persistence for FlakyPersistence {
        fn is_persistent(&self) -> bool {
            true
        }

        async fn load(&self, key: &str) -> Result<Option<String>, String> {
            if self.fail_load.load(Ordering::SeqCst) {
                return Err("database is locked".to_string());
            }
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, blob: &str) -> Result<(), String> {
            if self.fail_save.load(Ordering::SeqCst) {
                return Err("disk full".to_string());
            }
            self.saved_keys.lock().unwrap().push(key.to_string());
            self.inner.save(key, blob).await
        }
    }

    #[tokio::test]
    async fn test_add_task_validation() {
        let store = store();
        assert!(matches!(
            store.add_task("").await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_task("   ").await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.tasks().await.is_empty());

        let task = store.add_task("Buy milk").await.unwrap();
        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id(), task.id());
        assert!(!tasks[0].is_completed());
    }

    #[tokio::test]
    async fn test_timestamps_increase_across_adds() {
        let store = store();
        let a = store.add_task("a").await.unwrap();
        let b = store.add_task("b").await.unwrap();
        let s = store.add_subtask(b.id(), "s").await.unwrap();
        assert!(b.created_at() > a.created_at());
        assert!(s.created_at() > b.created_at());
    }

    #[tokio::test]
    async fn test_completing_task_completes_subtasks() {
        let store = store();
        let task = store.add_task("Plan trip").await.unwrap();
        store.add_subtask(task.id(), "Book flight").await.unwrap();
        store.add_subtask(task.id(), "Book hotel").await.unwrap();

        store
            .update_task(task.id(), TaskUpdate::completed(true))
            .await
            .unwrap();
        let task = store.get_task(task.id()).await.unwrap();
        assert!(task.subtasks().iter().all(Subtask::is_completed));
    }

    #[tokio::test]
    async fn test_plan_trip_scenario() {
        let store = store();
        let task = store.add_task("Plan trip").await.unwrap();
        let flight = store.add_subtask(task.id(), "Book flight").await.unwrap();
        let hotel = store.add_subtask(task.id(), "Book hotel").await.unwrap();

        store
            .update_subtask(task.id(), flight.id(), SubtaskUpdate::completed(true))
            .await
            .unwrap();
        assert!(!store.get_task(task.id()).await.unwrap().is_completed());

        store
            .update_subtask(task.id(), hotel.id(), SubtaskUpdate::completed(true))
            .await
            .unwrap();
        assert!(store.get_task(task.id()).await.unwrap().is_completed());

        store
            .update_subtask(task.id(), flight.id(), SubtaskUpdate::completed(false))
            .await
            .unwrap();
        assert!(!store.get_task(task.id()).await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_deleted_task_subtasks_are_gone() {
        let store = store();
        let task = store.add_task("Plan trip").await.unwrap();
        let flight = store.add_subtask(task.id(), "Book flight").await.unwrap();
        store.delete_task(task.id()).await.unwrap();

        assert!(matches!(
            store
                .update_subtask(task.id(), flight.id(), SubtaskUpdate::completed(true))
                .await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_task(task.id()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_subtask() {
        let store = store();
        let task = store.add_task("Plan trip").await.unwrap();
        let flight = store.add_subtask(task.id(), "Book flight").await.unwrap();
        store.delete_subtask(task.id(), flight.id()).await.unwrap();
        assert!(store.get_task(task.id()).await.unwrap().subtasks().is_empty());
        assert!(matches!(
            store.delete_subtask(task.id(), flight.id()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commits_are_saved() {
        let (store, persistence) = store_with(StaticGenerator::ok(&[]));
        let task = store.add_task("Plan trip").await.unwrap();

        let blob = persistence.load(KEY).await.unwrap().expect("saved blob");
        let saved: AppData = serde_json::from_str(&blob).unwrap();
        assert_eq!(saved.tasks[0].id(), task.id());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_state_unchanged() {
        let persistence = Arc::new(FlakyPersistence::default());
        let store = TaskStore::with_state(
            AppData::default(),
            persistence.clone(),
            Arc::new(StaticGenerator::ok(&[])),
            KEY,
        );
        let task = store.add_task("Plan trip").await.unwrap();

        persistence.fail_save.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.update_task(task.id(), TaskUpdate::completed(true)).await,
            Err(StoreError::Persistence(_))
        ));
        assert!(matches!(
            store.add_task("Another").await,
            Err(StoreError::Persistence(_))
        ));

        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert!(!tasks[0].is_completed());
    }

    #[tokio::test]
    async fn test_open_reloads_saved_state_and_clock() {
        let persistence = InMemoryPersistence::new();
        let created = {
            let store = TaskStore::open(
                Arc::new(persistence.clone()),
                Arc::new(StaticGenerator::ok(&[])),
                KEY,
            )
            .await
            .unwrap();
            store.set_api_key(Some("sk-test".to_string())).await.unwrap();
            store.add_task("Plan trip").await.unwrap()
        };

        let store = TaskStore::open(
            Arc::new(persistence),
            Arc::new(StaticGenerator::ok(&[])),
            KEY,
        )
        .await
        .unwrap();
        assert!(store.has_api_key().await);
        assert_eq!(store.tasks().await[0].id(), created.id());
        let next = store.add_task("Later").await.unwrap();
        assert!(next.created_at() > created.created_at());
    }

    #[tokio::test]
    async fn test_open_fails_when_load_fails() {
        let saved = r#"{"tasks":[{"id":"1","text":"Important","completed":false,"createdAt":1}],
            "apiKey":"sk-x"}"#;
        let persistence = FlakyPersistence::holding(saved).await;
        persistence.fail_load.store(true, Ordering::SeqCst);

        let result = TaskStore::open(
            persistence.clone(),
            Arc::new(StaticGenerator::ok(&[])),
            KEY,
        )
        .await;
        assert!(matches!(result, Err(StoreError::Persistence(ref m)) if m.contains("locked")));
        assert!(persistence.saved().is_empty());

        persistence.fail_load.store(false, Ordering::SeqCst);
        assert_eq!(persistence.load(KEY).await.unwrap().as_deref(), Some(saved));
    }

    #[tokio::test]
    async fn test_open_backs_up_unreadable_blob() {
        let persistence = FlakyPersistence::holding("{not json").await;
        let store = TaskStore::open(
            persistence.clone(),
            Arc::new(StaticGenerator::ok(&[])),
            KEY,
        )
        .await
        .unwrap();
        assert!(store.tasks().await.is_empty());

        let saved = persistence.saved();
        assert_eq!(saved.len(), 1);
        let backup_key = &saved[0];
        assert!(backup_key.starts_with("task-manager-data.corrupt-"));

        store.add_task("New").await.unwrap();
        assert_eq!(
            persistence.load(backup_key).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_open_fails_when_backup_fails() {
        let persistence = FlakyPersistence::holding("{not json").await;
        persistence.fail_save.store(true, Ordering::SeqCst);

        let result = TaskStore::open(
            persistence.clone(),
            Arc::new(StaticGenerator::ok(&[])),
            KEY,
        )
        .await;
        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert_eq!(
            persistence.load(KEY).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_open_keeps_tasks_with_textless_subtasks() {
        let saved = r#"{"tasks":[{"id":"1","text":"Keep me","completed":false,"createdAt":1,
            "subtasks":[{"id":"2","completed":false,"createdAt":2}]}]}"#;
        let persistence = FlakyPersistence::holding(saved).await;
        let store = TaskStore::open(
            persistence.clone(),
            Arc::new(StaticGenerator::ok(&[])),
            KEY,
        )
        .await
        .unwrap();

        store.add_task("New").await.unwrap();
        let texts: Vec<_> = store
            .tasks()
            .await
            .iter()
            .map(|t| t.text().to_string())
            .collect();
        assert_eq!(texts, vec!["Keep me", "New"]);
        assert_eq!(persistence.saved(), vec![KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_generate_without_api_key_is_configuration_error() {
        let (store, _) = store_with(StaticGenerator::ok(&["Book flight"]));
        let task = store.add_task("Plan trip").await.unwrap();
        assert!(matches!(
            store.generate_subtasks_for(task.id(), "Plan trip").await,
            Err(StoreError::Configuration(_))
        ));
        assert!(store.get_task(task.id()).await.unwrap().subtasks().is_empty());
    }

    #[tokio::test]
    async fn test_generate_appends_in_order() {
        let (store, _) = store_with(StaticGenerator::ok(&["Book flight", "Book hotel", "Pack"]));
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        let task = store.add_task("Plan trip").await.unwrap();
        let existing = store.add_subtask(task.id(), "Pick dates").await.unwrap();

        let generated = store
            .generate_subtasks_for(task.id(), "Plan trip")
            .await
            .unwrap();
        assert_eq!(generated.len(), 3);
        assert!(generated.iter().all(|s| !s.is_completed()));
        assert!(generated
            .windows(2)
            .all(|w| w[1].created_at() > w[0].created_at() && w[1].id() != w[0].id()));

        let task = store.get_task(task.id()).await.unwrap();
        let texts: Vec<_> = task.subtasks().iter().map(|s| s.text()).collect();
        assert_eq!(texts, vec!["Pick dates", "Book flight", "Book hotel", "Pack"]);
        assert_eq!(task.subtasks()[0].id(), existing.id());
    }

    #[tokio::test]
    async fn test_generate_failure_appends_nothing() {
        let (store, _) = store_with(StaticGenerator::failing(
            GenerationError::MalformedResponse("missing subtasks".to_string()),
        ));
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        let task = store.add_task("Plan trip").await.unwrap();

        assert!(matches!(
            store.generate_subtasks_for(task.id(), "Plan trip").await,
            Err(StoreError::Integration(_))
        ));
        assert!(store.get_task(task.id()).await.unwrap().subtasks().is_empty());
    }

    #[tokio::test]
    async fn test_generate_http_failure_is_integration_error() {
        let (store, _) = store_with(StaticGenerator::failing(GenerationError::Llm(
            LlmError::from_status(500, "boom".to_string(), None),
        )));
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        let task = store.add_task("Plan trip").await.unwrap();
        let err = store
            .generate_subtasks_for(task.id(), "Plan trip")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Integration(ref m) if m.contains("HTTP 500")));
    }

    #[tokio::test]
    async fn test_generate_unknown_task_and_blank_description() {
        let (store, _) = store_with(StaticGenerator::ok(&["x"]));
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        assert!(matches!(
            store
                .generate_subtasks_for(&TaskId::from("missing"), "Plan trip")
                .await,
            Err(StoreError::NotFound(_))
        ));

        let task = store.add_task("Plan trip").await.unwrap();
        assert!(matches!(
            store.generate_subtasks_for(task.id(), "  ").await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_merges_with_concurrent_mutations() {
        let gate = Arc::new(Notify::new());
        let generator = StaticGenerator::ok(&["Book hotel"]).gated(gate.clone());
        let started = generator.started.clone();
        let (store, _) = store_with(generator);
        let store = Arc::new(store);
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        let task = store.add_task("Plan trip").await.unwrap();

        let pending = {
            let store = Arc::clone(&store);
            let task_id = task.id().clone();
            tokio::spawn(async move { store.generate_subtasks_for(&task_id, "Plan trip").await })
        };
        started.notified().await;

        // Mutations while the generator is pending.
        store.add_subtask(task.id(), "Book flight").await.unwrap();
        store
            .update_task(task.id(), TaskUpdate::text("Plan summer trip"))
            .await
            .unwrap();
        let other = store.add_task("Buy milk").await.unwrap();

        gate.notify_one();
        pending.await.unwrap().unwrap();

        let task = store.get_task(task.id()).await.unwrap();
        assert_eq!(task.text(), "Plan summer trip");
        let texts: Vec<_> = task.subtasks().iter().map(|s| s.text()).collect();
        assert_eq!(texts, vec!["Book flight", "Book hotel"]);
        assert!(store.get_task(other.id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_for_task_deleted_while_pending() {
        let gate = Arc::new(Notify::new());
        let generator = StaticGenerator::ok(&["Book hotel"]).gated(gate.clone());
        let started = generator.started.clone();
        let (store, _) = store_with(generator);
        let store = Arc::new(store);
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        let task = store.add_task("Plan trip").await.unwrap();
        let other = store.add_task("Buy milk").await.unwrap();

        let pending = {
            let store = Arc::clone(&store);
            let task_id = task.id().clone();
            tokio::spawn(async move { store.generate_subtasks_for(&task_id, "Plan trip").await })
        };
        started.notified().await;
        store.delete_task(task.id()).await.unwrap();
        gate.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(StoreError::NotFound(_))
        ));
        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id(), other.id());
        assert!(tasks[0].subtasks().is_empty());
    }

    #[tokio::test]
    async fn test_clear_tasks_and_stats() {
        let store = store();
        store.set_api_key(Some("sk-test".to_string())).await.unwrap();
        let task = store.add_task("Plan trip").await.unwrap();
        store.add_subtask(task.id(), "Book flight").await.unwrap();
        store.add_task("Buy milk").await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.tasks, 2);
        assert_eq!(stats.subtasks, 1);

        assert_eq!(store.clear_tasks().await.unwrap(), 2);
        assert_eq!(store.stats().await, TaskStats::default());
        assert!(store.has_api_key().await);
    }

    #[tokio::test]
    async fn test_clear_count_matches_concurrent_adds() {
        let store = Arc::new(store());
        let adders: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_task(&format!("Task {}", i)).await })
            })
            .collect();
        let clearer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.clear_tasks().await })
        };

        for adder in adders {
            adder.await.unwrap().unwrap();
        }
        let removed = clearer.await.unwrap().unwrap();
        assert_eq!(removed + store.tasks().await.len(), 20);
    }

    #[tokio::test]
    async fn test_api_key_set_and_clear() {
        let store = store();
        assert!(!store.has_api_key().await);
        store
            .set_api_key(Some("  sk-test  ".to_string()))
            .await
            .unwrap();
        assert_eq!(store.snapshot().await.api_key.as_deref(), Some("sk-test"));
        store.set_api_key(Some(String::new())).await.unwrap();
        assert!(!store.has_api_key().await);
    }

    #[tokio::test]
    async fn test_connection_checks() {
        let store = store();
        assert!(matches!(
            store.test_connection(None).await,
            Err(StoreError::Configuration(_))
        ));
        assert!(matches!(
            store.test_connection(Some("   ")).await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.test_connection(Some(" sk-valid ")).await.is_ok());
        assert!(matches!(
            store.test_connection(Some("sk-wrong")).await,
            Err(StoreError::Integration(_))
        ));

        store.set_api_key(Some("sk-valid".to_string())).await.unwrap();
        assert!(store.test_connection(None).await.is_ok());
    }
}
