//! SQLite-based persistence: a single key-value table.

use super::{now_string, Persistence};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const DB_FILENAME: &str = "smart-tasks.db";

pub struct SqlitePersistence {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersistence {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create data dir: {}", e))?;
        let db_path = base_dir.join(DB_FILENAME);

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;
            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl Persistence for SqlitePersistence {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn load(&self, key: &str) -> Result<Option<String>, String> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))?
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), String> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        let blob = blob.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, blob, now_string()],
            )
            .map_err(|e| e.to_string())?;
            Ok(())
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upsert_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqlitePersistence::new(dir.path().to_path_buf())
                .await
                .unwrap();
            assert_eq!(store.load("task-manager-data").await.unwrap(), None);
            store.save("task-manager-data", "first").await.unwrap();
            store.save("task-manager-data", "second").await.unwrap();
        }

        let store = SqlitePersistence::new(dir.path().to_path_buf())
            .await
            .unwrap();
        assert_eq!(
            store.load("task-manager-data").await.unwrap().as_deref(),
            Some("second")
        );
    }
}
