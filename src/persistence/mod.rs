//! Key-value persistence with pluggable backends.
//!
//! The store saves its whole collection as one opaque blob under a fixed key.
//! Backends never look inside the blob.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `file`: One JSON file per key
//! - `sqlite`: SQLite key-value table

mod file;
mod memory;
mod sqlite;

pub use file::FilePersistence;
pub use memory::InMemoryPersistence;
pub use sqlite::SqlitePersistence;

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;

/// Key under which the task collection is stored.
pub const DEFAULT_STORE_KEY: &str = "task-manager-data";

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Sanitize a key for use as a filename.
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

/// Persistence trait - implemented by all storage backends.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Whether this backend keeps data across restarts.
    fn is_persistent(&self) -> bool;

    /// Load the blob stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<String>, String>;

    /// Replace the blob stored under `key`.
    async fn save(&self, key: &str, blob: &str) -> Result<(), String>;
}

/// Persistence backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceType {
    Memory,
    #[default]
    File,
    Sqlite,
}

impl PersistenceType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "file" | "json" => Self::File,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for PersistenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceType::Memory => write!(f, "memory"),
            PersistenceType::File => write!(f, "file"),
            PersistenceType::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Create a persistence backend based on type and data directory.
pub async fn create_persistence(
    backend: PersistenceType,
    data_dir: PathBuf,
) -> Result<Arc<dyn Persistence>, String> {
    match backend {
        PersistenceType::Memory => Ok(Arc::new(InMemoryPersistence::new())),
        PersistenceType::File => Ok(Arc::new(FilePersistence::new(data_dir).await?)),
        PersistenceType::Sqlite => Ok(Arc::new(SqlitePersistence::new(data_dir).await?)),
    }
}
