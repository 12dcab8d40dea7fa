//! JSON file-based persistence: `{data_dir}/{key}.json`.

use super::{sanitize_filename, Persistence};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct FilePersistence {
    base_dir: PathBuf,
    persist_lock: Arc<Mutex<()>>,
}

impl FilePersistence {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create data dir: {}", e))?;
        Ok(Self {
            base_dir,
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.json", sanitize_filename(key)))
    }
}

#[async_trait]
impl Persistence for FilePersistence {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn load(&self, key: &str) -> Result<Option<String>, String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => {
                tracing::debug!("Loaded {} from {}", key, path.display());
                Ok(Some(contents))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(format!("Failed to read {}: {}", path.display(), err)),
        }
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), String> {
        let _guard = self.persist_lock.lock().await;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, blob)
            .await
            .map_err(|e| format!("Failed to write {}: {}", tmp_path.display(), e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| format!("Failed to finalize {}: {}", path.display(), e))?;
        tracing::debug!("Saved {} to {}", key, path.display());
        Ok(())
    }
}
