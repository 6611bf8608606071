//! Settings Storage as a single JSON document

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::document::{read_document, write_document};

/// File-backed [`SettingsStore`].
///
/// All keys live in one JSON object document. Every write re-reads the
/// document under a lock, updates one key and replaces the file.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let Some(data) = read_document(&self.path).await? else {
            return Ok(Map::new());
        };

        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                warn!(path = ?self.path, "Settings document is not an object; ignoring it");
                Ok(Map::new())
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Settings document is corrupt; ignoring it");
                Ok(Map::new())
            }
        }
    }

    async fn store(&self, map: Map<String, Value>) -> Result<()> {
        let data = serde_json::to_vec_pretty(&Value::Object(map)).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode settings: {}", e))
        })?;
        write_document(&self.path, &data).await
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn set_json(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.store(map).await?;
        debug!(key = key, "Saved setting");
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<Value>> {
        let map = self.load().await?;
        Ok(map.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.store(map).await?;
            debug!(key = key, "Deleted setting");
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.keys().cloned().collect())
    }
}
