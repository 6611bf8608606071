//! Credential Storage as JSON documents on disk
//!
//! Each key maps to its own `<key>.json` file inside a directory, so the
//! OAuth credential lands in a plain `token.json` next to the settings
//! document.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::document::{read_document, remove_document, write_document};

/// File-backed [`SecureStore`].
///
/// Values are written verbatim; callers that store JSON get a readable
/// document. Writes are serialized through an internal lock.
pub struct JsonFileSecureStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSecureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid secret key: {:?}",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl SecureStore for JsonFileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        write_document(&path, value).await?;
        debug!(key = key, "Stored secret document");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        read_document(&path).await
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock().await;
        remove_document(&path).await?;
        debug!(key = key, "Deleted secret document");
        Ok(())
    }
}
