//! Credential Persistence
//!
//! Stores the single process-wide [`Credential`] as a JSON document through
//! the host's `SecureStore`. On desktop the default store writes it to
//! `token.json` in the data directory.
//!
//! Token values are never logged.

use crate::error::{AuthError, Result};
use crate::types::Credential;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key the credential document is stored under.
pub const TOKEN_KEY: &str = "token";

/// Persistence for the OAuth credential.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self::with_key(secure_store, TOKEN_KEY)
    }

    pub fn with_key(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            secure_store,
            key: key.into(),
        }
    }

    /// Persist the credential, replacing any previous one.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize credential: {}", e)))?;

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist credential");
                AuthError::Storage(e.to_string())
            })?;

        info!(
            has_refresh_token = credential.refresh_token.is_some(),
            expires_at = %credential.expires_at,
            "Credential stored"
        );
        Ok(())
    }

    /// Load the persisted credential.
    ///
    /// Returns `Ok(None)` when nothing is stored. A document that no longer
    /// parses is deleted and reported as absent so the next authorization can
    /// replace it.
    pub async fn load(&self) -> Result<Option<Credential>> {
        let data = self
            .secure_store
            .get_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read persisted credential");
                AuthError::Storage(e.to_string())
            })?;

        let Some(data) = data else {
            debug!("No persisted credential");
            return Ok(None);
        };

        match serde_json::from_slice::<Credential>(&data) {
            Ok(credential) => {
                debug!(expires_at = %credential.expires_at, "Persisted credential loaded");
                Ok(Some(credential))
            }
            Err(e) => {
                warn!(error = %e, "Persisted credential is corrupted, discarding it");
                if let Err(delete_err) = self.secure_store.delete_secret(&self.key).await {
                    warn!(error = %delete_err, "Failed to delete corrupted credential");
                }
                Ok(None)
            }
        }
    }

    /// Remove the persisted credential. Succeeds when nothing is stored.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete persisted credential");
                AuthError::Storage(e.to_string())
            })?;
        info!("Persisted credential removed");
        Ok(())
    }

    pub async fn has_credential(&self) -> Result<bool> {
        self.secure_store
            .has_secret(&self.key)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))
    }
}
