//! # Remote Mutator
//!
//! Deletes remote documents and tells observers about each outcome.
//!
//! Batch deletion is sequential and best effort: a failed delete is logged,
//! reported as `DeleteFailed`, and the batch moves on.

use crate::error::{Result, SyncError};
use bridge_traits::remote::RemoteStore;
use core_runtime::events::{CoreEvent, EventBus, RemoteEvent};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    /// Ids deleted, in request order
    pub deleted: Vec<String>,
    /// `(file_id, message)` for each failure, in request order
    pub failed: Vec<(String, String)>,
}

impl DeleteReport {
    pub fn all_deleted(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct RemoteMutator {
    store: Arc<dyn RemoteStore>,
    event_bus: EventBus,
}

impl RemoteMutator {
    pub fn new(store: Arc<dyn RemoteStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Delete one document.
    ///
    /// Emits `FileDeleted` on success. On failure emits `DeleteFailed` and
    /// returns the error.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        match self.store.delete(file_id).await {
            Ok(()) => {
                info!("Remote file deleted");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Remote(RemoteEvent::FileDeleted {
                        file_id: file_id.to_string(),
                    }));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Remote delete failed");
                let message = e.to_string();
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Remote(RemoteEvent::DeleteFailed {
                        file_id: file_id.to_string(),
                        message: message.clone(),
                    }));
                Err(match SyncError::from(e) {
                    SyncError::Auth(msg) => SyncError::Auth(msg),
                    _ => SyncError::Delete {
                        file_id: file_id.to_string(),
                        message,
                    },
                })
            }
        }
    }

    /// Delete every id in order. Never fails; see the returned report.
    #[instrument(skip(self, file_ids), fields(count = file_ids.len()))]
    pub async fn delete_all(&self, file_ids: &[String]) -> DeleteReport {
        let mut report = DeleteReport::default();

        for file_id in file_ids {
            match self.delete_file(file_id).await {
                Ok(()) => report.deleted.push(file_id.clone()),
                Err(e) => report.failed.push((file_id.clone(), e.to_string())),
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Batch delete finished"
        );
        report
    }
}
