use crate::error::Result;
use bridge_traits::remote::{RemoteFile, RemoteStore};
use core_auth::{AuthSession, OAuthConfig, OAuthFlowManager, TokenStore};
use core_print::{
    PrintQueue, PrintRunReport, PrintSettings, PrintSettingsPatch, PrintSettingsStore, RunMode,
};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus, EventStream};
use core_runtime::CoreConfig;
use core_sync::{CatalogPoller, DeleteReport, RemoteCatalog, RemoteMutator, Transfer};
use provider_google_drive::GoogleDriveConnector;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Result of [`CoreService::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    /// Unreachable, or the credential was refused
    Disconnected,
    /// Reachable but the request failed
    Error(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

struct ServiceInner {
    folder_id: String,
    poll_interval: Duration,
    event_bus: EventBus,
    session: AuthSession,
    catalog: Arc<RemoteCatalog>,
    mutator: RemoteMutator,
    queue: PrintQueue,
    settings: Arc<PrintSettingsStore>,
    shutdown: CancellationToken,
}

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share the session, the print queue and the event
/// bus.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Wire the engine against Google Drive.
    pub fn new(config: CoreConfig) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let session = Self::build_session(&config, event_bus.clone());
        let store: Arc<dyn RemoteStore> = Arc::new(GoogleDriveConnector::new(
            config.http_client.clone(),
            Arc::new(session.clone()),
        ));
        Self::assemble(config, event_bus, session, store)
    }

    /// Wire the engine against another remote store.
    ///
    /// The store is responsible for its own authorization; the session
    /// built from `config` is still available through [`session`](Self::session).
    pub fn with_remote_store(config: CoreConfig, store: Arc<dyn RemoteStore>) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let session = Self::build_session(&config, event_bus.clone());
        Self::assemble(config, event_bus, session, store)
    }

    fn build_session(config: &CoreConfig, event_bus: EventBus) -> AuthSession {
        let flow = OAuthFlowManager::new(
            OAuthConfig::google_drive(&config.oauth),
            config.http_client.clone(),
        );
        AuthSession::new(
            flow,
            TokenStore::new(config.secure_store.clone()),
            config.authorization_prompt.clone(),
            event_bus,
        )
    }

    fn assemble(
        config: CoreConfig,
        event_bus: EventBus,
        session: AuthSession,
        store: Arc<dyn RemoteStore>,
    ) -> Self {
        let catalog = Arc::new(RemoteCatalog::for_folder(store.clone(), &config.folder_id));
        let transfer = Arc::new(Transfer::new(
            store.clone(),
            config.file_system.clone(),
            config.cache_dir.clone(),
        ));
        let settings = Arc::new(PrintSettingsStore::new(config.settings_store.clone()));
        let queue = PrintQueue::new(
            transfer,
            config.print_executor.clone(),
            settings.clone(),
            event_bus.clone(),
        );
        let mutator = RemoteMutator::new(store, event_bus.clone());

        info!(folder_id = %config.folder_id, "Core service ready");

        Self {
            inner: Arc::new(ServiceInner {
                folder_id: config.folder_id,
                poll_interval: config.poll_interval,
                event_bus,
                session,
                catalog,
                mutator,
                queue,
                settings,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn folder_id(&self) -> &str {
        &self.inner.folder_id
    }

    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Subscribe to every event the engine publishes.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// List the folder now and publish the result as `FileListUpdated`.
    ///
    /// On failure `RefreshFailed` is published and the error returned.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&self) -> Result<Vec<RemoteFile>> {
        match self.inner.catalog.list_files().await {
            Ok(files) => {
                self.emit(CoreEvent::Catalog(CatalogEvent::FileListUpdated {
                    files: files.clone(),
                }));
                Ok(files)
            }
            Err(e) => {
                warn!(error = %e, "Catalog refresh failed");
                self.emit(CoreEvent::Catalog(CatalogEvent::RefreshFailed {
                    message: e.to_string(),
                }));
                Err(e.into())
            }
        }
    }

    /// Start periodic catalog refreshes until [`shutdown`](Self::shutdown).
    pub fn start_polling(&self) -> JoinHandle<()> {
        CatalogPoller::new(
            self.inner.catalog.clone(),
            self.inner.event_bus.clone(),
            self.inner.poll_interval,
        )
        .spawn(self.inner.shutdown.child_token())
    }

    /// Stop background work started by this service.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Probe the remote folder with a single listing request.
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self.inner.catalog.probe().await {
            Ok(()) => ConnectionStatus::Connected,
            Err(e) if e.is_disconnect() => {
                warn!(error = %e, "Remote store unreachable");
                ConnectionStatus::Disconnected
            }
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                ConnectionStatus::Error(e.to_string())
            }
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub async fn get_settings(&self) -> Result<PrintSettings> {
        Ok(self.inner.settings.load().await?)
    }

    pub async fn save_settings(&self, settings: &PrintSettings) -> Result<()> {
        Ok(self.inner.settings.save(settings).await?)
    }

    pub async fn update_settings(&self, patch: &PrintSettingsPatch) -> Result<PrintSettings> {
        Ok(self.inner.settings.update(patch).await?)
    }

    // ------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------

    /// Print one document.
    ///
    /// Unlike the batch operations, a surfaced failure is returned as the
    /// error of this call.
    pub async fn print_one(&self, file: RemoteFile) -> Result<PrintRunReport> {
        let report = self.inner.queue.run(vec![file], RunMode::Selected).await?;
        match report.first_surfaced_error() {
            Some(error) => Err(error.into()),
            None => Ok(report),
        }
    }

    pub async fn print_all(&self, files: Vec<RemoteFile>) -> Result<PrintRunReport> {
        Ok(self.inner.queue.run(files, RunMode::All).await?)
    }

    pub async fn print_selected(&self, files: Vec<RemoteFile>) -> Result<PrintRunReport> {
        Ok(self.inner.queue.run(files, RunMode::Selected).await?)
    }

    /// Stop the active print run at the next item. Returns `false` when idle.
    pub async fn cancel_print(&self) -> bool {
        self.inner.queue.cancel().await
    }

    pub async fn is_printing(&self) -> bool {
        self.inner.queue.is_running().await
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    pub async fn delete_one(&self, file_id: &str) -> Result<()> {
        Ok(self.inner.mutator.delete_file(file_id).await?)
    }

    /// Best effort: failures are in the report and never abort the batch.
    pub async fn delete_all(&self, file_ids: &[String]) -> DeleteReport {
        self.inner.mutator.delete_all(file_ids).await
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Forget the stored credential.
    pub async fn sign_out(&self) -> Result<()> {
        Ok(self.inner.session.sign_out().await?)
    }

    /// Forget the stored credential and run the consent flow again.
    #[instrument(skip(self))]
    pub async fn reauthorize(&self) -> Result<()> {
        self.inner.session.sign_out().await?;
        self.inner.session.get_credential().await?;
        info!("Credentials updated");
        Ok(())
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.inner.event_bus.emit(event);
    }
}
