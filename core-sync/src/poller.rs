//! # Catalog Poller
//!
//! Background refresh of the visible file list.
//!
//! Each tick lists the catalog and publishes `FileListUpdated`. A failed
//! refresh publishes `RefreshFailed` followed by an empty `FileListUpdated`
//! so nothing upstream has to handle a background error.

use crate::catalog::RemoteCatalog;
use bridge_traits::remote::RemoteFile;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct CatalogPoller {
    catalog: Arc<RemoteCatalog>,
    event_bus: EventBus,
    interval: Duration,
}

impl CatalogPoller {
    pub fn new(catalog: Arc<RemoteCatalog>, event_bus: EventBus, interval: Duration) -> Self {
        Self {
            catalog,
            event_bus,
            interval,
        }
    }

    /// Refresh once, degrading to an empty list on failure.
    pub async fn refresh_once(&self) -> Vec<RemoteFile> {
        let files = match self.catalog.list_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Background catalog refresh failed");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Catalog(CatalogEvent::RefreshFailed {
                        message: e.to_string(),
                    }));
                Vec::new()
            }
        };

        let _ = self
            .event_bus
            .emit(CoreEvent::Catalog(CatalogEvent::FileListUpdated {
                files: files.clone(),
            }));
        files
    }

    /// Run until `shutdown` is cancelled. The first refresh happens
    /// immediately.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = self.interval.as_secs(), "Catalog poller started");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let files = tokio::select! {
                            _ = shutdown.cancelled() => break,
                            files = self.refresh_once() => files,
                        };
                        debug!(count = files.len(), "Catalog poll finished");
                    }
                }
            }

            info!("Catalog poller stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::remote::{ListQuery, RemotePage, RemoteStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// First listing fails, later ones return one file.
    #[derive(Default)]
    struct FlakyStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for FlakyStore {
        async fn list_page(&self, _: &ListQuery, _: Option<&str>) -> BridgeResult<RemotePage> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(BridgeError::NotAvailable("offline".to_string()));
            }
            Ok(RemotePage {
                files: vec![RemoteFile::new("1", "A.pdf")],
                next_page_token: None,
            })
        }

        async fn content_stream(
            &self,
            _file_id: &str,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            unimplemented!()
        }

        async fn delete(&self, _file_id: &str) -> BridgeResult<()> {
            unimplemented!()
        }
    }

    fn poller(bus: &EventBus, interval: Duration) -> CatalogPoller {
        let catalog = Arc::new(RemoteCatalog::for_folder(
            Arc::new(FlakyStore::default()),
            "folder",
        ));
        CatalogPoller::new(catalog, bus.clone(), interval)
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty_list() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let poller = poller(&bus, Duration::from_secs(15));

        assert!(poller.refresh_once().await.is_empty());
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Catalog(CatalogEvent::RefreshFailed { .. })
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Catalog(CatalogEvent::FileListUpdated { files: vec![] })
        );

        assert_eq!(poller.refresh_once().await.len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_poller_ticks_and_stops() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let shutdown = CancellationToken::new();
        let handle = poller(&bus, Duration::from_millis(10)).spawn(shutdown.clone());

        let mut updates = 0;
        while updates < 3 {
            if let CoreEvent::Catalog(CatalogEvent::FileListUpdated { .. }) =
                rx.recv().await.unwrap()
            {
                updates += 1;
            }
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
