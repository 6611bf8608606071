//! # Print Queue
//!
//! Downloads and prints an ordered list of documents, one at a time.
//!
//! A run snapshots the print settings once, then for each file checks the
//! cancellation flag, transfers the file into the cache and hands it to the
//! print executor. Failures never stop the batch; the [`ErrorPolicy`]
//! decides whether a failure is surfaced to the user or only logged.
//!
//! Events per run, in order: `Started`, then for every processed file an
//! optional `ItemFailed` followed by `Progress { completed: i + 1 }`, then
//! `Completed` or `Cancelled`.
//!
//! Only one run may be active per queue. Cancellation is cooperative and
//! takes effect at the next item boundary: the item in flight always
//! finishes first.

use crate::error::{PrintError, Result};
use crate::job::{PrintJob, PrintJobId, PrintStatus, RunMode};
use crate::settings::{PrintSettings, PrintSettingsStore};
use bridge_traits::print::{PrintExecutor, PrintOptions};
use bridge_traits::remote::RemoteFile;
use core_runtime::events::{CoreEvent, EventBus, PrintEvent};
use core_sync::Transfer;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Whether per-item failures reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log executor failures and keep going
    Silent,
    /// Report executor failures to the user and keep going
    Surface,
}

impl ErrorPolicy {
    /// Preview runs surface executor failures; silent runs swallow them.
    pub fn for_settings(settings: &PrintSettings) -> Self {
        if settings.preview {
            ErrorPolicy::Surface
        } else {
            ErrorPolicy::Silent
        }
    }

    /// Download failures are always surfaced; executor failures only under
    /// [`ErrorPolicy::Surface`].
    pub fn surfaces(&self, stage: FailureStage) -> bool {
        match stage {
            FailureStage::Transfer => true,
            FailureStage::Executor => matches!(self, ErrorPolicy::Surface),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Transfer,
    Executor,
}

/// One item that could not be printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintFailure {
    pub file_id: String,
    pub file_name: String,
    pub stage: FailureStage,
    pub message: String,
    pub surfaced: bool,
}

impl PrintFailure {
    pub fn to_error(&self) -> PrintError {
        match self.stage {
            FailureStage::Transfer => PrintError::Transfer {
                file_name: self.file_name.clone(),
                message: self.message.clone(),
            },
            FailureStage::Executor => PrintError::Executor {
                file_name: self.file_name.clone(),
                message: self.message.clone(),
            },
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintRunReport {
    pub job_id: String,
    pub mode: RunMode,
    pub policy: ErrorPolicy,
    pub status: PrintStatus,
    pub total: usize,
    pub completed: usize,
    pub failures: Vec<PrintFailure>,
}

impl PrintRunReport {
    pub fn surfaced_failures(&self) -> impl Iterator<Item = &PrintFailure> {
        self.failures.iter().filter(|f| f.surfaced)
    }

    /// The first failure the policy surfaced, as an error.
    pub fn first_surfaced_error(&self) -> Option<PrintError> {
        self.surfaced_failures().next().map(PrintFailure::to_error)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == PrintStatus::Cancelled
    }
}

struct ActiveRun {
    job_id: PrintJobId,
    cancel: CancellationToken,
}

/// Frees the active-run slot when the run ends, including when its future is
/// dropped before finishing.
struct SlotRelease<'a> {
    queue: &'a PrintQueue,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        if let Some(run) = self.queue.slot().take() {
            debug!(job_id = %run.job_id, "Print slot released");
        }
    }
}

/// Sequential print orchestrator. Owns the single active-run slot.
pub struct PrintQueue {
    transfer: Arc<Transfer>,
    executor: Arc<dyn PrintExecutor>,
    settings: Arc<PrintSettingsStore>,
    event_bus: EventBus,
    active: Mutex<Option<ActiveRun>>,
}

impl PrintQueue {
    pub fn new(
        transfer: Arc<Transfer>,
        executor: Arc<dyn PrintExecutor>,
        settings: Arc<PrintSettingsStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            transfer,
            executor,
            settings,
            event_bus,
            active: Mutex::new(None),
        }
    }

    /// Print `files` in order with the policy implied by the stored settings.
    ///
    /// # Errors
    ///
    /// Returns [`PrintError::JobInProgress`] if another run is active. Item
    /// failures are reported in the returned [`PrintRunReport`].
    pub async fn run(&self, files: Vec<RemoteFile>, mode: RunMode) -> Result<PrintRunReport> {
        self.execute(files, mode, None).await
    }

    /// Like [`run`](Self::run) with an explicit error policy.
    pub async fn run_with_policy(
        &self,
        files: Vec<RemoteFile>,
        mode: RunMode,
        policy: ErrorPolicy,
    ) -> Result<PrintRunReport> {
        self.execute(files, mode, Some(policy)).await
    }

    /// Ask the active run to stop at the next item boundary.
    ///
    /// Returns `false` when nothing is running.
    pub async fn cancel(&self) -> bool {
        match self.slot().as_ref() {
            Some(run) => {
                info!(job_id = %run.job_id, "Cancelling print run");
                run.cancel.cancel();
                true
            }
            None => {
                debug!("Cancel requested with no active print run");
                false
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.slot().is_some()
    }

    pub async fn active_job_id(&self) -> Option<PrintJobId> {
        self.slot().as_ref().map(|run| run.job_id)
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute(
        &self,
        files: Vec<RemoteFile>,
        mode: RunMode,
        policy: Option<ErrorPolicy>,
    ) -> Result<PrintRunReport> {
        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Falling back to default print settings");
                PrintSettings::default()
            }
        };
        let policy = policy.unwrap_or_else(|| ErrorPolicy::for_settings(&settings));
        let job = PrintJob::new(mode, files.len(), settings);

        let cancel = self.claim(job.id)?;
        let _release = SlotRelease { queue: self };
        self.drive(job, &files, policy, &cancel).await
    }

    fn claim(&self, job_id: PrintJobId) -> Result<CancellationToken> {
        let mut active = self.slot();
        if let Some(run) = active.as_ref() {
            warn!(active = %run.job_id, "Rejecting print run while another is active");
            return Err(PrintError::JobInProgress {
                job_id: run.job_id.to_string(),
            });
        }

        let cancel = CancellationToken::new();
        *active = Some(ActiveRun {
            job_id,
            cancel: cancel.clone(),
        });
        Ok(cancel)
    }

    #[instrument(skip_all, fields(job_id = %job.id, mode = %job.mode, total = job.total))]
    async fn drive(
        &self,
        job: PrintJob,
        files: &[RemoteFile],
        policy: ErrorPolicy,
        cancel: &CancellationToken,
    ) -> Result<PrintRunReport> {
        let job_id = job.id.to_string();
        let total = job.total;
        let mut job = job.start()?;
        let options = job.settings.to_print_options();

        info!(?policy, "Print run started");
        self.emit(PrintEvent::Started {
            job_id: job_id.clone(),
            total,
        });

        let mut failures = Vec::new();
        let mut cancelled = false;

        for file in files {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            if let Err(failure) = self.print_item(file, &options, policy).await {
                self.emit(PrintEvent::ItemFailed {
                    job_id: job_id.clone(),
                    file_id: failure.file_id.clone(),
                    file_name: failure.file_name.clone(),
                    message: failure.message.clone(),
                    surfaced: failure.surfaced,
                });
                failures.push(failure);
            }

            let completed = job.record_item()?;
            self.emit(PrintEvent::Progress {
                job_id: job_id.clone(),
                completed,
                total,
            });
        }

        let job = if cancelled {
            let job = job.cancel()?;
            info!(completed = job.completed, "Print run cancelled");
            self.emit(PrintEvent::Cancelled {
                job_id: job_id.clone(),
                completed: job.completed,
                total,
            });
            job
        } else {
            let job = job.complete()?;
            info!(failed = failures.len(), "Print run completed");
            self.emit(PrintEvent::Completed {
                job_id: job_id.clone(),
                total,
            });
            job
        };

        Ok(PrintRunReport {
            job_id,
            mode: job.mode,
            policy,
            status: job.status,
            total,
            completed: job.completed,
            failures,
        })
    }

    #[instrument(skip(self, options), fields(file_id = %file.id))]
    async fn print_item(
        &self,
        file: &RemoteFile,
        options: &PrintOptions,
        policy: ErrorPolicy,
    ) -> std::result::Result<(), PrintFailure> {
        let path = self
            .transfer
            .download_file(file)
            .await
            .map_err(|e| Self::failure(file, FailureStage::Transfer, e.to_string(), policy))?;

        self.executor
            .print(&path, options)
            .await
            .map_err(|e| Self::failure(file, FailureStage::Executor, e.to_string(), policy))?;

        debug!("Printed");
        Ok(())
    }

    fn failure(
        file: &RemoteFile,
        stage: FailureStage,
        message: String,
        policy: ErrorPolicy,
    ) -> PrintFailure {
        let surfaced = policy.surfaces(stage);
        if surfaced {
            error!(?stage, error = %message, "Print item failed");
        } else {
            warn!(?stage, error = %message, "Print item failed, continuing silently");
        }

        PrintFailure {
            file_id: file.id.clone(),
            file_name: file.name.clone(),
            stage,
            message,
            surfaced,
        }
    }

    fn emit(&self, event: PrintEvent) {
        let _ = self.event_bus.emit(CoreEvent::Print(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Setting, SETTINGS_KEY};
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::remote::{ListQuery, RemotePage, RemoteStore};
    use bridge_traits::storage::SettingsStore;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tokio::sync::{broadcast::Receiver, Mutex, Notify};

    #[derive(Default)]
    struct PdfStore {
        content: HashMap<String, Vec<u8>>,
    }

    impl PdfStore {
        fn with(ids: &[&str]) -> Self {
            Self {
                content: ids
                    .iter()
                    .map(|id| (id.to_string(), format!("%PDF {}", id).into_bytes()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl RemoteStore for PdfStore {
        async fn list_page(&self, _: &ListQuery, _: Option<&str>) -> BridgeResult<RemotePage> {
            Ok(RemotePage::default())
        }

        async fn content_stream(
            &self,
            file_id: &str,
        ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            match self.content.get(file_id) {
                Some(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
                None => Err(BridgeError::OperationFailed("404 not found".to_string())),
            }
        }

        async fn delete(&self, _file_id: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySettingsStore {
        values: Mutex<HashMap<String, Value>>,
    }

    #[async_trait]
    impl SettingsStore for MemorySettingsStore {
        async fn set_json(&self, key: &str, value: Value) -> BridgeResult<()> {
            self.values.lock().await.insert(key.to_string(), value);
            Ok(())
        }

        async fn get_json(&self, key: &str) -> BridgeResult<Option<Value>> {
            Ok(self.values.lock().await.get(key).cloned())
        }

        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.values.lock().await.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.values.lock().await.keys().cloned().collect())
        }
    }

    /// Holds the print of one named file until released.
    struct Gate {
        file_name: &'static str,
        reached: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct FakeExecutor {
        printed: Mutex<Vec<(PathBuf, PrintOptions)>>,
        failing: Vec<&'static str>,
        gate: Option<Gate>,
    }

    #[async_trait]
    impl PrintExecutor for FakeExecutor {
        async fn print(&self, path: &Path, options: &PrintOptions) -> BridgeResult<()> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            if let Some(gate) = &self.gate {
                if gate.file_name == name {
                    gate.reached.notify_one();
                    gate.release.notified().await;
                }
            }

            if self.failing.contains(&name.as_str()) {
                return Err(BridgeError::OperationFailed("printer jammed".to_string()));
            }
            self.printed
                .lock()
                .await
                .push((path.to_path_buf(), options.clone()));
            Ok(())
        }
    }

    struct Harness {
        queue: Arc<PrintQueue>,
        executor: Arc<FakeExecutor>,
        settings: Arc<MemorySettingsStore>,
        events: Receiver<CoreEvent>,
    }

    fn harness(test: &str, store: PdfStore, executor: FakeExecutor) -> Harness {
        let cache = std::env::temp_dir()
            .join(format!("core-print-queue-{}-{}", test, std::process::id()))
            .join("downloads");
        let transfer = Arc::new(Transfer::new(
            Arc::new(store),
            Arc::new(TokioFileSystem::new()),
            cache,
        ));
        let executor = Arc::new(executor);
        let settings = Arc::new(MemorySettingsStore::default());
        let bus = EventBus::new(64);
        let events = bus.subscribe();
        let queue = Arc::new(PrintQueue::new(
            transfer,
            executor.clone(),
            Arc::new(PrintSettingsStore::new(settings.clone())),
            bus,
        ));

        Harness {
            queue,
            executor,
            settings,
            events,
        }
    }

    fn files(names: &[&str]) -> Vec<RemoteFile> {
        names
            .iter()
            .map(|name| RemoteFile::new(name.trim_end_matches(".pdf"), *name))
            .collect()
    }

    fn drain(rx: &mut Receiver<CoreEvent>) -> Vec<PrintEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::Print(event) = event {
                events.push(event);
            }
        }
        events
    }

    fn progress(events: &[PrintEvent]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|event| match event {
                PrintEvent::Progress {
                    completed, total, ..
                } => Some((*completed, *total)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_error_policy() {
        let preview = PrintSettings {
            preview: true,
            ..PrintSettings::default()
        };
        assert_eq!(ErrorPolicy::for_settings(&preview), ErrorPolicy::Surface);
        assert_eq!(
            ErrorPolicy::for_settings(&PrintSettings::default()),
            ErrorPolicy::Silent
        );

        assert!(!ErrorPolicy::Silent.surfaces(FailureStage::Executor));
        assert!(ErrorPolicy::Silent.surfaces(FailureStage::Transfer));
        assert!(ErrorPolicy::Surface.surfaces(FailureStage::Executor));
        assert!(ErrorPolicy::Surface.surfaces(FailureStage::Transfer));
    }

    #[tokio::test]
    async fn test_print_all_reports_progress_in_order() {
        let mut h = harness(
            "all",
            PdfStore::with(&["A", "B", "C"]),
            FakeExecutor::default(),
        );

        let report = h
            .queue
            .run(files(&["A.pdf", "B.pdf", "C.pdf"]), RunMode::All)
            .await
            .unwrap();

        assert_eq!(report.status, PrintStatus::Completed);
        assert_eq!(report.completed, 3);
        assert_eq!(report.policy, ErrorPolicy::Silent);
        assert!(report.failures.is_empty());

        let events = drain(&mut h.events);
        assert_eq!(progress(&events), vec![(1, 3), (2, 3), (3, 3)]);
        assert!(matches!(events.first(), Some(PrintEvent::Started { total: 3, .. })));
        assert!(matches!(events.last(), Some(PrintEvent::Completed { total: 3, .. })));

        let printed = h.executor.printed.lock().await;
        let names: Vec<_> = printed
            .iter()
            .map(|(path, _)| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.pdf", "B.pdf", "C.pdf"]);
        assert!(printed.iter().all(|(path, _)| path.is_absolute()));
        assert_eq!(std::fs::read(&printed[1].0).unwrap(), b"%PDF B");
    }

    #[tokio::test]
    async fn test_silent_run_survives_executor_failures() {
        let mut h = harness(
            "silent-failures",
            PdfStore::with(&["1", "2", "3", "4", "5", "6"]),
            FakeExecutor {
                failing: vec!["2.pdf", "5.pdf"],
                ..Default::default()
            },
        );

        let report = h
            .queue
            .run(
                files(&["1.pdf", "2.pdf", "3.pdf", "4.pdf", "5.pdf", "6.pdf"]),
                RunMode::All,
            )
            .await
            .unwrap();

        assert_eq!(report.status, PrintStatus::Completed);
        assert_eq!(report.completed, 6);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| !f.surfaced));
        assert!(report
            .failures
            .iter()
            .all(|f| f.stage == FailureStage::Executor));
        assert!(report.first_surfaced_error().is_none());

        let events = drain(&mut h.events);
        assert_eq!(
            progress(&events),
            (1..=6).map(|i| (i, 6)).collect::<Vec<_>>()
        );
        assert_eq!(h.executor.printed.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn test_preview_surfaces_failures_without_halting() {
        let mut h = harness(
            "preview",
            PdfStore::with(&["A", "B"]),
            FakeExecutor {
                failing: vec!["A.pdf"],
                ..Default::default()
            },
        );
        h.settings
            .set_json(SETTINGS_KEY, serde_json::json!({ "preview": true }))
            .await
            .unwrap();

        let report = h
            .queue
            .run(files(&["A.pdf", "B.pdf"]), RunMode::Selected)
            .await
            .unwrap();

        assert_eq!(report.policy, ErrorPolicy::Surface);
        assert_eq!(report.status, PrintStatus::Completed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.first_surfaced_error(),
            Some(PrintError::Executor {
                file_name: "A.pdf".to_string(),
                message: "Bridge operation failed: printer jammed".to_string(),
            })
        );

        let printed = h.executor.printed.lock().await;
        assert_eq!(printed.len(), 1);
        assert!(printed[0].1.show_dialog);

        let events = drain(&mut h.events);
        assert!(events.iter().any(|e| matches!(
            e,
            PrintEvent::ItemFailed { surfaced: true, file_name, .. } if file_name == "A.pdf"
        )));
    }

    #[tokio::test]
    async fn test_transfer_failure_is_recorded_per_item() {
        let mut h = harness("transfer", PdfStore::with(&["A", "C"]), FakeExecutor::default());

        let report = h
            .queue
            .run_with_policy(
                files(&["A.pdf", "missing.pdf", "C.pdf"]),
                RunMode::Selected,
                ErrorPolicy::Surface,
            )
            .await
            .unwrap();

        assert_eq!(report.status, PrintStatus::Completed);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.file_id, "missing");
        assert_eq!(failure.stage, FailureStage::Transfer);
        assert!(failure.surfaced);
        assert!(matches!(
            failure.to_error(),
            PrintError::Transfer { ref file_name, .. } if file_name == "missing.pdf"
        ));

        assert_eq!(progress(&drain(&mut h.events)).len(), 3);
        assert_eq!(h.executor.printed.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_settings_snapshot_is_applied() {
        let h = harness("snapshot", PdfStore::with(&["A"]), FakeExecutor::default());
        h.settings
            .set_json(
                SETTINGS_KEY,
                serde_json::json!({ "fit": false, "copies": 2, "printer": "Lab" }),
            )
            .await
            .unwrap();

        h.queue.run(files(&["A.pdf"]), RunMode::All).await.unwrap();

        let printed = h.executor.printed.lock().await;
        let options = &printed[0].1;
        assert!(!options.fit);
        assert!(!options.show_dialog);
        assert_eq!(options.copies, Some(2));
        assert_eq!(options.printer.as_deref(), Some("Lab"));
        assert_eq!(
            PrintSettings::merge_over_defaults(&serde_json::json!({ "copies": 2 })).copies,
            Setting::Value(2)
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_item() {
        let mut h = harness(
            "cancel",
            PdfStore::with(&["1", "2", "3", "4", "5"]),
            FakeExecutor {
                gate: Some(Gate {
                    file_name: "2.pdf",
                    reached: Notify::new(),
                    release: Notify::new(),
                }),
                ..Default::default()
            },
        );

        let queue = h.queue.clone();
        let run = tokio::spawn(async move {
            queue
                .run(
                    files(&["1.pdf", "2.pdf", "3.pdf", "4.pdf", "5.pdf"]),
                    RunMode::All,
                )
                .await
        });

        let gate = h.executor.gate.as_ref().unwrap();
        gate.reached.notified().await;
        assert!(h.queue.is_running().await);
        assert!(h.queue.cancel().await);
        gate.release.notify_one();

        let report = run.await.unwrap().unwrap();
        assert_eq!(report.status, PrintStatus::Cancelled);
        assert!(report.is_cancelled());
        assert_eq!(report.completed, 2);
        assert_eq!(h.executor.printed.lock().await.len(), 2);

        let events = drain(&mut h.events);
        assert_eq!(progress(&events), vec![(1, 5), (2, 5)]);
        assert!(matches!(
            events.last(),
            Some(PrintEvent::Cancelled {
                completed: 2,
                total: 5,
                ..
            })
        ));
        assert!(!events
            .iter()
            .any(|e| matches!(e, PrintEvent::Completed { .. })));
        assert!(!h.queue.is_running().await);
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_while_active() {
        let h = harness(
            "busy",
            PdfStore::with(&["A", "B"]),
            FakeExecutor {
                gate: Some(Gate {
                    file_name: "A.pdf",
                    reached: Notify::new(),
                    release: Notify::new(),
                }),
                ..Default::default()
            },
        );

        let queue = h.queue.clone();
        let first = tokio::spawn(async move { queue.run(files(&["A.pdf"]), RunMode::All).await });

        let gate = h.executor.gate.as_ref().unwrap();
        gate.reached.notified().await;

        let active = h.queue.active_job_id().await.unwrap();
        let err = h
            .queue
            .run(files(&["B.pdf"]), RunMode::Selected)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PrintError::JobInProgress {
                job_id: active.to_string()
            }
        );

        gate.release.notify_one();
        assert_eq!(
            first.await.unwrap().unwrap().status,
            PrintStatus::Completed
        );

        let next = h.queue.run(files(&["B.pdf"]), RunMode::Selected).await;
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let mut h = harness("idle", PdfStore::default(), FakeExecutor::default());
        assert!(!h.queue.cancel().await);
        assert!(drain(&mut h.events).is_empty());

        let report = h.queue.run(Vec::new(), RunMode::All).await.unwrap();
        assert_eq!(report.status, PrintStatus::Completed);
        assert_eq!(report.total, 0);
    }

    #[tokio::test]
    async fn test_dropped_run_frees_the_slot() {
        let h = harness(
            "dropped",
            PdfStore::with(&["A", "B"]),
            FakeExecutor {
                gate: Some(Gate {
                    file_name: "A.pdf",
                    reached: Notify::new(),
                    release: Notify::new(),
                }),
                ..Default::default()
            },
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            h.queue.run(files(&["A.pdf"]), RunMode::Selected),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!h.queue.is_running().await);
        assert!(h.queue.active_job_id().await.is_none());

        let report = h
            .queue
            .run(files(&["B.pdf"]), RunMode::Selected)
            .await
            .unwrap();
        assert_eq!(report.status, PrintStatus::Completed);
        assert_eq!(report.completed, 1);
    }
}
