//! End-to-end tests of the service façade against an in-memory Drive.

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AuthorizationOutcome, AuthorizationPrompt, AuthorizationRequest, HttpClient, HttpMethod,
    HttpRequest, HttpResponse, PrintExecutor, PrintOptions, SecureStore, SettingsStore,
};
use bytes::Bytes;
use core_runtime::events::{CatalogEvent, PrintEvent, RemoteEvent};
use core_service::{
    ConnectionStatus, CoreConfig, CoreEvent, CoreService, EventStream, OAuthClientSecrets,
    PrintSettings, PrintSettingsPatch, PrintStatus, RemoteFile, Setting,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use url::Url;

const API: &str = "https://www.googleapis.com/drive/v3";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const ACCESS_TOKEN: &str = "drive-token";
const FOLDER: &str = "folder-1";

// ============================================================================
// Fakes
// ============================================================================

/// Token endpoint plus the three Drive calls the engine makes.
struct FakeDrive {
    files: std::sync::Mutex<Vec<(String, String)>>,
    grants: AtomicUsize,
    offline: AtomicBool,
    fail_listing: AtomicBool,
}

impl FakeDrive {
    fn with_files(names: &[&str]) -> Self {
        Self {
            files: std::sync::Mutex::new(
                names
                    .iter()
                    .map(|n| (format!("id-{}", n.trim_end_matches(".pdf")), n.to_string()))
                    .collect(),
            ),
            grants: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
        }
    }

    fn remaining(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn response(status: u16, body: Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn authorized(request: &HttpRequest) -> bool {
        let expected = format!("Bearer {}", ACCESS_TOKEN);
        request.headers.get("Authorization") == Some(&expected)
    }
}

#[async_trait]
impl HttpClient for FakeDrive {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("network unreachable".to_string()));
        }

        if request.url == TOKEN_URL {
            self.grants.fetch_add(1, Ordering::SeqCst);
            return Ok(Self::response(
                200,
                json!({
                    "access_token": ACCESS_TOKEN,
                    "refresh_token": "refresh",
                    "expires_in": 3600
                }),
            ));
        }

        if !Self::authorized(&request) {
            return Ok(Self::response(401, json!({ "error": { "message": "bad token" } })));
        }

        let files_prefix = format!("{}/files", API);
        match request.method {
            HttpMethod::Get if request.url.starts_with(&format!("{}?", files_prefix)) => {
                if self.fail_listing.load(Ordering::SeqCst) {
                    return Ok(Self::response(
                        500,
                        json!({ "error": { "message": "backend error" } }),
                    ));
                }
                let files: Vec<Value> = self
                    .files
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|(id, name)| {
                        json!({ "id": id, "name": name, "modifiedTime": "2024-05-01T10:00:00Z" })
                    })
                    .collect();
                Ok(Self::response(200, json!({ "files": files })))
            }
            HttpMethod::Delete => {
                let id = request.url.trim_start_matches(&format!("{}/", files_prefix));
                let mut files = self.files.lock().unwrap();
                match files.iter().position(|(file_id, _)| file_id == id) {
                    Some(index) => {
                        files.remove(index);
                        Ok(HttpResponse {
                            status: 204,
                            headers: HashMap::new(),
                            body: Bytes::new(),
                        })
                    }
                    None => Ok(Self::response(
                        404,
                        json!({ "error": { "message": "File not found" } }),
                    )),
                }
            }
            _ => Ok(Self::response(404, json!({ "error": { "message": "no route" } }))),
        }
    }

    async fn download_stream(
        &self,
        request: HttpRequest,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        if !Self::authorized(&request) {
            return Err(BridgeError::Unauthorized("bad token".to_string()));
        }
        let id = request
            .url
            .trim_start_matches(&format!("{}/files/", API))
            .trim_end_matches("?alt=media")
            .to_string();

        let known = self.files.lock().unwrap().iter().any(|(file_id, _)| *file_id == id);
        if known {
            Ok(Box::new(std::io::Cursor::new(
                format!("%PDF-1.4 {}", id).into_bytes(),
            )))
        } else {
            Err(BridgeError::OperationFailed("404 File not found".to_string()))
        }
    }
}

/// Approves the consent window after a short delay.
#[derive(Default)]
struct ApprovingPrompt {
    calls: AtomicUsize,
}

#[async_trait]
impl AuthorizationPrompt for ApprovingPrompt {
    async fn authorize(&self, request: AuthorizationRequest) -> BridgeResult<AuthorizationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let url = Url::parse(&request.auth_url)
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        Ok(AuthorizationOutcome::Redirected(format!(
            "{}?code=approved&state={}",
            request.redirect_uri, state
        )))
    }
}

#[derive(Default)]
struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.secrets.lock().await.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.secrets.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.secrets.lock().await.remove(key);
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

/// Records printed paths; optionally blocks on one file name until released.
#[derive(Default)]
struct RecordingPrinter {
    printed: Mutex<Vec<PathBuf>>,
    hold: Option<&'static str>,
    reached: Notify,
    release: Notify,
}

#[async_trait]
impl PrintExecutor for RecordingPrinter {
    async fn print(&self, path: &Path, _options: &PrintOptions) -> BridgeResult<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.hold == Some(name.as_str()) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.printed.lock().await.push(path.to_path_buf());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: CoreService,
    drive: Arc<FakeDrive>,
    prompt: Arc<ApprovingPrompt>,
    printer: Arc<RecordingPrinter>,
    events: EventStream,
}

fn harness(test: &str, drive: FakeDrive, printer: RecordingPrinter) -> Harness {
    let data_dir = std::env::temp_dir().join(format!(
        "core-service-{}-{}",
        test,
        std::process::id()
    ));
    let drive = Arc::new(drive);
    let prompt = Arc::new(ApprovingPrompt::default());
    let printer = Arc::new(printer);

    let config = CoreConfig::builder()
        .folder_id(FOLDER)
        .data_dir(&data_dir)
        .oauth(OAuthClientSecrets::new("client-id", "http://127.0.0.1:8400/"))
        .http_client(drive.clone())
        .file_system(Arc::new(TokioFileSystem::new()))
        .secure_store(Arc::new(MemorySecureStore::default()))
        .settings_store(Arc::new(MemorySettingsStore::default()))
        .print_executor(printer.clone())
        .authorization_prompt(prompt.clone())
        .build()
        .unwrap();

    let service = CoreService::new(config);
    let events = service.subscribe();

    Harness {
        service,
        drive,
        prompt,
        printer,
        events,
    }
}

fn drain(events: &mut EventStream) -> Vec<CoreEvent> {
    let mut collected = Vec::new();
    while let Some(Ok(event)) = events.try_recv() {
        collected.push(event);
    }
    collected
}

fn print_progress(events: &[CoreEvent]) -> Vec<(usize, usize)> {
    events
        .iter()
        .filter_map(|event| match event {
            CoreEvent::Print(PrintEvent::Progress {
                completed, total, ..
            }) => Some((*completed, *total)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_print_all_scenario() {
    let mut h = harness(
        "print-all",
        FakeDrive::with_files(&["A.pdf", "B.pdf", "C.pdf"]),
        RecordingPrinter::default(),
    );

    let files = h.service.refresh_catalog().await.unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["A.pdf", "B.pdf", "C.pdf"]);
    assert!(files.iter().all(|f| f.modified_time.is_some()));

    let report = h.service.print_all(files).await.unwrap();
    assert_eq!(report.status, PrintStatus::Completed);
    assert_eq!(report.completed, 3);
    assert!(report.failures.is_empty());

    let events = drain(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Catalog(CatalogEvent::FileListUpdated { files }) if files.len() == 3
    )));
    assert_eq!(print_progress(&events), vec![(1, 3), (2, 3), (3, 3)]);
    assert!(matches!(
        events.last(),
        Some(CoreEvent::Print(PrintEvent::Completed { total: 3, .. }))
    ));

    let printed = h.printer.printed.lock().await;
    assert_eq!(printed.len(), 3);
    assert_eq!(
        std::fs::read(&printed[2]).unwrap(),
        b"%PDF-1.4 id-C".to_vec()
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_one_consent() {
    let h = harness(
        "single-flight",
        FakeDrive::with_files(&["A.pdf"]),
        RecordingPrinter::default(),
    );

    let calls = (0..5).map(|_| {
        let service = h.service.clone();
        async move { service.refresh_catalog().await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.as_ref().map(Vec::len).ok() == Some(1)));
    assert_eq!(h.prompt.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.drive.grants.load(Ordering::SeqCst), 1);
    assert!(h.service.session().is_signed_in().await);
}

#[tokio::test]
async fn test_cancel_print_through_service() {
    let mut h = harness(
        "cancel",
        FakeDrive::with_files(&["1.pdf", "2.pdf", "3.pdf", "4.pdf"]),
        RecordingPrinter {
            hold: Some("2.pdf"),
            ..Default::default()
        },
    );
    let files = h.service.refresh_catalog().await.unwrap();

    let service = h.service.clone();
    let run = tokio::spawn(async move { service.print_selected(files).await });

    h.printer.reached.notified().await;
    assert!(h.service.is_printing().await);
    assert!(h.service.cancel_print().await);
    h.printer.release.notify_one();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.status, PrintStatus::Cancelled);
    assert_eq!(report.completed, 2);
    assert_eq!(h.printer.printed.lock().await.len(), 2);

    let events = drain(&mut h.events);
    assert_eq!(print_progress(&events), vec![(1, 4), (2, 4)]);
    assert!(matches!(
        events.last(),
        Some(CoreEvent::Print(PrintEvent::Cancelled {
            completed: 2,
            total: 4,
            ..
        }))
    ));

    assert!(!h.service.cancel_print().await);
}

#[tokio::test]
async fn test_delete_all_continues_past_failure() {
    let mut h = harness(
        "delete-all",
        FakeDrive::with_files(&["A.pdf", "B.pdf"]),
        RecordingPrinter::default(),
    );

    let ids = vec![
        "id-A".to_string(),
        "id-missing".to_string(),
        "id-B".to_string(),
    ];
    let report = h.service.delete_all(&ids).await;

    assert_eq!(report.deleted, vec!["id-A".to_string(), "id-B".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "id-missing");
    assert!(h.drive.remaining().is_empty());

    let deleted: Vec<_> = drain(&mut h.events)
        .into_iter()
        .filter_map(|e| match e {
            CoreEvent::Remote(RemoteEvent::FileDeleted { file_id }) => Some(file_id),
            _ => None,
        })
        .collect();
    assert_eq!(deleted, vec!["id-A".to_string(), "id-B".to_string()]);
}

#[tokio::test]
async fn test_delete_one_surfaces_failure() {
    let h = harness(
        "delete-one",
        FakeDrive::with_files(&["A.pdf"]),
        RecordingPrinter::default(),
    );

    h.service.delete_one("id-A").await.unwrap();
    assert!(h.service.delete_one("id-A").await.is_err());
}

#[tokio::test]
async fn test_print_one_surfaces_missing_download() {
    let h = harness(
        "print-one",
        FakeDrive::with_files(&["A.pdf"]),
        RecordingPrinter::default(),
    );

    let ok = h
        .service
        .print_one(RemoteFile::new("id-A", "A.pdf"))
        .await
        .unwrap();
    assert_eq!(ok.status, PrintStatus::Completed);

    let err = h
        .service
        .print_one(RemoteFile::new("id-gone", "Gone.pdf"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Gone.pdf"));
    assert_eq!(h.printer.printed.lock().await.len(), 1);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let h = harness(
        "settings",
        FakeDrive::with_files(&[]),
        RecordingPrinter::default(),
    );

    assert_eq!(h.service.get_settings().await.unwrap(), PrintSettings::default());

    let updated = h
        .service
        .update_settings(&PrintSettingsPatch {
            copies: Some(Setting::Value(2)),
            preview: Some(true),
            ..PrintSettingsPatch::default()
        })
        .await
        .unwrap();
    assert_eq!(h.service.get_settings().await.unwrap(), updated);

    let replaced = PrintSettings {
        fit: false,
        ..PrintSettings::default()
    };
    h.service.save_settings(&replaced).await.unwrap();
    assert_eq!(h.service.get_settings().await.unwrap(), replaced);
}

#[tokio::test]
async fn test_connection_status() {
    let h = harness(
        "connection",
        FakeDrive::with_files(&["A.pdf"]),
        RecordingPrinter::default(),
    );

    assert_eq!(h.service.test_connection().await, ConnectionStatus::Connected);

    h.drive.fail_listing.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.service.test_connection().await,
        ConnectionStatus::Error(_)
    ));

    h.drive.fail_listing.store(false, Ordering::SeqCst);
    h.drive.offline.store(true, Ordering::SeqCst);
    assert_eq!(
        h.service.test_connection().await,
        ConnectionStatus::Disconnected
    );
}

#[tokio::test]
async fn test_refresh_failure_is_published() {
    let mut h = harness(
        "refresh-failure",
        FakeDrive::with_files(&["A.pdf"]),
        RecordingPrinter::default(),
    );
    h.drive.fail_listing.store(true, Ordering::SeqCst);

    assert!(h.service.refresh_catalog().await.is_err());
    assert!(drain(&mut h.events)
        .iter()
        .any(|e| matches!(e, CoreEvent::Catalog(CatalogEvent::RefreshFailed { .. }))));
}

#[tokio::test]
async fn test_sign_out_forces_new_consent() {
    let h = harness(
        "sign-out",
        FakeDrive::with_files(&["A.pdf"]),
        RecordingPrinter::default(),
    );

    h.service.refresh_catalog().await.unwrap();
    h.service.sign_out().await.unwrap();
    assert!(!h.service.session().is_signed_in().await);

    h.service.refresh_catalog().await.unwrap();
    assert_eq!(h.prompt.calls.load(Ordering::SeqCst), 2);

    h.service.reauthorize().await.unwrap();
    assert_eq!(h.prompt.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_polling_publishes_file_list() {
    let h = harness(
        "polling",
        FakeDrive::with_files(&["A.pdf", "B.pdf"]),
        RecordingPrinter::default(),
    );
    let mut updates = h
        .service
        .subscribe()
        .filter(|e| matches!(e, CoreEvent::Catalog(CatalogEvent::FileListUpdated { .. })));

    let handle = h.service.start_polling();
    let event = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        event,
        CoreEvent::Catalog(CatalogEvent::FileListUpdated { ref files }) if files.len() == 2
    ));

    h.service.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
