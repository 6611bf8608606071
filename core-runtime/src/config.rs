//! # Core Configuration Module
//!
//! Provides configuration management for the sync and print engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all dependencies and settings the core needs. It
//! enforces fail-fast validation so a missing bridge or a bad path is reported
//! before any remote call is made.
//!
//! ## Required Settings
//!
//! - `folder_id` - The remote folder whose PDFs are listed
//! - `oauth` - OAuth client secrets (see [`OAuthClientSecrets::from_file`])
//!
//! ## Bridges (with desktop defaults)
//!
//! - `HttpClient` - reqwest
//! - `FileSystemAccess` - tokio fs
//! - `SecureStore` - `token.json` in the data directory
//! - `SettingsStore` - `settings.json` in the data directory
//! - `PrintExecutor` - external command line PDF printer
//! - `AuthorizationPrompt` - system browser plus loopback redirect listener
//!
//! Desktop defaults are injected only when the `desktop-shims` feature is
//! enabled; otherwise every bridge must be provided explicitly.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, OAuthClientSecrets};
//!
//! let config = CoreConfig::builder()
//!     .folder_id("1AbCdEf")
//!     .oauth(OAuthClientSecrets::from_file("credentials.json")?)
//!     .data_dir("/home/me/.local/share/drive-print")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AuthorizationPrompt, FileSystemAccess, HttpClient, PrintExecutor, SecureStore, SettingsStore,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default interval between background catalog refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Default program used for silent printing on desktop.
pub const DEFAULT_PRINT_PROGRAM: &str = "SumatraPDF";

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// ============================================================================
// OAuth client secrets
// ============================================================================

/// OAuth client registration for an installed application.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientSecrets {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecretsSection>,
    web: Option<ClientSecretsSection>,
}

#[derive(Deserialize)]
struct ClientSecretsSection {
    client_id: String,
    client_secret: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl OAuthClientSecrets {
    /// Secrets with Google's default endpoints.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Parse a downloaded client secrets document.
    ///
    /// Accepts both the `installed` and `web` layouts. The first redirect URI
    /// is used.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid client secrets document: {}", e)))?;

        let section = file.installed.or(file.web).ok_or_else(|| {
            Error::Config(
                "Client secrets document has neither an 'installed' nor a 'web' section"
                    .to_string(),
            )
        })?;

        let redirect_uri = section.redirect_uris.into_iter().next().ok_or_else(|| {
            Error::Config("Client secrets document lists no redirect_uris".to_string())
        })?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_uri,
            auth_uri: section.auth_uri.unwrap_or_else(|| GOOGLE_AUTH_URI.to_string()),
            token_uri: section
                .token_uri
                .unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string()),
        })
    }

    /// Read and parse a client secrets document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read client secrets {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("OAuth client_id cannot be empty".to_string()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(Error::Config(
                "OAuth redirect URI cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuthClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientSecrets")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

// ============================================================================
// Core configuration
// ============================================================================

/// Core configuration for the engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Remote folder whose PDFs are listed and printed
    pub folder_id: String,

    /// Directory holding the token and settings documents
    pub data_dir: PathBuf,

    /// Directory downloaded documents are written to
    pub cache_dir: PathBuf,

    /// Interval between background catalog refreshes
    pub poll_interval: Duration,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// OAuth client registration
    pub oauth: OAuthClientSecrets,

    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub secure_store: Arc<dyn SecureStore>,
    pub settings_store: Arc<dyn SettingsStore>,
    pub print_executor: Arc<dyn PrintExecutor>,
    pub authorization_prompt: Arc<dyn AuthorizationPrompt>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("folder_id", &self.folder_id)
            .field("data_dir", &self.data_dir)
            .field("cache_dir", &self.cache_dir)
            .field("poll_interval", &self.poll_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("oauth", &self.oauth)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("print_executor", &"PrintExecutor { ... }")
            .field("authorization_prompt", &"AuthorizationPrompt { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The folder id is not blank
    /// - Data and cache directories are absolute
    /// - The poll interval is at least one second
    /// - The event buffer can hold at least one event
    /// - OAuth secrets carry a client id and redirect URI
    pub fn validate(&self) -> Result<()> {
        if self.folder_id.trim().is_empty() {
            return Err(Error::Config("Folder id cannot be empty".to_string()));
        }

        if !self.data_dir.is_absolute() {
            return Err(Error::Config(format!(
                "Data directory must be an absolute path, got {}",
                self.data_dir.display()
            )));
        }

        if !self.cache_dir.is_absolute() {
            return Err(Error::Config(format!(
                "Cache directory must be an absolute path, got {}",
                self.cache_dir.display()
            )));
        }

        if self.poll_interval < Duration::from_secs(1) {
            return Err(Error::Config(
                "Poll interval must be at least one second".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.oauth.validate()
    }
}

#[cfg_attr(feature = "desktop-shims", allow(dead_code))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default. \
             Other hosts: inject a native adapter.",
            capability, purpose
        ),
    }
}

/// Desktop defaults for bridges the caller did not provide.
#[cfg(feature = "desktop-shims")]
mod desktop_defaults {
    use super::*;
    use bridge_desktop::{
        CommandPrintExecutor, JsonFileSettingsStore,
        LoopbackAuthorizationPrompt, ReqwestHttpClient, TokioFileSystem,
    };

    pub(super) fn data_dir() -> Option<PathBuf> {
        Some(bridge_desktop::default_data_dir())
    }

    pub(super) fn http_client() -> Result<Arc<dyn HttpClient>> {
        let client = ReqwestHttpClient::new()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Arc::new(client))
    }

    pub(super) fn file_system(cache_dir: &Path, data_dir: &Path) -> Result<Arc<dyn FileSystemAccess>> {
        Ok(Arc::new(TokioFileSystem::with_directories(
            cache_dir.to_path_buf(),
            data_dir.to_path_buf(),
        )))
    }

    #[cfg(not(feature = "keyring-store"))]
    pub(super) fn secure_store(data_dir: &Path) -> Result<Arc<dyn SecureStore>> {
        Ok(Arc::new(bridge_desktop::JsonFileSecureStore::new(data_dir)))
    }

    #[cfg(feature = "keyring-store")]
    pub(super) fn secure_store(_data_dir: &Path) -> Result<Arc<dyn SecureStore>> {
        Ok(Arc::new(bridge_desktop::KeyringSecureStore::new()))
    }

    pub(super) fn settings_store(data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
        Ok(Arc::new(JsonFileSettingsStore::new(
            data_dir.join("settings.json"),
        )))
    }

    pub(super) fn print_executor(program: Option<&Path>) -> Result<Arc<dyn PrintExecutor>> {
        let program = program
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PRINT_PROGRAM));
        Ok(Arc::new(CommandPrintExecutor::new(program)))
    }

    pub(super) fn authorization_prompt() -> Result<Arc<dyn AuthorizationPrompt>> {
        Ok(Arc::new(LoopbackAuthorizationPrompt::new()))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod desktop_defaults {
    use super::*;

    pub(super) fn data_dir() -> Option<PathBuf> {
        None
    }

    pub(super) fn http_client() -> Result<Arc<dyn HttpClient>> {
        Err(capability_missing("HttpClient", "remote API calls"))
    }

    pub(super) fn file_system(_cache_dir: &Path, _data_dir: &Path) -> Result<Arc<dyn FileSystemAccess>> {
        Err(capability_missing("FileSystemAccess", "the download cache"))
    }

    pub(super) fn secure_store(_data_dir: &Path) -> Result<Arc<dyn SecureStore>> {
        Err(capability_missing("SecureStore", "credential persistence"))
    }

    pub(super) fn settings_store(_data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
        Err(capability_missing("SettingsStore", "print preferences"))
    }

    pub(super) fn print_executor(_program: Option<&Path>) -> Result<Arc<dyn PrintExecutor>> {
        Err(capability_missing("PrintExecutor", "printing documents"))
    }

    pub(super) fn authorization_prompt() -> Result<Arc<dyn AuthorizationPrompt>> {
        Err(capability_missing(
            "AuthorizationPrompt",
            "interactive authorization",
        ))
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Set options incrementally and call [`build()`](CoreConfigBuilder::build).
/// The builder reports missing settings with the setter that fixes them.
#[derive(Default)]
pub struct CoreConfigBuilder {
    folder_id: Option<String>,
    data_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    poll_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    oauth: Option<OAuthClientSecrets>,
    print_program: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    print_executor: Option<Arc<dyn PrintExecutor>>,
    authorization_prompt: Option<Arc<dyn AuthorizationPrompt>>,
}

impl CoreConfigBuilder {
    /// Sets the remote folder id.
    pub fn folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// Sets the directory holding the token and settings documents.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the download cache directory. Defaults to `<data_dir>/downloads`.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the background refresh interval. Defaults to 15 seconds.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the event bus capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the OAuth client registration.
    pub fn oauth(mut self, secrets: OAuthClientSecrets) -> Self {
        self.oauth = Some(secrets);
        self
    }

    /// Program used by the default desktop print executor.
    pub fn print_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.print_program = Some(program.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn print_executor(mut self, executor: Arc<dyn PrintExecutor>) -> Self {
        self.print_executor = Some(executor);
        self
    }

    pub fn authorization_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        self.authorization_prompt = Some(prompt);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Missing bridges fall back to desktop defaults when the `desktop-shims`
    /// feature is enabled and fail with [`Error::CapabilityMissing`]
    /// otherwise.
    pub fn build(self) -> Result<CoreConfig> {
        let folder_id = self.folder_id.ok_or_else(|| {
            Error::Config("Folder id is required. Use .folder_id() to set it.".to_string())
        })?;

        let oauth = self.oauth.ok_or_else(|| {
            Error::Config("OAuth client secrets are required. Use .oauth() to set them.".to_string())
        })?;

        let data_dir = self
            .data_dir
            .or_else(desktop_defaults::data_dir)
            .ok_or_else(|| {
                Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
            })?;

        let cache_dir = self
            .cache_dir
            .unwrap_or_else(|| data_dir.join("downloads"));

        let http_client = match self.http_client {
            Some(client) => client,
            None => desktop_defaults::http_client()?,
        };
        let file_system = match self.file_system {
            Some(fs) => fs,
            None => desktop_defaults::file_system(&cache_dir, &data_dir)?,
        };
        let secure_store = match self.secure_store {
            Some(store) => store,
            None => desktop_defaults::secure_store(&data_dir)?,
        };
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => desktop_defaults::settings_store(&data_dir)?,
        };
        let print_executor = match self.print_executor {
            Some(executor) => executor,
            None => desktop_defaults::print_executor(self.print_program.as_deref())?,
        };
        let authorization_prompt = match self.authorization_prompt {
            Some(prompt) => prompt,
            None => desktop_defaults::authorization_prompt()?,
        };

        let config = CoreConfig {
            folder_id,
            data_dir,
            cache_dir,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            oauth,
            http_client,
            file_system,
            secure_store,
            settings_store,
            print_executor,
            authorization_prompt,
        };

        config.validate()?;

        Ok(config)
    }
}
