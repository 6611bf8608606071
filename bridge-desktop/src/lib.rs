//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SecureStore` as JSON documents on disk, or the OS keychain via `keyring`
//! - `SettingsStore` as a single JSON document
//! - `PrintExecutor` shelling out to a command line PDF printer
//! - `AuthorizationPrompt` using the system browser and a loopback listener
//! - `LoggerSink` appending JSON lines to a log file
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonFileSettingsStore, ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let settings = JsonFileSettingsStore::new("settings.json");
//!     // Hand these to the core configuration builder
//!     Ok(())
//! }
//! ```

mod auth_prompt;
mod document;
mod file_store;
mod filesystem;
mod http;
mod log_file;
mod print;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use auth_prompt::{LoopbackAuthorizationPrompt, DEFAULT_LOOPBACK_PORT};
pub use file_store::JsonFileSecureStore;
pub use filesystem::{default_cache_dir, default_data_dir, TokioFileSystem, APP_DIR_NAME};
pub use http::ReqwestHttpClient;
pub use log_file::JsonLinesLoggerSink;
pub use print::CommandPrintExecutor;
pub use settings::JsonFileSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
