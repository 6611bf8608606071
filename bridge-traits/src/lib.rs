//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and host-specific
//! implementations. Each trait represents a capability that the core requires
//! but that is implemented differently per host (desktop shell, headless CLI,
//! test harness).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and streamed downloads
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local download cache I/O
//! - [`RemoteStore`](remote::RemoteStore) - Paged listing, content streaming and deletion of remote documents
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Host Integration
//! - [`AuthorizationPrompt`](auth::AuthorizationPrompt) - Interactive consent page and redirect capture
//! - [`PrintExecutor`](print::PrintExecutor) - Physical printing of a local document
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let print_executor = config.print_executor
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "PrintExecutor".to_string(),
//!         message: "No print executor provided. \
//!                  Desktop: enable the desktop-shims feature. \
//!                  Other hosts: inject a native adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert platform-specific errors to `BridgeError`
//! and include context such as file paths or HTTP status codes.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so trait objects can be shared
//! across async tasks.

pub mod auth;
pub mod error;
pub mod http;
pub mod logging;
pub mod print;
pub mod remote;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use auth::{AuthorizationOutcome, AuthorizationPrompt, AuthorizationRequest};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use print::{DuplexMode, PageOrientation, PrintExecutor, PrintOptions};
pub use remote::{ListQuery, RemoteFile, RemotePage, RemoteStore};
pub use storage::{FileMetadata, FileSystemAccess, SecureStore, SettingsStore};
