//! # Google Drive Provider
//!
//! Implements the `RemoteStore` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated listing of one folder filtered by MIME type
//! - Streaming downloads
//! - Permanent deletion
//! - Re-authorization through the shared `AccessTokenProvider` when a token
//!   is rejected

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{GoogleDriveConnector, DRIVE_API_BASE};
pub use error::{GoogleDriveError, Result};
