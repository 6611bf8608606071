//! # Authentication Module
//!
//! Owns the OAuth 2.0 credential every remote call is made with.
//!
//! ## Overview
//!
//! The [`AuthSession`] caches one credential per process and acquires it at
//! most once at a time: it reuses the persisted token when the provider still
//! accepts it, refreshes it when possible, and otherwise runs the interactive
//! consent flow through the host's `AuthorizationPrompt`.
//!
//! ## Features
//!
//! - OAuth 2.0 authorization code flow with PKCE and CSRF state
//! - Offline access with forced consent so a refresh token is always issued
//! - Token refresh with bounded retries
//! - Credential persistence through the host's `SecureStore`
//! - Auth state event emission

pub mod error;
pub mod oauth;
pub mod session;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier, DRIVE_SCOPE};
pub use session::{AccessTokenProvider, AuthSession};
pub use token_store::TokenStore;
pub use types::Credential;
