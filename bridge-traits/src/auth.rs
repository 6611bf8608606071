//! Interactive Authorization Abstraction
//!
//! The core builds the authorization URL and exchanges the resulting code; the
//! host is only responsible for showing the consent page to the user and
//! capturing the redirect.

use async_trait::async_trait;

use crate::error::Result;

/// What the host needs to run the interactive step.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Fully built consent page URL
    pub auth_url: String,
    /// Redirect target the provider will navigate to once consent is given
    pub redirect_uri: String,
}

/// Result of the interactive step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The full redirect URL, including its query string
    Redirected(String),
    /// The user closed the window or otherwise abandoned the flow
    Aborted,
}

/// Host-provided interactive authorization.
///
/// Implementations open the consent page (browser, embedded web view, ...)
/// and resolve once the provider redirects to `redirect_uri` or the user gives
/// up. They must not interpret the redirect; parsing and validation belong to
/// the caller.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationOutcome>;
}
