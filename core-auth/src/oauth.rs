//! OAuth 2.0 Authorization Flow with PKCE Support
//!
//! Implements the pieces of RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) the
//! session needs:
//! - Building the consent URL (offline access, forced consent)
//! - Parsing the redirect the host captured
//! - Exchanging the authorization code for a [`Credential`]
//! - Refreshing an access token
//! - Probing whether an access token is still accepted
//!
//! Sensitive values (tokens, codes, verifiers) are never logged.

use crate::error::{AuthError, Result};
use crate::types::Credential;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::OAuthClientSecrets;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Full Drive access; listing, downloading and deleting all need it.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Lightweight authenticated call used to validate a stored token.
pub const DRIVE_VALIDATION_URL: &str = "https://www.googleapis.com/drive/v3/about?fields=user";

const MAX_REFRESH_ATTEMPTS: u32 = 3;

/// OAuth 2.0 provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Name shown in events and logs
    pub provider: String,
    pub client_id: String,
    /// Optional for public clients
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    /// URL answered with 2xx for a valid bearer token
    pub validation_url: String,
    /// Base delay for refresh retries
    pub retry_base_delay: Duration,
}

impl OAuthConfig {
    /// Google Drive configuration built from the client secrets document.
    pub fn google_drive(secrets: &OAuthClientSecrets) -> Self {
        Self {
            provider: "Google Drive".to_string(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            redirect_uri: secrets.redirect_uri.clone(),
            scopes: vec![DRIVE_SCOPE.to_string()],
            auth_url: secrets.auth_uri.clone(),
            token_url: secrets.token_uri.clone(),
            validation_url: DRIVE_VALIDATION_URL.to_string(),
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

/// PKCE (Proof Key for Code Exchange) verifier plus the CSRF state.
///
/// Only the challenge derived from the verifier is sent with the consent URL;
/// the verifier itself goes to the token endpoint.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// Generate a 32-byte verifier and a 16-byte state, both URL-safe base64
    /// without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);

        Self {
            verifier: URL_SAFE_NO_PAD.encode(verifier_bytes),
            state: URL_SAFE_NO_PAD.encode(state_bytes),
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth 2.0 flow manager.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the consent URL.
    ///
    /// Requests offline access and forces the consent screen so the provider
    /// always issues a refresh token for the full scope. Returns the URL and
    /// the verifier needed to finish the flow.
    #[instrument(skip(self), fields(provider = %self.config.provider))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Protocol(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", verifier.state())
            .append_pair("code_challenge", &challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        debug!("Built authorization URL");
        Ok((url.to_string(), verifier))
    }

    /// Extract the authorization code from a captured redirect.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Aborted`] when the provider reports `access_denied`
    /// - [`AuthError::Protocol`] when the redirect targets another location,
    ///   carries another provider error, or has no code
    /// - [`AuthError::StateMismatch`] when `state` does not match
    pub fn parse_redirect(&self, redirect: &str, verifier: &PkceVerifier) -> Result<String> {
        let actual = Url::parse(redirect)
            .map_err(|e| AuthError::Protocol(format!("Malformed redirect URL: {}", e)))?;
        let expected = Url::parse(&self.config.redirect_uri)
            .map_err(|e| AuthError::Protocol(format!("Invalid redirect URI: {}", e)))?;

        if !same_target(&expected, &actual) {
            warn!(
                expected = %redirect_target(&expected),
                actual = %redirect_target(&actual),
                "Redirect does not match the registered redirect URI"
            );
            return Err(AuthError::Protocol(format!(
                "Unexpected redirect target {}",
                redirect_target(&actual)
            )));
        }

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in actual.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            if error == "access_denied" {
                info!("User denied consent");
                return Err(AuthError::Aborted);
            }
            return Err(AuthError::Protocol(format!(
                "Provider returned error: {}",
                error
            )));
        }

        let state = state.unwrap_or_default();
        if state != verifier.state() {
            warn!("OAuth state mismatch");
            return Err(AuthError::StateMismatch {
                expected: verifier.state().to_string(),
                actual: state,
            });
        }

        match code {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err(AuthError::Protocol(
                "Redirect carries no authorization code".to_string(),
            )),
        }
    }

    /// Exchange an authorization code for a credential.
    #[instrument(skip(self, code, verifier), fields(provider = %self.config.provider))]
    pub async fn exchange_code(&self, code: &str, verifier: &PkceVerifier) -> Result<Credential> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        debug!("Exchanging authorization code for tokens");

        let response = self
            .http_client
            .execute(self.token_request(&params)?)
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!(status, error = %body, "Token exchange failed");
            return Err(AuthError::TokenExchange(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AuthError::TokenExchange(format!("Failed to parse token response: {}", e)))?;

        info!(expires_in = token.expires_in, "Exchanged code for tokens");
        Ok(token.into_credential(None))
    }

    /// Refresh an access token.
    ///
    /// Retries transport failures and 5xx responses up to three times with
    /// exponential backoff. 4xx responses are final. A response without a
    /// refresh token keeps the one passed in.
    #[instrument(skip(self, refresh_token), fields(provider = %self.config.provider))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }
        let request = self.token_request(&params)?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let last_error = match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    let token: TokenResponse = response.json().map_err(|e| {
                        AuthError::TokenExchange(format!("Failed to parse token response: {}", e))
                    })?;
                    info!(expires_in = token.expires_in, "Refreshed access token");
                    return Ok(token.into_credential(Some(refresh_token)));
                }
                Ok(response) => {
                    let status = response.status;
                    let body = response
                        .text()
                        .unwrap_or_else(|_| "Unable to read error response".to_string());

                    if response.is_client_error() {
                        warn!(status, error = %body, "Token refresh rejected");
                        return Err(AuthError::TokenExchange(format!(
                            "Token endpoint returned {}: {}",
                            status, body
                        )));
                    }
                    format!("{} - {}", status, body)
                }
                Err(e) => e.to_string(),
            };

            if attempts >= MAX_REFRESH_ATTEMPTS {
                return Err(AuthError::TokenExchange(format!(
                    "Token refresh failed after {} attempts. Last error: {}",
                    attempts, last_error
                )));
            }

            let delay = self.config.retry_base_delay * 2u32.pow(attempts - 1);
            warn!(
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Token refresh failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Probe whether the provider still accepts `access_token`.
    ///
    /// Returns `Ok(false)` for any 4xx answer and an error only when the
    /// probe itself could not be made.
    #[instrument(skip(self, access_token))]
    pub async fn validate(&self, access_token: &str) -> Result<bool> {
        let request = HttpRequest::new(HttpMethod::Get, self.config.validation_url.clone())
            .bearer_token(access_token);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        if response.is_success() {
            return Ok(true);
        }
        if response.is_client_error() {
            debug!(status = response.status, "Access token rejected");
            return Ok(false);
        }
        Err(AuthError::Http(format!(
            "Validation endpoint returned {}",
            response.status
        )))
    }

    fn token_request(&self, params: &[(&str, &str)]) -> Result<HttpRequest> {
        let encoded = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::Protocol(format!("Failed to encode token request: {}", e)))?;
        Ok(HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form(encoded))
    }
}

fn same_target(expected: &Url, actual: &Url) -> bool {
    expected.scheme() == actual.scheme()
        && expected.host_str() == actual.host_str()
        && expected.port_or_known_default() == actual.port_or_known_default()
        && expected.path().trim_end_matches('/') == actual.path().trim_end_matches('/')
}

fn redirect_target(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    )
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_credential(self, previous_refresh_token: Option<&str>) -> Credential {
        let refresh_token = self
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string));
        let mut credential = Credential::new(self.access_token, refresh_token, self.expires_in);
        credential.scope = self.scope;
        credential
    }
}

fn default_expires_in() -> i64 {
    3600
}
