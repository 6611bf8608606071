//! # Authorization Session
//!
//! Owns the single process-wide [`Credential`] and hands it to every remote
//! operation.
//!
//! ## Single flight
//!
//! The credential lives in a slot that is either empty, pending or resolved.
//! The first caller that finds the slot empty (or holding an expired
//! credential) starts an acquisition and parks it in the slot as a shared
//! future; every caller arriving while it runs awaits that same future, so at
//! most one consent window is ever open. A failed acquisition empties the slot
//! so the next call starts over.
//!
//! ## Acquisition order
//!
//! 1. Reuse the persisted credential when the provider still accepts it
//! 2. Otherwise refresh it when it carries a refresh token
//! 3. Otherwise discard it and run the interactive consent flow

use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::token_store::TokenStore;
use crate::types::Credential;
use async_trait::async_trait;
use bridge_traits::auth::{AuthorizationOutcome, AuthorizationPrompt, AuthorizationRequest};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

type PendingCredential = Shared<BoxFuture<'static, Result<Arc<Credential>>>>;

enum Slot {
    Empty,
    Pending {
        generation: u64,
        future: PendingCredential,
    },
    Resolved(Arc<Credential>),
}

struct SlotState {
    slot: Slot,
    next_generation: u64,
}

struct SessionInner {
    flow: OAuthFlowManager,
    token_store: TokenStore,
    prompt: Arc<dyn AuthorizationPrompt>,
    event_bus: EventBus,
    state: Mutex<SlotState>,
}

/// Source of bearer tokens for remote calls.
///
/// Implemented by [`AuthSession`]; connectors depend on this trait so they
/// can be tested without an OAuth flow.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A currently valid access token, authorizing if necessary.
    async fn access_token(&self) -> Result<String>;

    /// Report that the remote side rejected `rejected_token`.
    ///
    /// The cached credential is dropped only if it still holds that token.
    async fn invalidate_token(&self, rejected_token: &str);
}

/// Cached, single-flight authorization session.
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

impl AuthSession {
    pub fn new(
        flow: OAuthFlowManager,
        token_store: TokenStore,
        prompt: Arc<dyn AuthorizationPrompt>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                flow,
                token_store,
                prompt,
                event_bus,
                state: Mutex::new(SlotState {
                    slot: Slot::Empty,
                    next_generation: 0,
                }),
            }),
        }
    }

    /// Return the session credential, acquiring it if needed.
    ///
    /// Safe to call concurrently: callers arriving while an acquisition is in
    /// flight share its outcome.
    pub async fn get_credential(&self) -> Result<Arc<Credential>> {
        let (generation, pending) = {
            let mut state = self.inner.state.lock().await;
            match &state.slot {
                Slot::Resolved(credential) if !credential.is_expired() => {
                    return Ok(credential.clone());
                }
                Slot::Pending { generation, future } => (*generation, future.clone()),
                slot => {
                    let previous = match slot {
                        Slot::Resolved(expired) => Some(expired.clone()),
                        _ => None,
                    };
                    let generation = state.next_generation;
                    state.next_generation += 1;

                    let future = Self::acquire(self.inner.clone(), previous)
                        .boxed()
                        .shared();
                    state.slot = Slot::Pending {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let outcome = pending.await;

        let mut state = self.inner.state.lock().await;
        if matches!(&state.slot, Slot::Pending { generation: g, .. } if *g == generation) {
            state.slot = match &outcome {
                Ok(credential) => Slot::Resolved(credential.clone()),
                Err(_) => Slot::Empty,
            };
        }

        outcome
    }

    /// Drop the cached credential; the next call re-acquires it.
    ///
    /// An in-flight acquisition is left alone.
    pub async fn invalidate(&self) {
        let mut state = self.inner.state.lock().await;
        if matches!(state.slot, Slot::Resolved(_)) {
            debug!("Cached credential invalidated");
            state.slot = Slot::Empty;
        }
    }

    /// Drop the cached credential and delete the persisted one, forcing the
    /// next call through the consent flow.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock().await;
            state.slot = Slot::Empty;
        }
        self.inner.token_store.clear().await?;
        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedOut));
        info!("Signed out");
        Ok(())
    }

    /// Whether a credential is cached and not expired.
    pub async fn is_signed_in(&self) -> bool {
        let state = self.inner.state.lock().await;
        matches!(&state.slot, Slot::Resolved(c) if !c.is_expired())
    }

    async fn acquire(
        inner: Arc<SessionInner>,
        previous: Option<Arc<Credential>>,
    ) -> Result<Arc<Credential>> {
        let outcome = Self::try_acquire(&inner, previous).await;
        if let Err(e) = &outcome {
            let _ = inner.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                message: e.to_string(),
                recoverable: e.is_recoverable(),
            }));
        }
        outcome
    }

    async fn try_acquire(
        inner: &SessionInner,
        previous: Option<Arc<Credential>>,
    ) -> Result<Arc<Credential>> {
        let candidate = match previous {
            Some(credential) => Some((*credential).clone()),
            None => inner.token_store.load().await?,
        };

        if let Some(stored) = candidate {
            if !stored.is_expired() {
                if inner.flow.validate(&stored.access_token).await? {
                    debug!("Persisted credential accepted");
                    return Ok(Arc::new(stored));
                }
                info!("Persisted credential rejected by the provider");
            }

            if let Some(refresh_token) = stored.refresh_token.as_deref().filter(|t| !t.is_empty()) {
                match Self::refresh(inner, refresh_token).await {
                    Ok(credential) => return Ok(credential),
                    Err(e) => warn!(error = %e, "Refresh failed, falling back to consent"),
                }
            }

            inner.token_store.clear().await?;
        }

        Self::authorize_interactively(inner).await
    }

    #[instrument(skip(inner, refresh_token))]
    async fn refresh(inner: &SessionInner, refresh_token: &str) -> Result<Arc<Credential>> {
        let credential = inner.flow.refresh(refresh_token).await?;
        inner.token_store.save(&credential).await?;
        let _ = inner
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                expires_at: credential.expires_at.timestamp(),
            }));
        Ok(Arc::new(credential))
    }

    #[instrument(skip(inner))]
    async fn authorize_interactively(inner: &SessionInner) -> Result<Arc<Credential>> {
        let (auth_url, verifier) = inner.flow.build_auth_url()?;
        let _ = inner.event_bus.emit(CoreEvent::Auth(AuthEvent::SigningIn {
            provider: inner.flow.config().provider.clone(),
        }));

        let request = AuthorizationRequest {
            auth_url,
            redirect_uri: inner.flow.config().redirect_uri.clone(),
        };
        let outcome = inner
            .prompt
            .authorize(request)
            .await
            .map_err(|e| AuthError::Protocol(format!("Authorization prompt failed: {}", e)))?;

        let redirect = match outcome {
            AuthorizationOutcome::Redirected(redirect) => redirect,
            AuthorizationOutcome::Aborted => {
                info!("Authorization abandoned by the user");
                return Err(AuthError::Aborted);
            }
        };

        let code = inner.flow.parse_redirect(&redirect, &verifier)?;
        let credential = inner.flow.exchange_code(&code, &verifier).await?;
        inner.token_store.save(&credential).await?;

        let _ = inner.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn));
        info!("Authorization completed");
        Ok(Arc::new(credential))
    }
}

#[async_trait]
impl AccessTokenProvider for AuthSession {
    async fn access_token(&self) -> Result<String> {
        Ok(self.get_credential().await?.access_token.clone())
    }

    async fn invalidate_token(&self, rejected_token: &str) {
        let mut state = self.inner.state.lock().await;
        if matches!(&state.slot, Slot::Resolved(c) if c.access_token == rejected_token) {
            debug!("Cached credential rejected by the provider");
            state.slot = Slot::Empty;
        }
    }
}
