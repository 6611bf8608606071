//! Interactive authorization through the system browser
//!
//! Opens the consent page in the default browser and listens on the loopback
//! address named by the redirect URI for the provider's redirect.

use async_trait::async_trait;
use bridge_traits::{
    auth::{AuthorizationOutcome, AuthorizationPrompt, AuthorizationRequest},
    error::{BridgeError, Result},
};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Port used when building a loopback redirect URI.
pub const DEFAULT_LOOPBACK_PORT: u16 = 8400;

const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound for a single browser connection, idle or not.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

type RedirectSender = Arc<Mutex<Option<oneshot::Sender<String>>>>;

type BrowserLauncher = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Desktop [`AuthorizationPrompt`] using a loopback redirect listener.
///
/// If the user never completes the consent page within the wait timeout the
/// outcome is [`AuthorizationOutcome::Aborted`].
pub struct LoopbackAuthorizationPrompt {
    wait_timeout: Duration,
    launcher: BrowserLauncher,
}

impl LoopbackAuthorizationPrompt {
    pub fn new() -> Self {
        Self {
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            launcher: Arc::new(|url| webbrowser::open(url).map(|_| ())),
        }
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Replace the browser launcher (used by tests and headless hosts).
    pub fn with_launcher<F>(mut self, launcher: F) -> Self
    where
        F: Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    {
        self.launcher = Arc::new(launcher);
        self
    }

    /// Loopback redirect URI for `port`.
    pub fn redirect_uri_for(port: u16) -> String {
        format!("http://127.0.0.1:{}/", port)
    }

    fn bind_address(redirect: &Url) -> Result<String> {
        if redirect.scheme() != "http" {
            return Err(BridgeError::OperationFailed(format!(
                "Loopback redirect must use http, got {}",
                redirect.scheme()
            )));
        }
        let host = match redirect.host_str() {
            Some("localhost") | Some("127.0.0.1") => "127.0.0.1",
            Some("[::1]") | Some("::1") => "[::1]",
            other => {
                return Err(BridgeError::OperationFailed(format!(
                    "Redirect host {:?} is not a loopback address",
                    other
                )))
            }
        };
        let port = redirect.port_or_known_default().unwrap_or(80);
        Ok(format!("{}:{}", host, port))
    }

    /// Serve every loopback connection on its own task until one of them
    /// delivers the redirect.
    async fn wait_for_redirect(listener: TcpListener, redirect: Url) -> Result<String> {
        let (tx, mut rx) = oneshot::channel::<String>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let redirect = Arc::new(redirect);

        loop {
            tokio::select! {
                received = &mut rx => {
                    return received.map_err(|_| {
                        BridgeError::OperationFailed("Redirect listener closed".to_string())
                    });
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "Accepted loopback connection");
                    Self::serve(stream, redirect.clone(), tx.clone());
                }
            }
        }
    }

    fn serve(stream: TcpStream, redirect: Arc<Url>, tx: RedirectSender) {
        let service = service_fn(move |req: Request<Incoming>| {
            let redirect = redirect.clone();
            let tx = tx.clone();
            async move { Ok::<_, Infallible>(respond(&redirect, req.uri(), &tx).await) }
        });

        tokio::spawn(async move {
            let connection = http1::Builder::new()
                .timer(TokioTimer::new())
                .keep_alive(false)
                .serve_connection(TokioIo::new(stream), service);
            match tokio::time::timeout(CONNECTION_TIMEOUT, connection).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "Loopback connection failed"),
                Err(_) => debug!("Dropping idle loopback connection"),
            }
        });
    }
}

/// Answer one request. A hit on the redirect path carrying `code` or `error`
/// hands the full URL to the waiting prompt.
async fn respond(redirect: &Url, target: &Uri, tx: &RedirectSender) -> Response<Full<Bytes>> {
    let full = match redirect.join(&target.to_string()) {
        Ok(full) => full,
        Err(e) => {
            warn!(error = %e, "Malformed redirect request");
            return page(StatusCode::BAD_REQUEST, NOT_FOUND_PAGE);
        }
    };

    let is_redirect = full.path() == redirect.path()
        && full
            .query_pairs()
            .any(|(key, _)| key == "code" || key == "error");
    if !is_redirect {
        return page(StatusCode::NOT_FOUND, NOT_FOUND_PAGE);
    }

    if let Some(sender) = tx.lock().await.take() {
        let _ = sender.send(full.to_string());
    }
    page(StatusCode::OK, SUCCESS_PAGE)
}

fn page(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

impl Default for LoopbackAuthorizationPrompt {
    fn default() -> Self {
        Self::new()
    }
}

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Drive Print</title></head>\
<body style=\"font-family: sans-serif; text-align: center; padding-top: 50px;\">\
<h1>Authorization received</h1><p>You can close this window and return to Drive Print.</p>\
</body></html>";

const NOT_FOUND_PAGE: &str = "<!DOCTYPE html><html><body>Not found</body></html>";

#[async_trait]
impl AuthorizationPrompt for LoopbackAuthorizationPrompt {
    #[instrument(skip(self, request), fields(redirect_uri = %request.redirect_uri))]
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationOutcome> {
        let redirect = Url::parse(&request.redirect_uri).map_err(|e| {
            BridgeError::OperationFailed(format!("Invalid redirect URI: {}", e))
        })?;
        let address = Self::bind_address(&redirect)?;

        let listener = TcpListener::bind(&address).await.map_err(|e| {
            BridgeError::NotAvailable(format!("Failed to listen on {}: {}", address, e))
        })?;
        info!(%address, "Waiting for authorization redirect");

        if let Err(e) = (self.launcher)(&request.auth_url) {
            warn!(error = %e, "Could not open a browser; open the authorization URL manually");
            info!(auth_url = %request.auth_url, "Authorization URL");
        }

        match tokio::time::timeout(
            self.wait_timeout,
            Self::wait_for_redirect(listener, redirect),
        )
        .await
        {
            Ok(Ok(url)) => Ok(AuthorizationOutcome::Redirected(url)),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    timeout_secs = self.wait_timeout.as_secs(),
                    "Authorization was not completed in time"
                );
                Ok(AuthorizationOutcome::Aborted)
            }
        }
    }
}
