//! Google Drive API connector implementation
//!
//! Implements the `RemoteStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::remote::{ListQuery, RemotePage, RemoteStore};
use core_auth::AccessTokenProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{ApiErrorResponse, DriveFile, FilesListResponse};

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for listings
const LIST_FIELDS: &str = "nextPageToken,files(id,name,modifiedTime)";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Drive API connector
///
/// # Features
///
/// - Paginated listing of one folder filtered by MIME type
/// - Streaming downloads via `alt=media`
/// - Permanent deletion
/// - Exponential backoff for 429 and 5xx through the `HttpClient` retry policy
/// - A rejected token (401) is reported to the token provider and the call is
///   retried once with a fresh credential
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::remote::{ListQuery, RemoteStore};
///
/// let connector = GoogleDriveConnector::new(http_client, auth_session);
/// let page = connector.list_page(&ListQuery::pdfs_in(folder_id), None).await?;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    tokens: Arc<dyn AccessTokenProvider>,
    api_base: String,
    retry_policy: RetryPolicy,
}

impl GoogleDriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http_client,
            tokens,
            api_base: DRIVE_API_BASE.to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Point the connector at another API root (test servers, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Build the `files.list` query for `query`.
    pub fn search_query(query: &ListQuery) -> String {
        format!(
            "'{}' in parents and mimeType='{}'",
            escape_literal(&query.parent_id),
            escape_literal(&query.mime_type)
        )
    }

    fn list_url(&self, query: &ListQuery, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/files?q={}&fields={}&pageSize={}",
            self.api_base,
            urlencoding::encode(&Self::search_query(query)),
            urlencoding::encode(LIST_FIELDS),
            MAX_PAGE_SIZE
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_base, urlencoding::encode(file_id))
    }

    async fn access_token(&self) -> Result<String> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| GoogleDriveError::AuthenticationFailed(e.to_string()))
    }

    /// Execute a request built around the current bearer token.
    async fn execute_authorized<F>(&self, build: F, file_id: Option<&str>) -> Result<HttpResponse>
    where
        F: Fn(&str) -> HttpRequest + Send + Sync,
    {
        let mut retried = false;
        loop {
            let token = self.access_token().await?;
            let response = self
                .http_client
                .execute_with_retry(build(&token), self.retry_policy.clone())
                .await?;

            if response.status == 401 && !retried {
                warn!("Access token rejected, retrying with a fresh credential");
                self.tokens.invalidate_token(&token).await;
                retried = true;
                continue;
            }

            return check_status(response, file_id);
        }
    }
}

/// Escape a value for use inside a single-quoted query literal.
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn check_status(response: HttpResponse, file_id: Option<&str>) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status;
    let message = response
        .json::<ApiErrorResponse>()
        .map(|e| e.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string());
    warn!(status, error = %message, "Google Drive API request failed");

    Err(match (status, file_id) {
        (404, Some(file_id)) => GoogleDriveError::FileNotFound {
            file_id: file_id.to_string(),
        },
        (429, _) => GoogleDriveError::RateLimitExceeded {
            retry_after_seconds: response
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("retry-after"))
                .and_then(|(_, v)| v.trim().parse().ok())
                .unwrap_or(0),
        },
        _ => GoogleDriveError::ApiError {
            status_code: status,
            message,
        },
    })
}

#[async_trait]
impl RemoteStore for GoogleDriveConnector {
    #[instrument(skip(self, query), fields(parent = %query.parent_id, has_token = page_token.is_some()))]
    async fn list_page(&self, query: &ListQuery, page_token: Option<&str>) -> BridgeResult<RemotePage> {
        let url = self.list_url(query, page_token);

        let response = self
            .execute_authorized(
                |token| {
                    HttpRequest::new(HttpMethod::Get, url.clone())
                        .bearer_token(token)
                        .header("Accept", "application/json")
                        .timeout(REQUEST_TIMEOUT)
                },
                None,
            )
            .await?;

        let list: FilesListResponse = response
            .json()
            .map_err(|e| GoogleDriveError::ParseError(e.to_string()))?;

        let files: Vec<_> = list
            .files
            .into_iter()
            .map(DriveFile::into_remote_file)
            .collect();

        debug!(
            count = files.len(),
            has_more = list.next_page_token.is_some(),
            "Listed page"
        );

        Ok(RemotePage {
            files,
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    #[instrument(skip(self))]
    async fn content_stream(&self, file_id: &str) -> BridgeResult<Box<dyn AsyncRead + Send + Unpin>> {
        let url = format!("{}?alt=media", self.file_url(file_id));

        let mut retried = false;
        loop {
            let token = self.access_token().await?;
            let request = HttpRequest::new(HttpMethod::Get, url.clone()).bearer_token(&token);

            match self.http_client.download_stream(request).await {
                Ok(stream) => {
                    debug!("Content stream opened");
                    return Ok(stream);
                }
                Err(BridgeError::Unauthorized(_)) if !retried => {
                    warn!("Access token rejected, retrying download with a fresh credential");
                    self.tokens.invalidate_token(&token).await;
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, file_id: &str) -> BridgeResult<()> {
        let url = self.file_url(file_id);

        self.execute_authorized(
            |token| {
                HttpRequest::new(HttpMethod::Delete, url.clone())
                    .bearer_token(token)
                    .timeout(REQUEST_TIMEOUT)
            },
            Some(file_id),
        )
        .await?;

        info!("Deleted remote file");
        Ok(())
    }
}
