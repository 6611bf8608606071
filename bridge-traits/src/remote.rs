//! Remote Document Store Abstraction
//!
//! A remote store exposes a flat folder of documents that can be listed page
//! by page, streamed, and deleted. Providers (for example Google Drive)
//! implement [`RemoteStore`]; the sync layer only depends on this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identity and display metadata for one remote document.
///
/// Identity is `id`. `name` doubles as the local cache file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
}

impl RemoteFile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            modified_time: None,
        }
    }

    pub fn with_modified_time(mut self, modified_time: DateTime<Utc>) -> Self {
        self.modified_time = Some(modified_time);
        self
    }
}

/// Filter applied to a listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Folder whose direct children are listed
    pub parent_id: String,
    /// Only documents of this MIME type are returned
    pub mime_type: String,
}

impl ListQuery {
    pub const PDF_MIME_TYPE: &'static str = "application/pdf";

    /// PDFs directly inside `parent_id`.
    pub fn pdfs_in(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            mime_type: Self::PDF_MIME_TYPE.to_string(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct RemotePage {
    pub files: Vec<RemoteFile>,
    /// Continuation token; `None` means this was the last page
    pub next_page_token: Option<String>,
}

/// Remote document store.
///
/// Authorization is the implementor's concern: implementations obtain and
/// refresh credentials themselves and report rejected credentials as
/// [`BridgeError::Unauthorized`](crate::BridgeError::Unauthorized).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one page of documents matching `query`.
    ///
    /// Pass `None` for the first page and the previous page's
    /// `next_page_token` afterwards.
    async fn list_page(&self, query: &ListQuery, page_token: Option<&str>) -> Result<RemotePage>;

    /// Open the raw content of a document as a byte stream.
    async fn content_stream(
        &self,
        file_id: &str,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;

    /// Permanently delete a document.
    async fn delete(&self, file_id: &str) -> Result<()>;
}
