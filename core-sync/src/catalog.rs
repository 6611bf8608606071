//! # Remote Catalog
//!
//! Lists every PDF in the configured folder by following continuation tokens
//! until the remote side reports no further pages.

use crate::error::{Result, SyncError};
use bridge_traits::remote::{ListQuery, RemoteFile, RemoteStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Full listing of one remote folder.
pub struct RemoteCatalog {
    store: Arc<dyn RemoteStore>,
    query: ListQuery,
}

impl RemoteCatalog {
    pub fn new(store: Arc<dyn RemoteStore>, query: ListQuery) -> Self {
        Self { store, query }
    }

    /// Catalog of the PDFs directly inside `folder_id`.
    pub fn for_folder(store: Arc<dyn RemoteStore>, folder_id: impl Into<String>) -> Self {
        Self::new(store, ListQuery::pdfs_in(folder_id))
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    /// Fetch and accumulate all pages.
    ///
    /// Any failure aborts the listing and is returned; callers decide whether
    /// to degrade to an empty list. A continuation token the server already
    /// issued is treated as a fetch failure rather than looping forever.
    #[instrument(skip(self), fields(folder = %self.query.parent_id))]
    pub async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let mut files = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .store
                .list_page(&self.query, page_token.as_deref())
                .await
                .map_err(|e| {
                    warn!(error = %e, pages, "Catalog page fetch failed");
                    match SyncError::from(e) {
                        SyncError::Auth(msg) => SyncError::Auth(msg),
                        other => SyncError::CatalogFetch(other.to_string()),
                    }
                })?;

            pages += 1;
            debug!(page = pages, count = page.files.len(), "Fetched catalog page");
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(SyncError::CatalogFetch(format!(
                            "Server repeated page token after {} pages",
                            pages
                        )));
                    }
                    page_token = Some(token);
                }
                None => break,
            }
        }

        info!(count = files.len(), pages, "Catalog listed");
        Ok(files)
    }

    /// Fetch only the first page to check the folder is reachable.
    ///
    /// Errors keep their bridge classification so callers can tell an
    /// unreachable or unauthorized store from a failed request.
    #[instrument(skip(self), fields(folder = %self.query.parent_id))]
    pub async fn probe(&self) -> Result<()> {
        self.store.list_page(&self.query, None).await?;
        debug!("Catalog reachable");
        Ok(())
    }
}
