//! # Transfer
//!
//! Streams one remote document to `{cache_dir}/{name}`.
//!
//! The cache directory is created on demand. An existing file of the same
//! name is overwritten. A stream that fails part way leaves the partial file
//! behind; the next transfer of the same name replaces it.

use crate::error::{Result, SyncError};
use bridge_traits::remote::{RemoteFile, RemoteStore};
use bridge_traits::storage::FileSystemAccess;
use core_runtime::logging::strip_path;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Downloads remote documents into the local cache.
pub struct Transfer {
    store: Arc<dyn RemoteStore>,
    file_system: Arc<dyn FileSystemAccess>,
    cache_dir: PathBuf,
}

impl Transfer {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        file_system: Arc<dyn FileSystemAccess>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            file_system,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local path a document named `file_name` is cached at.
    ///
    /// The name is used verbatim, so two documents with the same name share
    /// one cache entry. Names that are not a single plain path component are
    /// refused.
    pub fn local_path(&self, file_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(SyncError::Transfer {
                    file_name: file_name.to_string(),
                    message: "file name is not a plain file name".to_string(),
                })
            }
        }

        let dir = if self.cache_dir.is_absolute() {
            self.cache_dir.clone()
        } else {
            std::env::current_dir()?.join(&self.cache_dir)
        };
        Ok(dir.join(file_name))
    }

    /// Download a remote document and return its absolute local path.
    ///
    /// Resolves once the whole stream has been written and flushed.
    #[instrument(skip(self), fields(file = %strip_path(file_name)))]
    pub async fn download(&self, file_id: &str, file_name: &str) -> Result<PathBuf> {
        let path = self.local_path(file_name)?;
        let fail = |message: String| SyncError::Transfer {
            file_name: file_name.to_string(),
            message,
        };

        if let Some(dir) = path.parent() {
            self.file_system
                .create_dir_all(dir)
                .await
                .map_err(|e| fail(format!("cannot create cache directory: {}", e)))?;
        }

        let mut reader = self
            .store
            .content_stream(file_id)
            .await
            .map_err(|e| match SyncError::from(e) {
                SyncError::Auth(msg) => SyncError::Auth(msg),
                other => fail(other.to_string()),
            })?;

        let mut writer = self
            .file_system
            .open_write_stream(&path)
            .await
            .map_err(|e| fail(format!("cannot open cache file: {}", e)))?;

        let bytes = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Download stream failed");
                return Err(fail(e.to_string()));
            }
        };
        writer
            .shutdown()
            .await
            .map_err(|e| fail(format!("cannot finish cache file: {}", e)))?;

        debug!(bytes, "Stream written");
        info!(bytes, "Downloaded {}", strip_path(&path.to_string_lossy()));
        Ok(path)
    }

    /// Convenience wrapper taking a catalog entry.
    pub async fn download_file(&self, file: &RemoteFile) -> Result<PathBuf> {
        self.download(&file.id, &file.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::TokioFileSystem;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::remote::{ListQuery, RemotePage};
    use std::collections::HashMap;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    /// Serves fixed content per file id; `broken` ids fail mid-stream.
    #[derive(Default)]
    struct ContentStore {
        content: HashMap<String, Vec<u8>>,
        broken: Vec<String>,
    }

    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if !self.sent {
                self.sent = true;
                buf.put_slice(b"partial");
                return Poll::Ready(Ok(()));
            }
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    #[async_trait]
    impl RemoteStore for ContentStore {
        async fn list_page(&self, _: &ListQuery, _: Option<&str>) -> BridgeResult<RemotePage> {
            unimplemented!()
        }

        async fn content_stream(
            &self,
            file_id: &str,
        ) -> BridgeResult<Box<dyn AsyncRead + Send + Unpin>> {
            if self.broken.iter().any(|id| id == file_id) {
                return Ok(Box::new(FailingReader { sent: false }));
            }
            match self.content.get(file_id) {
                Some(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
                None => Err(BridgeError::OperationFailed("404".to_string())),
            }
        }

        async fn delete(&self, _file_id: &str) -> BridgeResult<()> {
            unimplemented!()
        }
    }

    fn temp_cache(test: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("core-sync-transfer-{}-{}", test, std::process::id()))
            .join("downloads")
    }

    fn transfer(store: ContentStore, cache: &Path) -> Transfer {
        Transfer::new(Arc::new(store), Arc::new(TokioFileSystem::new()), cache)
    }

    #[tokio::test]
    async fn test_download_creates_directory_and_overwrites() {
        let cache = temp_cache("overwrite");
        let _ = std::fs::remove_dir_all(cache.parent().unwrap());

        let mut store = ContentStore::default();
        store.content.insert("a".to_string(), b"%PDF-1.7 first".to_vec());
        store.content.insert("b".to_string(), b"%PDF".to_vec());
        let transfer = transfer(store, &cache);

        let path = transfer.download("a", "A.pdf").await.unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, cache.join("A.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 first");

        let again = transfer.download("a", "A.pdf").await.unwrap();
        assert_eq!(std::fs::read(&again).unwrap().len(), b"%PDF-1.7 first".len());

        // Same name, different document: the cache entry is replaced.
        transfer.download("b", "A.pdf").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");

        let _ = std::fs::remove_dir_all(cache.parent().unwrap());
    }

    #[tokio::test]
    async fn test_stream_error_rejects() {
        let cache = temp_cache("broken");
        let store = ContentStore {
            broken: vec!["x".to_string()],
            ..Default::default()
        };

        let err = transfer(store, &cache).download("x", "X.pdf").await.unwrap_err();
        assert!(matches!(err, SyncError::Transfer { ref file_name, .. } if file_name == "X.pdf"));

        let _ = std::fs::remove_dir_all(cache.parent().unwrap());
    }

    #[tokio::test]
    async fn test_remote_error_is_transfer_error() {
        let cache = temp_cache("missing");
        let err = transfer(ContentStore::default(), &cache)
            .download("nope", "N.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Transfer { .. }));

        let _ = std::fs::remove_dir_all(cache.parent().unwrap());
    }

    #[test]
    fn test_local_path_refuses_traversal() {
        let transfer = transfer(ContentStore::default(), Path::new("/tmp/cache"));
        assert_eq!(
            transfer.local_path("Report 2024.pdf").unwrap(),
            PathBuf::from("/tmp/cache/Report 2024.pdf")
        );
        assert!(transfer.local_path("../escape.pdf").is_err());
        assert!(transfer.local_path("nested/file.pdf").is_err());
        assert!(transfer.local_path("").is_err());
    }
}
