//! Small helpers for JSON documents persisted on disk.

use bridge_traits::error::{BridgeError, Result};
use std::path::Path;
use tokio::fs;

/// Read a whole document. A missing file yields `Ok(None)`.
pub(crate) async fn read_document(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BridgeError::Io(e)),
    }
}

/// Replace a document by writing a sibling temp file and renaming it over the
/// target, creating parent directories as needed.
pub(crate) async fn write_document(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Remove a document. A missing file is not an error.
pub(crate) async fn remove_document(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BridgeError::Io(e)),
    }
}
