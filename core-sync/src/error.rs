use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Paging through the remote folder failed.
    #[error("Catalog fetch failed: {0}")]
    CatalogFetch(String),

    #[error("Transfer of {file_name} failed: {message}")]
    Transfer { file_name: String, message: String },

    #[error("Delete of {file_id} failed: {message}")]
    Delete { file_id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Bridge(BridgeError),
}

impl SyncError {
    /// Whether the failure means the remote store is unreachable or the
    /// credential was refused, as opposed to a broken request.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SyncError::Auth(_))
            || matches!(self, SyncError::Bridge(e) if e.is_disconnect())
    }
}

impl From<BridgeError> for SyncError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Unauthorized(msg) => SyncError::Auth(msg),
            other => SyncError::Bridge(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_conversion() {
        let err: SyncError = BridgeError::Unauthorized("401".to_string()).into();
        assert!(matches!(err, SyncError::Auth(_)));
        assert!(err.is_disconnect());

        let err: SyncError = BridgeError::NotAvailable("offline".to_string()).into();
        assert!(err.is_disconnect());

        let err: SyncError = BridgeError::OperationFailed("500".to_string()).into();
        assert!(!err.is_disconnect());
    }
}
