use thiserror::Error;

/// Authorization failures.
///
/// `Clone` so a single in-flight attempt can hand the same failure to every
/// waiting caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The user abandoned the interactive step.
    #[error("Authorization aborted by the user")]
    Aborted,

    /// Malformed redirect, missing code, or an unexpected provider error.
    #[error("Authorization protocol error: {0}")]
    Protocol(String),

    #[error("OAuth state mismatch: expected {expected}, got {actual}")]
    StateMismatch { expected: String, actual: String },

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Credential storage failed: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl AuthError {
    /// Whether a later attempt may succeed without user intervention beyond
    /// re-running the interactive step.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AuthError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
