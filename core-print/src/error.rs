use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintError {
    /// Another run owns the queue.
    #[error("A print run is already in progress: {job_id}")]
    JobInProgress { job_id: String },

    #[error("Download of {file_name} failed: {message}")]
    Transfer { file_name: String, message: String },

    #[error("Printing {file_name} failed: {message}")]
    Executor { file_name: String, message: String },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Print settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, PrintError>;
