//! Logger Sink appending JSON lines to a file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    logging::{LogEntry, LogLevel, LoggerSink},
};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// [`LoggerSink`] writing one JSON object per entry.
///
/// The file and its directory are created on the first entry and always
/// appended to.
pub struct JsonLinesLoggerSink {
    path: PathBuf,
    min_level: LogLevel,
    file: Mutex<Option<File>>,
}

impl JsonLinesLoggerSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            min_level: LogLevel::Info,
            file: Mutex::new(None),
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?)
    }
}

#[async_trait]
impl LoggerSink for JsonLinesLoggerSink {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        let mut line = serde_json::to_vec(&entry).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode log entry: {}", e))
        })?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        if file.is_none() {
            *file = Some(self.open().await?);
        }
        if let Some(file) = file.as_mut() {
            file.write_all(&line).await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        if let Some(file) = self.file.lock().await.as_mut() {
            file.flush().await?;
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
