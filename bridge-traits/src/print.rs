//! Print Executor Abstraction
//!
//! The physical print step is host-specific (a command line PDF tool, an OS
//! spooler, a print dialog). The core hands over a local file path plus the
//! resolved options and only observes success or failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Page orientation requested from the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

/// Duplex mode requested from the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplexMode {
    Simplex,
    /// Flip on the short edge
    Short,
    /// Flip on the long edge
    Long,
}

/// Options for a single print invocation.
///
/// `None` means "let the executor or printer decide".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Show an interactive dialog or viewer instead of printing silently
    pub show_dialog: bool,
    /// Scale pages to the printable area
    pub fit: bool,
    pub orientation: Option<PageOrientation>,
    pub paper_size: Option<String>,
    /// Explicit printer; `None` prints to the system default
    pub printer: Option<String>,
    pub copies: Option<u32>,
    pub duplex: Option<DuplexMode>,
}

/// Host print facility.
#[async_trait]
pub trait PrintExecutor: Send + Sync {
    /// Print (or open for preview) the document at `path`.
    async fn print(&self, path: &Path, options: &PrintOptions) -> Result<()>;

    /// Names of printers the executor can target.
    async fn list_printers(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
