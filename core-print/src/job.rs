//! # Print Job State Machine
//!
//! One print run, with validated state transitions.
//!
//! ```text
//! Idle → Running → Completed
//!           │
//!           └────→ Cancelled
//! ```
//!
//! A job carries the settings snapshot taken when the run started, so a
//! settings save during the run does not affect it.

use crate::error::{PrintError, Result};
use crate::settings::PrintSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrintJobId(Uuid);

impl PrintJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PrintJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PrintJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl PrintStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PrintStatus::Completed | PrintStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrintStatus::Idle => "idle",
            PrintStatus::Running => "running",
            PrintStatus::Completed => "completed",
            PrintStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PrintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the file list of a run was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Every file currently in the catalog (or the visible subset of it)
    All,
    /// Files the user picked
    Selected,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::All => write!(f, "all"),
            RunMode::Selected => write!(f, "selected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: PrintJobId,
    pub mode: RunMode,
    pub status: PrintStatus,
    /// Settings snapshot used for every item
    pub settings: PrintSettings,
    pub total: usize,
    /// Items processed so far, successful or not
    pub completed: usize,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PrintJob {
    /// Create a job in `Idle` state.
    pub fn new(mode: RunMode, total: usize, settings: PrintSettings) -> Self {
        Self {
            id: PrintJobId::new(),
            mode,
            status: PrintStatus::Idle,
            settings,
            total,
            completed: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the job is not `Idle`
    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(PrintStatus::Running)?;
        self.status = PrintStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(self)
    }

    /// Count one processed item and return the new `completed` value.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not `Running` or every item is
    /// already counted
    pub fn record_item(&mut self) -> Result<usize> {
        if self.status != PrintStatus::Running {
            return Err(PrintError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "record_item".to_string(),
                reason: "Job must be running to record progress".to_string(),
            });
        }
        if self.completed >= self.total {
            return Err(PrintError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "record_item".to_string(),
                reason: format!("All {} items already recorded", self.total),
            });
        }

        self.completed += 1;
        Ok(self.completed)
    }

    /// # Errors
    ///
    /// Returns an error if the job is not `Running`
    pub fn complete(mut self) -> Result<Self> {
        self.validate_transition(PrintStatus::Completed)?;
        self.status = PrintStatus::Completed;
        self.finished_at = Some(Utc::now());
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error if the job is not `Running`
    pub fn cancel(mut self) -> Result<Self> {
        self.validate_transition(PrintStatus::Cancelled)?;
        self.status = PrintStatus::Cancelled;
        self.finished_at = Some(Utc::now());
        Ok(self)
    }

    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }

    fn validate_transition(&self, to: PrintStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (PrintStatus::Idle, PrintStatus::Running)
                | (PrintStatus::Running, PrintStatus::Completed)
                | (PrintStatus::Running, PrintStatus::Cancelled)
        );

        if !valid {
            return Err(PrintError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self.status, to),
            });
        }

        Ok(())
    }
}
