//! # Print Module
//!
//! Turns a list of catalog entries into print jobs.
//!
//! - **Settings** (`settings`): Persisted preferences, defaults and the executor option mapping
//! - **Job** (`job`): `Idle → Running → Completed | Cancelled` state machine for one run
//! - **Queue** (`queue`): Sequential, cancellable download-and-print orchestration

pub mod error;
pub mod job;
pub mod queue;
pub mod settings;

pub use error::{PrintError, Result};
pub use job::{PrintJob, PrintJobId, PrintStatus, RunMode};
pub use queue::{ErrorPolicy, FailureStage, PrintFailure, PrintQueue, PrintRunReport};
pub use settings::{PrintSettings, PrintSettingsPatch, PrintSettingsStore, Setting, SETTINGS_KEY};
