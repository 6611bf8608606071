//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the sync and print engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, the configuration builder and the
//! event broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, OAuthClientSecrets};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
