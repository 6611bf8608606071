//! Core service façade.
//!
//! Wires the host bridges from a [`CoreConfig`](core_runtime::CoreConfig)
//! into the authorization session, the Drive connector, the catalog, the
//! transfer cache, the remote mutator and the print queue, and exposes the
//! operations a presentation layer calls:
//!
//! | Operation | Method |
//! |---|---|
//! | refresh-catalog | [`CoreService::refresh_catalog`] |
//! | get/save settings | [`CoreService::get_settings`], [`CoreService::save_settings`] |
//! | print one/all/selected | [`CoreService::print_one`], [`CoreService::print_all`], [`CoreService::print_selected`] |
//! | cancel-print | [`CoreService::cancel_print`] |
//! | delete one/all | [`CoreService::delete_one`], [`CoreService::delete_all`] |
//! | test-connection | [`CoreService::test_connection`] |
//!
//! Outbound signals (file list updates, deletions, print progress) arrive
//! through [`CoreService::subscribe`].
//!
//! Desktop hosts enable the `desktop-shims` feature so every bridge the
//! configuration leaves unset falls back to the `bridge-desktop` default.

pub mod error;
mod service;

pub use error::{CoreError, Result};
pub use service::{ConnectionStatus, CoreService};

pub use bridge_traits::remote::RemoteFile;
pub use core_print::{
    ErrorPolicy, FailureStage, PrintFailure, PrintRunReport, PrintSettings, PrintSettingsPatch,
    PrintStatus, Setting,
};
pub use core_runtime::events::{CoreEvent, EventStream};
pub use core_runtime::{CoreConfig, CoreConfigBuilder, OAuthClientSecrets};
pub use core_sync::{filter_by_name, DeleteReport};
