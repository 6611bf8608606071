//! # Sync Module
//!
//! Keeps the local view of the remote folder current.
//!
//! ## Components
//!
//! - **Remote Catalog** (`catalog`): Pages through the folder listing and returns every PDF
//! - **Transfer** (`transfer`): Streams one document into the local cache
//! - **Remote Mutator** (`mutator`): Deletes documents and announces each outcome
//! - **Catalog Poller** (`poller`): Periodic background refresh that never fails upstream
//! - **Filter** (`filter`): Case-insensitive name filter for the visible list

pub mod catalog;
pub mod error;
pub mod filter;
pub mod mutator;
pub mod poller;
pub mod transfer;

pub use catalog::RemoteCatalog;
pub use error::{Result, SyncError};
pub use filter::filter_by_name;
pub use mutator::{DeleteReport, RemoteMutator};
pub use poller::CatalogPoller;
pub use transfer::Transfer;
