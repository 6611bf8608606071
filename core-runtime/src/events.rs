//! # Event Bus System
//!
//! Provides an event-driven architecture for the engine using `tokio::sync::broadcast`.
//! Core modules publish typed events; the presentation layer subscribes to them
//! instead of polling.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for each domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Auth Session ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │ Catalog Poll ├──────────────>│  channel) ├─────────────────>│ Presenter  │
//! └──────────────┘               │           │                  └────────────┘
//!                                │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │ Print Queue  ├──────────────>│           ├─────────────────>│ Logger     │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, PrintEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Print(PrintEvent::Progress {
//!         job_id: "job-1".to_string(),
//!         completed: 1,
//!         total: 3,
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Print(_)));
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Authentication Events
//! - `SigningIn`: Interactive authorization started
//! - `SignedIn`: A credential was obtained and persisted
//! - `TokenRefreshed`: Access token was refreshed
//! - `AuthError`: Authorization failed
//! - `SignedOut`: The credential was discarded
//!
//! ### Catalog Events
//! - `FileListUpdated`: The visible file set changed (may be empty after a failed refresh)
//! - `RefreshFailed`: A background refresh failed
//!
//! ### Print Events
//! - `Started`, `Progress`, `ItemFailed`, `Completed`, `Cancelled`
//!
//! ### Remote Events
//! - `FileDeleted`: A remote file was deleted
//! - `DeleteFailed`: A remote delete failed
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use bridge_traits::RemoteFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Remote catalog events
    Catalog(CatalogEvent),
    /// Print queue events
    Print(PrintEvent),
    /// Remote mutation events
    Remote(RemoteEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Print(e) => e.description(),
            CoreEvent::Remote(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Catalog(CatalogEvent::RefreshFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Print(PrintEvent::ItemFailed { surfaced: true, .. }) => {
                EventSeverity::Error
            }
            CoreEvent::Print(PrintEvent::ItemFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Remote(RemoteEvent::DeleteFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn) => EventSeverity::Info,
            CoreEvent::Print(PrintEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Print(PrintEvent::Cancelled { .. }) => EventSeverity::Info,
            CoreEvent::Remote(RemoteEvent::FileDeleted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to the authorization session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Interactive authorization started.
    SigningIn {
        /// The provider being authenticated with.
        provider: String,
    },
    /// A credential was obtained and persisted.
    SignedIn,
    /// Access token refresh completed.
    TokenRefreshed {
        /// Timestamp when the new token expires (Unix epoch seconds).
        expires_at: i64,
    },
    /// Authorization failed.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether a later attempt may succeed.
        recoverable: bool,
    },
    /// The cached and persisted credential was discarded.
    SignedOut,
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn { .. } => "Authorization in progress",
            AuthEvent::SignedIn => "Signed in successfully",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::AuthError { .. } => "Authorization error",
            AuthEvent::SignedOut => "Signed out",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events describing the visible remote file set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// The file list was refreshed.
    FileListUpdated {
        /// Complete list; empty after a failed background refresh.
        files: Vec<RemoteFile>,
    },
    /// A background refresh failed.
    RefreshFailed {
        /// Human-readable error message.
        message: String,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::FileListUpdated { .. } => "File list updated",
            CatalogEvent::RefreshFailed { .. } => "File list refresh failed",
        }
    }
}

// ============================================================================
// Print Events
// ============================================================================

/// Events emitted by a print queue run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PrintEvent {
    /// A run started.
    Started {
        /// Unique identifier for this run.
        job_id: String,
        /// Number of files in the run.
        total: usize,
    },
    /// One file was processed (successfully or not).
    Progress {
        /// The run ID.
        job_id: String,
        /// Files processed so far, including this one.
        completed: usize,
        /// Number of files in the run.
        total: usize,
    },
    /// Downloading or printing one file failed.
    ItemFailed {
        /// The run ID.
        job_id: String,
        /// Remote file ID.
        file_id: String,
        /// Remote file name.
        file_name: String,
        /// Human-readable error message.
        message: String,
        /// Whether the error policy surfaces this failure to the user.
        surfaced: bool,
    },
    /// Every file was processed.
    Completed {
        /// The run ID.
        job_id: String,
        /// Number of files in the run.
        total: usize,
    },
    /// The run stopped early because it was cancelled.
    Cancelled {
        /// The run ID.
        job_id: String,
        /// Files processed before cancellation took effect.
        completed: usize,
        /// Number of files in the run.
        total: usize,
    },
}

impl PrintEvent {
    fn description(&self) -> &str {
        match self {
            PrintEvent::Started { .. } => "Print run started",
            PrintEvent::Progress { .. } => "Print run in progress",
            PrintEvent::ItemFailed { .. } => "Print item failed",
            PrintEvent::Completed { .. } => "Print run completed",
            PrintEvent::Cancelled { .. } => "Print run cancelled",
        }
    }
}

// ============================================================================
// Remote Events
// ============================================================================

/// Events describing changes made to the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RemoteEvent {
    /// A remote file was deleted.
    FileDeleted {
        /// The deleted file ID.
        file_id: String,
    },
    /// Deleting a remote file failed; the file is still present remotely.
    DeleteFailed {
        /// The file ID.
        file_id: String,
        /// Human-readable error message.
        message: String,
    },
}

impl RemoteEvent {
    fn description(&self) -> &str {
        match self {
            RemoteEvent::FileDeleted { .. } => "Remote file deleted",
            RemoteEvent::DeleteFailed { .. } => "Remote file delete failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let print_stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Print(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(completed: usize, total: usize) -> CoreEvent {
        CoreEvent::Print(PrintEvent::Progress {
            job_id: "job-1".to_string(),
            completed,
            total,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Auth(AuthEvent::SignedOut)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Remote(RemoteEvent::FileDeleted {
            file_id: "file-1".to_string(),
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Print(_)));

        bus.emit(CoreEvent::Catalog(CatalogEvent::FileListUpdated { files: vec![] }))
            .ok();
        bus.emit(progress(1, 2)).ok();

        assert_eq!(stream.recv().await.unwrap(), progress(1, 2));
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 1..=5 {
            bus.emit(progress(i, 5)).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let surfaced = CoreEvent::Print(PrintEvent::ItemFailed {
            job_id: "job-1".to_string(),
            file_id: "f".to_string(),
            file_name: "A.pdf".to_string(),
            message: "boom".to_string(),
            surfaced: true,
        });
        assert_eq!(surfaced.severity(), EventSeverity::Error);

        let swallowed = CoreEvent::Print(PrintEvent::ItemFailed {
            job_id: "job-1".to_string(),
            file_id: "f".to_string(),
            file_name: "A.pdf".to_string(),
            message: "boom".to_string(),
            surfaced: false,
        });
        assert_eq!(swallowed.severity(), EventSeverity::Warning);

        assert_eq!(progress(1, 3).severity(), EventSeverity::Debug);
        assert_eq!(
            CoreEvent::Auth(AuthEvent::SignedIn).severity(),
            EventSeverity::Info
        );
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Print(PrintEvent::Cancelled {
            job_id: "job-1".to_string(),
            completed: 1,
            total: 3,
        });
        assert_eq!(event.description(), "Print run cancelled");
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(progress(i, 10)).ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for i in 0..10 {
                bus2.emit(CoreEvent::Remote(RemoteEvent::FileDeleted {
                    file_id: format!("file-{}", i),
                }))
                .ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Catalog(CatalogEvent::FileListUpdated {
            files: vec![RemoteFile::new("id-1", "A.pdf")],
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Catalog");
        assert_eq!(json["payload"]["event"], "FileListUpdated");
        assert_eq!(json["payload"]["files"][0]["name"], "A.pdf");

        let deserialized: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(progress(1, 1)).ok();
        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, progress(1, 1));
    }
}
