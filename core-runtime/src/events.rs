//! # Event Bus System
//!
//! Provides an event-driven architecture for the resolution core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between core modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//! - **Subscription Management**: Multiple subscribers can listen independently
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │   Registry   ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │TrackResolver ├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └──────────────┘               │           │                  └────────────┘
//!                                │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │   Playback   ├──────────────>│           ├─────────────────>│ Subscriber │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, RegistryEvent};
//!
//! # let event_bus = EventBus::new(100);
//! let event = CoreEvent::Registry(RegistryEvent::ResolverInstalled {
//!     resolver_id: "bandcamp".to_string(),
//!     name: "Bandcamp".to_string(),
//!     version: "1.2.0".to_string(),
//!     updated: false,
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent};
//! use tokio::sync::broadcast::error::RecvError;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! tokio::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(event) => println!("Received: {:?}", event),
//!             Err(RecvError::Lagged(n)) => {
//!                 eprintln!("Missed {} events", n);
//!             }
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of
//! errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emission is best-effort: a slow or absent subscriber never blocks the
//! emitting module.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// This value balances memory usage with the ability to handle bursts of
/// events. Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Resolver registry events
    Registry(RegistryEvent),
    /// Track resolution events
    Resolution(ResolutionEvent),
    /// Playback selection events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Registry(e) => e.description(),
            CoreEvent::Resolution(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::NoSourceFound { .. }) => EventSeverity::Warning,
            CoreEvent::Registry(RegistryEvent::ResolverInstalled { .. }) => EventSeverity::Info,
            CoreEvent::Registry(RegistryEvent::ResolverUninstalled { .. }) => EventSeverity::Info,
            CoreEvent::Registry(RegistryEvent::ResolverActiveChanged { .. }) => EventSeverity::Info,
            CoreEvent::Resolution(ResolutionEvent::QueueResolutionCompleted { .. }) => {
                EventSeverity::Info
            }
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
// Registry Events
// ============================================================================

/// Events related to resolver installation and configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    /// A resolver was installed or hot-swapped.
    ResolverInstalled {
        /// The resolver ID.
        resolver_id: String,
        /// Display name from the manifest.
        name: String,
        /// Manifest version string.
        version: String,
        /// True when an existing resolver with the same ID was replaced.
        updated: bool,
    },
    /// A resolver was uninstalled and its sources purged.
    ResolverUninstalled {
        /// The resolver ID that was removed.
        resolver_id: String,
    },
    /// A resolver was enabled or disabled.
    ResolverActiveChanged {
        /// The resolver ID.
        resolver_id: String,
        /// New active state.
        active: bool,
    },
    /// The priority order changed.
    OrderChanged {
        /// The full new order, highest priority first.
        order: Vec<String>,
    },
}

impl RegistryEvent {
    fn description(&self) -> &str {
        match self {
            RegistryEvent::ResolverInstalled { updated: true, .. } => "Resolver updated",
            RegistryEvent::ResolverInstalled { .. } => "Resolver installed",
            RegistryEvent::ResolverUninstalled { .. } => "Resolver uninstalled",
            RegistryEvent::ResolverActiveChanged { active: true, .. } => "Resolver enabled",
            RegistryEvent::ResolverActiveChanged { .. } => "Resolver disabled",
            RegistryEvent::OrderChanged { .. } => "Resolver order changed",
        }
    }
}

// ============================================================================
// Resolution Events
// ============================================================================

/// Events related to track source resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ResolutionEvent {
    /// A track finished resolving.
    TrackResolved {
        /// Deterministic track ID.
        track_id: String,
        /// Number of sources in the resulting map.
        source_count: usize,
        /// True when the result was served from cache without new queries.
        from_cache: bool,
    },
    /// Progress update for a batch (release page, playlist) resolution.
    BatchProgress {
        /// Tracks resolved so far.
        completed: usize,
        /// Total tracks in the batch.
        total: usize,
    },
    /// A background revalidation finished.
    RevalidationCompleted {
        /// Cache key of the revalidated entry.
        cache_key: String,
        /// True when the resolver-id set changed and the entry was rewritten.
        changed: bool,
        /// True when no sources were found and the entry was deleted.
        removed: bool,
    },
    /// Queue resolution started (the priority flag is raised).
    QueueResolutionStarted {
        /// Number of queue tracks lacking sources.
        pending: usize,
    },
    /// Queue resolution finished (the priority flag is cleared).
    QueueResolutionCompleted {
        /// Tracks that received sources.
        resolved: usize,
        /// Results discarded because the track left the queue meanwhile.
        discarded: usize,
    },
}

impl ResolutionEvent {
    fn description(&self) -> &str {
        match self {
            ResolutionEvent::TrackResolved { .. } => "Track resolved",
            ResolutionEvent::BatchProgress { .. } => "Batch resolution in progress",
            ResolutionEvent::RevalidationCompleted { .. } => "Cache revalidation completed",
            ResolutionEvent::QueueResolutionStarted { .. } => "Queue resolution started",
            ResolutionEvent::QueueResolutionCompleted { .. } => "Queue resolution completed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to source selection and playback hand-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A source was selected and playback started.
    SourceSelected {
        /// The track ID.
        track_id: String,
        /// The winning resolver.
        resolver_id: String,
        /// True when the resolver plays through an external context.
        external: bool,
    },
    /// A non-streaming resolver won; awaiting caller confirmation.
    ExternalConfirmationPending {
        /// The track ID.
        track_id: String,
        /// The resolver awaiting confirmation.
        resolver_id: String,
    },
    /// External playback was skipped (declined or timed out).
    ExternalSkipped {
        /// The track ID.
        track_id: String,
        /// The resolver that was skipped.
        resolver_id: String,
    },
    /// A failed `play` call is being retried once.
    RetryingPlayback {
        /// The track ID.
        track_id: String,
        /// The resolver being retried.
        resolver_id: String,
    },
    /// No active resolver produced a usable source.
    NoSourceFound {
        /// The track ID.
        track_id: String,
    },
    /// Playback failed after the retry policy was exhausted.
    Error {
        /// The track ID if available.
        track_id: Option<String>,
        /// The resolver involved if known.
        resolver_id: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether a fresh resolution was forced so a retry may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::SourceSelected { .. } => "Playback source selected",
            PlaybackEvent::ExternalConfirmationPending { .. } => "External playback pending",
            PlaybackEvent::ExternalSkipped { .. } => "External playback skipped",
            PlaybackEvent::RetryingPlayback { .. } => "Retrying playback",
            PlaybackEvent::NoSourceFound { .. } => "No playable source found",
            PlaybackEvent::Error { .. } => "Playback error",
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
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, CoreEvent, ResolutionEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
///
/// // Subscribe to events
/// let mut subscriber = event_bus.subscribe();
///
/// // Emit an event
/// let event = CoreEvent::Resolution(ResolutionEvent::TrackResolved {
///     track_id: "daftpunkaroundtheworld".to_string(),
///     source_count: 2,
///     from_cache: false,
/// });
/// event_bus.emit(event).ok();
/// # }
/// ```
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

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// This provides a more ergonomic API for consuming events with optional
/// filtering by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for playback events only
/// let mut playback_stream = stream.filter(|event| {
///     matches!(event, CoreEvent::Playback(_))
/// });
/// # }
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
    /// This will skip events that don't match the filter and return the next
    /// matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            // If no filter, return immediately
            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            // Apply filter
            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    // If no filter, return immediately
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    // Apply filter
                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
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
