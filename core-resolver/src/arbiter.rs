//! # Queue Priority Arbiter
//!
//! Gives the playback queue first claim on resolver backends. While a queue
//! resolution is running a shared signal is raised; bulk resolution loops
//! (release pages, playlists) check it at every track boundary and wait
//! instead of issuing queries, so the tracks about to play are never stuck
//! behind a 200-track playlist.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────┐ raise / clear  ┌─────────────┐
//! │ QueuePriorityArbiter ├───────────────►│ QueueSignal │
//! │  - queue snapshot    │                └──────┬──────┘
//! │  - parallel resolve  │                       │ wait_until_clear
//! └──────────────────────┘                       ▼
//!                                        batch loops pause at
//!                                        track boundaries
//! ```
//!
//! The signal is cleared by a guard on drop, so an early return or a failed
//! resolution can never leave bulk loops waiting forever. Results for
//! tracks that were removed from the queue while their query was in flight
//! are discarded instead of applied.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex, RwLock};
use tracing::{debug, instrument, warn};

use core_runtime::events::{CoreEvent, EventBus, ResolutionEvent};

use crate::model::{SourceMap, Track};
use crate::registry::SourcePurge;
use crate::resolution::TrackResolver;

// ============================================================================
// Queue Signal
// ============================================================================

/// Shared flag raised for the duration of a queue resolution.
///
/// Clones observe the same flag. Raising returns a guard that clears the
/// flag when dropped.
#[derive(Clone)]
pub struct QueueSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl QueueSignal {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Raises the flag until the returned guard is dropped.
    pub fn raise(&self) -> QueueSignalGuard {
        self.sender.send_replace(true);
        QueueSignalGuard {
            sender: Arc::clone(&self.sender),
        }
    }

    /// Whether a queue resolution is currently running.
    pub fn is_raised(&self) -> bool {
        *self.sender.borrow()
    }

    /// Waits until the flag is clear. Returns immediately when it already
    /// is.
    pub async fn wait_until_clear(&self) {
        let mut receiver = self.sender.subscribe();
        while *receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for QueueSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the queue signal on drop.
pub struct QueueSignalGuard {
    sender: Arc<watch::Sender<bool>>,
}

impl Drop for QueueSignalGuard {
    fn drop(&mut self) {
        self.sender.send_replace(false);
    }
}

// ============================================================================
// Queue Snapshot
// ============================================================================

/// The arbiter's view of the playback queue: ordered tracks plus their live
/// source maps. Purged in place when a resolver is disabled or removed.
pub struct QueueSnapshot {
    tracks: RwLock<Vec<Track>>,
}

impl QueueSnapshot {
    pub fn new() -> Self {
        Self {
            tracks: RwLock::new(Vec::new()),
        }
    }

    /// Adds tracks, replacing any existing track with the same id in place.
    pub async fn upsert(&self, incoming: Vec<Track>) {
        let mut tracks = self.tracks.write().await;
        for track in incoming {
            match tracks.iter_mut().find(|t| t.id == track.id) {
                Some(existing) => *existing = track,
                None => tracks.push(track),
            }
        }
    }

    /// Removes a track. Returns false if it was not queued.
    pub async fn remove(&self, track_id: &str) -> bool {
        let mut tracks = self.tracks.write().await;
        let before = tracks.len();
        tracks.retain(|t| t.id != track_id);
        tracks.len() < before
    }

    pub async fn contains(&self, track_id: &str) -> bool {
        self.tracks.read().await.iter().any(|t| t.id == track_id)
    }

    /// Replaces a queued track's source map. Returns false if the track
    /// left the queue, in which case nothing is stored.
    pub async fn set_sources(&self, track_id: &str, sources: SourceMap) -> bool {
        let mut tracks = self.tracks.write().await;
        match tracks.iter_mut().find(|t| t.id == track_id) {
            Some(track) => {
                track.sources = sources;
                true
            }
            None => false,
        }
    }

    pub async fn tracks(&self) -> Vec<Track> {
        self.tracks.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.tracks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tracks.read().await.is_empty()
    }
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourcePurge for QueueSnapshot {
    async fn purge_resolver(&self, resolver_id: &str) {
        let mut tracks = self.tracks.write().await;
        for track in tracks.iter_mut() {
            track.sources.remove(resolver_id);
        }
    }
}

// ============================================================================
// Arbiter
// ============================================================================

/// Resolves queued tracks ahead of everything else.
///
/// Queue resolutions are serialized through an internal gate so the signal
/// stays raised until the last one finishes.
pub struct QueuePriorityArbiter {
    signal: QueueSignal,
    snapshot: Arc<QueueSnapshot>,
    resolver: Arc<TrackResolver>,
    events: Arc<EventBus>,
    resolution_gate: AsyncMutex<()>,
}

impl QueuePriorityArbiter {
    /// Shares the resolver's queue signal so batch loops observe this
    /// arbiter's resolutions.
    pub fn new(
        resolver: Arc<TrackResolver>,
        snapshot: Arc<QueueSnapshot>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            signal: resolver.queue_signal().clone(),
            snapshot,
            resolver,
            events,
            resolution_gate: AsyncMutex::new(()),
        }
    }

    pub fn signal(&self) -> &QueueSignal {
        &self.signal
    }

    pub fn snapshot(&self) -> &Arc<QueueSnapshot> {
        &self.snapshot
    }

    /// Adds tracks to the queue and resolves every queued track that still
    /// lacks sources, with the priority signal raised throughout.
    ///
    /// Returns the number of tracks that received sources. Tracks removed
    /// from the queue while their query was in flight are discarded.
    #[instrument(skip(self, tracks), fields(count = tracks.len()))]
    pub async fn enqueue_and_resolve(&self, tracks: Vec<Track>) -> usize {
        self.snapshot.upsert(tracks).await;

        // Pending is computed under the gate so that back-to-back calls do
        // not re-resolve tracks the earlier run already filled in.
        let _gate = self.resolution_gate.lock().await;
        let pending: Vec<Track> = self
            .snapshot
            .tracks()
            .await
            .into_iter()
            .filter(|t| t.sources.is_empty())
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let _raised = self.signal.raise();
        debug!(pending = pending.len(), "Queue resolution started");
        self.events
            .emit(CoreEvent::Resolution(
                ResolutionEvent::QueueResolutionStarted {
                    pending: pending.len(),
                },
            ))
            .ok();

        let lookups = pending.iter().map(|track| {
            let descriptor = track.descriptor();
            let resolver = Arc::clone(&self.resolver);
            let track_id = track.id.clone();
            async move {
                let outcome = resolver.resolve_track(&descriptor, false).await;
                (track_id, outcome)
            }
        });

        let mut resolved = 0usize;
        let mut discarded = 0usize;
        for (track_id, outcome) in join_all(lookups).await {
            let sources = match outcome {
                Ok(sources) => sources,
                Err(e) => {
                    warn!(track_id = %track_id, error = %e, "Queue track resolution failed");
                    continue;
                }
            };
            if sources.is_empty() {
                continue;
            }
            if self.snapshot.set_sources(&track_id, sources).await {
                resolved += 1;
            } else {
                debug!(track_id = %track_id, "Track left the queue mid-resolution, result dropped");
                discarded += 1;
            }
        }

        debug!(resolved, discarded, "Queue resolution completed");
        self.events
            .emit(CoreEvent::Resolution(
                ResolutionEvent::QueueResolutionCompleted {
                    resolved,
                    discarded,
                },
            ))
            .ok();
        resolved
    }

    /// Removes a track from the queue. An in-flight resolution for it will
    /// be discarded on completion.
    pub async fn remove_from_queue(&self, track_id: &str) -> bool {
        self.snapshot.remove(track_id).await
    }
}

// ============================================================================
// Tests
// ============================================================================
