//! # Playback Source Selection
//!
//! Picks the source to hand to playback from a track's resolved source map
//! and drives the play attempt, including the confirmation step for
//! resolvers that play through an external context and the single-retry
//! policy for flaky backends.
//!
//! ## Overview
//!
//! Candidates are the track's sources whose resolver is installed and
//! active. An explicitly preferred resolver wins outright; otherwise
//! candidates are ranked by registry priority, with confidence breaking
//! ties. A track with no candidate in hand gets one on-demand resolution
//! before the lookup is declared failed.
//!
//! Non-streaming sources hand playback to an external application, so the
//! caller must confirm within a timeout before `play` is invoked; a decline
//! or timeout skips the track rather than falling through to another
//! source. A failed `play` is retried once when the manifest opts in, and
//! a final failure forces a fresh resolution so the next attempt does not
//! replay a stale source.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use core_runtime::config::ResolutionTuning;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};

use crate::error::{ResolverError, Result};
use crate::model::{SourceMap, SourceRecord, Track};
use crate::registry::{RegisteredResolver, ResolverRegistry};
use crate::resolution::TrackResolver;

/// Host-side hook asked to confirm hand-off to an external application.
#[async_trait]
pub trait PlaybackConfirmer: Send + Sync {
    /// Returns true when the user accepted playing `track` through the
    /// resolver's external context.
    async fn confirm_external(&self, track: &Track, resolver_id: &str) -> bool;
}

/// Per-call selection overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOptions {
    /// Play through this resolver regardless of priority and confidence,
    /// as long as it is active and has a source for the track.
    pub preferred_resolver: Option<String>,
}

impl SelectionOptions {
    pub fn with_preferred_resolver(mut self, resolver_id: impl Into<String>) -> Self {
        self.preferred_resolver = Some(resolver_id.into());
        self
    }
}

/// How a selection ended when no error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Playback started through the given resolver.
    Started { resolver_id: String, external: bool },
    /// The winning source was external and the caller declined or timed
    /// out, so the track was skipped.
    ExternalSkipped { resolver_id: String },
}

/// Selects and plays the best source for a track.
pub struct PlaybackSourceSelector {
    registry: Arc<ResolverRegistry>,
    resolver: Arc<TrackResolver>,
    confirmer: Arc<dyn PlaybackConfirmer>,
    events: Arc<EventBus>,
    tuning: ResolutionTuning,
}

impl PlaybackSourceSelector {
    pub fn new(
        registry: Arc<ResolverRegistry>,
        resolver: Arc<TrackResolver>,
        confirmer: Arc<dyn PlaybackConfirmer>,
        events: Arc<EventBus>,
        tuning: ResolutionTuning,
    ) -> Self {
        Self {
            registry,
            resolver,
            confirmer,
            events,
            tuning,
        }
    }

    /// Picks a source for the track and attempts playback.
    ///
    /// # Errors
    ///
    /// [`ResolverError::NoSourceFound`] when no active resolver has a
    /// source even after an on-demand resolution, and
    /// [`ResolverError::PlaybackFailed`] when the chosen source would not
    /// start; its `recoverable` flag tells whether the forced re-resolution
    /// found fresh sources worth another attempt.
    #[instrument(skip(self, track, options), fields(track_id = %track.id))]
    pub async fn select_and_play(
        &self,
        track: &Track,
        options: &SelectionOptions,
    ) -> Result<PlaybackOutcome> {
        let mut candidates = self.ranked_candidates(&track.sources).await;

        if candidates.is_empty() {
            debug!("No candidate in hand, resolving on demand");
            let fresh = self.resolver.resolve_track(&track.descriptor(), false).await?;
            candidates = self.ranked_candidates(&fresh).await;
        }

        if candidates.is_empty() {
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::NoSourceFound {
                    track_id: track.id.clone(),
                }))
                .ok();
            return Err(ResolverError::NoSourceFound {
                track_id: track.id.clone(),
            });
        }

        let source = match options.preferred_resolver.as_deref() {
            Some(preferred) => {
                match candidates
                    .iter()
                    .position(|s| s.resolver_id == preferred)
                {
                    Some(index) => candidates.swap_remove(index),
                    None => candidates.remove(0),
                }
            }
            None => candidates.remove(0),
        };

        self.attempt(track, &source).await
    }

    /// Plays a specific source of the track, bypassing ranking. The
    /// resolver must still be active.
    pub async fn play_source(&self, track: &Track, resolver_id: &str) -> Result<PlaybackOutcome> {
        if !self.registry.is_active(resolver_id).await {
            return Err(ResolverError::NoSourceFound {
                track_id: track.id.clone(),
            });
        }
        let Some(source) = track.sources.get(resolver_id) else {
            return Err(ResolverError::NoSourceFound {
                track_id: track.id.clone(),
            });
        };
        self.attempt(track, source).await
    }

    /// Active sources ranked by registry priority, confidence breaking
    /// ties.
    async fn ranked_candidates(&self, sources: &SourceMap) -> Vec<SourceRecord> {
        let order = self.registry.order().await;
        let mut ranked: Vec<(usize, SourceRecord)> = Vec::new();
        for (resolver_id, source) in sources {
            if !self.registry.is_active(resolver_id).await {
                continue;
            }
            let priority = order
                .iter()
                .position(|id| id == resolver_id)
                .unwrap_or(usize::MAX);
            ranked.push((priority, source.clone()));
        }

        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0).then_with(|| {
                b.1.confidence
                    .partial_cmp(&a.1.confidence)
                    .unwrap_or(Ordering::Equal)
            })
        });
        ranked.into_iter().map(|(_, source)| source).collect()
    }

    async fn attempt(&self, track: &Track, source: &SourceRecord) -> Result<PlaybackOutcome> {
        let resolver_id = source.resolver_id.clone();
        let Some(registered) = self.registry.get(&resolver_id).await else {
            return Err(ResolverError::UnknownResolver(resolver_id));
        };
        let external = !registered.manifest.capabilities.stream;

        if external && !self.confirm_external(track, &resolver_id).await {
            debug!(resolver_id = %resolver_id, "External source not confirmed, skipping track");
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::ExternalSkipped {
                    track_id: track.id.clone(),
                    resolver_id: resolver_id.clone(),
                }))
                .ok();
            return Ok(PlaybackOutcome::ExternalSkipped { resolver_id });
        }

        if self.try_play(&registered, source).await {
            return Ok(self.started(track, resolver_id, external));
        }

        if registered.manifest.retry_on_play_failure {
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::RetryingPlayback {
                    track_id: track.id.clone(),
                    resolver_id: resolver_id.clone(),
                }))
                .ok();
            tokio::time::sleep(Duration::from_millis(self.tuning.play_retry_delay_ms)).await;
            if self.try_play(&registered, source).await {
                return Ok(self.started(track, resolver_id, external));
            }
        }

        // The source is dead as far as we can tell. Force a fresh resolution
        // so the next attempt starts from current data instead of replaying
        // this entry from cache.
        let fresh = self
            .resolver
            .resolve_track(&track.descriptor(), true)
            .await
            .unwrap_or_default();
        let recoverable = !fresh.is_empty();
        let message = format!("resolver '{resolver_id}' failed to start playback");
        self.events
            .emit(CoreEvent::Playback(PlaybackEvent::Error {
                track_id: Some(track.id.clone()),
                resolver_id: Some(resolver_id.clone()),
                message: message.clone(),
                recoverable,
            }))
            .ok();
        Err(ResolverError::PlaybackFailed {
            track_id: track.id.clone(),
            resolver_id,
            message,
            recoverable,
        })
    }

    /// Asks the host to confirm an external hand-off, bounded by the
    /// configured timeout. A timeout counts as a decline.
    async fn confirm_external(&self, track: &Track, resolver_id: &str) -> bool {
        self.events
            .emit(CoreEvent::Playback(
                PlaybackEvent::ExternalConfirmationPending {
                    track_id: track.id.clone(),
                    resolver_id: resolver_id.to_string(),
                },
            ))
            .ok();

        let window = Duration::from_secs(self.tuning.external_confirm_timeout_secs);
        match timeout(window, self.confirmer.confirm_external(track, resolver_id)).await {
            Ok(confirmed) => confirmed,
            Err(_) => {
                debug!(resolver_id = %resolver_id, "External confirmation timed out");
                false
            }
        }
    }

    async fn try_play(&self, registered: &RegisteredResolver, source: &SourceRecord) -> bool {
        match registered.implementation.play(source).await {
            Ok(started) => started,
            Err(e) => {
                warn!(resolver_id = %source.resolver_id, error = %e, "Play attempt failed");
                false
            }
        }
    }

    fn started(&self, track: &Track, resolver_id: String, external: bool) -> PlaybackOutcome {
        self.events
            .emit(CoreEvent::Playback(PlaybackEvent::SourceSelected {
                track_id: track.id.clone(),
                resolver_id: resolver_id.clone(),
                external,
            }))
            .ok();
        PlaybackOutcome::Started {
            resolver_id,
            external,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
