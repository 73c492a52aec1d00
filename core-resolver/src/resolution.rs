//! # Track Resolution
//!
//! Cache-first resolution of playable sources for track metadata. A lookup
//! consults the track-sources cache, fans out to the active resolve-capable
//! resolvers only for what the cache cannot answer, scores every candidate
//! and re-caches the result tagged with the current settings digest.
//!
//! ## Overview
//!
//! ```text
//! resolve_track(descriptor, forced)
//!         │
//!         ▼ cache lookup (skipped when forced)
//!   ┌─────────────┐ full hit    serve, revalidate in background
//!   │ TrackSources├──────────►  when older than the threshold
//!   │    cache    │ partial hit
//!   │             ├──────────►  query only the missing resolvers,
//!   └──────┬──────┘             merge and re-cache
//!          │ miss / stale settings digest
//!          ▼
//!   parallel fan-out to active resolve-capable resolvers
//!          ▼
//!   score candidates, cache when non-empty, serve
//! ```
//!
//! A resolver failure during fan-out is logged and contributes nothing; the
//! remaining resolvers still produce a usable source map.
//!
//! ## Usage
//!
//! ```ignore
//! let resolver = TrackResolver::new(registry, cache, events, clock, tuning, signal);
//! let descriptor = TrackDescriptor::new("Daft Punk", "Around the World")
//!     .with_album("Homework")
//!     .with_duration_secs(428);
//! let sources = resolver.resolve_track(&descriptor, false).await?;
//! ```

use futures::future::join_all;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use bridge_traits::Clock;
use core_runtime::config::ResolutionTuning;
use core_runtime::events::{CoreEvent, EventBus, ResolutionEvent};

use crate::arbiter::QueueSignal;
use crate::cache::{CacheNamespace, CacheStore};
use crate::error::Result;
use crate::model::{SourceMap, SourceRecord, Track, TrackDescriptor};
use crate::registry::{Resolver, ResolverRegistry};
use crate::scoring::ConfidenceScorer;

/// Cache-first source resolution over the active resolver set.
///
/// Cheap to clone; clones share the registry, cache and in-flight
/// revalidation set.
#[derive(Clone)]
pub struct TrackResolver {
    registry: Arc<ResolverRegistry>,
    cache: Arc<CacheStore>,
    scorer: ConfidenceScorer,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    tuning: ResolutionTuning,
    queue_signal: QueueSignal,
    revalidations_in_flight: Arc<StdMutex<HashSet<String>>>,
}

impl TrackResolver {
    pub fn new(
        registry: Arc<ResolverRegistry>,
        cache: Arc<CacheStore>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        tuning: ResolutionTuning,
        queue_signal: QueueSignal,
    ) -> Self {
        let scorer = ConfidenceScorer::new(tuning.duration_tolerance_secs);
        Self {
            registry,
            cache,
            scorer,
            events,
            clock,
            tuning,
            queue_signal,
            revalidations_in_flight: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    /// The signal batch loops yield to while a queue resolution runs.
    pub fn queue_signal(&self) -> &QueueSignal {
        &self.queue_signal
    }

    // ------------------------------------------------------------------
    // Single track
    // ------------------------------------------------------------------

    /// Resolves sources for one track.
    ///
    /// `forced` skips the cache read and always queries, refreshing the
    /// cached entry. The returned map is keyed by resolver id.
    #[instrument(skip(self, descriptor), fields(track_id = %descriptor.track_id()))]
    pub async fn resolve_track(
        &self,
        descriptor: &TrackDescriptor,
        forced: bool,
    ) -> Result<SourceMap> {
        let cache_key = descriptor.sources_cache_key();
        let digest = self.registry.settings_fingerprint().await.digest();

        if !forced {
            if let Some(served) = self.try_cached(descriptor, &cache_key, &digest).await? {
                return Ok(served);
            }
        }

        let targets = self.registry.active_resolve_capable().await;
        let fresh = self.query_resolvers(descriptor, &targets).await;

        if !fresh.is_empty() {
            self.cache
                .set_with_settings_hash(
                    CacheNamespace::TrackSources,
                    cache_key,
                    serde_json::to_value(&fresh)?,
                    digest,
                )
                .await;
        }

        debug!(sources = fresh.len(), queried = targets.len(), "Track resolved");
        self.events
            .emit(CoreEvent::Resolution(ResolutionEvent::TrackResolved {
                track_id: descriptor.track_id(),
                source_count: fresh.len(),
                from_cache: false,
            }))
            .ok();
        Ok(fresh)
    }

    /// Serves from the cache when possible.
    ///
    /// Returns `Ok(None)` when the caller should fall through to a full
    /// fan-out: no entry, a corrupt payload, or a settings digest that no
    /// longer matches.
    async fn try_cached(
        &self,
        descriptor: &TrackDescriptor,
        cache_key: &str,
        digest: &str,
    ) -> Result<Option<SourceMap>> {
        let Some(entry) = self
            .cache
            .get(CacheNamespace::TrackSources, cache_key)
            .await
        else {
            return Ok(None);
        };

        let age_secs = entry.age_secs(self.clock.unix_timestamp());
        let stored_hash = entry.settings_hash;
        let sources: SourceMap = match serde_json::from_value(entry.payload) {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "Cached source map unreadable, treating as miss");
                return Ok(None);
            }
        };

        if stored_hash.as_deref() != Some(digest) {
            debug!("Settings changed since cache write, requerying");
            return Ok(None);
        }

        let active = self.registry.active_resolve_capable().await;
        let missing: Vec<String> = active
            .iter()
            .filter(|id| !sources.contains_key(*id))
            .cloned()
            .collect();

        if missing.is_empty() {
            if age_secs > self.tuning.revalidation_threshold_secs as i64 {
                let cached_ids: BTreeSet<String> = sources.keys().cloned().collect();
                self.spawn_revalidation(descriptor.clone(), cache_key.to_string(), cached_ids);
            }
            debug!(sources = sources.len(), age_secs, "Cache hit");
            self.events
                .emit(CoreEvent::Resolution(ResolutionEvent::TrackResolved {
                    track_id: descriptor.track_id(),
                    source_count: sources.len(),
                    from_cache: true,
                }))
                .ok();
            return Ok(Some(sources));
        }

        // Partial hit: the entry is valid for the current settings but some
        // active resolvers were not known when it was written.
        debug!(missing = missing.len(), "Partial cache hit, querying missing resolvers");
        let fresh = self.query_resolvers(descriptor, &missing).await;
        let mut merged = sources;
        merged.extend(fresh);
        self.cache
            .set_with_settings_hash(
                CacheNamespace::TrackSources,
                cache_key,
                serde_json::to_value(&merged)?,
                digest.to_string(),
            )
            .await;
        self.events
            .emit(CoreEvent::Resolution(ResolutionEvent::TrackResolved {
                track_id: descriptor.track_id(),
                source_count: merged.len(),
                from_cache: false,
            }))
            .ok();
        Ok(Some(merged))
    }

    /// Queries the given resolvers in parallel and scores every candidate.
    /// Failures are logged per resolver and excluded from the map.
    async fn query_resolvers(
        &self,
        descriptor: &TrackDescriptor,
        resolver_ids: &[String],
    ) -> SourceMap {
        let mut targets: Vec<(String, Arc<dyn Resolver>)> = Vec::with_capacity(resolver_ids.len());
        for id in resolver_ids {
            if let Some(registered) = self.registry.get(id).await {
                targets.push((id.clone(), registered.implementation));
            }
        }

        let queries = targets.into_iter().map(|(id, implementation)| {
            let artist = descriptor.artist.as_str();
            let title = descriptor.title.as_str();
            let album = descriptor.album.as_deref();
            async move {
                let outcome = implementation.resolve(artist, title, album).await;
                (id, outcome)
            }
        });

        let mut sources = SourceMap::new();
        for (resolver_id, outcome) in join_all(queries).await {
            match outcome {
                Ok(Some(candidate)) => {
                    let confidence = self.scorer.score(descriptor, &candidate);
                    sources.insert(
                        resolver_id.clone(),
                        SourceRecord {
                            resolver_id,
                            confidence,
                            native_id: candidate.native_id,
                            payload: candidate.payload,
                        },
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(resolver_id = %resolver_id, error = %e, "Resolver query failed, continuing without it");
                }
            }
        }
        sources
    }

    // ------------------------------------------------------------------
    // Background revalidation
    // ------------------------------------------------------------------

    /// Requeries an aged cache entry without blocking the caller. At most
    /// one revalidation runs per cache key.
    fn spawn_revalidation(
        &self,
        descriptor: TrackDescriptor,
        cache_key: String,
        cached_ids: BTreeSet<String>,
    ) {
        {
            let mut in_flight = match self.revalidations_in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !in_flight.insert(cache_key.clone()) {
                return;
            }
        }

        let resolver = self.clone();
        tokio::spawn(async move {
            if let Err(e) = resolver.revalidate(&descriptor, &cache_key, &cached_ids).await {
                warn!(cache_key = %cache_key, error = %e, "Revalidation failed");
            }
            let mut in_flight = match resolver.revalidations_in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            in_flight.remove(&cache_key);
        });
    }

    async fn revalidate(
        &self,
        descriptor: &TrackDescriptor,
        cache_key: &str,
        cached_ids: &BTreeSet<String>,
    ) -> Result<()> {
        let targets = self.registry.active_resolve_capable().await;
        let fresh = self.query_resolvers(descriptor, &targets).await;
        let digest = self.registry.settings_fingerprint().await.digest();

        let (changed, removed) = if fresh.is_empty() {
            self.cache
                .delete(CacheNamespace::TrackSources, cache_key)
                .await;
            (true, true)
        } else {
            let fresh_ids: BTreeSet<String> = fresh.keys().cloned().collect();
            if fresh_ids == *cached_ids {
                self.cache
                    .refresh_timestamp(CacheNamespace::TrackSources, cache_key, Some(digest))
                    .await;
                (false, false)
            } else {
                self.cache
                    .set_with_settings_hash(
                        CacheNamespace::TrackSources,
                        cache_key,
                        serde_json::to_value(&fresh)?,
                        digest,
                    )
                    .await;
                (true, false)
            }
        };

        debug!(changed, removed, "Revalidation completed");
        self.events
            .emit(CoreEvent::Resolution(
                ResolutionEvent::RevalidationCompleted {
                    cache_key: cache_key.to_string(),
                    changed,
                    removed,
                },
            ))
            .ok();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Resolves a batch of tracks sequentially, pacing queries and yielding
    /// to queue resolution at every track boundary.
    ///
    /// Per-track failures produce a track with an empty source map instead
    /// of aborting the batch.
    #[instrument(skip(self, descriptors), fields(total = descriptors.len()))]
    pub async fn resolve_batch(
        &self,
        descriptors: &[TrackDescriptor],
        forced: bool,
    ) -> Vec<Track> {
        let total = descriptors.len();
        let mut resolved = Vec::with_capacity(total);

        for (index, descriptor) in descriptors.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(self.tuning.batch_track_delay_ms)).await;
            }
            self.queue_signal.wait_until_clear().await;

            let sources = match self.resolve_track(descriptor, forced).await {
                Ok(sources) => sources,
                Err(e) => {
                    warn!(track_id = %descriptor.track_id(), error = %e, "Batch track failed, continuing");
                    SourceMap::new()
                }
            };
            resolved.push(descriptor.to_track().with_sources(sources));

            self.events
                .emit(CoreEvent::Resolution(ResolutionEvent::BatchProgress {
                    completed: index + 1,
                    total,
                }))
                .ok();
        }

        resolved
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use crate::manifest::{Capabilities, ResolverManifest};
    use crate::model::SourceCandidate;
    use async_trait::async_trait;
    use bridge_desktop::MemoryKeyValueStore;
    use bridge_traits::ManualClock;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::broadcast::Receiver;

    struct ScriptedResolver {
        resolve_calls: AtomicUsize,
        candidate: StdMutex<Option<SourceCandidate>>,
        fail: AtomicBool,
    }

    impl ScriptedResolver {
        fn returning(candidate: SourceCandidate) -> Self {
            Self {
                resolve_calls: AtomicUsize::new(0),
                candidate: StdMutex::new(Some(candidate)),
                fail: AtomicBool::new(false),
            }
        }

        fn empty() -> Self {
            Self {
                resolve_calls: AtomicUsize::new(0),
                candidate: StdMutex::new(None),
                fail: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            let resolver = Self::empty();
            resolver.fail.store(true, Ordering::SeqCst);
            resolver
        }

        fn set_candidate(&self, candidate: Option<SourceCandidate>) {
            *self.candidate.lock().unwrap() = candidate;
        }

        fn calls(&self) -> usize {
            self.resolve_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Resolver for ScriptedResolver {
        async fn resolve(
            &self,
            _artist: &str,
            _title: &str,
            _album: Option<&str>,
        ) -> Result<Option<SourceCandidate>> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ResolverError::QueryFailed {
                    resolver_id: "scripted".to_string(),
                    message: "backend unreachable".to_string(),
                });
            }
            Ok(self.candidate.lock().unwrap().clone())
        }
    }

    struct Harness {
        registry: Arc<ResolverRegistry>,
        cache: Arc<CacheStore>,
        resolver: TrackResolver,
        events: Arc<EventBus>,
        clock: Arc<ManualClock>,
    }

    async fn harness() -> Harness {
        let store: Arc<dyn bridge_traits::KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
        let events = Arc::new(EventBus::new(64));
        let cache = Arc::new(CacheStore::new(
            Arc::clone(&store),
            Arc::clone(&clock) as Arc<dyn Clock>,
            300,
        ));
        let registry = Arc::new(ResolverRegistry::new(store, Arc::clone(&events), 0));
        registry
            .add_purge_target(Arc::clone(&cache) as Arc<dyn crate::registry::SourcePurge>)
            .await;

        let tuning = ResolutionTuning::default().with_batch_track_delay_ms(0);
        let resolver = TrackResolver::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&events),
            Arc::clone(&clock) as Arc<dyn Clock>,
            tuning,
            QueueSignal::new(),
        );

        Harness {
            registry,
            cache,
            resolver,
            events,
            clock,
        }
    }

    fn resolve_manifest(id: &str) -> ResolverManifest {
        ResolverManifest::new(id, id).with_capabilities(Capabilities {
            resolve: true,
            ..Capabilities::default()
        })
    }

    fn candidate(confidence: f64) -> SourceCandidate {
        SourceCandidate::new(json!({"url": "https://example.com/stream"}))
            .with_confidence(confidence)
    }

    fn descriptor() -> TrackDescriptor {
        TrackDescriptor::new("Daft Punk", "Around the World")
            .with_album("Homework")
            .with_duration_secs(428)
    }

    async fn wait_for_revalidation(subscriber: &mut Receiver<CoreEvent>) -> (bool, bool) {
        loop {
            if let CoreEvent::Resolution(ResolutionEvent::RevalidationCompleted {
                changed,
                removed,
                ..
            }) = subscriber.recv().await.unwrap()
            {
                return (changed, removed);
            }
        }
    }

    #[tokio::test]
    async fn test_miss_fans_out_and_caches() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        let b = Arc::new(ScriptedResolver::returning(
            SourceCandidate::new(json!({"url": "b"}))
                .with_title("Around the World")
                .with_duration_secs(428),
        ));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();
        h.registry
            .install(resolve_manifest("b"), Arc::clone(&b) as Arc<dyn Resolver>)
            .await
            .unwrap();

        let sources = h.resolver.resolve_track(&descriptor(), false).await.unwrap();

        assert_eq!(sources.len(), 2);
        assert!((sources["a"].confidence - 0.9).abs() < f64::EPSILON);
        assert!((sources["b"].confidence - 0.95).abs() < f64::EPSILON);

        let entry = h
            .cache
            .get(CacheNamespace::TrackSources, &descriptor().sources_cache_key())
            .await
            .unwrap();
        let expected = h.registry.settings_fingerprint().await.digest();
        assert_eq!(entry.settings_hash, Some(expected));
    }

    #[tokio::test]
    async fn test_cache_hit_serves_without_queries() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.8)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        let first = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(a.calls(), 1);

        let mut subscriber = h.events.subscribe();
        let second = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(first, second);

        let event = subscriber.recv().await.unwrap();
        assert_eq!(
            event,
            CoreEvent::Resolution(ResolutionEvent::TrackResolved {
                track_id: descriptor().track_id(),
                source_count: 1,
                from_cache: true,
            })
        );
    }

    #[tokio::test]
    async fn test_forced_bypasses_cache() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.8)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        h.resolver.resolve_track(&descriptor(), true).await.unwrap();
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn test_resolver_failure_is_isolated() {
        let h = harness().await;
        let broken = Arc::new(ScriptedResolver::failing());
        let working = Arc::new(ScriptedResolver::returning(candidate(0.7)));
        h.registry
            .install(
                resolve_manifest("broken"),
                Arc::clone(&broken) as Arc<dyn Resolver>,
            )
            .await
            .unwrap();
        h.registry
            .install(
                resolve_manifest("working"),
                Arc::clone(&working) as Arc<dyn Resolver>,
            )
            .await
            .unwrap();

        let sources = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources.contains_key("working"));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_cached() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::empty());
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        let sources = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert!(sources.is_empty());
        assert!(h
            .cache
            .get(CacheNamespace::TrackSources, &descriptor().sources_cache_key())
            .await
            .is_none());

        // Next lookup is a miss again
        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn test_partial_hit_queries_only_missing() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        let b = Arc::new(ScriptedResolver::returning(candidate(0.8)));
        let c = Arc::new(ScriptedResolver::empty());
        for (id, resolver) in [("a", &a), ("b", &b), ("c", &c)] {
            h.registry
                .install(
                    resolve_manifest(id),
                    Arc::clone(resolver) as Arc<dyn Resolver>,
                )
                .await
                .unwrap();
        }

        let first = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 1));

        // The late resolver comes online; only it is queried
        c.set_candidate(Some(candidate(0.6)));
        let second = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 2));

        // The merged entry now satisfies the full active set
        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!((a.calls(), b.calls(), c.calls()), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_settings_change_invalidates_cache() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        let b = Arc::new(ScriptedResolver::returning(candidate(0.8)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();
        h.registry
            .install(resolve_manifest("b"), Arc::clone(&b) as Arc<dyn Resolver>)
            .await
            .unwrap();

        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(a.calls(), 1);

        h.registry.set_active("b", false).await.unwrap();
        let sources = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(a.calls(), 2);
        assert_eq!(sources.len(), 1);
        assert!(sources.contains_key("a"));
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_treated_as_miss() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        let digest = h.registry.settings_fingerprint().await.digest();
        h.cache
            .set_with_settings_hash(
                CacheNamespace::TrackSources,
                descriptor().sources_cache_key(),
                json!("not a source map"),
                digest,
            )
            .await;

        let sources = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(a.calls(), 1);
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn test_aged_hit_revalidates_in_background() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        h.clock.advance_secs(25 * 3600);

        let mut subscriber = h.events.subscribe();
        let sources = h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        assert_eq!(sources.len(), 1);

        let (changed, removed) = wait_for_revalidation(&mut subscriber).await;
        assert!(!changed);
        assert!(!removed);
        assert_eq!(a.calls(), 2);

        // Timestamp was refreshed
        let entry = h
            .cache
            .get(CacheNamespace::TrackSources, &descriptor().sources_cache_key())
            .await
            .unwrap();
        assert_eq!(entry.age_secs(h.clock.unix_timestamp()), 0);
    }

    #[tokio::test]
    async fn test_revalidation_deletes_entry_when_sources_vanish() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        a.set_candidate(None);
        h.clock.advance_secs(25 * 3600);

        let mut subscriber = h.events.subscribe();
        h.resolver.resolve_track(&descriptor(), false).await.unwrap();

        let (changed, removed) = wait_for_revalidation(&mut subscriber).await;
        assert!(changed);
        assert!(removed);
        assert!(h
            .cache
            .get(CacheNamespace::TrackSources, &descriptor().sources_cache_key())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_revalidation_rewrites_changed_source_set() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        let b = Arc::new(ScriptedResolver::returning(candidate(0.8)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();
        h.registry
            .install(resolve_manifest("b"), Arc::clone(&b) as Arc<dyn Resolver>)
            .await
            .unwrap();

        h.resolver.resolve_track(&descriptor(), false).await.unwrap();
        b.set_candidate(None);
        h.clock.advance_secs(25 * 3600);

        let mut subscriber = h.events.subscribe();
        h.resolver.resolve_track(&descriptor(), false).await.unwrap();

        let (changed, removed) = wait_for_revalidation(&mut subscriber).await;
        assert!(changed);
        assert!(!removed);

        let entry = h
            .cache
            .get(CacheNamespace::TrackSources, &descriptor().sources_cache_key())
            .await
            .unwrap();
        let rewritten: SourceMap = serde_json::from_value(entry.payload).unwrap();
        assert_eq!(rewritten.len(), 1);
        assert!(rewritten.contains_key("a"));
    }

    #[tokio::test]
    async fn test_batch_resolves_all_with_progress() {
        let h = harness().await;
        let a = Arc::new(ScriptedResolver::returning(candidate(0.9)));
        h.registry
            .install(resolve_manifest("a"), Arc::clone(&a) as Arc<dyn Resolver>)
            .await
            .unwrap();

        let descriptors = vec![
            TrackDescriptor::new("Burial", "Archangel").with_position(1),
            TrackDescriptor::new("Burial", "Near Dark").with_position(2),
            TrackDescriptor::new("Burial", "Ghost Hardware").with_position(3),
        ];

        let mut subscriber = h.events.subscribe();
        let tracks = h.resolver.resolve_batch(&descriptors, false).await;
        assert_eq!(tracks.len(), 3);
        assert!(tracks.iter().all(|t| t.sources.len() == 1));

        let mut progress = Vec::new();
        while let Ok(event) = subscriber.try_recv() {
            if let CoreEvent::Resolution(ResolutionEvent::BatchProgress { completed, total }) =
                event
            {
                progress.push((completed, total));
            }
        }
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
