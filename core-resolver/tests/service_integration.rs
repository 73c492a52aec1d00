//! Integration tests for the assembled resolver service
//!
//! These tests run the full stack over the SQLite key-value bridge and
//! verify:
//! - Fan-out over a mixed healthy/failing/empty resolver set
//! - Purging a disabled resolver from cache and queue alike
//! - Cache and settings surviving a service restart
//! - Expired cache entries being discarded at startup
//! - Default resolver trait methods behaving as no-ops

use async_trait::async_trait;
use bridge_desktop::SqliteKeyValueStore;
use bridge_traits::{Clock, KeyValueStore, ManualClock};
use core_resolver::{
    CacheNamespace, Capabilities, PlaybackConfirmer, Resolver, ResolverManifest, ResolverService,
    SourceCandidate, SourceMap, SourceRecord, Track, TrackDescriptor,
};
use core_runtime::config::CoreConfig;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Mock Implementations
// ============================================================================

/// Counting resolver with a fixed candidate and an optional failure mode.
struct CountingResolver {
    calls: AtomicUsize,
    candidate: Option<SourceCandidate>,
    fail: AtomicBool,
}

impl CountingResolver {
    fn returning(candidate: SourceCandidate) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            candidate: Some(candidate),
            fail: AtomicBool::new(false),
        }
    }

    fn empty() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            candidate: None,
            fail: AtomicBool::new(false),
        }
    }

    fn failing() -> Self {
        let resolver = Self::empty();
        resolver.fail.store(true, Ordering::SeqCst);
        resolver
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for CountingResolver {
    async fn resolve(
        &self,
        _artist: &str,
        _title: &str,
        _album: Option<&str>,
    ) -> core_resolver::Result<Option<SourceCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(core_resolver::ResolverError::QueryFailed {
                resolver_id: "counting".to_string(),
                message: "backend unreachable".to_string(),
            });
        }
        Ok(self.candidate.clone())
    }

    async fn play(&self, _source: &SourceRecord) -> core_resolver::Result<bool> {
        Ok(true)
    }
}

/// Resolver relying entirely on the trait's default method bodies.
struct BareResolver;

#[async_trait]
impl Resolver for BareResolver {}

struct AcceptAll;

#[async_trait]
impl PlaybackConfirmer for AcceptAll {
    async fn confirm_external(&self, _track: &Track, _resolver_id: &str) -> bool {
        true
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn sqlite_store() -> Arc<dyn KeyValueStore> {
    Arc::new(SqliteKeyValueStore::in_memory().await.unwrap())
}

fn config_over(store: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> CoreConfig {
    CoreConfig::builder()
        .key_value_store(store)
        .clock(clock as Arc<dyn Clock>)
        .build()
        .unwrap()
}

fn resolve_manifest(id: &str) -> ResolverManifest {
    ResolverManifest::new(id, id).with_capabilities(Capabilities {
        resolve: true,
        stream: true,
        ..Capabilities::default()
    })
}

fn candidate(url: &str, confidence: f64) -> SourceCandidate {
    SourceCandidate::new(json!({ "url": url })).with_confidence(confidence)
}

fn descriptor() -> TrackDescriptor {
    TrackDescriptor::new("Daft Punk", "Around the World")
        .with_album("Homework")
        .with_duration_secs(428)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_fanout_collects_only_healthy_resolvers() {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
    let service = ResolverService::new(config_over(sqlite_store().await, clock), Arc::new(AcceptAll)).await;

    let healthy = Arc::new(CountingResolver::returning(candidate("h", 0.9)));
    let reports_out_of_range = Arc::new(CountingResolver::returning(candidate("r", 3.5)));
    let failing = Arc::new(CountingResolver::failing());
    let empty = Arc::new(CountingResolver::empty());

    let registry = service.registry();
    registry
        .install(resolve_manifest("healthy"), Arc::clone(&healthy) as Arc<dyn Resolver>)
        .await
        .unwrap();
    registry
        .install(
            resolve_manifest("loud"),
            Arc::clone(&reports_out_of_range) as Arc<dyn Resolver>,
        )
        .await
        .unwrap();
    registry
        .install(resolve_manifest("failing"), Arc::clone(&failing) as Arc<dyn Resolver>)
        .await
        .unwrap();
    registry
        .install(resolve_manifest("empty"), Arc::clone(&empty) as Arc<dyn Resolver>)
        .await
        .unwrap();

    let sources = service
        .resolver()
        .resolve_track(&descriptor(), false)
        .await
        .unwrap();

    // Two of four produced candidates; every confidence is clamped to [0, 1]
    assert_eq!(sources.len(), 2);
    assert!(sources.contains_key("healthy"));
    assert!(sources.contains_key("loud"));
    assert!(sources
        .values()
        .all(|s| (0.0..=1.0).contains(&s.confidence)));
    assert_eq!(failing.calls(), 1);
    assert_eq!(empty.calls(), 1);
}

#[tokio::test]
async fn test_disable_purges_cache_and_queue_but_keeps_others() {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
    let service = ResolverService::new(config_over(sqlite_store().await, clock), Arc::new(AcceptAll)).await;

    let registry = service.registry();
    for id in ["keep", "drop"] {
        registry
            .install(
                resolve_manifest(id),
                Arc::new(CountingResolver::returning(candidate(id, 0.8))),
            )
            .await
            .unwrap();
    }

    // One track through the plain resolver, one through the queue
    let resolved_descriptor = descriptor();
    service
        .resolver()
        .resolve_track(&resolved_descriptor, false)
        .await
        .unwrap();
    let queued = Track::new("Burial", "Archangel", Some("Untrue".to_string()));
    service.arbiter().enqueue_and_resolve(vec![queued]).await;

    registry.set_active("drop", false).await.unwrap();

    // Cache entry for the resolved track lost exactly the disabled resolver
    let entry = service
        .cache()
        .get(
            CacheNamespace::TrackSources,
            &resolved_descriptor.sources_cache_key(),
        )
        .await
        .unwrap();
    let map: SourceMap = serde_json::from_value(entry.payload).unwrap();
    assert!(map.contains_key("keep"));
    assert!(!map.contains_key("drop"));

    // Queue snapshot lost it as well
    let tracks = service.queue().tracks().await;
    assert_eq!(tracks.len(), 1);
    assert!(tracks[0].sources.contains_key("keep"));
    assert!(!tracks[0].sources.contains_key("drop"));

    // Re-enabling does not resurrect purged sources
    registry.set_active("drop", true).await.unwrap();
    let tracks = service.queue().tracks().await;
    assert!(!tracks[0].sources.contains_key("drop"));
}

#[tokio::test]
async fn test_cache_and_settings_survive_restart() {
    let store = sqlite_store().await;
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));

    {
        let service = ResolverService::new(
            config_over(Arc::clone(&store), Arc::clone(&clock)),
            Arc::new(AcceptAll),
        )
        .await;
        let registry = service.registry();
        registry
            .install(
                resolve_manifest("a"),
                Arc::new(CountingResolver::returning(candidate("a", 0.9))),
            )
            .await
            .unwrap();
        registry
            .install(resolve_manifest("b"), Arc::new(CountingResolver::empty()))
            .await
            .unwrap();
        registry.set_active("b", false).await.unwrap();

        service
            .resolver()
            .resolve_track(&descriptor(), false)
            .await
            .unwrap();
        service.shutdown().await.unwrap();
    }

    let service = ResolverService::new(
        config_over(Arc::clone(&store), clock),
        Arc::new(AcceptAll),
    )
    .await;
    let second_run = Arc::new(CountingResolver::returning(candidate("a", 0.9)));
    let registry = service.registry();
    registry
        .install(resolve_manifest("a"), Arc::clone(&second_run) as Arc<dyn Resolver>)
        .await
        .unwrap();
    registry
        .install(resolve_manifest("b"), Arc::new(CountingResolver::empty()))
        .await
        .unwrap();
    service.restore_settings().await;

    assert!(registry.is_active("a").await);
    assert!(!registry.is_active("b").await);
    assert_eq!(registry.order().await, vec!["a", "b"]);

    // Served from the reloaded cache without touching the resolver
    let sources = service
        .resolver()
        .resolve_track(&descriptor(), false)
        .await
        .unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(second_run.calls(), 0);
}

#[tokio::test]
async fn test_expired_cache_discarded_on_restart() {
    let store = sqlite_store().await;
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));

    {
        let service = ResolverService::new(
            config_over(Arc::clone(&store), Arc::clone(&clock)),
            Arc::new(AcceptAll),
        )
        .await;
        service
            .registry()
            .install(
                resolve_manifest("a"),
                Arc::new(CountingResolver::returning(candidate("a", 0.9))),
            )
            .await
            .unwrap();
        service
            .resolver()
            .resolve_track(&descriptor(), false)
            .await
            .unwrap();
        service.shutdown().await.unwrap();
    }

    // Track sources live for seven days; jump past that
    clock.advance_secs(8 * 86_400);

    let service = ResolverService::new(config_over(store, clock), Arc::new(AcceptAll)).await;
    let fresh = Arc::new(CountingResolver::returning(candidate("a", 0.9)));
    service
        .registry()
        .install(resolve_manifest("a"), Arc::clone(&fresh) as Arc<dyn Resolver>)
        .await
        .unwrap();
    service.restore_settings().await;

    service
        .resolver()
        .resolve_track(&descriptor(), false)
        .await
        .unwrap();
    assert_eq!(fresh.calls(), 1);
}

#[tokio::test]
async fn test_default_trait_methods_are_no_ops() {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
    let service = ResolverService::new(config_over(sqlite_store().await, clock), Arc::new(AcceptAll)).await;

    // Declares resolve and search but implements neither
    let manifest = ResolverManifest::new("bare", "Bare").with_capabilities(Capabilities {
        resolve: true,
        search: true,
        ..Capabilities::default()
    });
    service
        .registry()
        .install(manifest, Arc::new(BareResolver))
        .await
        .unwrap();

    let sources = service
        .resolver()
        .resolve_track(&descriptor(), false)
        .await
        .unwrap();
    assert!(sources.is_empty());

    let results = service.registry().search_all("around the world").await;
    assert!(results.is_empty());
}
