//! # Multi-Namespace TTL Cache
//!
//! In-memory cache with five independently-TTL'd namespaces, persisted as
//! JSON snapshots through the host's key-value store. Reads never touch disk;
//! persistence is a periodic background flush plus a final flush on shutdown.
//!
//! ## Namespaces
//!
//! | Namespace | TTL | Tagging |
//! |-----------|-----|---------|
//! | Album art | 90 days | none |
//! | Artist metadata | 30 days | schema version |
//! | Track sources | 7 days | settings fingerprint |
//! | Artist images | 90 days | none |
//! | Playlist covers | 30 days | none |
//!
//! Track sources churn fastest because provider catalogs and availability
//! change under us, so that namespace gets the short TTL. Artist metadata is
//! schema-versioned: when the cached field shape changes, a version bump
//! discards the whole namespace at load time instead of migrating entries.
//!
//! ## Consistency
//!
//! Entries older than their namespace TTL are never returned by [`CacheStore::get`].
//! Expired and wrong-schema entries are swept once at startup in
//! [`CacheStore::load_from_persistence`]; in-memory expiry is filter-on-read.
//! Storage failures are logged and treated as cache misses, never surfaced to
//! resolution callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bridge_traits::{Clock, KeyValueStore};

use crate::error::Result;
use crate::registry::SourcePurge;

/// Current schema version for artist metadata entries. Bump when the cached
/// field shape changes; old entries are discarded wholesale at load time.
pub const ARTIST_METADATA_SCHEMA_VERSION: u32 = 2;

// ============================================================================
// Namespaces
// ============================================================================

/// The five independently-TTL'd cache partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    AlbumArt,
    ArtistMetadata,
    TrackSources,
    ArtistImages,
    PlaylistCovers,
}

impl CacheNamespace {
    /// All namespaces, in persistence order.
    pub const ALL: [CacheNamespace; 5] = [
        CacheNamespace::AlbumArt,
        CacheNamespace::ArtistMetadata,
        CacheNamespace::TrackSources,
        CacheNamespace::ArtistImages,
        CacheNamespace::PlaylistCovers,
    ];

    /// Time-to-live in seconds.
    pub fn ttl_secs(&self) -> i64 {
        const DAY: i64 = 86_400;
        match self {
            CacheNamespace::AlbumArt => 90 * DAY,
            CacheNamespace::ArtistMetadata => 30 * DAY,
            CacheNamespace::TrackSources => 7 * DAY,
            CacheNamespace::ArtistImages => 90 * DAY,
            CacheNamespace::PlaylistCovers => 30 * DAY,
        }
    }

    /// Key under which the namespace snapshot is persisted.
    pub fn storage_key(&self) -> &'static str {
        match self {
            CacheNamespace::AlbumArt => "cache:album_art",
            CacheNamespace::ArtistMetadata => "cache:artist_metadata",
            CacheNamespace::TrackSources => "cache:track_sources",
            CacheNamespace::ArtistImages => "cache:artist_images",
            CacheNamespace::PlaylistCovers => "cache:playlist_covers",
        }
    }

    /// Whether entries in this namespace are composite objects keyed by
    /// resolver id, and therefore subject to per-resolver purging.
    fn resolver_composite(&self) -> bool {
        matches!(
            self,
            CacheNamespace::TrackSources | CacheNamespace::ArtistMetadata
        )
    }
}

// ============================================================================
// Settings Fingerprint
// ============================================================================

/// Structured composite of the current resolver configuration.
///
/// Cached track-sources entries are tagged with the digest of the
/// fingerprint in effect when they were written; a digest mismatch means the
/// cached result may not reflect the current resolver set and must not be
/// served as a full hit. The active set is held sorted so the digest is
/// insensitive to enable/disable call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFingerprint {
    active: BTreeSet<String>,
    order: Vec<String>,
}

impl SettingsFingerprint {
    /// Builds a fingerprint from the active resolver ids and the full
    /// priority order.
    pub fn new(active: impl IntoIterator<Item = String>, order: Vec<String>) -> Self {
        Self {
            active: active.into_iter().collect(),
            order,
        }
    }

    /// Deterministic digest stored in cache entries.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"active:");
        for id in &self.active {
            hasher.update(id.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(b"|order:");
        for id in &self.order {
            hasher.update(id.as_bytes());
            hasher.update(b"\x1f");
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One cached record with its freshness metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Namespace-specific payload. Composite namespaces store an object
    /// keyed by resolver id.
    pub payload: Value,
    /// Unix timestamp (seconds) of the last full write.
    pub timestamp: i64,
    /// Settings digest in effect at write time. Track sources only.
    #[serde(default)]
    pub settings_hash: Option<String>,
    /// Schema version at write time. Artist metadata only.
    #[serde(default)]
    pub schema_version: Option<u32>,
}

impl CacheEntry {
    /// Age of the entry in seconds at `now`.
    pub fn age_secs(&self, now: i64) -> i64 {
        now - self.timestamp
    }

    fn is_fresh(&self, ttl_secs: i64, now: i64) -> bool {
        self.age_secs(now) <= ttl_secs
    }
}

type NamespaceMap = HashMap<String, CacheEntry>;

// ============================================================================
// Cache Store
// ============================================================================

/// Multi-namespace TTL cache backed by the host key-value store.
///
/// All lookups are served from memory. Mutations mark the store dirty; a
/// periodic task (and [`CacheStore::shutdown`]) persists dirty snapshots.
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    flush_interval: Duration,
    namespaces: RwLock<HashMap<CacheNamespace, NamespaceMap>>,
    dirty: AtomicBool,
    flush_task: StdMutex<Option<JoinHandle<()>>>,
}

impl CacheStore {
    /// Creates an empty cache over the given store and clock.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        flush_interval_secs: u64,
    ) -> Self {
        let mut namespaces = HashMap::new();
        for namespace in CacheNamespace::ALL {
            namespaces.insert(namespace, NamespaceMap::new());
        }
        Self {
            store,
            clock,
            flush_interval: Duration::from_secs(flush_interval_secs),
            namespaces: RwLock::new(namespaces),
            dirty: AtomicBool::new(false),
            flush_task: StdMutex::new(None),
        }
    }

    /// Loads persisted snapshots, discarding entries past their TTL or with
    /// a stale schema version. Returns the number of entries kept.
    ///
    /// Storage or parse failures leave the affected namespace empty; the
    /// cache starts cold for it instead of failing startup.
    pub async fn load_from_persistence(&self) -> usize {
        let now = self.clock.unix_timestamp();
        let mut kept = 0usize;
        let mut namespaces = self.namespaces.write().await;

        for namespace in CacheNamespace::ALL {
            let raw = match self.store.get(namespace.storage_key()).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(namespace = ?namespace, error = %e, "Cache snapshot read failed, starting cold");
                    continue;
                }
            };

            let parsed: NamespaceMap = match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(namespace = ?namespace, error = %e, "Cache snapshot corrupt, starting cold");
                    continue;
                }
            };

            let ttl = namespace.ttl_secs();
            let total = parsed.len();
            let fresh: NamespaceMap = parsed
                .into_iter()
                .filter(|(_, entry)| entry.is_fresh(ttl, now))
                .filter(|(_, entry)| {
                    namespace != CacheNamespace::ArtistMetadata
                        || entry.schema_version == Some(ARTIST_METADATA_SCHEMA_VERSION)
                })
                .collect();

            let discarded = total - fresh.len();
            if discarded > 0 {
                debug!(
                    namespace = ?namespace,
                    discarded,
                    "Discarded stale cache entries at load"
                );
                // The persisted snapshot still holds them; rewrite on next flush.
                self.dirty.store(true, Ordering::SeqCst);
            }

            kept += fresh.len();
            namespaces.insert(namespace, fresh);
        }

        info!(entries = kept, "Cache loaded from persistence");
        kept
    }

    /// Returns the entry if present and within its namespace TTL.
    pub async fn get(&self, namespace: CacheNamespace, key: &str) -> Option<CacheEntry> {
        let now = self.clock.unix_timestamp();
        let namespaces = self.namespaces.read().await;
        namespaces
            .get(&namespace)
            .and_then(|entries| entries.get(key))
            .filter(|entry| entry.is_fresh(namespace.ttl_secs(), now))
            .cloned()
    }

    /// Writes an entry with the current timestamp.
    ///
    /// Artist metadata entries are tagged with the current schema version
    /// automatically.
    pub async fn set(&self, namespace: CacheNamespace, key: impl Into<String>, payload: Value) {
        self.insert(namespace, key.into(), payload, None).await;
    }

    /// Writes a track-sources entry tagged with the settings digest in
    /// effect at write time.
    pub async fn set_with_settings_hash(
        &self,
        namespace: CacheNamespace,
        key: impl Into<String>,
        payload: Value,
        settings_hash: String,
    ) {
        self.insert(namespace, key.into(), payload, Some(settings_hash))
            .await;
    }

    async fn insert(
        &self,
        namespace: CacheNamespace,
        key: String,
        payload: Value,
        settings_hash: Option<String>,
    ) {
        let entry = CacheEntry {
            payload,
            timestamp: self.clock.unix_timestamp(),
            settings_hash,
            schema_version: (namespace == CacheNamespace::ArtistMetadata)
                .then_some(ARTIST_METADATA_SCHEMA_VERSION),
        };

        let mut namespaces = self.namespaces.write().await;
        if let Some(entries) = namespaces.get_mut(&namespace) {
            entries.insert(key, entry);
            self.dirty.store(true, Ordering::SeqCst);
        }
    }

    /// Refreshes an entry's timestamp (and settings digest) without touching
    /// its payload. Used when background revalidation found the cached
    /// result still accurate. Returns false if the entry is gone.
    pub async fn refresh_timestamp(
        &self,
        namespace: CacheNamespace,
        key: &str,
        settings_hash: Option<String>,
    ) -> bool {
        let now = self.clock.unix_timestamp();
        let mut namespaces = self.namespaces.write().await;
        let Some(entry) = namespaces
            .get_mut(&namespace)
            .and_then(|entries| entries.get_mut(key))
        else {
            return false;
        };

        entry.timestamp = now;
        if settings_hash.is_some() {
            entry.settings_hash = settings_hash;
        }
        self.dirty.store(true, Ordering::SeqCst);
        true
    }

    /// Removes an entry. Returns whether it existed.
    pub async fn delete(&self, namespace: CacheNamespace, key: &str) -> bool {
        let mut namespaces = self.namespaces.write().await;
        let removed = namespaces
            .get_mut(&namespace)
            .map(|entries| entries.remove(key).is_some())
            .unwrap_or(false);
        if removed {
            self.dirty.store(true, Ordering::SeqCst);
        }
        removed
    }

    /// Strips one resolver's contribution from every composite entry,
    /// deleting entries that become empty. Returns the number of entries
    /// touched.
    pub async fn purge_resolver_entries(&self, resolver_id: &str) -> usize {
        let mut touched = 0usize;
        let mut namespaces = self.namespaces.write().await;

        for namespace in CacheNamespace::ALL {
            if !namespace.resolver_composite() {
                continue;
            }
            let Some(entries) = namespaces.get_mut(&namespace) else {
                continue;
            };

            let mut emptied = Vec::new();
            for (key, entry) in entries.iter_mut() {
                let Value::Object(map) = &mut entry.payload else {
                    continue;
                };
                if map.remove(resolver_id).is_some() {
                    touched += 1;
                    if map.is_empty() {
                        emptied.push(key.clone());
                    }
                }
            }
            for key in emptied {
                entries.remove(&key);
            }
        }

        if touched > 0 {
            self.dirty.store(true, Ordering::SeqCst);
            debug!(resolver_id, touched, "Purged resolver from cache entries");
        }
        touched
    }

    /// Persists every namespace snapshot if anything changed since the last
    /// flush.
    pub async fn flush(&self) -> Result<()> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Snapshot under the read lock, write to storage without it.
        let mut snapshots = Vec::with_capacity(CacheNamespace::ALL.len());
        {
            let namespaces = self.namespaces.read().await;
            for namespace in CacheNamespace::ALL {
                if let Some(entries) = namespaces.get(&namespace) {
                    match serde_json::to_string(entries) {
                        Ok(serialized) => snapshots.push((namespace, serialized)),
                        Err(e) => {
                            warn!(namespace = ?namespace, error = %e, "Cache snapshot serialization failed");
                        }
                    }
                }
            }
        }

        for (namespace, serialized) in snapshots {
            if let Err(e) = self.store.set(namespace.storage_key(), &serialized).await {
                // Leave the store dirty so the next tick retries.
                self.dirty.store(true, Ordering::SeqCst);
                return Err(e.into());
            }
        }

        debug!("Cache flushed to persistence");
        Ok(())
    }

    /// Starts the periodic flush task. Idempotent; a second call replaces
    /// the previous task.
    pub fn start_periodic_flush(self: &Arc<Self>) {
        let cache = Arc::clone(self);
        let interval = self.flush_interval;
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = cache.flush().await {
                    warn!(error = %e, "Periodic cache flush failed");
                }
            }
        });

        let mut slot = match self.flush_task.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Stops the periodic flush task and performs a final flush.
    pub async fn shutdown(&self) -> Result<()> {
        let task = {
            let mut slot = match self.flush_task.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        if let Some(task) = task {
            task.abort();
        }
        self.flush().await
    }

    /// Number of live entries in a namespace. Expired entries still pending
    /// sweep are counted.
    pub async fn entry_count(&self, namespace: CacheNamespace) -> usize {
        let namespaces = self.namespaces.read().await;
        namespaces
            .get(&namespace)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl SourcePurge for CacheStore {
    async fn purge_resolver(&self, resolver_id: &str) {
        self.purge_resolver_entries(resolver_id).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use bridge_desktop::MemoryKeyValueStore;
    use bridge_traits::{BridgeError, ManualClock};
    use mockall::mock;
    use serde_json::json;

    fn store_and_clock() -> (Arc<MemoryKeyValueStore>, Arc<ManualClock>) {
        (
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(ManualClock::starting_at(1_700_000_000)),
        )
    }

    fn cache_over(
        store: Arc<MemoryKeyValueStore>,
        clock: Arc<ManualClock>,
    ) -> CacheStore {
        CacheStore::new(store, clock, 300)
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(store, clock);

        cache
            .set(CacheNamespace::AlbumArt, "ok computer", json!({"url": "art://1"}))
            .await;

        let entry = cache.get(CacheNamespace::AlbumArt, "ok computer").await;
        assert_eq!(entry.unwrap().payload, json!({"url": "art://1"}));
        assert!(cache.get(CacheNamespace::AlbumArt, "missing").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_not_served() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(store, Arc::clone(&clock));

        cache
            .set(CacheNamespace::TrackSources, "a|b|", json!({"x": 1}))
            .await;

        // Just inside the 7 day TTL
        clock.advance_secs(CacheNamespace::TrackSources.ttl_secs() - 1);
        assert!(cache.get(CacheNamespace::TrackSources, "a|b|").await.is_some());

        clock.advance_secs(2);
        assert!(cache.get(CacheNamespace::TrackSources, "a|b|").await.is_none());
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(store, clock);

        cache
            .set(CacheNamespace::ArtistImages, "burial", json!("img://a"))
            .await;
        assert!(cache.get(CacheNamespace::AlbumArt, "burial").await.is_none());
        assert!(cache.get(CacheNamespace::ArtistImages, "burial").await.is_some());
    }

    #[tokio::test]
    async fn test_flush_and_reload() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(Arc::clone(&store), Arc::clone(&clock));

        cache
            .set_with_settings_hash(
                CacheNamespace::TrackSources,
                "burial|archangel|",
                json!({"bandcamp": {"resolver_id": "bandcamp", "confidence": 0.9, "payload": {}}}),
                "digest-1".to_string(),
            )
            .await;
        cache.flush().await.unwrap();

        let reloaded = cache_over(store, clock);
        let kept = reloaded.load_from_persistence().await;
        assert_eq!(kept, 1);

        let entry = reloaded
            .get(CacheNamespace::TrackSources, "burial|archangel|")
            .await
            .unwrap();
        assert_eq!(entry.settings_hash.as_deref(), Some("digest-1"));
    }

    #[tokio::test]
    async fn test_load_discards_expired() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(Arc::clone(&store), Arc::clone(&clock));

        cache
            .set(CacheNamespace::PlaylistCovers, "summer", json!(["c1", "c2"]))
            .await;
        cache.flush().await.unwrap();

        clock.advance_secs(CacheNamespace::PlaylistCovers.ttl_secs() + 1);

        let reloaded = cache_over(store, clock);
        assert_eq!(reloaded.load_from_persistence().await, 0);
        assert!(reloaded.get(CacheNamespace::PlaylistCovers, "summer").await.is_none());
    }

    #[tokio::test]
    async fn test_load_discards_wrong_schema_version() {
        let (store, clock) = store_and_clock();

        // Entry persisted by an older build with a stale schema version.
        let mut stale = NamespaceMap::new();
        stale.insert(
            "radiohead".to_string(),
            CacheEntry {
                payload: json!({"bio": "old shape"}),
                timestamp: clock.unix_timestamp(),
                settings_hash: None,
                schema_version: Some(ARTIST_METADATA_SCHEMA_VERSION - 1),
            },
        );
        store
            .set(
                CacheNamespace::ArtistMetadata.storage_key(),
                &serde_json::to_string(&stale).unwrap(),
            )
            .await
            .unwrap();

        let cache = cache_over(store, clock);
        assert_eq!(cache.load_from_persistence().await, 0);
    }

    #[tokio::test]
    async fn test_purge_strips_only_target_resolver() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(store, clock);

        cache
            .set(
                CacheNamespace::TrackSources,
                "a|b|",
                json!({
                    "bandcamp": {"resolver_id": "bandcamp", "confidence": 0.9, "payload": {}},
                    "youtube": {"resolver_id": "youtube", "confidence": 0.7, "payload": {}}
                }),
            )
            .await;
        cache
            .set(
                CacheNamespace::ArtistMetadata,
                "burial",
                json!({"youtube": {"bio": "scraped"}}),
            )
            .await;

        let touched = cache.purge_resolver_entries("youtube").await;
        assert_eq!(touched, 2);

        // Sibling entry untouched
        let sources = cache.get(CacheNamespace::TrackSources, "a|b|").await.unwrap();
        let map = sources.payload.as_object().unwrap();
        assert!(map.contains_key("bandcamp"));
        assert!(!map.contains_key("youtube"));

        // Entry that became empty is deleted outright
        assert!(cache.get(CacheNamespace::ArtistMetadata, "burial").await.is_none());
        assert_eq!(cache.entry_count(CacheNamespace::ArtistMetadata).await, 0);
    }

    #[tokio::test]
    async fn test_purge_ignores_non_composite_namespaces() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(store, clock);

        cache
            .set(CacheNamespace::AlbumArt, "untrue", json!({"youtube": "not a source map"}))
            .await;

        // Album art payloads are opaque, not resolver-keyed.
        assert_eq!(cache.purge_resolver_entries("youtube").await, 0);
        assert!(cache.get(CacheNamespace::AlbumArt, "untrue").await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_timestamp_extends_life() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(store, Arc::clone(&clock));

        cache
            .set_with_settings_hash(
                CacheNamespace::TrackSources,
                "k",
                json!({"a": 1}),
                "old".to_string(),
            )
            .await;

        clock.advance_secs(CacheNamespace::TrackSources.ttl_secs() - 10);
        assert!(cache
            .refresh_timestamp(CacheNamespace::TrackSources, "k", Some("new".to_string()))
            .await);

        // Past the original expiry, still fresh after the refresh.
        clock.advance_secs(20);
        let entry = cache.get(CacheNamespace::TrackSources, "k").await.unwrap();
        assert_eq!(entry.settings_hash.as_deref(), Some("new"));
        assert_eq!(entry.payload, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_flush_skips_when_clean() {
        let (store, clock) = store_and_clock();
        let cache = cache_over(Arc::clone(&store), clock);

        cache.flush().await.unwrap();
        assert!(store.is_empty().await);
    }

    mock! {
        pub Store {}

        #[async_trait::async_trait]
        impl KeyValueStore for Store {
            async fn get(&self, key: &str) -> bridge_traits::error::Result<Option<String>>;
            async fn set(&self, key: &str, value: &str) -> bridge_traits::error::Result<()>;
            async fn delete(&self, key: &str) -> bridge_traits::error::Result<()>;
        }
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_cache_dirty() {
        let mut store = MockStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(BridgeError::DatabaseError("disk full".to_string())));
        store.expect_set().returning(|_, _| Ok(()));

        let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
        let cache = CacheStore::new(Arc::new(store), clock, 300);
        cache
            .set(CacheNamespace::AlbumArt, "kid a", json!({"url": "art://2"}))
            .await;

        let first = cache.flush().await;
        assert!(matches!(first, Err(ResolverError::CachePersistence(_))));

        // Entry stays served from memory and the write is retried next flush
        let entry = cache.get(CacheNamespace::AlbumArt, "kid a").await;
        assert!(entry.is_some());
        cache.flush().await.unwrap();
    }

    #[test]
    fn test_fingerprint_insensitive_to_activation_order() {
        let a = SettingsFingerprint::new(
            ["youtube".to_string(), "bandcamp".to_string()],
            vec!["bandcamp".to_string(), "youtube".to_string()],
        );
        let b = SettingsFingerprint::new(
            ["bandcamp".to_string(), "youtube".to_string()],
            vec!["bandcamp".to_string(), "youtube".to_string()],
        );
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_fingerprint_sensitive_to_priority_order() {
        let a = SettingsFingerprint::new(
            ["bandcamp".to_string(), "youtube".to_string()],
            vec!["bandcamp".to_string(), "youtube".to_string()],
        );
        let b = SettingsFingerprint::new(
            ["bandcamp".to_string(), "youtube".to_string()],
            vec!["youtube".to_string(), "bandcamp".to_string()],
        );
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_fingerprint_sensitive_to_active_set() {
        let a = SettingsFingerprint::new(
            ["bandcamp".to_string()],
            vec!["bandcamp".to_string(), "youtube".to_string()],
        );
        let b = SettingsFingerprint::new(
            ["bandcamp".to_string(), "youtube".to_string()],
            vec!["bandcamp".to_string(), "youtube".to_string()],
        );
        assert_ne!(a.digest(), b.digest());
    }
}
