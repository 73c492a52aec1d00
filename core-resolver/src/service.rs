//! # Resolver Service
//!
//! Wires the resolution stack together from a [`CoreConfig`]: event bus,
//! cache (loaded from persistence, flushed periodically), registry with its
//! purge targets, track resolver, queue arbiter and playback selector.
//!
//! ## Usage
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .key_value_store(store)
//!     .build()?;
//! let service = ResolverService::new(config, confirmer).await;
//!
//! service.registry().install(manifest, implementation).await?;
//! service.restore_settings().await;
//!
//! let sources = service.resolver().resolve_track(&descriptor, false).await?;
//! service.shutdown().await?;
//! ```

use std::sync::Arc;
use tracing::{info, warn};

use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};

use crate::arbiter::{QueuePriorityArbiter, QueueSignal, QueueSnapshot};
use crate::cache::CacheStore;
use crate::error::Result;
use crate::playback::{PlaybackConfirmer, PlaybackSourceSelector};
use crate::registry::{ResolverRegistry, SourcePurge};
use crate::resolution::TrackResolver;

/// Owns every component of the resolution stack and their shared wiring.
///
/// Dropping the service does not flush state; call [`shutdown`] first.
///
/// [`shutdown`]: ResolverService::shutdown
pub struct ResolverService {
    events: Arc<EventBus>,
    registry: Arc<ResolverRegistry>,
    cache: Arc<CacheStore>,
    resolver: Arc<TrackResolver>,
    snapshot: Arc<QueueSnapshot>,
    arbiter: Arc<QueuePriorityArbiter>,
    selector: Arc<PlaybackSourceSelector>,
}

impl ResolverService {
    /// Builds the stack, loads the persisted cache and starts the periodic
    /// cache flush.
    pub async fn new(config: CoreConfig, confirmer: Arc<dyn PlaybackConfirmer>) -> Self {
        let events = Arc::new(EventBus::new(config.event_buffer_size));

        let cache = Arc::new(CacheStore::new(
            Arc::clone(&config.key_value_store),
            Arc::clone(&config.clock),
            config.tuning.cache_flush_interval_secs,
        ));
        let restored = cache.load_from_persistence().await;
        info!(restored, "Cache loaded from persistence");
        cache.start_periodic_flush();

        let registry = Arc::new(ResolverRegistry::new(
            Arc::clone(&config.key_value_store),
            Arc::clone(&events),
            config.tuning.settings_write_debounce_ms,
        ));
        registry
            .add_purge_target(Arc::clone(&cache) as Arc<dyn SourcePurge>)
            .await;

        let resolver = Arc::new(TrackResolver::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&events),
            Arc::clone(&config.clock),
            config.tuning.clone(),
            QueueSignal::new(),
        ));

        let snapshot = Arc::new(QueueSnapshot::new());
        registry
            .add_purge_target(Arc::clone(&snapshot) as Arc<dyn SourcePurge>)
            .await;
        let arbiter = Arc::new(QueuePriorityArbiter::new(
            Arc::clone(&resolver),
            Arc::clone(&snapshot),
            Arc::clone(&events),
        ));

        let selector = Arc::new(PlaybackSourceSelector::new(
            Arc::clone(&registry),
            Arc::clone(&resolver),
            confirmer,
            Arc::clone(&events),
            config.tuning,
        ));

        info!("Resolver service started");
        Self {
            events,
            registry,
            cache,
            resolver,
            snapshot,
            arbiter,
            selector,
        }
    }

    /// Restores the persisted active set and priority order. Call after
    /// the host has installed its resolvers; stored ids that are no longer
    /// installed are dropped. A storage failure keeps install-time
    /// defaults.
    pub async fn restore_settings(&self) {
        if let Err(e) = self.registry.restore_settings().await {
            warn!(error = %e, "Restoring resolver settings failed, keeping defaults");
        }
    }

    /// Subscribes to the service's event stream.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn registry(&self) -> Arc<ResolverRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn cache(&self) -> Arc<CacheStore> {
        Arc::clone(&self.cache)
    }

    pub fn resolver(&self) -> Arc<TrackResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn queue(&self) -> Arc<QueueSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn arbiter(&self) -> Arc<QueuePriorityArbiter> {
        Arc::clone(&self.arbiter)
    }

    pub fn selector(&self) -> Arc<PlaybackSourceSelector> {
        Arc::clone(&self.selector)
    }

    /// Flushes registry settings and the cache, stopping the periodic
    /// flush task. Both flushes are attempted even if the first fails.
    pub async fn shutdown(&self) -> Result<()> {
        let settings_result = self.registry.flush_settings().await;
        let cache_result = self.cache.shutdown().await;
        info!("Resolver service shut down");
        settings_result?;
        cache_result?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
