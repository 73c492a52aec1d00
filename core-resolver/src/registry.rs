//! # Resolver Registry
//!
//! Owns the set of installed resolver plugins and the user's configuration
//! of them: which are active and in what priority order. Every other module
//! queries the registry for the active/ordered view instead of holding its
//! own copy.
//!
//! ## Overview
//!
//! - **Install / hot-swap**: installing a manifest with an id that already
//!   exists replaces the implementation in place. In-flight resolutions keep
//!   their handle to the old implementation and complete against it.
//! - **Purge on removal**: disabling or uninstalling a resolver purges its
//!   sources from every registered [`SourcePurge`] target (cache, queue
//!   snapshot) before the call returns. A disabled resolver must never be
//!   offered for playback.
//! - **Persistence**: the active set and order are written to the host
//!   key-value store, debounced so a burst of toggles costs one write.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐   install/uninstall   ┌────────────────┐
//! │  Host / UI layer  ├──────────────────────>│                │
//! └───────────────────┘                       │ ResolverRegistry│
//! ┌───────────────────┐   active/ordered view │  - resolvers   │
//! │   TrackResolver   │<──────────────────────┤  - active set  │
//! └───────────────────┘                       │  - order       │
//! ┌───────────────────┐   purge_resolver      └───────┬────────┘
//! │ CacheStore /      │<──────────────────────────────┘
//! │ QueueSnapshot     │        (on disable/uninstall)
//! └───────────────────┘
//! ```

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use bridge_traits::KeyValueStore;
use core_runtime::events::{CoreEvent, EventBus, RegistryEvent};

use crate::cache::SettingsFingerprint;
use crate::error::{ResolverError, Result};
use crate::manifest::ResolverManifest;
use crate::model::{SourceCandidate, SourceRecord, Track};

/// Settings key holding the JSON array of active resolver ids.
pub const ACTIVE_RESOLVERS_KEY: &str = "active_resolvers";
/// Settings key holding the JSON array defining priority order.
pub const RESOLVER_ORDER_KEY: &str = "resolver_order";

// ============================================================================
// Resolver Contract
// ============================================================================

/// A resolver plugin implementation.
///
/// Every method has a no-op default so a resolver only implements what its
/// manifest declares. The core never calls an operation whose capability
/// flag is false, so the defaults exist for type completeness, not as a
/// dispatch mechanism.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Called once on install with the manifest's `settings` payload.
    async fn init(&self, _settings: &Value) -> Result<()> {
        Ok(())
    }

    /// Called on uninstall or before being replaced by a hot-swap.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Looks up a source for a known track. `None` means "no match", which
    /// is not an error.
    async fn resolve(
        &self,
        _artist: &str,
        _title: &str,
        _album: Option<&str>,
    ) -> Result<Option<SourceCandidate>> {
        Ok(None)
    }

    /// Free-text search over the resolver's catalog. Returned tracks carry
    /// the resolver's own source records, keyed by its id, so merged search
    /// results keep their origin.
    async fn search(&self, _query: &str) -> Result<Vec<Track>> {
        Ok(Vec::new())
    }

    /// Starts playback of one of this resolver's sources. `false` means the
    /// attempt failed in a way the resolver already reported to its backend.
    async fn play(&self, _source: &SourceRecord) -> Result<bool> {
        Ok(false)
    }
}

/// A component holding live source maps that must drop a resolver's entries
/// when it is disabled or uninstalled.
#[async_trait]
pub trait SourcePurge: Send + Sync {
    async fn purge_resolver(&self, resolver_id: &str);
}

/// An installed resolver: its manifest plus the implementation handle.
#[derive(Clone)]
pub struct RegisteredResolver {
    pub manifest: ResolverManifest,
    pub implementation: Arc<dyn Resolver>,
}

impl fmt::Debug for RegisteredResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredResolver")
            .field("manifest", &self.manifest)
            .field("implementation", &"Arc<dyn Resolver>")
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

struct RegistryState {
    resolvers: HashMap<String, RegisteredResolver>,
    active: BTreeSet<String>,
    order: Vec<String>,
}

/// Registry of installed resolvers and their user configuration.
pub struct ResolverRegistry {
    state: RwLock<RegistryState>,
    store: Arc<dyn KeyValueStore>,
    events: Arc<EventBus>,
    purge_targets: RwLock<Vec<Arc<dyn SourcePurge>>>,
    persist_debounce: Duration,
    persist_task: StdMutex<Option<JoinHandle<()>>>,
}

impl ResolverRegistry {
    /// Creates an empty registry persisting settings to `store`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        events: Arc<EventBus>,
        settings_write_debounce_ms: u64,
    ) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                resolvers: HashMap::new(),
                active: BTreeSet::new(),
                order: Vec::new(),
            }),
            store,
            events,
            purge_targets: RwLock::new(Vec::new()),
            persist_debounce: Duration::from_millis(settings_write_debounce_ms),
            persist_task: StdMutex::new(None),
        }
    }

    /// Registers a component to be purged when a resolver is disabled or
    /// uninstalled.
    pub async fn add_purge_target(&self, target: Arc<dyn SourcePurge>) {
        self.purge_targets.write().await.push(target);
    }

    // ------------------------------------------------------------------
    // Installation
    // ------------------------------------------------------------------

    /// Installs a resolver, or hot-swaps the implementation if the id is
    /// already installed.
    ///
    /// New installs are enabled and appended to the end of the priority
    /// order. Updates keep the existing active state and order position.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::InvalidManifest`] for a manifest missing its
    /// id or name, and propagates `init` failures. Registry state is
    /// unchanged in both cases.
    #[instrument(skip(self, implementation), fields(resolver_id = %manifest.id))]
    pub async fn install(
        &self,
        manifest: ResolverManifest,
        implementation: Arc<dyn Resolver>,
    ) -> Result<()> {
        manifest.validate()?;

        // Initialize before touching state so a failing resolver leaves the
        // registry exactly as it was.
        implementation.init(&manifest.settings).await?;

        let resolver_id = manifest.id.clone();
        let name = manifest.name.clone();
        let version = manifest.version.clone();

        let replaced = {
            let mut state = self.state.write().await;
            let replaced = state.resolvers.insert(
                resolver_id.clone(),
                RegisteredResolver {
                    manifest,
                    implementation,
                },
            );
            if replaced.is_none() {
                state.active.insert(resolver_id.clone());
                state.order.push(resolver_id.clone());
            }
            replaced
        };

        let updated = replaced.is_some();
        if let Some(old) = replaced {
            if let Err(e) = old.implementation.cleanup().await {
                warn!(error = %e, "Replaced resolver cleanup failed");
            }
        }

        info!(updated, "Resolver installed");
        self.schedule_persist().await;
        self.events
            .emit(CoreEvent::Registry(RegistryEvent::ResolverInstalled {
                resolver_id,
                name,
                version,
                updated,
            }))
            .ok();
        Ok(())
    }

    /// Uninstalls a resolver and purges its sources everywhere.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::UnknownResolver`] if the id is not
    /// installed; state is unchanged.
    #[instrument(skip(self))]
    pub async fn uninstall(&self, resolver_id: &str) -> Result<()> {
        let removed = {
            let mut state = self.state.write().await;
            let Some(removed) = state.resolvers.remove(resolver_id) else {
                return Err(ResolverError::UnknownResolver(resolver_id.to_string()));
            };
            state.active.remove(resolver_id);
            state.order.retain(|id| id != resolver_id);
            removed
        };

        if let Err(e) = removed.implementation.cleanup().await {
            warn!(error = %e, "Resolver cleanup failed during uninstall");
        }

        self.purge_everywhere(resolver_id).await;
        info!("Resolver uninstalled");
        self.schedule_persist().await;
        self.events
            .emit(CoreEvent::Registry(RegistryEvent::ResolverUninstalled {
                resolver_id: resolver_id.to_string(),
            }))
            .ok();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Enables or disables a resolver. Disabling purges its sources from
    /// every purge target before returning.
    #[instrument(skip(self))]
    pub async fn set_active(&self, resolver_id: &str, active: bool) -> Result<()> {
        let changed = {
            let mut state = self.state.write().await;
            if !state.resolvers.contains_key(resolver_id) {
                return Err(ResolverError::UnknownResolver(resolver_id.to_string()));
            }
            if active {
                state.active.insert(resolver_id.to_string())
            } else {
                state.active.remove(resolver_id)
            }
        };

        if !changed {
            return Ok(());
        }

        if !active {
            self.purge_everywhere(resolver_id).await;
        }

        debug!(active, "Resolver active state changed");
        self.schedule_persist().await;
        self.events
            .emit(CoreEvent::Registry(RegistryEvent::ResolverActiveChanged {
                resolver_id: resolver_id.to_string(),
                active,
            }))
            .ok();
        Ok(())
    }

    /// Replaces the priority order.
    ///
    /// Installed resolvers missing from `new_order` are appended at the
    /// tail in their previous relative order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::UnknownResolver`] if the list names an id
    /// that is not installed; order is unchanged.
    #[instrument(skip(self, new_order))]
    pub async fn reorder(&self, new_order: Vec<String>) -> Result<()> {
        let order = {
            let mut state = self.state.write().await;
            for id in &new_order {
                if !state.resolvers.contains_key(id) {
                    return Err(ResolverError::UnknownResolver(id.clone()));
                }
            }

            let mut order = new_order;
            let tail: Vec<String> = state
                .order
                .iter()
                .filter(|id| !order.contains(*id))
                .cloned()
                .collect();
            order.extend(tail);
            state.order = order.clone();
            order
        };

        debug!(?order, "Resolver order changed");
        self.schedule_persist().await;
        self.events
            .emit(CoreEvent::Registry(RegistryEvent::OrderChanged { order }))
            .ok();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// The installed resolver for an id, if any.
    pub async fn get(&self, resolver_id: &str) -> Option<RegisteredResolver> {
        self.state.read().await.resolvers.get(resolver_id).cloned()
    }

    /// The manifest for an id, if installed.
    pub async fn manifest(&self, resolver_id: &str) -> Option<ResolverManifest> {
        self.state
            .read()
            .await
            .resolvers
            .get(resolver_id)
            .map(|r| r.manifest.clone())
    }

    /// Whether a resolver is installed and active.
    pub async fn is_active(&self, resolver_id: &str) -> bool {
        self.state.read().await.active.contains(resolver_id)
    }

    /// The full priority order, highest priority first.
    pub async fn order(&self) -> Vec<String> {
        self.state.read().await.order.clone()
    }

    /// Active resolver ids in priority order.
    pub async fn active_ordered(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter(|id| state.active.contains(*id))
            .cloned()
            .collect()
    }

    /// Active, resolve-capable resolvers in priority order. This is the set
    /// a track resolution fans out to.
    pub async fn active_resolve_capable(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter(|id| state.active.contains(*id))
            .filter(|id| {
                state
                    .resolvers
                    .get(*id)
                    .map(|r| r.manifest.capabilities.resolve)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Fingerprint of the current active set and order. Cached
    /// track-sources entries are tagged with its digest.
    pub async fn settings_fingerprint(&self) -> SettingsFingerprint {
        let state = self.state.read().await;
        SettingsFingerprint::new(state.active.iter().cloned(), state.order.clone())
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Fans a free-text search out to every active, search-capable
    /// resolver and merges results by track id. Individual resolver
    /// failures are logged and contribute nothing.
    #[instrument(skip(self))]
    pub async fn search_all(&self, query: &str) -> Vec<Track> {
        let targets: Vec<(String, Arc<dyn Resolver>)> = {
            let state = self.state.read().await;
            state
                .order
                .iter()
                .filter(|id| state.active.contains(*id))
                .filter_map(|id| {
                    let resolver = state.resolvers.get(id)?;
                    resolver
                        .manifest
                        .capabilities
                        .search
                        .then(|| (id.clone(), Arc::clone(&resolver.implementation)))
                })
                .collect()
        };

        let searches = targets.into_iter().map(|(id, implementation)| async move {
            let result = implementation.search(query).await;
            (id, result)
        });

        let mut merged: Vec<Track> = Vec::new();
        for (resolver_id, result) in join_all(searches).await {
            let tracks = match result {
                Ok(tracks) => tracks,
                Err(e) => {
                    warn!(resolver_id = %resolver_id, error = %e, "Search failed, skipping resolver");
                    continue;
                }
            };
            for track in tracks {
                match merged.iter_mut().find(|t| t.id == track.id) {
                    Some(existing) => existing.sources.extend(track.sources),
                    None => merged.push(track),
                }
            }
        }

        debug!(results = merged.len(), "Search completed");
        merged
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Restores the active set and order written by a previous session.
    ///
    /// Stored ids that are no longer installed are dropped; installed
    /// resolvers absent from the stored order are appended at the tail.
    /// Corrupt settings are logged and skipped.
    ///
    /// # Errors
    ///
    /// Propagates a storage read failure so the caller can decide whether
    /// to continue with install-time defaults.
    pub async fn restore_settings(&self) -> Result<()> {
        let stored_active = self.store.get(ACTIVE_RESOLVERS_KEY).await?;
        let stored_order = self.store.get(RESOLVER_ORDER_KEY).await?;

        let mut state = self.state.write().await;

        if let Some(raw) = stored_active {
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => {
                    let restored: BTreeSet<String> = ids
                        .into_iter()
                        .filter(|id| state.resolvers.contains_key(id))
                        .collect();
                    state.active = restored;
                }
                Err(e) => warn!(error = %e, "Stored active resolver list corrupt, keeping defaults"),
            }
        }

        if let Some(raw) = stored_order {
            match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(ids) => {
                    let mut order: Vec<String> = ids
                        .into_iter()
                        .filter(|id| state.resolvers.contains_key(id))
                        .collect();
                    let tail: Vec<String> = state
                        .order
                        .iter()
                        .filter(|id| !order.contains(*id))
                        .cloned()
                        .collect();
                    order.extend(tail);
                    state.order = order;
                }
                Err(e) => warn!(error = %e, "Stored resolver order corrupt, keeping defaults"),
            }
        }

        debug!(
            active = state.active.len(),
            ordered = state.order.len(),
            "Resolver settings restored"
        );
        Ok(())
    }

    /// Writes the active set and order immediately, cancelling any pending
    /// debounced write. Used on shutdown.
    pub async fn flush_settings(&self) -> Result<()> {
        self.cancel_pending_persist();
        let (active, order) = self.settings_snapshot().await?;
        self.store.set(ACTIVE_RESOLVERS_KEY, &active).await?;
        self.store.set(RESOLVER_ORDER_KEY, &order).await?;
        Ok(())
    }

    async fn settings_snapshot(&self) -> Result<(String, String)> {
        let state = self.state.read().await;
        let active: Vec<&String> = state.active.iter().collect();
        Ok((
            serde_json::to_string(&active)?,
            serde_json::to_string(&state.order)?,
        ))
    }

    /// Schedules a debounced settings write; a burst of changes collapses
    /// into the final one.
    async fn schedule_persist(&self) {
        let snapshot = match self.settings_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Settings snapshot failed, skipping persist");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let debounce = self.persist_debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let (active, order) = snapshot;
            if let Err(e) = store.set(ACTIVE_RESOLVERS_KEY, &active).await {
                warn!(error = %e, "Persisting active resolvers failed");
            }
            if let Err(e) = store.set(RESOLVER_ORDER_KEY, &order).await {
                warn!(error = %e, "Persisting resolver order failed");
            }
        });

        let mut slot = match self.persist_task.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    fn cancel_pending_persist(&self) {
        let mut slot = match self.persist_task.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }

    async fn purge_everywhere(&self, resolver_id: &str) {
        let targets = self.purge_targets.read().await.clone();
        for target in targets {
            target.purge_resolver(resolver_id).await;
        }
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("persist_debounce", &self.persist_debounce)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
