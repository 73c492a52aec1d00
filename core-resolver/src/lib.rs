//! # Resolver & Source Module
//!
//! Resolves playable sources for track metadata through pluggable resolver
//! backends, with persistent caching and queue-first prioritization.
//!
//! ## Overview
//!
//! This module handles:
//! - Resolver plugin lifecycle (manifests, install, hot-swap, activation)
//! - Cache-first source resolution with background revalidation
//! - Confidence scoring of resolver candidates
//! - TTL'd metadata caches persisted through the host key-value store
//! - Queue-priority arbitration between queue and bulk resolution
//! - Playback source selection, external hand-off and retry policy
//!
//! ## Components
//!
//! - **Registry** (`registry`): Installed resolvers, active set and priority order
//! - **Resolution** (`resolution`): Cache-first track resolution and batch loops
//! - **Cache** (`cache`): Namespaced TTL cache with settings fingerprinting
//! - **Scoring** (`scoring`): Confidence tiers for unscored candidates
//! - **Arbiter** (`arbiter`): Queue snapshot and the queue-priority signal
//! - **Playback** (`playback`): Source ranking, confirmation and play retry
//! - **Service** (`service`): Wires the stack from a `CoreConfig`

pub mod arbiter;
pub mod cache;
pub mod error;
pub mod manifest;
pub mod model;
pub mod playback;
pub mod registry;
pub mod resolution;
pub mod scoring;
pub mod service;

pub use error::{ResolverError, Result};
pub use model::{
    derive_track_id, SourceCandidate, SourceMap, SourceRecord, Track, TrackDescriptor,
};
pub use manifest::{Capabilities, ResolverManifest};
pub use scoring::ConfidenceScorer;
pub use cache::{CacheEntry, CacheNamespace, CacheStore, SettingsFingerprint};
pub use registry::{RegisteredResolver, Resolver, ResolverRegistry, SourcePurge};
pub use resolution::TrackResolver;
pub use arbiter::{QueuePriorityArbiter, QueueSignal, QueueSignalGuard, QueueSnapshot};
pub use playback::{
    PlaybackConfirmer, PlaybackOutcome, PlaybackSourceSelector, SelectionOptions,
};
pub use service::ResolverService;
