//! Error types for the resolution core.
//!
//! Failures inside a single resolver call are always recovered locally and
//! converted into "this resolver contributed nothing"; only the exhaustion of
//! every resolver for a track surfaces to the caller. Storage failures are
//! downgraded to cache misses and never abort a resolution.

use thiserror::Error;

/// Errors produced by the resolution core.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// A resolver manifest failed validation. Registry state is unchanged.
    #[error("Invalid resolver manifest: {0}")]
    InvalidManifest(String),

    /// A single resolver's query failed. Always recovered locally; surfaces
    /// in logs, never out of a resolution call.
    #[error("Resolver '{resolver_id}' query failed: {message}")]
    QueryFailed {
        resolver_id: String,
        message: String,
    },

    /// No active resolver produced a usable source, even after on-demand
    /// resolution. Non-fatal to the session; the caller decides what to show.
    #[error("No playable source found for track '{track_id}'")]
    NoSourceFound { track_id: String },

    /// Playback failed after the retry policy was exhausted. `recoverable`
    /// is true when a forced re-resolution produced fresh sources, so an
    /// immediate user retry may succeed.
    #[error("Playback failed for track '{track_id}' via resolver '{resolver_id}': {message}")]
    PlaybackFailed {
        track_id: String,
        resolver_id: String,
        message: String,
        recoverable: bool,
    },

    /// The backing key-value store failed. Callers treat this as a cache
    /// miss or skipped write, never as a fatal resolution error.
    #[error("Cache persistence failed: {0}")]
    CachePersistence(#[from] bridge_traits::BridgeError),

    /// An operation referenced a resolver id that is not installed.
    #[error("Unknown resolver: {0}")]
    UnknownResolver(String),

    /// Payload serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;
