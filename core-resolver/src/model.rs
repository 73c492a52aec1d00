//! # Core Data Model
//!
//! Track and source types shared by the registry, cache, resolution and
//! playback modules.
//!
//! ## Identity
//!
//! A track's `id` is derived deterministically from artist, title and album
//! (case-folded, non-alphanumerics stripped) so the same logical track maps
//! to the same key regardless of which view produced it. The track-sources
//! cache uses a separate, human-readable key built from
//! `artist|title|position-or-album`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Derives the deterministic track id from its identifying metadata.
///
/// Case-folds and strips every non-alphanumeric character, so
/// "Daft Punk" + "Around the World" and "daft punk" + "around-the-world"
/// produce the same id.
pub fn derive_track_id(artist: &str, title: &str, album: Option<&str>) -> String {
    let mut id = String::new();
    for part in [artist, title, album.unwrap_or("")] {
        id.extend(
            part.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase()),
        );
    }
    id
}

// ============================================================================
// Source Types
// ============================================================================

/// A resolver's raw answer for one track, before scoring.
///
/// `payload` is opaque to the core; it is handed back to the same resolver's
/// `play` unmodified. `confidence` is only set by resolvers with ground-truth
/// certainty (exact catalog id match) and is trusted verbatim when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceCandidate {
    /// Title as known by the resolver, used for match scoring.
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds as known by the resolver.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Resolver-supplied confidence. Skips heuristic scoring when present.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Resolver-native identifier (catalog id, file path, stream key).
    #[serde(default)]
    pub native_id: Option<String>,
    /// Opaque playback payload.
    #[serde(default)]
    pub payload: Value,
}

impl SourceCandidate {
    /// Creates a candidate carrying only an opaque payload.
    pub fn new(payload: Value) -> Self {
        Self {
            title: None,
            duration_secs: None,
            confidence: None,
            native_id: None,
            payload,
        }
    }

    /// Sets the candidate title used for scoring.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the candidate duration used for scoring.
    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets a resolver-supplied confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the resolver-native identifier.
    pub fn with_native_id(mut self, native_id: impl Into<String>) -> Self {
        self.native_id = Some(native_id.into());
        self
    }
}

/// A scored, playable source attributed to one resolver.
///
/// Never mutated in place; re-resolution replaces the whole record for that
/// resolver id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    /// The contributing resolver.
    pub resolver_id: String,
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
    /// Resolver-native identifier if the resolver reported one.
    #[serde(default)]
    pub native_id: Option<String>,
    /// Opaque playback payload, handed back to the resolver's `play`.
    #[serde(default)]
    pub payload: Value,
}

/// Sources map keyed by resolver id. Insertion order is irrelevant;
/// consumers sort by priority at read time.
pub type SourceMap = HashMap<String, SourceRecord>;

// ============================================================================
// Track Types
// ============================================================================

/// A logical track with whatever sources have been resolved for it so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Deterministic id derived from artist, title and album.
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Duration in seconds when known.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Resolved sources keyed by resolver id.
    #[serde(default)]
    pub sources: SourceMap,
}

impl Track {
    /// Creates a track with a derived id and no sources.
    pub fn new(artist: impl Into<String>, title: impl Into<String>, album: Option<String>) -> Self {
        let artist = artist.into();
        let title = title.into();
        let id = derive_track_id(&artist, &title, album.as_deref());
        Self {
            id,
            title,
            artist,
            album,
            duration_secs: None,
            sources: SourceMap::new(),
        }
    }

    /// Sets the duration in seconds.
    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets an already-resolved sources map.
    pub fn with_sources(mut self, sources: SourceMap) -> Self {
        self.sources = sources;
        self
    }

    /// Returns the descriptor used to resolve this track.
    pub fn descriptor(&self) -> TrackDescriptor {
        TrackDescriptor {
            artist: self.artist.clone(),
            title: self.title.clone(),
            album: self.album.clone(),
            duration_secs: self.duration_secs,
            position: None,
        }
    }
}

/// The minimal identifying metadata needed to resolve a track.
///
/// `position` is the 1-based position within an album or playlist view; it
/// takes the album's place in the cache key when present so two album views
/// of the same release share entries per slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackDescriptor {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub position: Option<u32>,
}

impl TrackDescriptor {
    /// Creates a descriptor with only the required fields.
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: None,
            duration_secs: None,
            position: None,
        }
    }

    /// Sets the album name.
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Sets the duration in seconds.
    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Sets the position within an album or playlist.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns the deterministic track id for this descriptor.
    pub fn track_id(&self) -> String {
        derive_track_id(&self.artist, &self.title, self.album.as_deref())
    }

    /// Returns the track-sources cache key: `artist|title|position-or-album`,
    /// lower-cased.
    pub fn sources_cache_key(&self) -> String {
        let third = match self.position {
            Some(position) => position.to_string(),
            None => self.album.clone().unwrap_or_default(),
        };
        format!("{}|{}|{}", self.artist, self.title, third).to_lowercase()
    }

    /// Builds a track (empty sources) from this descriptor.
    pub fn to_track(&self) -> Track {
        let mut track = Track::new(self.artist.clone(), self.title.clone(), self.album.clone());
        track.duration_secs = self.duration_secs;
        track
    }
}
