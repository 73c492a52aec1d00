//! # Resolver Manifest
//!
//! Declarative description of a resolver plugin. The manifest is the only
//! thing the core consults before invoking a resolver operation: a capability
//! that is not declared is never called, regardless of what the
//! implementation could do.
//!
//! ## Usage
//!
//! ```rust
//! use core_resolver::manifest::ResolverManifest;
//!
//! let manifest = ResolverManifest::from_json(
//!     r#"{
//!         "id": "bandcamp",
//!         "name": "Bandcamp",
//!         "version": "1.2.0",
//!         "capabilities": { "resolve": true, "search": true, "stream": true }
//!     }"#,
//! ).unwrap();
//!
//! assert!(manifest.capabilities.resolve);
//! assert!(!manifest.capabilities.browse);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ResolverError, Result};

/// Operations a resolver declares support for.
///
/// Every flag defaults to `false`; a manifest that omits the block declares
/// nothing and the resolver is never invoked for anything.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    /// May be queried for sources of a known track.
    #[serde(default)]
    pub resolve: bool,
    /// May be queried with free-text search.
    #[serde(default)]
    pub search: bool,
    /// Returns audio directly. When false, playback opens an external
    /// context and requires caller confirmation.
    #[serde(default)]
    pub stream: bool,
    /// Exposes a browsable catalog.
    #[serde(default)]
    pub browse: bool,
    /// Can resolve pasted URLs to tracks.
    #[serde(default, alias = "urlLookup")]
    pub url_lookup: bool,
}

/// Manifest describing one resolver plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverManifest {
    /// Unique id across the registry.
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Resolver-specific settings, handed to `init` opaquely.
    #[serde(default)]
    pub settings: Value,
    /// Grants one delayed playback retry before the re-resolve fallback.
    /// Meant for resolvers whose `play` drives a remote device and can fail
    /// transiently.
    #[serde(default)]
    pub retry_on_play_failure: bool,
}

impl ResolverManifest {
    /// Creates a minimal manifest with the given id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: String::new(),
            author: None,
            capabilities: Capabilities::default(),
            settings: Value::Null,
            retry_on_play_failure: false,
        }
    }

    /// Sets the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the declared capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the resolver-specific settings payload.
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Enables the single delayed playback retry.
    pub fn with_retry_on_play_failure(mut self, retry: bool) -> Self {
        self.retry_on_play_failure = retry;
        self
    }

    /// Parses a manifest from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json)
            .map_err(|e| ResolverError::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validates the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::InvalidManifest`] when `id` or `name` is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ResolverError::InvalidManifest(
                "manifest is missing an id".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ResolverError::InvalidManifest(format!(
                "manifest '{}' is missing a name",
                self.id
            )));
        }
        Ok(())
    }
}
