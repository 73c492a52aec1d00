//! # Core Configuration
//!
//! Dependency injection configuration for the resolution core. The host
//! application constructs a [`CoreConfig`] at startup and hands it to the
//! resolver service; every platform capability the core needs arrives
//! through this struct as a trait object.
//!
//! ## Overview
//!
//! The configuration follows a builder pattern with fail-fast validation:
//! capabilities that the core cannot function without are checked at build
//! time, not at first use. A missing store fails in `build()` with a clear
//! message instead of panicking deep inside a resolution call.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use core_runtime::config::CoreConfig;
//! use bridge_desktop::SqliteKeyValueStore;
//!
//! let store = SqliteKeyValueStore::new(data_dir.join("sonance.db")).await?;
//!
//! let config = CoreConfig::builder()
//!     .key_value_store(Arc::new(store))
//!     .event_buffer_size(200)
//!     .build()?;
//! ```
//!
//! ## Required Capabilities
//!
//! | Capability | Trait | Desktop implementation |
//! |------------|-------|------------------------|
//! | Persistence | `bridge_traits::KeyValueStore` | `bridge_desktop::SqliteKeyValueStore` |
//!
//! ## Optional Capabilities
//!
//! | Capability | Trait | Default |
//! |------------|-------|---------|
//! | Time source | `bridge_traits::Clock` | `bridge_traits::SystemClock` |

use std::fmt;
use std::sync::Arc;

use bridge_traits::{Clock, KeyValueStore, SystemClock};

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Resolution Tuning
// ============================================================================

/// Timing knobs for resolution, caching and playback hand-off.
///
/// Defaults match the behavior the core was designed around; hosts override
/// individual values for tests or constrained environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTuning {
    /// Tolerance when comparing candidate duration to the requested
    /// duration, in seconds.
    pub duration_tolerance_secs: u64,
    /// Cached results older than this are revalidated in the background
    /// after being served, in seconds.
    pub revalidation_threshold_secs: u64,
    /// Pause between tracks during batch resolution, in milliseconds.
    pub batch_track_delay_ms: u64,
    /// How long to wait for the caller to confirm an external (non-stream)
    /// source before skipping it, in seconds.
    pub external_confirm_timeout_secs: u64,
    /// Pause before the single playback retry, in milliseconds.
    pub play_retry_delay_ms: u64,
    /// Interval between periodic cache flushes to the store, in seconds.
    pub cache_flush_interval_secs: u64,
    /// Debounce window for persisting registry settings, in milliseconds.
    pub settings_write_debounce_ms: u64,
}

impl Default for ResolutionTuning {
    fn default() -> Self {
        Self {
            duration_tolerance_secs: 10,
            revalidation_threshold_secs: 86_400,
            batch_track_delay_ms: 175,
            external_confirm_timeout_secs: 15,
            play_retry_delay_ms: 800,
            cache_flush_interval_secs: 300,
            settings_write_debounce_ms: 500,
        }
    }
}

impl ResolutionTuning {
    /// Sets the duration matching tolerance in seconds.
    pub fn with_duration_tolerance_secs(mut self, secs: u64) -> Self {
        self.duration_tolerance_secs = secs;
        self
    }

    /// Sets the cache age beyond which served results are revalidated.
    pub fn with_revalidation_threshold_secs(mut self, secs: u64) -> Self {
        self.revalidation_threshold_secs = secs;
        self
    }

    /// Sets the pause between tracks in a batch resolution.
    pub fn with_batch_track_delay_ms(mut self, ms: u64) -> Self {
        self.batch_track_delay_ms = ms;
        self
    }

    /// Sets the external playback confirmation timeout.
    pub fn with_external_confirm_timeout_secs(mut self, secs: u64) -> Self {
        self.external_confirm_timeout_secs = secs;
        self
    }

    /// Sets the pause before the playback retry.
    pub fn with_play_retry_delay_ms(mut self, ms: u64) -> Self {
        self.play_retry_delay_ms = ms;
        self
    }

    /// Sets the periodic cache flush interval.
    pub fn with_cache_flush_interval_secs(mut self, secs: u64) -> Self {
        self.cache_flush_interval_secs = secs;
        self
    }

    /// Sets the settings persistence debounce window.
    pub fn with_settings_write_debounce_ms(mut self, ms: u64) -> Self {
        self.settings_write_debounce_ms = ms;
        self
    }

    /// Validates that the tuning values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.revalidation_threshold_secs == 0 {
            return Err(Error::Config(
                "revalidation_threshold_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache_flush_interval_secs == 0 {
            return Err(Error::Config(
                "cache_flush_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.external_confirm_timeout_secs == 0 {
            return Err(Error::Config(
                "external_confirm_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Core Configuration
// ============================================================================

/// Assembled configuration handed to the resolver service.
///
/// Construct through [`CoreConfig::builder`]. All trait objects are wrapped
/// in `Arc` so the service can share them across tasks.
#[derive(Clone)]
pub struct CoreConfig {
    /// Persistent key-value storage for settings and cache snapshots.
    pub key_value_store: Arc<dyn KeyValueStore>,
    /// Time source. Tests inject `ManualClock` here.
    pub clock: Arc<dyn Clock>,
    /// Buffer size for the event bus broadcast channel.
    pub event_buffer_size: usize,
    /// Timing knobs for resolution and caching.
    pub tuning: ResolutionTuning,
}

impl CoreConfig {
    /// Returns a new builder with no capabilities set.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("key_value_store", &"Arc<dyn KeyValueStore>")
            .field("clock", &"Arc<dyn Clock>")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("tuning", &self.tuning)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CoreConfig`].
///
/// Required capabilities are validated in [`build`](Self::build); a missing
/// one produces [`Error::CapabilityMissing`] naming the bridge implementation
/// to supply.
#[derive(Default)]
pub struct CoreConfigBuilder {
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    tuning: Option<ResolutionTuning>,
}

impl CoreConfigBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the persistent key-value store (required).
    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the time source (optional, defaults to `SystemClock`).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the event bus buffer size (optional, defaults to 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the resolution tuning (optional, defaults to
    /// `ResolutionTuning::default()`).
    pub fn tuning(mut self, tuning: ResolutionTuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Validates the configuration and produces a [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when a required capability was
    /// not provided, and [`Error::Config`] when the tuning values are
    /// invalid.
    pub fn build(self) -> Result<CoreConfig> {
        let key_value_store =
            self.key_value_store
                .ok_or_else(|| Error::CapabilityMissing {
                    capability: "key_value_store".to_string(),
                    message: "a KeyValueStore implementation is required; on desktop use \
                              bridge_desktop::SqliteKeyValueStore (or MemoryKeyValueStore \
                              in tests)"
                        .to_string(),
                })?;

        let tuning = self.tuning.unwrap_or_default();
        tuning.validate()?;

        Ok(CoreConfig {
            key_value_store,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            tuning,
        })
    }
}

impl fmt::Debug for CoreConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfigBuilder")
            .field("has_key_value_store", &self.key_value_store.is_some())
            .field("has_clock", &self.clock.is_some())
            .field("event_buffer_size", &self.event_buffer_size)
            .field("tuning", &self.tuning)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
