//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the resolution core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that is provided differently per host (desktop, mobile,
//! embedded test harness).
//!
//! ## Traits
//!
//! - [`KeyValueStore`](storage::KeyValueStore) - Persistent key-value storage
//!   backing cache namespaces and resolver settings
//! - [`Clock`](time::Clock) - Time source for TTL checks and deterministic
//!   testing
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! pub fn build(self) -> Result<CoreConfig> {
//!     let store = self.key_value_store.ok_or_else(|| Error::CapabilityMissing {
//!         capability: "KeyValueStore".to_string(),
//!         message: "No key-value store provided. \
//!                   Desktop: use bridge_desktop::SqliteKeyValueStore. \
//!                   Tests: use bridge_desktop::MemoryKeyValueStore."
//!             .to_string(),
//!     })?;
//!     // ...
//! }
//! ```
//!
//! ## Error Handling
//!
//! All trait methods return [`Result`](error::Result) with
//! [`BridgeError`](error::BridgeError). Implementations should map their
//! platform-native failures into the closest variant rather than panicking.

pub mod error;
pub mod storage;
pub mod time;

pub use error::{BridgeError, Result};
pub use storage::KeyValueStore;
pub use time::{Clock, ManualClock, SystemClock};
