//! Key-Value Storage Abstraction
//!
//! Provides a platform-agnostic trait for persistent key-value storage. The
//! resolution core uses it for cache namespace snapshots and resolver
//! settings; it never assumes anything about the backing medium.

use async_trait::async_trait;

use crate::error::Result;

/// Persistent key-value storage trait
///
/// Abstracts settings and cache persistence across platforms:
/// - Desktop: SQLite-backed store
/// - Mobile: platform preference APIs
/// - Tests: in-memory map
///
/// Values are opaque strings; callers that need structure serialize to JSON
/// before writing. Implementations must be safe for concurrent use.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember_order(store: &dyn KeyValueStore, order_json: &str) -> Result<()> {
///     store.set("resolver_order", order_json).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value, or `None` if the key has never been written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value, creating or overwriting the key
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
