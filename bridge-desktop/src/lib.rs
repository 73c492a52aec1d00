//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the storage
//! bridge:
//! - `KeyValueStore` using a SQLite-backed table ([`SqliteKeyValueStore`])
//! - `KeyValueStore` held entirely in memory ([`MemoryKeyValueStore`]),
//!   intended for tests and ephemeral sessions
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::SqliteKeyValueStore;
//! use bridge_traits::KeyValueStore;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = SqliteKeyValueStore::new(PathBuf::from("data/sonance.db"))
//!         .await
//!         .unwrap();
//!     store.set("resolver_order", "[\"local\"]").await.unwrap();
//! }
//! ```

mod kv;
mod memory;

pub use kv::SqliteKeyValueStore;
pub use memory::MemoryKeyValueStore;
