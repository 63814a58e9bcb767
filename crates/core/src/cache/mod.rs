//! SQLite-backed cache storage for versioned response stores.
//!
//! This module provides the persistent named stores the worker caches
//! responses in, with async access via tokio-rusqlite. It supports:
//!
//! - Named stores, one per cache version, created on demand
//! - Entries keyed by a SHA-256 of request method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheKey, CacheStore};
