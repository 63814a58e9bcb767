//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the cache stores.

pub mod keys;

pub use keys::{CacheKeysParams, keys_impl};
