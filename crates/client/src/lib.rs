//! Network access for the dxquiz cache worker.
//!
//! This crate provides the `Network` seam the worker fetches through, its
//! reqwest-backed implementation, and URL helpers for origin checks and
//! manifest resolution.

pub mod fetch;

pub use fetch::{CacheMode, HttpNetwork, Network, NetworkConfig};
pub use fetch::url::{UrlError, is_same_origin, resolve_manifest};
