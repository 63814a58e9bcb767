//! Core types and shared functionality for the dxquiz cache worker.
//!
//! This crate provides:
//! - Versioned cache storage with SQLite backend
//! - Request/response values
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheKey, CacheStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response, ResponseKind};
