//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Check a cache version name: non-empty, no whitespace.
pub fn validate_cache_version(version: &str) -> Result<(), ConfigError> {
    if version.is_empty() {
        return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not be empty".into() });
    }
    if version.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must not contain whitespace".into() });
    }
    Ok(())
}

/// Check a single manifest entry: non-empty and relative to the scope.
pub fn validate_manifest_entry(entry: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid { field: "core_manifest".into(), reason: format!("{entry:?}: {reason}") };

    if entry.trim().is_empty() {
        return Err(invalid("entry must not be empty"));
    }
    if entry.contains("://") || entry.starts_with("//") {
        return Err(invalid("entry must be a path relative to the scope"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `core_manifest` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `cache_version` is empty or contains whitespace
    /// - `scope` is not an absolute http(s) URL
    /// - a manifest entry is empty or not relative
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_redirects` exceeds 20
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cache_version(&self.cache_version)?;

        self.scope_url()?;

        if self.core_manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "core_manifest".into(),
                hint: "list at least the page document, e.g. DXQUIZ_CORE_MANIFEST='[./, ./index.html]'".into(),
            });
        }
        for entry in &self.core_manifest {
            validate_manifest_entry(entry)?;
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !self.skip_waiting && !self.claim_clients {
            tracing::warn!(
                cache_version = %self.cache_version,
                "skip_waiting and claim_clients are both off; \
                 a new version only takes over once every open page has closed"
            );
        }

        Ok(())
    }
}
