//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DXQUIZ_*)
//! 2. TOML config file (if DXQUIZ_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::{ConfigError, validate_cache_version, validate_manifest_entry};

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DXQUIZ_*)
/// 2. TOML config file (if DXQUIZ_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via DXQUIZ_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name of the current cache generation. Change it on every deploy.
    ///
    /// Set via DXQUIZ_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URL the worker is served from. Its origin is the only one intercepted,
    /// and manifest paths resolve against it.
    ///
    /// Set via DXQUIZ_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Relative paths fetched and stored at install time.
    ///
    /// Set via DXQUIZ_CORE_MANIFEST using array syntax: `[./, ./index.html]`.
    #[serde(default = "default_core_manifest")]
    pub core_manifest: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via DXQUIZ_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via DXQUIZ_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via DXQUIZ_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    ///
    /// Set via DXQUIZ_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Activate a freshly installed version without waiting for pages
    /// controlled by the previous one to close.
    ///
    /// Set via DXQUIZ_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of already open pages on activation.
    ///
    /// Set via DXQUIZ_CLAIM_CLIENTS environment variable.
    #[serde(default = "default_true")]
    pub claim_clients: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./dxquiz-cache.sqlite")
}

fn default_cache_version() -> String {
    format!("dxquiz-v{}", env!("CARGO_PKG_VERSION"))
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_core_manifest() -> Vec<String> {
    ["./", "./index.html", "./styles.css", "./game.js", "./data/cases.json", "./data/exams.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    "dxquiz-worker/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            scope: default_scope(),
            core_manifest: default_core_manifest(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            skip_waiting: true,
            claim_clients: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The scope as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the scope is not an absolute http(s) URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "scope".into(), reason: format!("unsupported scheme: {other}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DXQUIZ_`
    /// 2. TOML file from `DXQUIZ_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DXQUIZ_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("DXQUIZ_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./dxquiz-cache.sqlite"));
        assert!(config.cache_version.starts_with("dxquiz-v"));
        assert_eq!(config.scope, "http://localhost:8080/");
        assert_eq!(config.core_manifest.len(), 6);
        assert_eq!(config.core_manifest[0], "./");
        assert_eq!(config.user_agent, "dxquiz-worker/0.1");
        assert_eq!(config.max_bytes, 10_485_760);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_redirects, 5);
        assert!(config.skip_waiting);
        assert!(config.claim_clients);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_scope_url() {
        let config = AppConfig::default();
        let url = config.scope_url().unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_scope_url_rejects_file_scheme() {
        let config = AppConfig { scope: "file:///srv/dxquiz/".into(), ..Default::default() };
        assert!(matches!(config.scope_url(), Err(ConfigError::Invalid { field, .. }) if field == "scope"));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "dxquiz.toml",
                r#"
                cache_version = "dxquiz-from-file"
                core_manifest = ["./", "./index.html"]
                skip_waiting = false
                "#,
            )?;
            jail.set_env("DXQUIZ_CONFIG_FILE", "dxquiz.toml");
            jail.set_env("DXQUIZ_CACHE_VERSION", "dxquiz-from-env");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version, "dxquiz-from-env");
            assert_eq!(config.core_manifest, vec!["./".to_string(), "./index.html".to_string()]);
            assert!(!config.skip_waiting);
            assert_eq!(config.timeout_ms, 20_000);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DXQUIZ_TIMEOUT_MS", "5");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
