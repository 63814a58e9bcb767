//! Shared state behind the MCP tools.

use std::sync::Arc;

use dxquiz_client::{HttpNetwork, Network, NetworkConfig};
use dxquiz_core::config::{validate_cache_version, validate_manifest_entry};
use dxquiz_core::{AppConfig, CacheDb, Error};
use dxquiz_worker::{CacheController, ClientId, ControllerConfig, RegisterOutcome, Registration};
use url::Url;

/// Everything a tool call needs: configuration, storage, the registration
/// and the page the host session stands for.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: AppConfig,
    pub scope: Url,
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub registration: Arc<Registration>,
    pub client: ClientId,
}

impl WorkerContext {
    /// Build the context from parts and open the host's page.
    pub async fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let scope = config.scope_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let registration = Arc::new(Registration::new(network.clone()));
        let client = registration.open_client().await;
        Ok(Self { config, scope, db, network, registration, client })
    }

    /// Open storage and the network from `config`, then register the
    /// configured version.
    ///
    /// A failed initial install is logged, not fatal: the host can deploy
    /// again once the origin is reachable.
    pub async fn boot(config: AppConfig) -> Result<Self, Error> {
        let db = CacheDb::open(&config.db_path).await?;
        let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(NetworkConfig::from(&config))?);
        let context = Self::new(config, db, network).await?;

        let version = context.config.cache_version.clone();
        if let Err(e) = context.deploy(&version, None).await {
            tracing::error!(version = %version, error = %e, "initial install failed, running without an active version");
        }

        Ok(context)
    }

    /// Register a controller for `version`, with an optional manifest override.
    ///
    /// The version and the override follow the same rules as configuration.
    pub async fn deploy(&self, version: &str, core_manifest: Option<Vec<String>>) -> Result<RegisterOutcome, Error> {
        validate_cache_version(version).map_err(|e| Error::InvalidInput(e.to_string()))?;
        for entry in core_manifest.iter().flatten() {
            validate_manifest_entry(entry).map_err(|e| Error::InvalidInput(e.to_string()))?;
        }

        let mut controller_config =
            ControllerConfig::try_from(&self.config).map_err(|e| Error::InvalidInput(e.to_string()))?;
        controller_config.version = version.to_string();
        if let Some(manifest) = core_manifest {
            controller_config.core_manifest = manifest;
        }

        let controller = CacheController::new(controller_config, self.db.clone(), self.network.clone())?;
        self.registration.register(Arc::new(controller)).await
    }
}
