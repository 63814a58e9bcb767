//! The cache controller: one versioned store, two freshness policies.
//!
//! ### Lifecycle
//! - install: open the store named by the cache version, fetch the whole core
//!   manifest, commit it in one transaction or not at all
//! - activate: delete every store whose name is not the current version
//! - dispose: stop intercepting; nothing is written afterwards
//!
//! ### Fetch policies
//! - Image: cache-first, network fill on miss, no fallback on failure
//! - Asset: network-first with HTTP caches bypassed, store fallback when offline

use std::sync::Arc;

use async_trait::async_trait;
use dxquiz_client::{CacheMode, Network, is_same_origin, resolve_manifest};
use dxquiz_core::{AppConfig, CacheDb, CacheStore, ConfigError, Error, Request, Response};
use futures_util::future::try_join_all;
use tokio::sync::watch;
use url::Url;

use crate::lifecycle::{
    ActivateEvent, ActivateOutcome, FetchDisposition, FetchEvent, InstallEvent, InstallOutcome, LifecycleHandler,
    LifecycleState,
};
use crate::routing::{ResourceKind, Route, route};

/// Deployment settings for one controller version.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Cache version; also the name of the controller's store.
    pub version: String,
    /// Scope URL. Its origin is the only one intercepted.
    pub scope: Url,
    /// Relative paths stored at install time.
    pub core_manifest: Vec<String>,
    pub skip_waiting: bool,
    pub claim_clients: bool,
}

impl TryFrom<&AppConfig> for ControllerConfig {
    type Error = ConfigError;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            version: config.cache_version.clone(),
            scope: config.scope_url()?,
            core_manifest: config.core_manifest.clone(),
            skip_waiting: config.skip_waiting,
            claim_clients: config.claim_clients,
        })
    }
}

/// Answers intercepted requests from one versioned store.
pub struct CacheController {
    config: ControllerConfig,
    manifest: Vec<Url>,
    db: CacheDb,
    store: CacheStore,
    network: Arc<dyn Network>,
    state: watch::Sender<LifecycleState>,
}

impl CacheController {
    /// Create a controller for `config`.
    ///
    /// Resolves the manifest against the scope up front so a bad deployment is
    /// rejected before any event is dispatched.
    pub fn new(config: ControllerConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        if config.version.trim().is_empty() {
            return Err(Error::InvalidInput("cache version must not be empty".into()));
        }
        let manifest =
            resolve_manifest(&config.scope, &config.core_manifest).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if let Some(foreign) = manifest.iter().find(|url| !is_same_origin(url, &config.scope)) {
            return Err(Error::InvalidUrl(format!("manifest entry {} is outside {}", foreign, config.scope)));
        }
        let store = db.store(&config.version);

        Ok(Self { config, manifest, db, store, network, state: watch::Sender::new(LifecycleState::Pending) })
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Resolved core manifest, in configured order.
    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    fn transition(&self, next: LifecycleState) -> Result<(), Error> {
        let mut from = None;
        self.state.send_if_modified(|state| {
            from = Some(*state);
            if state.can_transition(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        match from {
            Some(current) if current.can_transition(next) => {
                tracing::debug!(version = %self.config.version, "{} -> {}", current, next);
                Ok(())
            }
            Some(current) => Err(Error::InvalidState(format!(
                "{}: cannot move from {} to {}",
                self.config.version, current, next
            ))),
            None => Err(Error::InvalidState(format!("{}: state unavailable", self.config.version))),
        }
    }

    /// Handle the install event.
    ///
    /// On failure the controller is superseded and the previously active
    /// version, if any, keeps serving.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        self.transition(LifecycleState::Installing)?;
        tracing::info!(version = %self.config.version, entries = self.manifest.len(), "installing");

        match self.populate().await {
            Ok(cached) => {
                self.transition(LifecycleState::Installed)?;
                tracing::info!(version = %self.config.version, cached, "installed");
                Ok(InstallOutcome {
                    version: self.config.version.clone(),
                    cached,
                    skip_waiting: self.config.skip_waiting,
                })
            }
            Err(e) => {
                tracing::warn!(version = %self.config.version, error = %e, "install failed");
                self.state.send_replace(LifecycleState::Superseded);
                Err(e)
            }
        }
    }

    async fn populate(&self) -> Result<usize, Error> {
        let existed = self.db.has_store(&self.config.version).await?;
        let store = self.db.open_store(&self.config.version).await?;

        let result = match try_join_all(self.manifest.iter().map(|url| self.fetch_manifest_entry(url))).await {
            Ok(entries) => store.put_all(&entries).await,
            Err(e) => Err(e),
        };

        if result.is_err() && !existed {
            // a store this install created must not outlive the failed install
            if let Err(e) = self.db.delete_store(&self.config.version).await {
                tracing::warn!(version = %self.config.version, error = %e, "failed to discard store");
            }
        }

        result
    }

    async fn fetch_manifest_entry(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let response = self
            .network
            .fetch(&request, CacheMode::Default)
            .await
            .map_err(|e| Error::InstallFailed(format!("{}: {}", url, e)))?;

        if !response.ok() {
            return Err(Error::InstallFailed(format!("{}: status {}", url, response.status)));
        }

        Ok((request, response))
    }

    /// Handle the activate event: sweep every store but the current one.
    pub async fn activate(&self) -> Result<ActivateOutcome, Error> {
        self.transition(LifecycleState::Activating)?;

        match self.sweep().await {
            Ok(purged) => {
                self.transition(LifecycleState::Active)?;
                tracing::info!(version = %self.config.version, purged = ?purged, "activated");
                Ok(ActivateOutcome {
                    version: self.config.version.clone(),
                    purged,
                    claim: self.config.claim_clients,
                })
            }
            Err(e) => {
                tracing::warn!(version = %self.config.version, error = %e, "activation failed");
                if let Err(revert) = self.transition(LifecycleState::Installed) {
                    tracing::debug!(error = %revert, "state changed during activation");
                }
                Err(e)
            }
        }
    }

    async fn sweep(&self) -> Result<Vec<String>, Error> {
        let mut purged = Vec::new();
        for name in self.db.store_names().await? {
            if name != self.config.version && self.db.delete_store(&name).await? {
                tracing::debug!(store = %name, "deleted stale store");
                purged.push(name);
            }
        }
        Ok(purged)
    }

    /// Answer one request from the page.
    pub async fn handle_fetch(&self, request: &Request) -> FetchDisposition {
        if self.state() != LifecycleState::Active {
            return FetchDisposition::PassThrough;
        }

        match route(request, &self.config.scope) {
            Route::PassThrough(reason) => {
                tracing::trace!(url = %request.url(), ?reason, "not intercepted");
                FetchDisposition::PassThrough
            }
            Route::Intercept(ResourceKind::Image) => {
                let response = self.cache_first(request).await.unwrap_or_else(|e| {
                    tracing::warn!(url = %request.url(), error = %e, "image unavailable");
                    Response::network_error()
                });
                FetchDisposition::Respond(response)
            }
            Route::Intercept(ResourceKind::Asset) => FetchDisposition::Respond(self.network_first(request).await),
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<Response, Error> {
        if let Some(cached) = self.lookup(request).await {
            tracing::debug!(url = %request.url(), "cache hit");
            return Ok(cached);
        }

        tracing::debug!(url = %request.url(), "cache miss");
        let response = self.network.fetch(request, CacheMode::Default).await?;
        self.store_copy(request, &response).await;
        Ok(response)
    }

    async fn network_first(&self, request: &Request) -> Response {
        match self.network.fetch(request, CacheMode::Bypass).await {
            Ok(response) => {
                self.store_copy(request, &response).await;
                response
            }
            Err(e) => match self.lookup(request).await {
                Some(cached) => {
                    tracing::warn!(url = %request.url(), error = %e, "network failed, serving cached copy");
                    cached
                }
                None => {
                    tracing::warn!(url = %request.url(), error = %e, "network failed, nothing cached");
                    Response::network_error()
                }
            },
        }
    }

    /// Read failures count as misses.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.store.match_request(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, "cache read failed");
                None
            }
        }
    }

    async fn store_copy(&self, request: &Request, response: &Response) {
        if !response.is_storable() || self.state() == LifecycleState::Superseded {
            return;
        }

        match self.store.put(request, response).await {
            Ok(()) => {}
            Err(Error::StoreMissing(_)) => {
                tracing::debug!(url = %request.url(), version = %self.config.version, "store swept, dropping write");
            }
            Err(e) => tracing::warn!(url = %request.url(), error = %e, "cache write failed"),
        }
    }

    /// Stop serving. A disposed controller passes every fetch through.
    pub fn dispose(&self) {
        let previous = self.state.send_replace(LifecycleState::Superseded);
        if previous != LifecycleState::Superseded {
            tracing::info!(version = %self.config.version, "{} -> superseded", previous);
        }
    }
}

#[async_trait]
impl LifecycleHandler for CacheController {
    fn version(&self) -> &str {
        CacheController::version(self)
    }

    fn state(&self) -> LifecycleState {
        CacheController::state(self)
    }

    async fn on_install(&self, event: InstallEvent) -> Result<InstallOutcome, Error> {
        if let Some(active) = &event.active_version {
            tracing::debug!(version = %self.config.version, active = %active, "install over active version");
        }
        self.install().await
    }

    async fn on_activate(&self, event: ActivateEvent) -> Result<ActivateOutcome, Error> {
        if let Some(previous) = &event.previous_version {
            tracing::debug!(version = %self.config.version, previous = %previous, "replacing version");
        }
        self.activate().await
    }

    async fn on_fetch(&self, event: FetchEvent) -> FetchDisposition {
        self.handle_fetch(&event.request).await
    }

    fn on_dispose(&self) {
        self.dispose();
    }
}
