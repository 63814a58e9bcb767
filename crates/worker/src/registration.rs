//! Host side of the lifecycle interface.
//!
//! A registration owns at most one active and one waiting handler, tracks the
//! open pages and which version controls each, and dispatches install,
//! activate and fetch events. The slot lock is never held across a handler
//! await, so pages keep fetching while a new version installs.

use std::collections::BTreeMap;
use std::sync::Arc;

use dxquiz_client::{CacheMode, Network};
use dxquiz_core::{Error, Request, Response};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::lifecycle::{
    ActivateEvent, ActivateOutcome, ClientId, FetchDisposition, FetchEvent, InstallEvent, InstallOutcome,
    LifecycleHandler,
};

type Handler = Arc<dyn LifecycleHandler>;

/// Snapshot of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct RegistrationStatus {
    pub active: Option<String>,
    pub waiting: Option<String>,
    pub clients: usize,
}

/// Result of registering a new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct RegisterOutcome {
    pub install: InstallOutcome,
    /// Present when the version was activated right away.
    pub activation: Option<ActivateOutcome>,
}

#[derive(Default)]
struct Slots {
    active: Option<Handler>,
    waiting: Option<Handler>,
    /// Open pages and the version controlling each, if any.
    clients: BTreeMap<ClientId, Option<String>>,
    next_client: u64,
}

impl Slots {
    fn active_version(&self) -> Option<String> {
        self.active.as_ref().map(|h| h.version().to_string())
    }

    fn controlled_by_active(&self) -> usize {
        match self.active_version() {
            Some(version) => self.clients.values().filter(|c| c.as_deref() == Some(version.as_str())).count(),
            None => 0,
        }
    }
}

/// Dispatches lifecycle events to registered handlers.
pub struct Registration {
    network: Arc<dyn Network>,
    slots: RwLock<Slots>,
}

impl Registration {
    /// `network` serves requests no handler intercepts.
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self { network, slots: RwLock::new(Slots::default()) }
    }

    /// Install `handler` and, when nothing holds it back, activate it.
    ///
    /// A failed install disposes `handler` and leaves the active version in
    /// control.
    pub async fn register(&self, handler: Handler) -> Result<RegisterOutcome, Error> {
        let active_version = self.slots.read().await.active_version();
        tracing::info!(version = handler.version(), active = ?active_version, "registering");

        let install = match handler.on_install(InstallEvent { active_version }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                handler.on_dispose();
                return Err(e);
            }
        };

        let activate_now = {
            let mut slots = self.slots.write().await;
            if let Some(displaced) = slots.waiting.replace(handler) {
                tracing::debug!(version = displaced.version(), "waiting version displaced");
                displaced.on_dispose();
            }
            install.skip_waiting || slots.active.is_none() || slots.controlled_by_active() == 0
        };

        let activation = if activate_now { self.activate_waiting().await? } else { None };

        Ok(RegisterOutcome { install, activation })
    }

    /// Activate the waiting handler, if any.
    ///
    /// On failure the handler stays waiting and the active one keeps serving.
    pub async fn activate_waiting(&self) -> Result<Option<ActivateOutcome>, Error> {
        let (waiting, previous_version) = {
            let slots = self.slots.read().await;
            match &slots.waiting {
                Some(handler) => (handler.clone(), slots.active_version()),
                None => return Ok(None),
            }
        };

        let outcome = waiting.on_activate(ActivateEvent { previous_version: previous_version.clone() }).await?;

        let mut slots = self.slots.write().await;
        if slots.waiting.as_ref().is_some_and(|h| Arc::ptr_eq(h, &waiting)) {
            slots.waiting = None;
        }
        let version = waiting.version().to_string();
        if let Some(old) = slots.active.replace(waiting) {
            old.on_dispose();
        }

        for controller in slots.clients.values_mut() {
            let was_controlled = controller.is_some() && controller.as_deref() == previous_version.as_deref();
            if was_controlled || (outcome.claim && controller.as_deref() != Some(version.as_str())) {
                *controller = Some(version.clone());
            }
        }
        tracing::info!(version = %version, clients = slots.clients.len(), claim = outcome.claim, "now active");

        Ok(Some(outcome))
    }

    /// Open a page. It is controlled by the active version, if any.
    pub async fn open_client(&self) -> ClientId {
        let mut slots = self.slots.write().await;
        let id = ClientId(slots.next_client);
        slots.next_client += 1;
        let controller = slots.active_version();
        slots.clients.insert(id, controller);
        id
    }

    /// Close a page. When it was the last one held by the active version, a
    /// waiting version takes over.
    pub async fn close_client(&self, id: ClientId) -> Result<(), Error> {
        let promote = {
            let mut slots = self.slots.write().await;
            if slots.clients.remove(&id).is_none() {
                return Err(Error::InvalidInput(format!("unknown client {id}")));
            }
            slots.waiting.is_some() && slots.controlled_by_active() == 0
        };

        if promote {
            self.activate_waiting().await?;
        }
        Ok(())
    }

    /// Version controlling `id`, if any.
    pub async fn controller_of(&self, id: ClientId) -> Option<String> {
        self.slots.read().await.clients.get(&id).cloned().flatten()
    }

    /// Issue a fetch from page `client`. Always resolves to a response.
    pub async fn fetch(&self, client: Option<ClientId>, request: Request) -> Response {
        let handler = {
            let slots = self.slots.read().await;
            let controlled = match client {
                Some(id) => slots.clients.get(&id).cloned().flatten(),
                None => slots.active_version(),
            };
            match (controlled, &slots.active) {
                (Some(version), Some(active)) if active.version() == version => Some(active.clone()),
                _ => None,
            }
        };

        if let Some(handler) = handler {
            match handler.on_fetch(FetchEvent { client, request: request.clone() }).await {
                FetchDisposition::Respond(response) => return response,
                FetchDisposition::PassThrough => {}
            }
        }

        match self.network.fetch(&request, CacheMode::Default).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "uncontrolled fetch failed");
                Response::network_error()
            }
        }
    }

    pub async fn status(&self) -> RegistrationStatus {
        let slots = self.slots.read().await;
        RegistrationStatus {
            active: slots.active_version(),
            waiting: slots.waiting.as_ref().map(|h| h.version().to_string()),
            clients: slots.clients.len(),
        }
    }
}
