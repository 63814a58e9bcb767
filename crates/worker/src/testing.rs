//! Scripted network double for controller and registration tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dxquiz_client::{CacheMode, Network};
use dxquiz_core::{Error, Request, Response};
use tokio::sync::Notify;
use url::Url;

/// Holds fetches of one URL until released.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    released: Notify,
}

impl Gate {
    /// Wait until a fetch is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked fetch continue.
    pub fn release(&self) {
        self.released.notify_one();
    }
}

pub fn scope() -> Url {
    Url::parse("http://localhost:8080/").unwrap()
}

/// Serves canned responses by path; unknown paths get a 404.
pub struct ScriptedNetwork {
    online: AtomicBool,
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(Url, CacheMode)>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            routes: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `body` for same-origin `path` (or for an absolute URL).
    pub fn serve(&self, path: &str, content_type: &str, body: impl Into<Bytes>) {
        let response = Response::new(200, vec![("content-type".into(), content_type.into())], body);
        self.routes.lock().unwrap().insert(Self::key(path), response);
    }

    /// Make fetches of `path` fail at the transport level.
    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(Self::key(path));
    }

    /// Park fetches of `path` until the returned gate is released.
    pub fn gate(&self, path: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates.lock().unwrap().insert(Self::key(path), gate.clone());
        gate
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls_to(&self, path: &str) -> usize {
        let key = Self::key(path);
        self.calls.lock().unwrap().iter().filter(|(url, _)| url.as_str() == key).count()
    }

    pub fn last_mode(&self, path: &str) -> Option<CacheMode> {
        let key = Self::key(path);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(url, _)| url.as_str() == key)
            .map(|(_, mode)| *mode)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn key(path: &str) -> String {
        if path.contains("://") { Url::parse(path).unwrap().to_string() } else { scope().join(path).unwrap().to_string() }
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, Error> {
        self.calls.lock().unwrap().push((request.url().clone(), mode));

        let gate = self.gates.lock().unwrap().get(request.url().as_str()).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.released.notified().await;
        }

        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        let key = request.url().to_string();
        if self.failing.lock().unwrap().contains(&key) {
            return Err(Error::Network(format!("connection reset: {key}")));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Response::new(404, Vec::new(), "not found")))
    }
}
