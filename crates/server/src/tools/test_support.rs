//! In-memory origin for tool tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use dxquiz_client::{CacheMode, Network};
use dxquiz_core::{AppConfig, CacheDb, Error, Request, Response};
use rmcp::model::CallToolResult;

use crate::context::WorkerContext;

/// Serves a fixed set of URLs; everything else is a 404. Can be taken offline.
#[derive(Default)]
pub struct StaticOrigin {
    pages: Mutex<HashMap<String, Response>>,
    offline: Mutex<bool>,
}

impl StaticOrigin {
    pub fn with_site() -> Self {
        let origin = Self::default();
        origin.put("http://localhost:8080/", "text/html", "<html>dx</html>");
        origin.put("http://localhost:8080/index.html", "text/html", "<html>dx</html>");
        origin.put("http://localhost:8080/styles.css", "text/css", "body{}");
        origin.put("http://localhost:8080/game.js", "text/javascript", "start()");
        origin.put("http://localhost:8080/data/cases.json", "application/json", "[]");
        origin.put("http://localhost:8080/data/exams.json", "application/json", "[]");
        origin.put("http://localhost:8080/img/heart.png", "image/png", "\u{89}PNG");
        origin
    }

    pub fn put(&self, url: &str, content_type: &str, body: &str) {
        let response = Response::new(200, vec![("content-type".into(), content_type.into())], body.to_string());
        self.pages.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }
}

#[async_trait]
impl Network for StaticOrigin {
    async fn fetch(&self, request: &Request, _mode: CacheMode) -> Result<Response, Error> {
        if *self.offline.lock().unwrap() {
            return Err(Error::Network("offline".into()));
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(request.url().as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, Vec::new(), "not found")))
    }
}

/// A context over an in-memory database, with the default version deployed.
pub async fn booted_context(origin: Arc<StaticOrigin>) -> WorkerContext {
    let config = AppConfig { cache_version: "dxquiz-v1".into(), ..Default::default() };
    let db = CacheDb::open_in_memory().await.unwrap();
    let context = WorkerContext::new(config, db, origin).await.unwrap();
    context.deploy("dxquiz-v1", None).await.unwrap();
    context
}

/// Parse the JSON text content of a tool result.
pub fn result_json(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
