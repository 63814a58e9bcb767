//! sw_fetch tool implementation.
//!
//! Issues a request from the host's page through the registration, exactly as
//! the game would, and reports what came back.

use dxquiz_client::fetch::url::resolve;
use dxquiz_core::cache::hash::body_digest;
use dxquiz_core::{Error, Request, Response};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::context::WorkerContext;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to fetch. Relative URLs resolve against the worker scope.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// HTTP status; 0 for a network error.
    pub status: u16,
    /// Whether the fetch failed outright.
    pub network_error: bool,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    /// Hex SHA-256 of the body.
    pub body_sha256: String,
    /// Body as text, for textual content types only.
    pub body_text: Option<String>,
}

fn is_textual(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    essence.starts_with("text/")
        || essence.ends_with("json")
        || essence.ends_with("javascript")
        || essence.ends_with("xml")
}

impl SwFetchOutput {
    fn new(url: String, response: &Response) -> Self {
        let body_text = response
            .content_type()
            .filter(|ct| is_textual(ct))
            .map(|_| String::from_utf8_lossy(&response.body).to_string());

        Self {
            url,
            status: response.status,
            network_error: response.is_network_error(),
            headers: response.headers.clone(),
            body_len: response.body.len(),
            body_sha256: body_digest(&response.body),
            body_text,
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(context: &WorkerContext, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }
    let url = resolve(&context.scope, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::new(&params.method, url);

    let response = context.registration.fetch(Some(context.client), request.clone()).await;

    json_result(&SwFetchOutput::new(request.url().to_string(), &response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StaticOrigin, booted_context, result_json};
    use std::sync::Arc;

    #[test]
    fn test_is_textual() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/json"));
        assert!(is_textual("text/javascript"));
        assert!(is_textual("image/svg+xml"));
        assert!(!is_textual("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_relative_asset() {
        let origin = Arc::new(StaticOrigin::with_site());
        let context = booted_context(origin).await;

        let params = SwFetchParams { url: "game.js".into(), method: default_method() };
        let output = result_json(&fetch_impl(&context, params).await.unwrap());

        assert_eq!(output["url"], "http://localhost:8080/game.js");
        assert_eq!(output["status"], 200);
        assert_eq!(output["body_text"], "start()");
        assert_eq!(output["network_error"], false);
    }

    #[tokio::test]
    async fn test_fetch_offline_image_after_online_fetch() {
        let origin = Arc::new(StaticOrigin::with_site());
        let context = booted_context(origin.clone()).await;
        let params = SwFetchParams { url: "img/heart.png".into(), method: default_method() };

        let online = result_json(&fetch_impl(&context, params.clone()).await.unwrap());
        origin.set_offline(true);
        let offline = result_json(&fetch_impl(&context, params).await.unwrap());

        assert_eq!(online["body_sha256"], offline["body_sha256"]);
        assert_eq!(offline["status"], 200);
        assert!(offline["body_text"].is_null());
    }

    #[tokio::test]
    async fn test_fetch_offline_uncached_asset() {
        let origin = Arc::new(StaticOrigin::with_site());
        let context = booted_context(origin.clone()).await;
        origin.set_offline(true);

        let params = SwFetchParams { url: "data/ranks.json".into(), method: default_method() };
        let output = result_json(&fetch_impl(&context, params).await.unwrap());

        assert_eq!(output["network_error"], true);
        assert_eq!(output["status"], 0);
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let origin = Arc::new(StaticOrigin::with_site());
        let context = booted_context(origin).await;

        let params = SwFetchParams { url: "ftp://localhost/file".into(), method: default_method() };
        assert!(fetch_impl(&context, params).await.is_err());
    }
}
