//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::context::WorkerContext;
use crate::tools::cache::{CacheKeysParams, keys_impl};
use crate::tools::{SwDeployParams, SwFetchParams, deploy_impl, fetch_impl, status_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for the dxquiz worker.
#[derive(Clone)]
pub struct DxWorkerServer {
    context: WorkerContext,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl DxWorkerServer {
    /// Create a new server handler.
    pub fn new(context: WorkerContext) -> Self {
        Self { context, tool_router: Self::tool_router() }
    }

    /// Deploy a cache version.
    ///
    /// Installs the version's core manifest and activates it according to the
    /// skip-waiting policy. A failed install leaves the current version in control.
    #[tool(description = "Install a new cache version and activate it. Returns install and activation outcomes.")]
    async fn sw_deploy(&self, params: Parameters<SwDeployParams>) -> Result<CallToolResult, McpError> {
        deploy_impl(&self.context, params.0).await
    }

    /// Fetch a URL as the game page would, through the active cache version.
    #[tool(description = "Fetch a URL through the offline cache as the game page would. Returns status, headers and body summary.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.context, params.0).await
    }

    #[tool(description = "Show the active and waiting cache versions, open pages and existing cache stores.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.context).await
    }

    #[tool(description = "List the request keys stored in a cache store (default: the active version's store).")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.context, params.0).await
    }
}

impl ServerHandler for DxWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "dxquiz-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StaticOrigin, booted_context};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_lists_all_tools() {
        let context = booted_context(Arc::new(StaticOrigin::with_site())).await;
        let server = DxWorkerServer::new(context);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_keys", "sw_deploy", "sw_fetch", "sw_status"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let context = booted_context(Arc::new(StaticOrigin::with_site())).await;
        let info = DxWorkerServer::new(context).get_info();
        assert_eq!(info.server_info.name, "dxquiz-worker");
    }
}
