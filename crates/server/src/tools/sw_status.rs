//! sw_status tool implementation.
//!
//! Reports which versions are active and waiting and which stores exist.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use super::json_result;
use crate::context::WorkerContext;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwStatusOutput {
    pub active: Option<String>,
    pub waiting: Option<String>,
    /// Open pages, including the host session.
    pub clients: usize,
    /// Version controlling the host session.
    pub controller: Option<String>,
    /// Every store currently in storage, oldest first.
    pub stores: Vec<String>,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(context: &WorkerContext) -> Result<CallToolResult, McpError> {
    let status = context.registration.status().await;
    let controller = context.registration.controller_of(context.client).await;
    let stores = context.db.store_names().await?;

    json_result(&SwStatusOutput { active: status.active, waiting: status.waiting, clients: status.clients, controller, stores })
}
