//! sw_deploy tool implementation.
//!
//! Registers a new cache version: installs it and, unless pages hold the old
//! version back, activates it.

use dxquiz_core::Error;
use dxquiz_worker::RegisterOutcome;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::context::WorkerContext;

/// Parameters for the sw_deploy tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwDeployParams {
    /// New cache version name. Must differ from the active one to roll out new assets.
    pub cache_version: String,

    /// Relative paths to store at install time. Defaults to the configured manifest.
    #[serde(default)]
    pub core_manifest: Option<Vec<String>>,
}

/// Output from the sw_deploy tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwDeployOutput {
    #[serde(flatten)]
    pub outcome: RegisterOutcome,
    /// Version in control after the deploy.
    pub active: Option<String>,
    /// Version installed but not yet in control.
    pub waiting: Option<String>,
}

/// Implementation of the sw_deploy tool.
pub async fn deploy_impl(context: &WorkerContext, params: SwDeployParams) -> Result<CallToolResult, McpError> {
    let version = params.cache_version.trim();
    if version.is_empty() {
        return Err(Error::InvalidInput("cache_version cannot be empty".into()).into());
    }
    if params.core_manifest.as_ref().is_some_and(|m| m.is_empty()) {
        return Err(Error::InvalidInput("core_manifest cannot be empty".into()).into());
    }

    let outcome = context.deploy(version, params.core_manifest).await?;
    let status = context.registration.status().await;

    json_result(&SwDeployOutput { outcome, active: status.active, waiting: status.waiting })
}
