//! MCP tool implementations.
//!
//! This module contains all tools exposed by the dxquiz worker host.

pub mod cache;
pub mod sw_deploy;
pub mod sw_fetch;
pub mod sw_status;

#[cfg(test)]
pub(crate) mod test_support;

use dxquiz_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use sw_deploy::{SwDeployParams, deploy_impl};
pub use sw_fetch::{SwFetchParams, fetch_impl};
pub use sw_status::status_impl;

/// Serialize `output` as the pretty-printed text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
