//! cache_keys tool implementation.
//!
//! Lists the request identities held in a store.

use dxquiz_core::{CacheKey, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::context::WorkerContext;
use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Store to list. Defaults to the active version's store.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub store: String,
    pub keys: Vec<CacheKey>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(context: &WorkerContext, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let name = match params.store {
        Some(name) => name,
        None => context
            .registration
            .status()
            .await
            .active
            .ok_or_else(|| Error::InvalidState("no active version".into()))?,
    };

    if !context.db.has_store(&name).await? {
        return Err(Error::StoreMissing(name).into());
    }

    let keys = context.db.store(&name).keys().await?;
    json_result(&CacheKeysOutput { store: name, keys })
}
