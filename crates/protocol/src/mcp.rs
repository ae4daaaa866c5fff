//! MCP-style payloads exchanged during the handshake and `tools/*` calls,
//! shared by the downstream stdio transport and the agent-facing front door.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client info sent during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Parameters for the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: Value,
    pub client_info: ClientInfo,
}

/// Build the `initialize` request parameters this gateway sends to each
/// downstream server on startup.
pub fn initialize_params() -> InitializeParams {
    InitializeParams {
        protocol_version: "2024-11-05".into(),
        capabilities: serde_json::json!({}),
        client_info: ClientInfo {
            name: "mcplexer".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        },
    }
}

/// A single tool definition as returned by a downstream server's `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// The result payload from `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<McpToolDef>,
}

/// A single content item in a `tools/call` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl ToolCallContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".into(),
            text: text.into(),
        }
    }
}

/// The result payload from `tools/call`. Carries an optional `_meta`
/// envelope the dispatch orchestrator injects after dispatch (see
/// `mux_protocol::cache_meta::{ToolMeta, CacheMeta}`); downstream servers
/// never set it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolCallContent>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<crate::cache_meta::ToolMeta>,
}

impl ToolCallResult {
    pub fn ok(content: Vec<ToolCallContent>) -> Self {
        Self {
            content,
            is_error: false,
            meta: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolCallContent::text(message)],
            is_error: true,
            meta: None,
        }
    }

    /// Merges cache metadata into the result's `_meta.cache` envelope per
    /// SPEC_FULL.md §4.5 step 8, preserving any other `_meta` keys already set.
    pub fn set_cache_meta(&mut self, cache: crate::cache_meta::CacheMeta) {
        self.meta.get_or_insert_with(Default::default).cache = Some(cache);
    }

    /// Convenience accessor for tests and callers that only care about the
    /// cache flag.
    pub fn cache_meta(&self) -> Option<&crate::cache_meta::CacheMeta> {
        self.meta.as_ref().and_then(|m| m.cache.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_tools_list_result() {
        let raw = r#"{
            "tools": [
                { "name": "read_file", "description": "Read a file",
                  "inputSchema": { "type": "object", "properties": { "path": { "type": "string" } } } }
            ]
        }"#;
        let result: ToolsListResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.tools[0].name, "read_file");
    }

    #[test]
    fn tools_list_missing_description_defaults_empty() {
        let raw = r#"{ "tools": [{ "name": "ping" }] }"#;
        let result: ToolsListResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.tools[0].description, "");
    }

    #[test]
    fn deserialize_tool_call_result_with_error() {
        let raw = r#"{ "content": [{ "type": "text", "text": "not found" }], "isError": true }"#;
        let result: ToolCallResult = serde_json::from_str(raw).unwrap();
        assert!(result.is_error);
        assert!(result.cache_meta().is_none());
    }

    #[test]
    fn initialize_params_uses_current_version() {
        let params = initialize_params();
        assert_eq!(params.protocol_version, "2024-11-05");
        assert_eq!(params.client_info.name, "mcplexer");
    }

    #[test]
    fn tool_call_result_ok_serializes_without_meta_field() {
        let result = ToolCallResult::ok(vec![ToolCallContent::text("hi")]);
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("_meta"));
    }

    #[test]
    fn set_cache_meta_nests_under_meta_cache() {
        let mut result = ToolCallResult::ok(vec![ToolCallContent::text("hi")]);
        result.set_cache_meta(crate::cache_meta::CacheMeta::hit(7));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["_meta"]["cache"]["cached"], true);
        assert_eq!(json["_meta"]["cache"]["age_seconds"], 7);
        assert_eq!(result.cache_meta().unwrap().cached, true);
    }
}
