pub mod cache_meta;
pub mod jsonrpc;
pub mod mcp;

pub use cache_meta::{CacheMeta, ToolMeta};
pub use jsonrpc::{
    error_code, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId,
};
pub use mcp::{
    initialize_params, ClientInfo, InitializeParams, McpToolDef, ToolCallContent, ToolCallResult,
    ToolsListResult,
};
