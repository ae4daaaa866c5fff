//! Downstream manager — holds one connection per configured downstream
//! server and orchestrates tool discovery and dispatch.

use std::collections::HashMap;

use async_trait::async_trait;
use mux_domain::config::{DownstreamConfig, DownstreamServerConfig};
use mux_protocol::{initialize_params, McpToolDef, ToolCallResult, ToolsListResult};
use serde_json::Value;

use crate::transport::{DownstreamTransport, StdioTransport, TransportError};

/// A downstream connection: any concrete manager implementation can `call`
/// a tool on a named server. The dispatch orchestrator is the only caller
/// that knows about caching — see `CacheAwareDownstream` in `mux_core`,
/// which layers `call_with_meta` over any `DownstreamManager` rather than
/// requiring every implementation to duplicate cache logic.
#[async_trait]
pub trait DownstreamManager: Send + Sync {
    async fn call(&self, server_id: &str, tool_name: &str, arguments: Value) -> Result<ToolCallResult, DownstreamError>;

    /// All discovered tools across all alive servers, as `(server_id, tool)`.
    fn list_tools(&self) -> Vec<(String, McpToolDef)>;

    fn server_count(&self) -> usize;

    fn tool_count(&self) -> usize;
}

#[derive(Debug, thiserror::Error)]
pub enum DownstreamError {
    #[error("downstream transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("downstream protocol error: {0}")]
    Protocol(String),

    #[error("downstream server not found: {0}")]
    ServerNotFound(String),

    #[error("downstream server is down: {0}")]
    ServerDown(String),
}

impl From<DownstreamError> for mux_domain::error::Error {
    fn from(e: DownstreamError) -> Self {
        mux_domain::error::Error::Other(e.to_string())
    }
}

/// One connected downstream server.
struct Connection {
    id: String,
    tools: Vec<McpToolDef>,
    transport: Box<dyn DownstreamTransport>,
}

impl Connection {
    async fn initialize(config: &DownstreamServerConfig) -> Result<Self, DownstreamError> {
        let transport: Box<dyn DownstreamTransport> =
            Box::new(StdioTransport::spawn(config).map_err(DownstreamError::Transport)?);

        let params = serde_json::to_value(initialize_params())
            .map_err(|e| DownstreamError::Protocol(format!("serializing initialize params: {e}")))?;

        let resp = transport
            .send_request("initialize", Some(params))
            .await
            .map_err(DownstreamError::Transport)?;
        if resp.is_error() {
            let err = resp.error.unwrap();
            return Err(DownstreamError::Protocol(format!("initialize failed: {err}")));
        }
        tracing::debug!(server_id = %config.id, "downstream initialize response received");

        transport
            .send_notification("notifications/initialized")
            .await
            .map_err(DownstreamError::Transport)?;

        let tools_resp = transport
            .send_request("tools/list", None)
            .await
            .map_err(DownstreamError::Transport)?;

        let tools = if tools_resp.is_error() {
            tracing::warn!(server_id = %config.id, "tools/list returned error, server will have no tools");
            Vec::new()
        } else {
            let result_value = tools_resp.result.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolsListResult>(result_value) {
                Ok(r) => r.tools,
                Err(e) => {
                    tracing::warn!(server_id = %config.id, error = %e, "failed to parse tools/list result");
                    Vec::new()
                }
            }
        };

        tracing::info!(server_id = %config.id, tool_count = tools.len(), "downstream server initialized");

        Ok(Self {
            id: config.id.clone(),
            tools,
            transport,
        })
    }

    fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolCallResult, DownstreamError> {
        if !self.transport.is_alive() {
            return Err(DownstreamError::ServerDown(self.id.clone()));
        }

        let params = serde_json::json!({ "name": tool_name, "arguments": arguments });
        let resp = self
            .transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(DownstreamError::Transport)?;

        if resp.is_error() {
            let err = resp.error.unwrap();
            return Err(DownstreamError::Protocol(format!("tools/call failed: {err}")));
        }

        let result_value = resp.result.unwrap_or(Value::Null);
        serde_json::from_value::<ToolCallResult>(result_value)
            .map_err(|e| DownstreamError::Protocol(format!("failed to parse tools/call result: {e}")))
    }

    async fn shutdown(&self) {
        tracing::info!(server_id = %self.id, "shutting down downstream server");
        self.transport.shutdown().await;
    }
}

/// Stdio-backed implementation of [`DownstreamManager`]: one spawned child
/// process per configured server.
pub struct StdioDownstreamManager {
    connections: HashMap<String, Connection>,
}

impl StdioDownstreamManager {
    pub fn empty() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Spawn and initialize every configured server. Servers that fail to
    /// start are logged and skipped, not fatal — matching the spec's
    /// "a server that fails to start is logged and skipped" requirement.
    pub async fn from_config(config: &DownstreamConfig) -> Self {
        let mut connections = HashMap::new();

        for server_config in &config.servers {
            tracing::info!(
                server_id = %server_config.id,
                command = %server_config.command,
                "initializing downstream server"
            );

            match Connection::initialize(server_config).await {
                Ok(conn) => {
                    connections.insert(server_config.id.clone(), conn);
                }
                Err(e) => {
                    tracing::warn!(server_id = %server_config.id, error = %e, "failed to initialize downstream server, skipping");
                }
            }
        }

        if !connections.is_empty() {
            tracing::info!(count = connections.len(), "downstream manager ready");
        }

        Self { connections }
    }

    pub async fn shutdown(&self) {
        let futs: Vec<_> = self.connections.values().map(|c| c.shutdown()).collect();
        futures_util::future::join_all(futs).await;
    }
}

#[async_trait]
impl DownstreamManager for StdioDownstreamManager {
    async fn call(&self, server_id: &str, tool_name: &str, arguments: Value) -> Result<ToolCallResult, DownstreamError> {
        let conn = self
            .connections
            .get(server_id)
            .ok_or_else(|| DownstreamError::ServerNotFound(server_id.to_string()))?;
        conn.call_tool(tool_name, arguments).await
    }

    fn list_tools(&self) -> Vec<(String, McpToolDef)> {
        self.connections
            .values()
            .filter(|c| c.is_alive())
            .flat_map(|c| c.tools.iter().cloned().map(move |t| (c.id.clone(), t)))
            .collect()
    }

    fn server_count(&self) -> usize {
        self.connections.len()
    }

    fn tool_count(&self) -> usize {
        self.connections.values().filter(|c| c.is_alive()).map(|c| c.tools.len()).sum()
    }
}
