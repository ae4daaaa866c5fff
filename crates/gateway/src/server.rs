//! The agent-facing JSON-RPC front door: line-delimited JSON-RPC 2.0 over
//! stdio or TCP, handling `initialize`, `ping`, `tools/list`, and
//! `tools/call`. Nearly all business logic lives in `mux_core::dispatch`;
//! this module is wire framing plus method routing.

use std::net::SocketAddr;
use std::sync::Arc;

use mux_core::dispatch::{DispatchError, SessionContext, ToolCallRequest};
use mux_downstream::DownstreamManager;
use mux_protocol::{error_code, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::state::AppState;

/// Per-connection session context. `initialize` fills it in; every later
/// call on the same connection reads a fresh snapshot.
struct Session {
    context: RwLock<SessionContext>,
}

impl Session {
    fn new() -> Self {
        Self {
            context: RwLock::new(SessionContext {
                session_id: Uuid::new_v4().to_string(),
                client_type: "unknown".into(),
                model: None,
                client_root: std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "/".into()),
            }),
        }
    }

    fn snapshot(&self) -> SessionContext {
        self.context.read().clone()
    }

    fn apply_initialize(&self, client_type: String, model: Option<String>, client_root: Option<String>) {
        let mut ctx = self.context.write();
        ctx.client_type = client_type;
        if model.is_some() {
            ctx.model = model;
        }
        if let Some(root) = client_root {
            ctx.client_root = root;
        }
    }
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    match state.config.server.transport.as_str() {
        "tcp" => serve_tcp(state).await,
        _ => serve_stdio(state).await,
    }
}

async fn serve_stdio(state: AppState) -> anyhow::Result<()> {
    tracing::info!("JSON-RPC front door listening on stdio");

    let stdout = Arc::new(AsyncMutex::new(tokio::io::stdout()));
    let session = Arc::new(Session::new());

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let state = state.clone();
        let session = session.clone();
        let stdout = stdout.clone();
        tokio::spawn(async move {
            if let Some(response) = dispatch_line(&state, &session, &line).await {
                write_stdio_response(&stdout, &response).await;
            }
        });
    }
    Ok(())
}

async fn write_stdio_response(stdout: &AsyncMutex<tokio::io::Stdout>, response: &JsonRpcResponse) {
    let Ok(mut bytes) = serde_json::to_vec(response) else {
        tracing::error!("failed to serialize JSON-RPC response");
        return;
    };
    bytes.push(b'\n');
    let mut out = stdout.lock().await;
    if let Err(e) = out.write_all(&bytes).await {
        tracing::warn!(error = %e, "failed to write response to stdout");
        return;
    }
    let _ = out.flush().await;
}

async fn serve_tcp(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.host/server.port: {e}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("binding to {addr}: {e}"))?;
    tracing::info!(%addr, "JSON-RPC front door listening on tcp");

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_tcp_connection(state, stream).await {
                tracing::warn!(error = %e, %peer, "connection ended with error");
            }
        });
    }
}

async fn handle_tcp_connection(state: AppState, stream: TcpStream) -> anyhow::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let writer = Arc::new(AsyncMutex::new(write_half));
    let session = Arc::new(Session::new());

    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let state = state.clone();
        let session = session.clone();
        let writer = writer.clone();
        tokio::spawn(async move {
            if let Some(response) = dispatch_line(&state, &session, &line).await {
                let Ok(mut bytes) = serde_json::to_vec(&response) else {
                    tracing::error!("failed to serialize JSON-RPC response");
                    return;
                };
                bytes.push(b'\n');
                let mut out = writer.lock().await;
                if let Err(e) = out.write_all(&bytes).await {
                    tracing::warn!(error = %e, "failed to write response to socket");
                    return;
                }
                let _ = out.flush().await;
            }
        });
    }
    Ok(())
}

/// Parses one wire line and produces the response to write back, or `None`
/// for a notification (no reply expected).
async fn dispatch_line(state: &AppState, session: &Session, line: &str) -> Option<JsonRpcResponse> {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(JsonRpcResponse::err(
                RequestId::Number(0),
                JsonRpcError::new(error_code::PARSE_ERROR, format!("parse error: {e}")),
            ));
        }
    };

    if value.get("id").is_none() {
        tracing::debug!(method = ?value.get("method"), "received notification");
        return None;
    }

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            return Some(JsonRpcResponse::err(
                RequestId::Number(0),
                JsonRpcError::new(error_code::INVALID_REQUEST, format!("invalid request: {e}")),
            ));
        }
    };

    let id = request.id.clone();
    match handle_request(state, session, request).await {
        Ok(result) => Some(JsonRpcResponse::ok(id, result)),
        Err(error) => Some(JsonRpcResponse::err(id, error)),
    }
}

async fn handle_request(state: &AppState, session: &Session, request: JsonRpcRequest) -> Result<Value, JsonRpcError> {
    match request.method.as_str() {
        "initialize" => Ok(handle_initialize(state, session, request.params)),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(handle_tools_list(state, session)),
        "tools/call" => handle_tools_call(state, session, request.params).await,
        other => Err(JsonRpcError::new(error_code::METHOD_NOT_FOUND, format!("unknown method: {other}"))),
    }
}

fn handle_initialize(state: &AppState, session: &Session, params: Option<Value>) -> Value {
    let params = params.unwrap_or(Value::Null);
    let client_type = params
        .get("clientInfo")
        .and_then(|c| c.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let model = params.get("model").and_then(|v| v.as_str()).map(str::to_string);
    let client_root = params.get("clientRoot").and_then(|v| v.as_str()).map(str::to_string);
    session.apply_initialize(client_type, model, client_root);

    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": { "tools": { "listChanged": true } },
        "serverInfo": {
            "name": state.config.observability.service_name,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn handle_tools_list(state: &AppState, session: &Session) -> Value {
    let ctx = session.snapshot();
    let downstream_tools = state.downstream.list_tools();
    let tools = state.dispatcher.handle_tools_list(&ctx, &downstream_tools, false);
    json!({ "tools": tools })
}

async fn handle_tools_call(state: &AppState, session: &Session, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::new(error_code::INVALID_PARAMS, "missing params"))?;
    let tool_name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| JsonRpcError::new(error_code::INVALID_PARAMS, "missing `name`"))?
        .to_string();
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    let ctx = session.snapshot();
    let request = ToolCallRequest { tool_name, arguments };

    match state.dispatcher.handle_tool_call(&ctx, request, CancellationToken::new()).await {
        Ok(result) => serde_json::to_value(result).map_err(|e| JsonRpcError::new(error_code::INTERNAL_ERROR, e.to_string())),
        Err(e) => Err(dispatch_error_to_jsonrpc(e)),
    }
}

fn dispatch_error_to_jsonrpc(error: DispatchError) -> JsonRpcError {
    match error {
        DispatchError::InvalidParams(msg) => JsonRpcError::new(error_code::INVALID_PARAMS, msg),
        DispatchError::RouteNotFound(msg) => JsonRpcError::new(error_code::ROUTE_DENIED, msg),
        DispatchError::ProcessError(msg) => JsonRpcError::new(error_code::DOWNSTREAM_PROCESS_ERROR, msg),
        DispatchError::InternalError(msg) => JsonRpcError::new(error_code::INTERNAL_ERROR, msg),
        DispatchError::Timeout => JsonRpcError::new(error_code::TIMEOUT, "request timed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_not_found_maps_to_route_denied_code() {
        let err = dispatch_error_to_jsonrpc(DispatchError::RouteNotFound("no match".into()));
        assert_eq!(err.code, error_code::ROUTE_DENIED);
    }

    #[test]
    fn timeout_maps_to_timeout_code() {
        let err = dispatch_error_to_jsonrpc(DispatchError::Timeout);
        assert_eq!(err.code, error_code::TIMEOUT);
    }

    #[test]
    fn session_initialize_sets_client_type_and_root() {
        let session = Session::new();
        session.apply_initialize("mcp_agent".into(), Some("gpt-5".into()), Some("/home/dev/project".into()));
        let ctx = session.snapshot();
        assert_eq!(ctx.client_type, "mcp_agent");
        assert_eq!(ctx.model.as_deref(), Some("gpt-5"));
        assert_eq!(ctx.client_root, "/home/dev/project");
    }

    #[tokio::test]
    async fn malformed_json_line_is_reported_as_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = mux_domain::config::Config {
            state_dir: dir.path().display().to_string(),
            ..Default::default()
        };
        let state = crate::state::AppState::bootstrap(config).await.unwrap();
        let session = Session::new();

        let response = dispatch_line(&state, &session, "not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, error_code::PARSE_ERROR);
    }
}
