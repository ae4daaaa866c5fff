//! Dispatch Orchestrator: the `tools/call` pipeline tying the route engine,
//! tool-call cache, and approval manager together, plus built-in tool
//! interception and audit emission. See SPEC_FULL.md §4.5.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use mux_domain::model::{ApprovalRecord, ApproverType, BUILTIN_SERVER_ID};
use mux_domain::tool::minify_schema;
use mux_downstream::{DownstreamError, DownstreamManager};
use mux_protocol::{CacheMeta, McpToolDef, ToolCallContent, ToolCallResult};
use mux_store::{AuditLog, AuditRecord};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::approval::{ApprovalManager, ApprovalOutcome};
use crate::route::{resolve_with_fallback, RouteError, RouteMatch};
use crate::toolcache::{bare_tool_name, fingerprint, ToolCallCache, ToolCallKey};

/// A historical built-in prefix some older clients still send; rewritten to
/// the current one so those clients keep working.
const LEGACY_BUILTIN_NAMESPACE: &str = "serialagent";
const BUILTIN_NAMESPACE: &str = "mcplexer";

/// The downstream namespace whose tools carry org/repo scope, subject to a
/// route's `allowed_orgs`/`allowed_repos` allowlist.
const CODE_HOSTING_NAMESPACE: &str = "github";
const CODE_HOSTING_HOST: &str = "github.com";

/// Walks `arguments` for org/repo references and returns the first one not
/// covered by the route's allowlists, or `None` if every reference found is
/// allowed (including the case where none were found at all, or no
/// allowlist is configured for that dimension).
fn check_scope_allowlist(arguments: &Value, allowed_orgs: Option<&[String]>, allowed_repos: Option<&[String]>) -> Option<String> {
    let mut refs = Vec::new();
    collect_scope_refs(arguments, &mut refs);

    for r in refs {
        match &r {
            ScopeRef::Repo(full_name) => {
                if let Some(allowed) = allowed_repos {
                    if !allowed.iter().any(|a| a == full_name) {
                        return Some(full_name.clone());
                    }
                }
            }
            ScopeRef::Org(org) => {
                if let Some(allowed) = allowed_orgs {
                    if !allowed.iter().any(|a| a == org) {
                        return Some(org.clone());
                    }
                }
            }
        }
    }
    None
}

enum ScopeRef {
    Repo(String),
    Org(String),
}

fn collect_scope_refs(value: &Value, out: &mut Vec<ScopeRef>) {
    match value {
        Value::Object(map) => {
            let owner = map.get("owner").and_then(|v| v.as_str());
            let repo = map.get("repo").and_then(|v| v.as_str());
            if let (Some(owner), Some(repo)) = (owner, repo) {
                out.push(ScopeRef::Repo(format!("{owner}/{repo}")));
            }
            if let Some(full_name) = map.get("full_name").or_else(|| map.get("repository")).and_then(|v| v.as_str()) {
                out.push(ScopeRef::Repo(full_name.to_string()));
            }
            if let Some(org) = map.get("org").or_else(|| map.get("organization")).and_then(|v| v.as_str()) {
                out.push(ScopeRef::Org(org.to_string()));
            }
            for v in map.values() {
                collect_scope_refs(v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_scope_refs(item, out);
            }
        }
        Value::String(s) => {
            if let Some(rest) = s.strip_prefix("repo:") {
                out.push(ScopeRef::Repo(rest.to_string()));
            } else if let Some(org) = s.strip_prefix("org:") {
                out.push(ScopeRef::Org(org.to_string()));
            } else if let Some(host_idx) = s.find(CODE_HOSTING_HOST) {
                let tail = &s[host_idx + CODE_HOSTING_HOST.len()..];
                let mut segments = tail.trim_start_matches('/').splitn(2, '/');
                if let (Some(owner), Some(repo)) = (segments.next(), segments.next()) {
                    let repo = repo.split(['/', '?', '#']).next().unwrap_or(repo);
                    if !owner.is_empty() && !repo.is_empty() {
                        out.push(ScopeRef::Repo(format!("{owner}/{repo}")));
                    }
                }
            }
        }
        _ => {}
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("route not found: {0}")]
    RouteNotFound(String),
    #[error("downstream process error: {0}")]
    ProcessError(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("request timed out")]
    Timeout,
}

impl From<DownstreamError> for DispatchError {
    fn from(e: DownstreamError) -> Self {
        DispatchError::ProcessError(e.to_string())
    }
}

/// Identifies the calling agent session for audit, approval self-check, and
/// workspace-chain resolution.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub client_type: String,
    pub model: Option<String>,
    pub client_root: String,
}

pub struct ToolCallRequest {
    pub tool_name: String,
    pub arguments: Value,
}

/// Denylisted argument-key substrings whose values are replaced before an
/// audit record is written. Case-insensitive, independent of route or
/// downstream server.
const REDACTED_KEY_SUBSTRINGS: &[&str] = &["token", "secret", "password", "api_key", "authorization"];

/// Pure function over a JSON value tree: replaces the value of any object
/// key matching a redaction substring with `"[redacted]"`.
pub fn redact_arguments(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let lower = k.to_lowercase();
                if REDACTED_KEY_SUBSTRINGS.iter().any(|s| lower.contains(s)) {
                    out.insert(k.clone(), Value::String("[redacted]".into()));
                } else {
                    out.insert(k.clone(), redact_arguments(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_arguments).collect()),
        other => other.clone(),
    }
}

/// Layers cache-awareness over any plain [`DownstreamManager`] — the
/// manager itself never knows about caching.
pub struct CacheAwareDownstream {
    inner: Arc<dyn DownstreamManager>,
    cache: Arc<ToolCallCache>,
}

impl CacheAwareDownstream {
    pub fn new(inner: Arc<dyn DownstreamManager>, cache: Arc<ToolCallCache>) -> Self {
        Self { inner, cache }
    }

    pub async fn call_with_meta(
        &self,
        server_id: &str,
        auth_scope_id: &str,
        bare_name: &str,
        arguments: Value,
        cache_bust: bool,
    ) -> Result<(ToolCallResult, CacheMeta), DownstreamError> {
        if self.cache.is_mutation(server_id, bare_name) {
            let result = self.inner.call(server_id, bare_name, arguments).await?;
            self.cache.invalidate_for_mutation(server_id, auth_scope_id);
            return Ok((result, CacheMeta::miss()));
        }

        if !self.cache.is_cacheable(server_id, bare_name) {
            let result = self.inner.call(server_id, bare_name, arguments).await?;
            return Ok((result, CacheMeta::miss()));
        }

        let args_bytes = serde_json::to_vec(&arguments).unwrap_or_default();
        let key = ToolCallKey {
            server_id: server_id.to_string(),
            auth_scope_id: auth_scope_id.to_string(),
            tool_name: bare_name.to_string(),
            args_fingerprint: fingerprint(&args_bytes),
        };

        if cache_bust {
            let result = self.inner.call(server_id, bare_name, arguments).await?;
            if let Ok(bytes) = serde_json::to_vec(&result) {
                self.cache.set(key, bytes);
            }
            return Ok((result, CacheMeta::miss()));
        }

        if let Some((bytes, age)) = self.cache.get_with_age(&key) {
            if let Ok(result) = serde_json::from_slice::<ToolCallResult>(&bytes) {
                return Ok((result, CacheMeta::hit(age.as_secs())));
            }
        }

        let inner = self.inner.clone();
        let server_id_owned = server_id.to_string();
        let bare_name_owned = bare_name.to_string();
        let bytes = self
            .cache
            .get_or_load(key, move || async move {
                let result = inner
                    .call(&server_id_owned, &bare_name_owned, arguments)
                    .await
                    .map_err(|e| crate::cache::LoadError::new(e.to_string()))?;
                serde_json::to_vec(&result).map_err(|e| crate::cache::LoadError::new(e.to_string()))
            })
            .await
            .map_err(|e| DownstreamError::Protocol(e.to_string()))?;

        let result = serde_json::from_slice::<ToolCallResult>(&bytes)
            .map_err(|e| DownstreamError::Protocol(format!("decoding cached tool result: {e}")))?;
        Ok((result, CacheMeta::miss()))
    }
}

pub struct Dispatcher {
    routes: Arc<mux_store::RouteStore>,
    workspaces: Arc<mux_store::WorkspaceStore>,
    downstream: CacheAwareDownstream,
    approvals: Arc<ApprovalManager>,
    audit: Arc<AuditLog>,
}

impl Dispatcher {
    pub fn new(
        routes: Arc<mux_store::RouteStore>,
        workspaces: Arc<mux_store::WorkspaceStore>,
        downstream: CacheAwareDownstream,
        approvals: Arc<ApprovalManager>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            routes,
            workspaces,
            downstream,
            approvals,
            audit,
        }
    }

    fn normalize_name(tool_name: &str) -> String {
        if let Some(rest) = tool_name.strip_prefix(&format!("{LEGACY_BUILTIN_NAMESPACE}__")) {
            format!("{BUILTIN_NAMESPACE}__{rest}")
        } else {
            tool_name.to_string()
        }
    }

    fn resolve_route(&self, session: &SessionContext, tool_name: &str) -> Result<RouteMatch, DispatchError> {
        let workspaces = self.workspaces.list();
        let routes = self.routes.list();
        resolve_with_fallback(
            &workspaces,
            |ws_id| routes.iter().filter(|r| r.workspace_id == ws_id).cloned().collect(),
            &session.client_root,
            tool_name,
        )
        .map_err(|e| match e {
            RouteError::NoRoute => DispatchError::RouteNotFound("no matching route".into()),
            RouteError::Denied { .. } => DispatchError::RouteNotFound("route denied by policy".into()),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_audit(
        &self,
        session: &SessionContext,
        workspace_id: Option<String>,
        tool_name: &str,
        route_rule_id: Option<String>,
        downstream_server_id: Option<String>,
        outcome: &str,
        cached: bool,
        arguments: &Value,
        started_at: Instant,
    ) {
        self.emit_audit_detailed(
            session,
            workspace_id,
            tool_name,
            route_rule_id,
            downstream_server_id,
            outcome,
            cached,
            arguments,
            started_at,
            0,
            None,
            None,
        )
        .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_audit_detailed(
        &self,
        session: &SessionContext,
        workspace_id: Option<String>,
        tool_name: &str,
        route_rule_id: Option<String>,
        downstream_server_id: Option<String>,
        outcome: &str,
        cached: bool,
        arguments: &Value,
        started_at: Instant,
        response_size: usize,
        error_code: Option<String>,
        error_message: Option<String>,
    ) {
        let record = AuditRecord {
            timestamp: Utc::now(),
            session_id: session.session_id.clone(),
            workspace_id,
            tool_name: tool_name.to_string(),
            route_rule_id,
            downstream_server_id,
            outcome: outcome.to_string(),
            cached,
            arguments: redact_arguments(arguments),
            latency_ms: started_at.elapsed().as_millis() as u64,
            response_size,
            error_code,
            error_message,
        };
        if let Err(e) = self.audit.append(&record) {
            tracing::warn!(error = %e, "failed to write audit record");
        }
    }

    /// The full `tools/call` pipeline. `arguments` must already have any
    /// transport-level envelope stripped.
    pub async fn handle_tool_call(
        &self,
        session: &SessionContext,
        request: ToolCallRequest,
        cancel: CancellationToken,
    ) -> Result<ToolCallResult, DispatchError> {
        let started_at = Instant::now();
        let tool_name = Self::normalize_name(&request.tool_name);
        let mut arguments = request.arguments;

        if !arguments.is_object() {
            return Err(DispatchError::InvalidParams("arguments must be a JSON object".into()));
        }

        let route = match self.resolve_route(session, &tool_name) {
            Ok(route) => route,
            Err(e) => {
                self.emit_audit(session, None, &tool_name, None, None, "blocked", false, &arguments, started_at)
                    .await;
                return Err(e);
            }
        };

        if route.downstream_server_id == BUILTIN_SERVER_ID {
            let result = self.handle_builtin(session, &tool_name, &arguments).await;
            self.emit_audit(
                session,
                Some(route.workspace_id.clone()),
                &tool_name,
                Some(route.rule_id.clone()),
                Some(route.downstream_server_id.clone()),
                if result.is_error { "error" } else { "success" },
                false,
                &arguments,
                started_at,
            )
            .await;
            return Ok(result);
        }

        let bare_name = bare_tool_name(&tool_name).to_string();

        let rule = self
            .routes
            .get(&route.rule_id)
            .ok_or_else(|| DispatchError::InternalError("matched rule vanished between resolve and fetch".into()))?;

        if tool_name.starts_with(&format!("{CODE_HOSTING_NAMESPACE}__")) {
            if let Some(denied) = check_scope_allowlist(&arguments, rule.allowed_orgs.as_deref(), rule.allowed_repos.as_deref()) {
                self.emit_audit(
                    session,
                    Some(route.workspace_id.clone()),
                    &tool_name,
                    Some(route.rule_id.clone()),
                    Some(route.downstream_server_id.clone()),
                    "blocked",
                    false,
                    &arguments,
                    started_at,
                )
                .await;
                return Ok(ToolCallResult::error(format!("target not allowlisted for this workspace: {denied}")));
            }
        }

        if rule.requires_approval {
            let justification = arguments
                .as_object()
                .and_then(|o| o.get("_justification"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .filter(|s| !s.is_empty());

            match justification {
                None => {
                    self.emit_audit(
                        session,
                        Some(route.workspace_id.clone()),
                        &tool_name,
                        Some(route.rule_id.clone()),
                        Some(route.downstream_server_id.clone()),
                        "blocked",
                        false,
                        &arguments,
                        started_at,
                    )
                    .await;
                    return Ok(ToolCallResult::error(
                        "this action requires approval; retry the call with a non-empty `_justification` field explaining why",
                    ));
                }
                Some(justification) => {
                    if let Some(obj) = arguments.as_object_mut() {
                        obj.remove("_justification");
                    }

                    let approval_id = uuid::Uuid::new_v4().to_string();
                    let timeout_sec = rule.approval_timeout_sec.unwrap_or(self.approvals.default_timeout_sec());
                    let record = ApprovalRecord {
                        id: approval_id.clone(),
                        request_session_id: session.session_id.clone(),
                        request_client_type: session.client_type.clone(),
                        request_model: session.model.clone(),
                        workspace_id: route.workspace_id.clone(),
                        tool_name: tool_name.clone(),
                        arguments: redact_arguments(&arguments),
                        justification,
                        route_rule_id: route.rule_id.clone(),
                        downstream_server_id: route.downstream_server_id.clone(),
                        auth_scope_id: route.auth_scope_id.clone(),
                        status: mux_domain::model::ApprovalStatus::Pending,
                        approver_session_id: None,
                        approver_type: None,
                        resolution: None,
                        created_at: Utc::now(),
                        resolved_at: None,
                        timeout_sec,
                    };

                    let outcome = self
                        .approvals
                        .request_approval(record, cancel.clone())
                        .await
                        .map_err(|e| DispatchError::InternalError(e.to_string()))?;

                    match outcome {
                        ApprovalOutcome::Approved => {}
                        ApprovalOutcome::Denied { reason } => {
                            self.emit_audit(
                                session,
                                Some(route.workspace_id.clone()),
                                &tool_name,
                                Some(route.rule_id.clone()),
                                Some(route.downstream_server_id.clone()),
                                "blocked",
                                false,
                                &arguments,
                                started_at,
                            )
                            .await;
                            return Ok(ToolCallResult::error(format!(
                                "call denied: {}",
                                reason.unwrap_or_else(|| "no reason given".into())
                            )));
                        }
                        ApprovalOutcome::Timeout => {
                            self.emit_audit(
                                session,
                                Some(route.workspace_id.clone()),
                                &tool_name,
                                Some(route.rule_id.clone()),
                                Some(route.downstream_server_id.clone()),
                                "blocked",
                                false,
                                &arguments,
                                started_at,
                            )
                            .await;
                            return Ok(ToolCallResult::error("approval timed out"));
                        }
                        ApprovalOutcome::Cancelled => {
                            self.emit_audit(
                                session,
                                Some(route.workspace_id.clone()),
                                &tool_name,
                                Some(route.rule_id.clone()),
                                Some(route.downstream_server_id.clone()),
                                "blocked",
                                false,
                                &arguments,
                                started_at,
                            )
                            .await;
                            return Err(DispatchError::Timeout);
                        }
                    }
                }
            }
        }

        let cache_bust = arguments
            .as_object_mut()
            .map(|o| o.remove("_cache_bust"))
            .and_then(|v| v)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let call_result = self
            .downstream
            .call_with_meta(&route.downstream_server_id, &route.auth_scope_id, &bare_name, arguments.clone(), cache_bust)
            .await;

        match call_result {
            Ok((mut result, cache_meta)) => {
                result.set_cache_meta(cache_meta);
                let status = if result.is_error { "error" } else { "success" };
                let response_size = serde_json::to_vec(&result).map(|b| b.len()).unwrap_or(0);
                let (error_code, error_message) = if result.is_error {
                    let truncated = result
                        .content
                        .first()
                        .map(|c| c.text.chars().take(200).collect::<String>());
                    (Some("tool_error".to_string()), truncated)
                } else {
                    (None, None)
                };
                self.emit_audit_detailed(
                    session,
                    Some(route.workspace_id.clone()),
                    &tool_name,
                    Some(route.rule_id.clone()),
                    Some(route.downstream_server_id.clone()),
                    status,
                    cache_meta.cached,
                    &arguments,
                    started_at,
                    response_size,
                    error_code,
                    error_message,
                )
                .await;
                Ok(result)
            }
            Err(e) => {
                self.emit_audit_detailed(
                    session,
                    Some(route.workspace_id.clone()),
                    &tool_name,
                    Some(route.rule_id.clone()),
                    Some(route.downstream_server_id.clone()),
                    "error",
                    false,
                    &arguments,
                    started_at,
                    0,
                    Some("process_error".to_string()),
                    Some(e.to_string()),
                )
                .await;
                Err(e.into())
            }
        }
    }

    async fn handle_builtin(&self, session: &SessionContext, tool_name: &str, arguments: &Value) -> ToolCallResult {
        match bare_tool_name(tool_name) {
            "search" => {
                let query = arguments.get("query").and_then(|v| v.as_str()).unwrap_or("").to_lowercase();
                if query.is_empty() {
                    return ToolCallResult::error("missing `query` argument");
                }
                let matches: Vec<String> = self
                    .downstream
                    .inner
                    .list_tools()
                    .into_iter()
                    .filter(|(server_id, tool)| {
                        let namespaced = format!("{server_id}__{}", tool.name);
                        namespaced.to_lowercase().contains(&query) || tool.description.to_lowercase().contains(&query)
                    })
                    .filter(|(server_id, tool)| {
                        let namespaced = format!("{server_id}__{}", tool.name);
                        self.resolve_route(session, &namespaced).is_ok()
                    })
                    .map(|(server_id, tool)| format!("{server_id}__{}", tool.name))
                    .collect();
                ToolCallResult::ok(vec![ToolCallContent::text(
                    serde_json::to_string(&matches).unwrap_or_else(|_| "[]".into()),
                )])
            }
            "cache_stats" => {
                let stats = self.downstream.cache.stats();
                ToolCallResult::ok(vec![ToolCallContent::text(
                    serde_json::json!({
                        "hits": stats.hits,
                        "misses": stats.misses,
                        "evictions": stats.evictions,
                        "size": stats.size,
                        "hit_rate": stats.hit_rate(),
                    })
                    .to_string(),
                )])
            }
            "cache_flush" => {
                self.downstream.cache.flush();
                ToolCallResult::ok(vec![ToolCallContent::text("cache flushed")])
            }
            "approvals_list" => {
                let pending = self.approvals.list_pending(Some(&session.session_id));
                ToolCallResult::ok(vec![ToolCallContent::text(
                    serde_json::to_string(&pending).unwrap_or_else(|_| "[]".into()),
                )])
            }
            "approvals_resolve" => {
                let id = arguments.get("id").and_then(|v| v.as_str());
                let approved = arguments.get("approved").and_then(|v| v.as_bool()).unwrap_or(false);
                let reason = arguments.get("reason").and_then(|v| v.as_str()).map(str::to_string);
                match id {
                    None => ToolCallResult::error("missing `id` argument"),
                    Some(id) => match self.approvals.resolve(id, &session.session_id, ApproverType::McpAgent, approved, reason) {
                        Ok(()) => ToolCallResult::ok(vec![ToolCallContent::text("resolved")]),
                        Err(e) => ToolCallResult::error(e.to_string()),
                    },
                }
            }
            other => ToolCallResult::error(format!("unknown built-in tool: {other}")),
        }
    }

    /// Aggregates tool definitions the current workspace chain can route to,
    /// always including built-ins, optionally minifying schemas.
    pub fn handle_tools_list(&self, session: &SessionContext, downstream_tools: &[(String, McpToolDef)], minify: bool) -> Vec<McpToolDef> {
        let workspaces = self.workspaces.list();
        let routes = self.routes.list();

        let mut visible: Vec<McpToolDef> = downstream_tools
            .iter()
            .filter(|(server_id, tool)| {
                let namespaced = format!("{server_id}__{}", tool.name);
                resolve_with_fallback(
                    &workspaces,
                    |ws_id| routes.iter().filter(|r| r.workspace_id == ws_id).cloned().collect(),
                    &session.client_root,
                    &namespaced,
                )
                .is_ok()
            })
            .map(|(server_id, tool)| McpToolDef {
                name: format!("{server_id}__{}", tool.name),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect();

        for name in ["search", "cache_stats", "cache_flush", "approvals_list", "approvals_resolve"] {
            visible.push(McpToolDef {
                name: format!("{BUILTIN_NAMESPACE}__{name}"),
                description: String::new(),
                input_schema: serde_json::json!({ "type": "object", "properties": {} }),
            });
        }

        if minify {
            for tool in &mut visible {
                tool.input_schema = minify_schema(&tool.input_schema);
            }
        }

        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_replaces_matching_keys_case_insensitively() {
        let input = serde_json::json!({
            "Api_Key": "sk-live-123",
            "nested": { "password": "hunter2", "ok": "fine" },
            "list": [{ "AUTHORIZATION": "Bearer xyz" }],
        });
        let redacted = redact_arguments(&input);
        assert_eq!(redacted["Api_Key"], "[redacted]");
        assert_eq!(redacted["nested"]["password"], "[redacted]");
        assert_eq!(redacted["nested"]["ok"], "fine");
        assert_eq!(redacted["list"][0]["AUTHORIZATION"], "[redacted]");
    }

    #[test]
    fn legacy_builtin_prefix_is_normalized() {
        assert_eq!(Dispatcher::normalize_name("serialagent__cache_flush"), "mcplexer__cache_flush");
        assert_eq!(Dispatcher::normalize_name("fs__read_file"), "fs__read_file");
    }

    #[test]
    fn scope_allowlist_accepts_owner_repo_pair_within_allowlist() {
        let args = serde_json::json!({ "owner": "acme", "repo": "widgets" });
        let denied = check_scope_allowlist(&args, None, Some(&["acme/widgets".to_string()]));
        assert!(denied.is_none());
    }

    #[test]
    fn scope_allowlist_rejects_repo_outside_allowlist() {
        let args = serde_json::json!({ "full_name": "acme/secret-repo" });
        let denied = check_scope_allowlist(&args, None, Some(&["acme/widgets".to_string()]));
        assert_eq!(denied, Some("acme/secret-repo".into()));
    }

    #[test]
    fn scope_allowlist_extracts_repo_from_url_field() {
        let args = serde_json::json!({ "url": "https://github.com/acme/widgets/pull/1" });
        let denied = check_scope_allowlist(&args, None, Some(&["other/repo".to_string()]));
        assert_eq!(denied, Some("acme/widgets".into()));
    }

    #[test]
    fn scope_allowlist_passes_when_no_allowlist_configured() {
        let args = serde_json::json!({ "owner": "acme", "repo": "widgets" });
        assert!(check_scope_allowlist(&args, None, None).is_none());
    }
}
