use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mux_core::approval::ApprovalManager;
use mux_core::bus::EventBus;
use mux_core::dispatch::{CacheAwareDownstream, Dispatcher, SessionContext, ToolCallRequest};
use mux_core::toolcache::ToolCallCache;
use mux_domain::config::ToolCallCachePolicy;
use mux_domain::model::{Policy, RouteRule, Workspace, BUILTIN_SERVER_ID};
use mux_downstream::{DownstreamError, DownstreamManager};
use mux_protocol::{McpToolDef, ToolCallContent, ToolCallResult};
use mux_store::{ApprovalStore, AuditLog, RouteStore, WorkspaceStore};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

struct StubDownstream {
    calls: Arc<AtomicUsize>,
}

impl StubDownstream {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }
}

#[async_trait]
impl DownstreamManager for StubDownstream {
    async fn call(&self, _server_id: &str, tool_name: &str, arguments: Value) -> Result<ToolCallResult, DownstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolCallResult::ok(vec![ToolCallContent::text(format!("{tool_name}:{arguments}"))]))
    }

    fn list_tools(&self) -> Vec<(String, McpToolDef)> {
        vec![]
    }

    fn server_count(&self) -> usize {
        1
    }

    fn tool_count(&self) -> usize {
        0
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    dispatcher: Dispatcher,
    downstream_calls: Arc<AtomicUsize>,
}

fn rule(id: &str, tool_match: Vec<&str>, policy: Policy, requires_approval: bool) -> RouteRule {
    RouteRule {
        id: id.into(),
        workspace_id: "w1".into(),
        priority: 0,
        path_glob: "*".into(),
        tool_match: tool_match.into_iter().map(String::from).collect(),
        policy,
        downstream_server_id: "clickup".into(),
        auth_scope_id: "default".into(),
        requires_approval,
        approval_timeout_sec: Some(5),
        allowed_orgs: None,
        allowed_repos: None,
        log_level: None,
    }
}

/// A route pointed at the built-in sentinel server id, so `mcplexer__*`
/// tools are intercepted by `Dispatcher::handle_builtin` instead of being
/// dispatched to a downstream server.
fn builtin_rule(id: &str, tool_match: Vec<&str>) -> RouteRule {
    RouteRule {
        downstream_server_id: BUILTIN_SERVER_ID.into(),
        ..rule(id, tool_match, Policy::Allow, false)
    }
}

fn harness(rules: Vec<RouteRule>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let routes = Arc::new(RouteStore::open(dir.path()).unwrap());
    routes.seed_if_empty(&rules).unwrap();
    let workspaces = Arc::new(WorkspaceStore::open(dir.path()).unwrap());
    workspaces
        .seed_if_empty(&[Workspace { id: "w1".into(), name: "root".into(), root_path: "/".into() }])
        .unwrap();

    let downstream_calls = Arc::new(AtomicUsize::new(0));
    let stub = Arc::new(StubDownstream::new(downstream_calls.clone()));
    let cache = Arc::new(ToolCallCache::new(
        64,
        1800,
        vec![ToolCallCachePolicy {
            downstream_server_id: "clickup".into(),
            enabled: true,
            cacheable: vec!["get_*".into()],
            mutating: vec!["create_*".into()],
            ttl_sec: 0,
            max_entries: None,
        }],
    ));
    let cache_aware = CacheAwareDownstream::new(stub.clone(), cache);

    let approval_store = Arc::new(ApprovalStore::open(dir.path()).unwrap());
    let bus = Arc::new(EventBus::new());
    let approvals = Arc::new(ApprovalManager::new(approval_store, bus));
    let audit = Arc::new(AuditLog::open(dir.path()).unwrap());

    let dispatcher = Dispatcher::new(routes, workspaces, cache_aware, approvals, audit);

    Harness {
        _dir: dir,
        dispatcher,
        downstream_calls,
    }
}

fn session() -> SessionContext {
    SessionContext {
        session_id: "sess-1".into(),
        client_type: "mcp_agent".into(),
        model: Some("test-model".into()),
        client_root: "/home/dev/project".into(),
    }
}

#[tokio::test]
async fn allowed_call_dispatches_and_returns_cache_miss_metadata() {
    let h = harness(vec![rule("r1", vec!["*"], Policy::Allow, false)]);
    let result = h
        .dispatcher
        .handle_tool_call(
            &session(),
            ToolCallRequest {
                tool_name: "clickup__get_task".into(),
                arguments: serde_json::json!({ "task_id": "123" }),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.is_error);
    assert_eq!(result.cache_meta().unwrap().cached, false);
    assert_eq!(h.downstream_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_cacheable_call_with_same_args_is_a_cache_hit() {
    let h = harness(vec![rule("r1", vec!["*"], Policy::Allow, false)]);
    let req = || ToolCallRequest {
        tool_name: "clickup__get_task".into(),
        arguments: serde_json::json!({ "task_id": "123" }),
    };

    let first = h.dispatcher.handle_tool_call(&session(), req(), CancellationToken::new()).await.unwrap();
    assert_eq!(first.cache_meta().unwrap().cached, false);

    let second = h.dispatcher.handle_tool_call(&session(), req(), CancellationToken::new()).await.unwrap();
    assert_eq!(second.cache_meta().unwrap().cached, true);
    assert_eq!(h.downstream_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mutation_call_invalidates_cache_for_scope() {
    let h = harness(vec![rule("r1", vec!["*"], Policy::Allow, false)]);
    let read = || ToolCallRequest {
        tool_name: "clickup__get_task".into(),
        arguments: serde_json::json!({ "task_id": "123" }),
    };

    let first = h.dispatcher.handle_tool_call(&session(), read(), CancellationToken::new()).await.unwrap();
    assert_eq!(first.cache_meta().unwrap().cached, false);
    let second = h.dispatcher.handle_tool_call(&session(), read(), CancellationToken::new()).await.unwrap();
    assert_eq!(second.cache_meta().unwrap().cached, true);

    h.dispatcher
        .handle_tool_call(
            &session(),
            ToolCallRequest {
                tool_name: "clickup__create_task".into(),
                arguments: serde_json::json!({ "title": "new" }),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let third = h.dispatcher.handle_tool_call(&session(), read(), CancellationToken::new()).await.unwrap();
    assert_eq!(third.cache_meta().unwrap().cached, false);

    assert_eq!(h.downstream_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn denied_route_returns_route_not_found_without_calling_downstream() {
    let h = harness(vec![rule("deny1", vec!["create_*"], Policy::Deny, false)]);
    let err = h
        .dispatcher
        .handle_tool_call(
            &session(),
            ToolCallRequest {
                tool_name: "clickup__create_task".into(),
                arguments: serde_json::json!({}),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, mux_core::dispatch::DispatchError::RouteNotFound(_)));
}

#[tokio::test]
async fn approval_required_first_call_asks_for_justification_then_second_call_blocks_until_resolved() {
    let h = harness(vec![rule("r1", vec!["*"], Policy::Allow, true)]);

    let phase1 = h
        .dispatcher
        .handle_tool_call(
            &session(),
            ToolCallRequest {
                tool_name: "clickup__create_task".into(),
                arguments: serde_json::json!({ "title": "do thing" }),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(phase1.is_error);
    assert!(phase1.content[0].text.contains("_justification"));
}

#[tokio::test]
async fn builtin_search_returns_only_routable_matches() {
    let h = harness(vec![
        builtin_rule("builtin", vec!["mcplexer__*"]),
        rule("r1", vec!["clickup__get_*"], Policy::Allow, false),
    ]);

    let result = h
        .dispatcher
        .handle_tool_call(
            &session(),
            ToolCallRequest {
                tool_name: "mcplexer__search".into(),
                arguments: serde_json::json!({ "query": "task" }),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.is_error);
    // StubDownstream advertises no tools, so the search finds nothing but must not error.
    assert_eq!(result.content[0].text, "[]");
}

#[tokio::test]
async fn builtin_search_with_empty_query_is_a_tool_error() {
    let h = harness(vec![builtin_rule("builtin", vec!["mcplexer__*"])]);

    let result = h
        .dispatcher
        .handle_tool_call(
            &session(),
            ToolCallRequest {
                tool_name: "mcplexer__search".into(),
                arguments: serde_json::json!({}),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.is_error);
}

#[tokio::test]
async fn no_route_for_unknown_workspace_path_is_route_not_found() {
    let h = harness(vec![rule("r1", vec!["*"], Policy::Allow, false)]);
    let mut sess = session();
    sess.client_root = "/outside/anything".into();

    let err = h
        .dispatcher
        .handle_tool_call(
            &sess,
            ToolCallRequest {
                tool_name: "clickup__get_task".into(),
                arguments: serde_json::json!({}),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, mux_core::dispatch::DispatchError::RouteNotFound(_)));
}
